//! XDR values shared by unit tests.

use stellar_xdr::curr::{
    ExtensionPoint, LedgerEntryChanges, SorobanAuthorizationEntry, SorobanAuthorizedFunction,
    SorobanAuthorizedInvocation, SorobanCredentials, SorobanTransactionMeta,
    SorobanTransactionMetaExt, SorobanTransactionMetaV2, TransactionMeta, TransactionMetaV3,
    TransactionMetaV4, VecM,
};

use super::transaction::InvokeCall;
use super::xdr::{encode, ScVal};
use super::{Simulation, SimulationSuccess};

/// `SorobanTransactionData` with an empty footprint and zero resources.
pub const EMPTY_TRANSACTION_DATA: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

pub fn simulation_success(return_value: Option<ScVal>) -> SimulationSuccess {
    SimulationSuccess {
        transaction_data: EMPTY_TRANSACTION_DATA.to_string(),
        min_resource_fee: 5_000,
        auth: vec![],
        return_value,
        latest_ledger: 100,
    }
}

pub fn simulation(return_value: Option<ScVal>) -> Simulation {
    Simulation::Success(simulation_success(return_value))
}

/// Source-account authorization for a call with no sub-invocations.
pub fn auth_entry(contract: [u8; 32], function: &str) -> SorobanAuthorizationEntry {
    let call = InvokeCall::new(contract, function, vec![]);
    SorobanAuthorizationEntry {
        credentials: SorobanCredentials::SourceAccount,
        root_invocation: SorobanAuthorizedInvocation {
            function: SorobanAuthorizedFunction::ContractFn(
                call.to_args().expect("valid call"),
            ),
            sub_invocations: VecM::default(),
        },
    }
}

/// Base64 v3 `TransactionMeta` carrying `return_value`.
pub fn meta_v3(return_value: ScVal) -> String {
    let meta = TransactionMeta::V3(TransactionMetaV3 {
        ext: ExtensionPoint::V0,
        tx_changes_before: LedgerEntryChanges(VecM::default()),
        operations: VecM::default(),
        tx_changes_after: LedgerEntryChanges(VecM::default()),
        soroban_meta: Some(SorobanTransactionMeta {
            ext: SorobanTransactionMetaExt::V0,
            events: VecM::default(),
            return_value,
            diagnostic_events: VecM::default(),
        }),
    });
    encode(&meta).expect("encodable meta")
}

/// Base64 v4 `TransactionMeta`, where the return value is optional.
pub fn meta_v4(return_value: Option<ScVal>) -> String {
    let meta = TransactionMeta::V4(TransactionMetaV4 {
        ext: ExtensionPoint::V0,
        tx_changes_before: LedgerEntryChanges(VecM::default()),
        operations: VecM::default(),
        tx_changes_after: LedgerEntryChanges(VecM::default()),
        soroban_meta: Some(SorobanTransactionMetaV2 {
            ext: SorobanTransactionMetaExt::V0,
            return_value,
        }),
        events: VecM::default(),
        diagnostic_events: VecM::default(),
    });
    encode(&meta).expect("encodable meta")
}

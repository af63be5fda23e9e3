//! Transaction envelopes for a single contract invocation.
//!
//! An [`Envelope`] is built unsigned, simulated, then assembled with the
//! simulated resource footprint and authorization entries before it is
//! handed to a wallet for signing.

use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    DecoratedSignature, Hash, HostFunction, InvokeContractArgs, InvokeHostFunctionOp, Limits,
    Memo, MuxedAccount, Operation, OperationBody, Preconditions, ScSymbol, SequenceNumber,
    Signature, SignatureHint, SorobanAuthorizationEntry, SorobanTransactionData, StringM,
    TimeBounds, TimePoint, Transaction, TransactionEnvelope, TransactionExt,
    TransactionSignaturePayload, TransactionSignaturePayloadTaggedTransaction,
    TransactionV1Envelope, Uint256, VecM, WriteXdr,
};

use super::xdr::{
    contract_address, contract_hash, decode, encode, ScVal, XdrError, MAX_SYMBOL_LEN,
};
use super::SimulationSuccess;
use crate::types::MarketError;

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// Which contract function to call and with what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeCall {
    pub contract: [u8; 32],
    pub function: String,
    pub args: Vec<ScVal>,
}

impl InvokeCall {
    pub fn new(contract: [u8; 32], function: &str, args: Vec<ScVal>) -> Self {
        Self {
            contract,
            function: function.to_string(),
            args,
        }
    }

    pub fn to_args(&self) -> Result<InvokeContractArgs, XdrError> {
        Ok(InvokeContractArgs {
            contract_address: contract_address(self.contract),
            function_name: ScSymbol(StringM::try_from(self.function.as_str())?),
            args: self.args.clone().try_into()?,
        })
    }

    fn from_args(args: &InvokeContractArgs) -> Result<Self, MarketError> {
        let contract = contract_hash(&args.contract_address)
            .ok_or_else(|| MarketError::Decode("invocation target is not a contract".into()))?;
        let function = std::str::from_utf8(args.function_name.0.as_slice())
            .map_err(|_| MarketError::Decode("function name is not UTF-8".into()))?;
        Ok(Self {
            contract,
            function: function.to_string(),
            args: args.args.to_vec(),
        })
    }
}

/// Whether `name` is a valid contract function symbol.
pub fn is_valid_symbol(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_SYMBOL_LEN
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A v1 transaction with exactly one `InvokeHostFunction` operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub source: [u8; 32],
    pub fee: u32,
    pub sequence: i64,
    /// Upper time bound (unix seconds). Lower bound is always 0.
    pub max_time: u64,
    pub call: InvokeCall,
    pub auth: Vec<SorobanAuthorizationEntry>,
    /// Resource footprint, present once assembled.
    pub soroban_data: Option<SorobanTransactionData>,
}

impl Envelope {
    pub fn new(source: [u8; 32], sequence: i64, fee: u32, max_time: u64, call: InvokeCall) -> Self {
        Self {
            source,
            fee,
            sequence,
            max_time,
            call,
            auth: Vec::new(),
            soroban_data: None,
        }
    }

    pub fn is_assembled(&self) -> bool {
        self.soroban_data.is_some()
    }

    /// Attach simulated resources: fee becomes `fee + minResourceFee`, the
    /// transaction data goes into `ext`, and the simulated auth entries are
    /// installed unless the operation already carries some.
    pub fn assemble(mut self, sim: &SimulationSuccess) -> Result<Self, MarketError> {
        let total = u32::try_from(sim.min_resource_fee)
            .ok()
            .and_then(|resource_fee| self.fee.checked_add(resource_fee))
            .ok_or_else(|| {
                MarketError::Decode(format!(
                    "resource fee {} overflows the transaction fee",
                    sim.min_resource_fee
                ))
            })?;
        self.fee = total;
        self.soroban_data = Some(decode(&sim.transaction_data)?);
        if self.auth.is_empty() {
            self.auth = sim
                .auth
                .iter()
                .map(|entry| decode::<SorobanAuthorizationEntry>(entry))
                .collect::<Result<_, _>>()?;
        }
        Ok(self)
    }

    pub fn transaction(&self) -> Result<Transaction, XdrError> {
        let operation = Operation {
            source_account: None,
            body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                host_function: HostFunction::InvokeContract(self.call.to_args()?),
                auth: self.auth.clone().try_into()?,
            }),
        };
        Ok(Transaction {
            source_account: MuxedAccount::Ed25519(Uint256(self.source)),
            fee: self.fee,
            seq_num: SequenceNumber(self.sequence),
            cond: Preconditions::Time(TimeBounds {
                min_time: TimePoint(0),
                max_time: TimePoint(self.max_time),
            }),
            memo: Memo::None,
            operations: vec![operation].try_into()?,
            ext: match &self.soroban_data {
                None => TransactionExt::V0,
                Some(data) => TransactionExt::V1(data.clone()),
            },
        })
    }

    /// Unsigned `TransactionEnvelope` XDR (zero signatures).
    pub fn to_xdr_base64(&self) -> Result<String, XdrError> {
        encode(&TransactionEnvelope::Tx(TransactionV1Envelope {
            tx: self.transaction()?,
            signatures: VecM::default(),
        }))
    }

    /// Transaction hash as signed by wallets.
    pub fn hash(&self, network_passphrase: &str) -> Result<[u8; 32], XdrError> {
        transaction_hash(&self.transaction()?, network_passphrase)
    }

    pub fn hash_hex(&self, network_passphrase: &str) -> Result<String, XdrError> {
        Ok(hex::encode(self.hash(network_passphrase)?))
    }
}

/// `sha256(TransactionSignaturePayload)` for a v1 transaction.
pub fn transaction_hash(tx: &Transaction, network_passphrase: &str) -> Result<[u8; 32], XdrError> {
    let payload = TransactionSignaturePayload {
        network_id: Hash(network_id(network_passphrase)),
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
    };
    Ok(sha256(&payload.to_xdr(Limits::none())?))
}

/// `sha256(passphrase)`, the network identifier mixed into every signature.
pub fn network_id(network_passphrase: &str) -> [u8; 32] {
    sha256(network_passphrase.as_bytes())
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(bytes));
    out
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

fn v1_envelope(envelope_b64: &str) -> Result<TransactionV1Envelope, MarketError> {
    match decode::<TransactionEnvelope>(envelope_b64)? {
        TransactionEnvelope::Tx(envelope) => Ok(envelope),
        _ => Err(MarketError::Decode("expected a v1 transaction envelope".into())),
    }
}

/// Hex hash of the transaction inside an envelope, signed or not.
pub fn envelope_hash_hex(
    envelope_b64: &str,
    network_passphrase: &str,
) -> Result<String, MarketError> {
    let envelope = v1_envelope(envelope_b64)?;
    Ok(hex::encode(transaction_hash(&envelope.tx, network_passphrase)?))
}

/// Append one `DecoratedSignature` to an unsigned envelope.
pub fn append_signature(
    unsigned_b64: &str,
    hint: [u8; 4],
    signature: &[u8],
) -> Result<String, MarketError> {
    let mut envelope = v1_envelope(unsigned_b64)?;
    if !envelope.signatures.is_empty() {
        return Err(MarketError::Decode("envelope is already signed".into()));
    }
    let decorated = DecoratedSignature {
        hint: SignatureHint(hint),
        signature: Signature(signature.to_vec().try_into()?),
    };
    envelope.signatures = vec![decorated].try_into()?;
    Ok(encode(&TransactionEnvelope::Tx(envelope))?)
}

/// Check that `signed_b64` is `unsigned_b64` plus signatures and nothing
/// else. Returns the number of signatures, or `None` when the signed
/// envelope does not carry the transaction that was handed out.
pub fn signature_count(unsigned_b64: &str, signed_b64: &str) -> Result<Option<u32>, MarketError> {
    let unsigned = v1_envelope(unsigned_b64)?;
    let signed = match v1_envelope(signed_b64) {
        Ok(envelope) => envelope,
        Err(_) => return Ok(None),
    };
    if signed.tx != unsigned.tx {
        return Ok(None);
    }
    Ok(Some(signed.signatures.len() as u32))
}

// ---------------------------------------------------------------------------
// Inspection
// ---------------------------------------------------------------------------

/// The fields of an invocation envelope callers and tests look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeSummary {
    pub source: [u8; 32],
    pub fee: u32,
    pub sequence: i64,
    pub max_time: Option<u64>,
    pub call: InvokeCall,
    pub auth_entries: u32,
    pub signatures: u32,
}

/// Decode an unsigned, assembled or signed invocation envelope.
pub fn inspect(envelope_b64: &str) -> Result<EnvelopeSummary, MarketError> {
    let envelope = v1_envelope(envelope_b64)?;
    let tx = &envelope.tx;

    let source = match &tx.source_account {
        MuxedAccount::Ed25519(Uint256(key)) => *key,
        MuxedAccount::MuxedEd25519(muxed) => muxed.ed25519.0,
    };
    let max_time = match &tx.cond {
        Preconditions::None => None,
        Preconditions::Time(bounds) => Some(bounds.max_time.0),
        Preconditions::V2(cond) => cond.time_bounds.as_ref().map(|bounds| bounds.max_time.0),
    };
    let op = match tx.operations.as_slice() {
        [op] => op,
        ops => {
            return Err(MarketError::Decode(format!(
                "expected one operation, found {}",
                ops.len()
            )))
        }
    };
    let (call, auth_entries) = match &op.body {
        OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
            host_function: HostFunction::InvokeContract(args),
            auth,
        }) => (InvokeCall::from_args(args)?, auth.len() as u32),
        _ => return Err(MarketError::Decode("operation is not a contract invocation".into())),
    };

    Ok(EnvelopeSummary {
        source,
        fee: tx.fee,
        sequence: tx.seq_num.0,
        max_time,
        call,
        auth_entries,
        signatures: envelope.signatures.len() as u32,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

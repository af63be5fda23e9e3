//! Stellar XDR as this client uses it.
//!
//! The wire types come from `stellar-xdr`. This module adds strkey
//! conversion, decode limits for data received from the network, and the
//! handful of `ScVal` constructors and accessors the contract adapter needs.

use stellar_xdr::curr::{
    AccountId, ContractId, Hash, Int128Parts, LedgerEntryData, LedgerKey, LedgerKeyAccount,
    PublicKey, ScMap, ScMapEntry, ScString, ScSymbol, ScVec, StringM, TransactionMeta,
    UInt128Parts, Uint256,
};

pub use stellar_xdr::curr::{Error as XdrError, Limits, ReadXdr, ScAddress, ScVal, WriteXdr};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Nesting limit when decoding values received from the network.
pub const MAX_DEPTH: u32 = 64;

/// Size limit on a single decoded blob. Result meta is the largest.
const MAX_LEN: usize = 8 * 1024 * 1024;

/// Maximum byte length of an `ScSymbol`.
pub const MAX_SYMBOL_LEN: usize = 32;

fn inbound() -> Limits {
    Limits {
        depth: MAX_DEPTH,
        len: MAX_LEN,
    }
}

/// Decode base64 XDR, rejecting trailing bytes and oversized input.
pub fn decode<T: ReadXdr>(b64: &str) -> Result<T, XdrError> {
    T::from_xdr_base64(b64.trim(), inbound())
}

pub fn encode<T: WriteXdr>(value: &T) -> Result<String, XdrError> {
    value.to_xdr_base64(Limits::none())
}

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

pub fn account_id(key: [u8; 32]) -> AccountId {
    AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(key)))
}

pub fn account_address(key: [u8; 32]) -> ScAddress {
    ScAddress::Account(account_id(key))
}

pub fn contract_address(hash: [u8; 32]) -> ScAddress {
    ScAddress::Contract(ContractId(Hash(hash)))
}

/// Parse a `G...` account or `C...` contract strkey.
///
/// Strkey decoding ignores case, so the input must also equal the
/// canonical encoding of what it decodes to.
pub fn parse_address(s: &str) -> Option<ScAddress> {
    let addr = match stellar_strkey::ed25519::PublicKey::from_string(s) {
        Ok(pk) => account_address(pk.0),
        Err(_) => contract_address(stellar_strkey::Contract::from_string(s).ok()?.0),
    };
    (strkey(&addr)? == s).then_some(addr)
}

/// Strkey of an account or contract address. Other address kinds have no
/// meaning to the market contract.
pub fn strkey(addr: &ScAddress) -> Option<String> {
    match addr {
        ScAddress::Account(_) => account_key(addr)
            .map(|key| stellar_strkey::ed25519::PublicKey(key).to_string()),
        ScAddress::Contract(_) => {
            contract_hash(addr).map(|hash| stellar_strkey::Contract(hash).to_string())
        }
        _ => None,
    }
}

pub fn account_key(addr: &ScAddress) -> Option<[u8; 32]> {
    match addr {
        ScAddress::Account(AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(key)))) => {
            Some(*key)
        }
        _ => None,
    }
}

pub fn contract_hash(addr: &ScAddress) -> Option<[u8; 32]> {
    match addr {
        ScAddress::Contract(ContractId(Hash(hash))) => Some(*hash),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// ScVal
// ---------------------------------------------------------------------------

pub fn symbol(s: &str) -> Result<ScVal, XdrError> {
    Ok(ScVal::Symbol(ScSymbol(StringM::try_from(s)?)))
}

pub fn string(s: &str) -> Result<ScVal, XdrError> {
    Ok(ScVal::String(ScString(StringM::try_from(s)?)))
}

pub fn vec(items: Vec<ScVal>) -> Result<ScVal, XdrError> {
    Ok(ScVal::Vec(Some(ScVec(items.try_into()?))))
}

/// Map value with entries kept in the given order.
pub fn map(entries: Vec<(ScVal, ScVal)>) -> Result<ScVal, XdrError> {
    let entries: Vec<ScMapEntry> = entries
        .into_iter()
        .map(|(key, val)| ScMapEntry { key, val })
        .collect();
    Ok(ScVal::Map(Some(ScMap(entries.try_into()?))))
}

pub fn i128(v: i128) -> ScVal {
    ScVal::I128(Int128Parts {
        hi: (v >> 64) as i64,
        lo: v as u64,
    })
}

pub fn u128(v: u128) -> ScVal {
    ScVal::U128(UInt128Parts {
        hi: (v >> 64) as u64,
        lo: v as u64,
    })
}

pub fn i128_from_parts(parts: &Int128Parts) -> i128 {
    (i128::from(parts.hi) << 64) | i128::from(parts.lo)
}

pub fn u128_from_parts(parts: &UInt128Parts) -> u128 {
    (u128::from(parts.hi) << 64) | u128::from(parts.lo)
}

/// Symbol or string contents, if this value is one of those.
pub fn text(val: &ScVal) -> Option<&str> {
    match val {
        ScVal::Symbol(ScSymbol(s)) => std::str::from_utf8(s.as_slice()).ok(),
        ScVal::String(ScString(s)) => std::str::from_utf8(s.as_slice()).ok(),
        _ => None,
    }
}

/// Vector items. An absent vector reads as empty.
pub fn items(val: &ScVal) -> Option<&[ScVal]> {
    match val {
        ScVal::Vec(Some(ScVec(items))) => Some(items.as_slice()),
        ScVal::Vec(None) => Some(&[]),
        _ => None,
    }
}

/// Map entries. An absent map reads as empty.
pub fn entries(val: &ScVal) -> Option<&[ScMapEntry]> {
    match val {
        ScVal::Map(Some(ScMap(entries))) => Some(entries.as_slice()),
        ScVal::Map(None) => Some(&[]),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Ledger entries and transaction meta
// ---------------------------------------------------------------------------

/// Base64 `LedgerKey::Account` for the given ed25519 key.
pub fn account_ledger_key(key: [u8; 32]) -> Result<String, XdrError> {
    encode(&LedgerKey::Account(LedgerKeyAccount {
        account_id: account_id(key),
    }))
}

/// Sequence number from a base64 `LedgerEntryData` holding an account.
pub fn account_sequence_from_entry(entry_b64: &str) -> Result<i64, XdrError> {
    match decode::<LedgerEntryData>(entry_b64)? {
        LedgerEntryData::Account(entry) => Ok(entry.seq_num.0),
        _ => Err(XdrError::Invalid),
    }
}

/// Contract return value recorded in a base64 `TransactionMeta`.
///
/// Only v3 and v4 meta carry Soroban data; older versions yield `None`.
pub fn return_value_from_meta(meta_b64: &str) -> Result<Option<ScVal>, XdrError> {
    let value = match decode::<TransactionMeta>(meta_b64)? {
        TransactionMeta::V3(meta) => meta.soroban_meta.map(|soroban| soroban.return_value),
        TransactionMeta::V4(meta) => meta.soroban_meta.and_then(|soroban| soroban.return_value),
        _ => None,
    };
    Ok(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

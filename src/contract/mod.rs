//! Prediction-market contract adapter.
//!
//! Maps native arguments to `ScVal` and `ScVal` results back to the records
//! in `types.rs`. Enum-shaped values go through [`TaggedVariant`] so every
//! historically observed wire shape is normalised in one place.

use std::fmt;

use stellar_xdr::curr::{ScMapEntry, ScVal};

use crate::ledger::transaction::is_valid_symbol;
use crate::ledger::xdr::{self, parse_address};
use crate::types::{Market, MarketError, MarketStatus, Position, Side};

// ---------------------------------------------------------------------------
// Contract interface
// ---------------------------------------------------------------------------

pub mod method {
    pub const GET_MARKET_COUNT: &str = "get_market_count";
    pub const GET_MARKET: &str = "get_market";
    pub const GET_POSITION: &str = "get_position";
    pub const CREATE_MARKET: &str = "create_market";
    pub const BUY_SHARES: &str = "buy_shares";
    pub const RESOLVE_MARKET: &str = "resolve_market";
    pub const CLAIM_WINNINGS: &str = "claim_winnings";
}

/// Tag the status decoder falls back to when the value has no usable shape.
pub const DEFAULT_STATUS_TAG: &str = "Open";

/// Errors the contract raises, by `#[contracterror]` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractError {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    Unauthorized = 3,
    MarketNotFound = 4,
    MarketClosed = 5,
    MarketNotResolved = 6,
    MarketAlreadyResolved = 7,
    DeadlineNotReached = 8,
    InvalidAmount = 9,
    NothingToClaim = 10,
    AlreadyClaimed = 11,
    InvalidDeadline = 12,
}

impl ContractError {
    pub fn code(&self) -> u32 {
        *self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        use ContractError::*;
        Some(match code {
            1 => AlreadyInitialized,
            2 => NotInitialized,
            3 => Unauthorized,
            4 => MarketNotFound,
            5 => MarketClosed,
            6 => MarketNotResolved,
            7 => MarketAlreadyResolved,
            8 => DeadlineNotReached,
            9 => InvalidAmount,
            10 => NothingToClaim,
            11 => AlreadyClaimed,
            12 => InvalidDeadline,
            _ => return None,
        })
    }

    /// Find `Error(Contract, #N)` in host diagnostic text.
    pub fn from_diagnostic(message: &str) -> Option<Self> {
        const MARKER: &str = "Error(Contract, #";
        let start = message.find(MARKER)? + MARKER.len();
        let digits: String = message[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok().and_then(Self::from_code)
    }
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} (#{})", self.code())
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Account or contract address. Malformed strkeys never reach the wire.
pub fn address(addr: &str) -> Result<ScVal, MarketError> {
    parse_address(addr.trim())
        .map(ScVal::Address)
        .ok_or_else(|| MarketError::Validation(format!("malformed address: {addr:?}")))
}

pub fn u64(v: u64) -> ScVal {
    ScVal::U64(v)
}

pub fn i128(v: i128) -> ScVal {
    xdr::i128(v)
}

pub fn string(s: &str) -> Result<ScVal, MarketError> {
    Ok(xdr::string(s)?)
}

pub fn symbol(s: &str) -> Result<ScVal, MarketError> {
    if !is_valid_symbol(s) {
        return Err(MarketError::Validation(format!("invalid symbol: {s:?}")));
    }
    Ok(xdr::symbol(s)?)
}

/// A payload-free enum case, as `#[contracttype]` enums expect: a vector
/// holding only the variant symbol.
pub fn unit_variant(tag: &str) -> Result<ScVal, MarketError> {
    Ok(xdr::vec(vec![symbol(tag)?])?)
}

pub fn side(side: Side) -> Result<ScVal, MarketError> {
    unit_variant(side.tag())
}

// ---------------------------------------------------------------------------
// Tagged variants
// ---------------------------------------------------------------------------

/// Normalised enum value: a tag plus its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedVariant {
    pub tag: String,
    pub values: Vec<ScVal>,
}

impl TaggedVariant {
    /// Accepts a bare symbol (or string), a vector with the tag first, or
    /// a single-entry map keyed by the tag. Anything else yields `None`.
    pub fn parse(val: &ScVal) -> Option<Self> {
        if let Some(tag) = xdr::text(val) {
            return Some(Self {
                tag: tag.to_string(),
                values: Vec::new(),
            });
        }
        if let Some(items) = xdr::items(val) {
            let (first, rest) = items.split_first()?;
            return Some(Self {
                tag: xdr::text(first)?.to_string(),
                values: rest.to_vec(),
            });
        }
        let entry = xdr::entries(val)?.first()?;
        Some(Self {
            tag: xdr::text(&entry.key)?.to_string(),
            values: vec![entry.val.clone()],
        })
    }

    /// Like [`parse`](Self::parse) but degrades to `default_tag`.
    pub fn parse_or(val: &ScVal, default_tag: &str) -> Self {
        Self::parse(val).unwrap_or_else(|| Self {
            tag: default_tag.to_string(),
            values: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// A `#[contracttype]` struct: a map keyed by field-name symbols.
#[derive(Debug)]
pub struct Record<'a> {
    entries: &'a [ScMapEntry],
}

impl<'a> Record<'a> {
    pub fn new(val: &'a ScVal) -> Result<Self, MarketError> {
        xdr::entries(val).map(|entries| Self { entries }).ok_or_else(|| {
            MarketError::Decode(format!("expected a record, got {}", kind(val)))
        })
    }

    pub fn field(&self, name: &str) -> Result<&'a ScVal, MarketError> {
        self.entries
            .iter()
            .find(|entry| xdr::text(&entry.key) == Some(name))
            .map(|entry| &entry.val)
            .ok_or_else(|| MarketError::Decode(format!("record has no field {name:?}")))
    }

    pub fn u64(&self, name: &str) -> Result<u64, MarketError> {
        decode_u64(self.field(name)?).map_err(|e| field_error(name, e))
    }

    pub fn i128(&self, name: &str) -> Result<i128, MarketError> {
        decode_i128(self.field(name)?).map_err(|e| field_error(name, e))
    }

    pub fn bool(&self, name: &str) -> Result<bool, MarketError> {
        match self.field(name)? {
            ScVal::Bool(b) => Ok(*b),
            other => Err(field_error(name, unexpected("bool", other))),
        }
    }

    pub fn text(&self, name: &str) -> Result<String, MarketError> {
        let val = self.field(name)?;
        if let Some(text) = xdr::text(val) {
            return Ok(text.to_string());
        }
        match val {
            ScVal::Bytes(b) => String::from_utf8(b.0.as_slice().to_vec())
                .map_err(|_| field_error(name, MarketError::Decode("invalid UTF-8".into()))),
            other => Err(field_error(name, unexpected("string", other))),
        }
    }

    pub fn address(&self, name: &str) -> Result<String, MarketError> {
        match self.field(name)? {
            ScVal::Address(addr) => xdr::strkey(addr).ok_or_else(|| {
                field_error(name, MarketError::Decode("not an account or contract".into()))
            }),
            other => Err(field_error(name, unexpected("address", other))),
        }
    }
}

/// Unsigned integer of any width that fits in 64 bits.
pub fn decode_u64(val: &ScVal) -> Result<u64, MarketError> {
    let out_of_range = || MarketError::Decode(format!("{val:?} does not fit in u64"));
    match val {
        ScVal::U64(v) => Ok(*v),
        ScVal::Timepoint(v) => Ok(v.0),
        ScVal::Duration(v) => Ok(v.0),
        ScVal::U32(v) => Ok(u64::from(*v)),
        ScVal::I32(v) => u64::try_from(*v).map_err(|_| out_of_range()),
        ScVal::I64(v) => u64::try_from(*v).map_err(|_| out_of_range()),
        ScVal::U128(parts) => {
            u64::try_from(xdr::u128_from_parts(parts)).map_err(|_| out_of_range())
        }
        ScVal::I128(parts) => {
            u64::try_from(xdr::i128_from_parts(parts)).map_err(|_| out_of_range())
        }
        other => Err(unexpected("integer", other)),
    }
}

pub fn decode_i128(val: &ScVal) -> Result<i128, MarketError> {
    match val {
        ScVal::I128(parts) => Ok(xdr::i128_from_parts(parts)),
        ScVal::U128(parts) => {
            let v = xdr::u128_from_parts(parts);
            i128::try_from(v).map_err(|_| MarketError::Decode(format!("{v} does not fit in i128")))
        }
        ScVal::I64(v) => Ok(i128::from(*v)),
        ScVal::U64(v) => Ok(i128::from(*v)),
        ScVal::I32(v) => Ok(i128::from(*v)),
        ScVal::U32(v) => Ok(i128::from(*v)),
        other => Err(unexpected("integer", other)),
    }
}

pub fn decode_side(val: &ScVal) -> Result<Side, MarketError> {
    let variant = TaggedVariant::parse(val)
        .ok_or_else(|| MarketError::Decode(format!("expected a side, got {}", kind(val))))?;
    side_from_tag(&variant.tag)
}

fn side_from_tag(tag: &str) -> Result<Side, MarketError> {
    match tag {
        "Yes" => Ok(Side::Yes),
        "No" => Ok(Side::No),
        other => Err(MarketError::Decode(format!("unknown side tag {other:?}"))),
    }
}

/// Market status; values without a recognisable shape read as `Open`.
pub fn decode_status(val: &ScVal) -> Result<MarketStatus, MarketError> {
    let variant = TaggedVariant::parse_or(val, DEFAULT_STATUS_TAG);
    match variant.tag.as_str() {
        "Open" => Ok(MarketStatus::Open),
        "Resolved" => {
            let outcome = variant
                .values
                .first()
                .ok_or_else(|| MarketError::Decode("Resolved status has no outcome".into()))?;
            // The outcome may itself be a tagged value or a bare tag.
            let side = match TaggedVariant::parse(outcome) {
                Some(inner) => side_from_tag(&inner.tag)?,
                None => return Err(unexpected("side", outcome)),
            };
            Ok(MarketStatus::Resolved(side))
        }
        other => Err(MarketError::Decode(format!("unknown status tag {other:?}"))),
    }
}

pub fn decode_market(id: u64, val: &ScVal) -> Result<Market, MarketError> {
    let rec = Record::new(val)?;
    let status = match rec.field("status") {
        Ok(status) => decode_status(status)?,
        Err(_) => MarketStatus::Open,
    };
    Ok(Market {
        id,
        creator: rec.address("creator")?,
        question: rec.text("question")?,
        deadline: rec.u64("deadline")?,
        status,
        total_yes: rec.i128("total_yes")?,
        total_no: rec.i128("total_no")?,
        pool_balance: rec.i128("pool_balance")?,
    })
}

pub fn decode_position(val: &ScVal) -> Result<Position, MarketError> {
    let rec = Record::new(val)?;
    Ok(Position {
        yes_shares: rec.i128("yes_shares")?,
        no_shares: rec.i128("no_shares")?,
        claimed: rec.bool("claimed")?,
    })
}

fn kind(val: &ScVal) -> &'static str {
    match val {
        ScVal::Bool(_) => "bool",
        ScVal::Void => "void",
        ScVal::Error(_) => "error",
        ScVal::U32(_) => "u32",
        ScVal::I32(_) => "i32",
        ScVal::U64(_) => "u64",
        ScVal::I64(_) => "i64",
        ScVal::Timepoint(_) => "timepoint",
        ScVal::Duration(_) => "duration",
        ScVal::U128(_) => "u128",
        ScVal::I128(_) => "i128",
        ScVal::U256(_) => "u256",
        ScVal::I256(_) => "i256",
        ScVal::Bytes(_) => "bytes",
        ScVal::String(_) => "string",
        ScVal::Symbol(_) => "symbol",
        ScVal::Vec(_) => "vec",
        ScVal::Map(_) => "map",
        ScVal::Address(_) => "address",
        _ => "ledger value",
    }
}

fn unexpected(expected: &str, got: &ScVal) -> MarketError {
    MarketError::Decode(format!("expected {expected}, got {}", kind(got)))
}

fn field_error(name: &str, err: MarketError) -> MarketError {
    match err {
        MarketError::Decode(msg) => MarketError::Decode(format!("field {name:?}: {msg}")),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Record encoding
// ---------------------------------------------------------------------------

/// Wire form of a market record as the contract returns it. Fields are
/// sorted by name, matching host map ordering.
pub fn encode_market(market: &Market) -> Result<ScVal, MarketError> {
    let status = match market.status {
        MarketStatus::Open => unit_variant("Open")?,
        MarketStatus::Resolved(outcome) => xdr::vec(vec![symbol("Resolved")?, side(outcome)?])?,
    };
    Ok(xdr::map(vec![
        (symbol("creator")?, address(&market.creator)?),
        (symbol("deadline")?, ScVal::U64(market.deadline)),
        (symbol("pool_balance")?, i128(market.pool_balance)),
        (symbol("question")?, string(&market.question)?),
        (symbol("status")?, status),
        (symbol("total_no")?, i128(market.total_no)),
        (symbol("total_yes")?, i128(market.total_yes)),
    ])?)
}

pub fn encode_position(position: &Position) -> Result<ScVal, MarketError> {
    Ok(xdr::map(vec![
        (symbol("claimed")?, ScVal::Bool(position.claimed)),
        (symbol("no_shares")?, i128(position.no_shares)),
        (symbol("yes_shares")?, i128(position.yes_shares)),
    ])?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Integration tests: the market client driven end to end against an
//! in-memory ledger.

mod scenarios;

//! Core engine: the contract call lifecycle.

pub mod invoker;

pub use invoker::{CallOrchestrator, InvokeSettings, WriteOutcome};

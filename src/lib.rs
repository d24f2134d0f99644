//! # Fincontract Evaluation
//!
//! Values fincontracts: financial instruments written as trees of a small,
//! fixed set of combinators (`And`, `Or`, `If`, `Give`, `Scale`, `ScaleObs`,
//! `Timebound`, `Zero`, `One`).
//!
//! ## Evaluation modes
//!
//! - **estimate** bounds the contract as one interval per currency without
//!   touching any live data source. Runtime choices widen to the envelope of
//!   both branches and unknown observables to their expected range.
//! - **direct** first refreshes every oracle ("gateway") the tree depends on,
//!   waits for all of them, and then resolves `If` and `ScaleObs` against the
//!   refreshed state.
//!
//! ```text
//! Node tree ─┬─ estimate ──────────────────────────────► Dispatcher(Estimation)
//!            └─ direct ─► Freshness (fan-out, barrier) ─► Dispatcher(Direct)
//! ```
//!
//! The contract tree lives in [`ast`], the engine in [`eval`], and the
//! capabilities it needs from the outside world in [`gateway`].

pub mod ast;
pub mod config;
pub mod currency;
pub mod error;
pub mod eval;
pub mod gateway;
pub mod timestamp;

// Re-exports
pub use ast::*;
pub use error::*;
pub use eval::*;

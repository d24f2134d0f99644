//! Fincontract Evaluation Engine
//!
//! Values a combinator tree in one of two modes. An *estimate* bounds the
//! contract per currency without any external call; a *direct* valuation
//! first refreshes every oracle the tree depends on and then resolves the
//! runtime branches against them.
//!
//! # Core Components
//!
//! ## Tree Dispatcher
//! [`visitor::visit`] walks the tree in post-order and hands each node, with
//! its children's results, to a [`visitor::NodeVisitor`] strategy.
//!
//! ## Estimation Evaluator
//! Interval semantics for every combinator ([`estimate`]).
//!
//! ## Direct Evaluator
//! Reuses the estimation semantics but reads oracles for `If` and `ScaleObs`
//! ([`direct`]).
//!
//! ## Gateway Freshness
//! Collects every referenced oracle and refreshes them concurrently; the
//! direct evaluator only runs once all refreshes succeed ([`freshness`]).
//!
//! ## Evaluator
//! Selects the mode and sequences the passes above ([`evaluator`]).

pub mod direct;
pub mod estimate;
pub mod evaluator;
pub mod freshness;
pub mod value;
pub mod visitor;

pub use evaluator::{EvalError, EvalResult, EvaluationMode, Evaluator};
pub use value::{CurrencyVector, Interval};

//! Capabilities the evaluation engine needs from the outside world.
//!
//! The engine never talks to a chain directly. Direct valuation goes through
//! [`Gateways`], which combines an asynchronous refresh with synchronous reads
//! of the committed oracle state. [`LedgerGateways`] builds that capability out
//! of the two lower-level collaborators: a [`Ledger`] that submits a
//! transaction and waits for its confirmation, and a [`GatewayReader`] that
//! reads the current value stored at an oracle.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::GatewayAddress;
use crate::config::EvaluatorConfig;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Transaction {operation} could not be submitted: {message}")]
    Submission { operation: String, message: String },
    #[error("Transaction {operation} was rejected: {message}")]
    Rejected { operation: String, message: String },
    #[error("Confirmation for {operation} never arrived: {message}")]
    Confirmation { operation: String, message: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Gateway unreachable: {0}")]
    Unreachable(String),
    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Raw value stored at an oracle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GatewayValue {
    Boolean(bool),
    Number(f64),
}

/// Which event marks a submitted transaction as confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationFilter {
    /// The transaction has been mined into the latest block.
    LatestBlock,
    /// The target contract emitted the named event.
    Event(String),
}

/// Oracle access used by direct evaluation.
#[automock]
#[async_trait]
pub trait Gateways: Send + Sync {
    /// Bring the oracle at `address` up to date. Resolves once the update is
    /// confirmed.
    async fn refresh(&self, address: &GatewayAddress) -> GatewayResult<()>;

    /// Current boolean held by the oracle.
    fn read_boolean(&self, address: &GatewayAddress) -> GatewayResult<bool>;

    /// Current scalar held by the oracle.
    fn read_scalar(&self, address: &GatewayAddress) -> GatewayResult<f64>;
}

/// Transaction submission against the ledger hosting the oracles.
#[automock]
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submit `operation(args)` to `target` and wait until `filter` observes
    /// its confirmation.
    async fn submit_and_wait(
        &self,
        target: &GatewayAddress,
        operation: &str,
        args: &[serde_json::Value],
        filter: &ConfirmationFilter,
    ) -> Result<(), LedgerError>;
}

/// Read access to committed oracle state.
#[automock]
pub trait GatewayReader: Send + Sync {
    fn get_value(&self, address: &GatewayAddress) -> GatewayResult<GatewayValue>;
}

/// [`Gateways`] backed by a ledger for refreshes and a reader for values.
pub struct LedgerGateways {
    ledger: Arc<dyn Ledger>,
    reader: Arc<dyn GatewayReader>,
    operation: String,
    filter: ConfirmationFilter,
}

impl LedgerGateways {
    pub fn new(ledger: Arc<dyn Ledger>, reader: Arc<dyn GatewayReader>) -> Self {
        Self {
            ledger,
            reader,
            operation: "update".to_string(),
            filter: ConfirmationFilter::LatestBlock,
        }
    }

    pub fn from_config(
        ledger: Arc<dyn Ledger>,
        reader: Arc<dyn GatewayReader>,
        config: &EvaluatorConfig,
    ) -> Self {
        Self::new(ledger, reader).with_operation(config.refresh_operation.clone())
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }

    pub fn with_filter(mut self, filter: ConfirmationFilter) -> Self {
        self.filter = filter;
        self
    }
}

#[async_trait]
impl Gateways for LedgerGateways {
    async fn refresh(&self, address: &GatewayAddress) -> GatewayResult<()> {
        self.ledger
            .submit_and_wait(address, &self.operation, &[], &self.filter)
            .await?;
        Ok(())
    }

    fn read_boolean(&self, address: &GatewayAddress) -> GatewayResult<bool> {
        match self.reader.get_value(address)? {
            GatewayValue::Boolean(value) => Ok(value),
            GatewayValue::Number(n) => Err(GatewayError::MalformedResponse(format!(
                "expected boolean from {}, got number {}",
                address, n
            ))),
        }
    }

    fn read_scalar(&self, address: &GatewayAddress) -> GatewayResult<f64> {
        match self.reader.get_value(address)? {
            GatewayValue::Number(n) if n.is_finite() => Ok(n),
            GatewayValue::Number(n) => Err(GatewayError::MalformedResponse(format!(
                "non-finite scalar {} from {}",
                n, address
            ))),
            GatewayValue::Boolean(b) => Err(GatewayError::MalformedResponse(format!(
                "expected number from {}, got boolean {}",
                address, b
            ))),
        }
    }
}

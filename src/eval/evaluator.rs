use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ast::{Fincontract, GatewayAddress, Node, NodeKind};
use crate::config::{ConfigResult, EvaluatorConfig};
use crate::eval::direct::DirectEvaluator;
use crate::eval::estimate::EstimationEvaluator;
use crate::eval::freshness::GatewayUpdater;
use crate::eval::value::CurrencyVector;
use crate::eval::visitor::visit;
use crate::gateway::{GatewayError, Gateways};
use crate::timestamp::{Clock, SystemClock};

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Unknown node type: {0}")]
    UnknownNode(String),
    #[error("{kind} node has an invalid gateway address: {address:?}")]
    InvalidGatewayAddress {
        kind: NodeKind,
        address: GatewayAddress,
    },
    #[error("Failed to refresh gateway {address} ({failed} of {total} refreshes failed): {source}")]
    OracleRefresh {
        address: GatewayAddress,
        failed: usize,
        total: usize,
        source: GatewayError,
    },
    #[error("Failed to read gateway {address}: {source}")]
    OracleRead {
        address: GatewayAddress,
        source: GatewayError,
    },
    #[error("Invalid evaluation mode: {0}")]
    InvalidMode(String),
    #[error("Currency index {index} out of range for {count} currencies")]
    InvalidCurrency { index: usize, count: usize },
    #[error("{kind} node is missing field {field}")]
    MissingField {
        kind: NodeKind,
        field: &'static str,
    },
    #[error("Malformed node description: {0}")]
    Decode(String),
    #[error("Invalid exchange rates: {0}")]
    InvalidExchangeRates(String),
}

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Static bounds, no oracle access.
    Estimate,
    /// Refresh every oracle, then resolve runtime branches against them.
    Direct,
}

/// Entry point for valuing a contract tree.
pub struct Evaluator {
    config: EvaluatorConfig,
    gateways: Arc<dyn Gateways>,
    clock: Arc<dyn Clock>,
}

impl Evaluator {
    pub fn new(gateways: Arc<dyn Gateways>) -> Self {
        Self::with_config(EvaluatorConfig::default(), gateways)
    }

    pub fn with_config(config: EvaluatorConfig, gateways: Arc<dyn Gateways>) -> Self {
        Self {
            config,
            gateways,
            clock: Arc::new(SystemClock),
        }
    }

    /// Like [`Evaluator::with_config`], but rejects an invalid config.
    pub fn try_new(config: EvaluatorConfig, gateways: Arc<dyn Gateways>) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::with_config(config, gateways))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Value `root` in the mode named by `mode` (`"estimate"` or `"direct"`).
    pub async fn evaluate(&self, root: &Node, mode: &str) -> EvalResult<CurrencyVector> {
        let mode =
            EvaluationMode::from_str(mode).map_err(|_| EvalError::InvalidMode(mode.to_string()))?;
        self.evaluate_with(root, mode).await
    }

    #[tracing::instrument(skip(self, root), fields(evaluation_id = %Uuid::new_v4()))]
    pub async fn evaluate_with(
        &self,
        root: &Node,
        mode: EvaluationMode,
    ) -> EvalResult<CurrencyVector> {
        debug!("Evaluating {} node tree", root.size());
        let result = match mode {
            EvaluationMode::Estimate => self.estimate(root),
            EvaluationMode::Direct => self.direct(root).await,
        }?;
        info!("Evaluation finished: {}", result);
        Ok(result)
    }

    pub async fn evaluate_fincontract(
        &self,
        fincontract: &Fincontract,
        mode: &str,
    ) -> EvalResult<CurrencyVector> {
        debug!("Evaluating fincontract {}", fincontract.id);
        self.evaluate(&fincontract.root, mode).await
    }

    /// Bounds on the value of `root`; never touches a gateway.
    pub fn estimate(&self, root: &Node) -> EvalResult<CurrencyVector> {
        visit(&self.estimation_evaluator(), root)
    }

    /// Refreshes every referenced gateway, then values `root` against them.
    pub async fn direct(&self, root: &Node) -> EvalResult<CurrencyVector> {
        let updated = self.gateway_updater().update_all(root).await?;
        debug!("{} gateways up to date", updated);
        let evaluator = DirectEvaluator::new(self.estimation_evaluator(), self.gateways.clone());
        visit(&evaluator, root)
    }

    fn estimation_evaluator(&self) -> EstimationEvaluator {
        EstimationEvaluator::new(
            self.config.currency_count,
            self.config.default_obs_range,
            self.clock.clone(),
        )
    }

    fn gateway_updater(&self) -> GatewayUpdater {
        GatewayUpdater::new(self.gateways.clone())
            .with_deduplication(self.config.deduplicate_gateways)
            .with_max_concurrent(self.config.max_concurrent_refreshes)
    }
}

use std::sync::Arc;

use tracing::debug;

use crate::ast::{GatewayAddress, ObsRange};
use crate::eval::estimate::EstimationEvaluator;
use crate::eval::evaluator::{EvalError, EvalResult};
use crate::eval::value::CurrencyVector;
use crate::eval::visitor::NodeVisitor;
use crate::gateway::Gateways;

/// Resolves `If` and `ScaleObs` against live oracle state.
///
/// Every other combinator shares the estimation semantics. Oracle reads are
/// synchronous and assume the gateways were refreshed beforehand.
pub struct DirectEvaluator {
    pure: EstimationEvaluator,
    gateways: Arc<dyn Gateways>,
}

impl DirectEvaluator {
    pub fn new(pure: EstimationEvaluator, gateways: Arc<dyn Gateways>) -> Self {
        Self { pure, gateways }
    }
}

impl NodeVisitor for DirectEvaluator {
    type Output = CurrencyVector;

    fn visit_zero(&self) -> EvalResult<CurrencyVector> {
        self.pure.visit_zero()
    }

    fn visit_one(&self, currency: usize) -> EvalResult<CurrencyVector> {
        self.pure.visit_one(currency)
    }

    fn visit_give(&self, child: CurrencyVector) -> EvalResult<CurrencyVector> {
        self.pure.visit_give(child)
    }

    fn visit_scale(&self, factor: f64, child: CurrencyVector) -> EvalResult<CurrencyVector> {
        self.pure.visit_scale(factor, child)
    }

    fn visit_scale_obs(
        &self,
        gateway: &GatewayAddress,
        _range: Option<ObsRange>,
        child: CurrencyVector,
    ) -> EvalResult<CurrencyVector> {
        let factor = self
            .gateways
            .read_scalar(gateway)
            .map_err(|source| EvalError::OracleRead {
                address: gateway.clone(),
                source,
            })?;
        debug!("ScaleObs gateway {} returned {}", gateway, factor);
        Ok(child.map(|i| i.scale(factor)))
    }

    fn visit_timebound(
        &self,
        lower_bound: i64,
        upper_bound: i64,
        child: CurrencyVector,
    ) -> EvalResult<CurrencyVector> {
        self.pure.visit_timebound(lower_bound, upper_bound, child)
    }

    fn visit_and(&self, left: CurrencyVector, right: CurrencyVector) -> EvalResult<CurrencyVector> {
        self.pure.visit_and(left, right)
    }

    fn visit_or(&self, left: CurrencyVector, right: CurrencyVector) -> EvalResult<CurrencyVector> {
        self.pure.visit_or(left, right)
    }

    fn visit_if(
        &self,
        gateway: &GatewayAddress,
        left: CurrencyVector,
        right: CurrencyVector,
    ) -> EvalResult<CurrencyVector> {
        let condition = self
            .gateways
            .read_boolean(gateway)
            .map_err(|source| EvalError::OracleRead {
                address: gateway.clone(),
                source,
            })?;
        debug!("If gateway {} returned {}", gateway, condition);
        Ok(if condition { left } else { right })
    }
}

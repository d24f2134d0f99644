use std::sync::Arc;

use crate::ast::{GatewayAddress, ObsRange};
use crate::eval::evaluator::EvalResult;
use crate::eval::value::{CurrencyVector, Interval};
use crate::eval::visitor::NodeVisitor;
use crate::timestamp::Clock;

/// Bounds a contract's value without consulting any oracle.
///
/// Branches decided at runtime (`Or`, `If`) widen to the envelope of both
/// sides, and unresolved observables (`ScaleObs`) multiply by their whole
/// expected range.
pub struct EstimationEvaluator {
    currency_count: usize,
    default_range: ObsRange,
    clock: Arc<dyn Clock>,
}

impl EstimationEvaluator {
    pub fn new(currency_count: usize, default_range: ObsRange, clock: Arc<dyn Clock>) -> Self {
        Self {
            currency_count,
            default_range,
            clock,
        }
    }

    pub fn currency_count(&self) -> usize {
        self.currency_count
    }
}

impl NodeVisitor for EstimationEvaluator {
    type Output = CurrencyVector;

    fn visit_zero(&self) -> EvalResult<CurrencyVector> {
        Ok(CurrencyVector::zero(self.currency_count))
    }

    fn visit_one(&self, currency: usize) -> EvalResult<CurrencyVector> {
        CurrencyVector::unit(self.currency_count, currency)
    }

    fn visit_give(&self, child: CurrencyVector) -> EvalResult<CurrencyVector> {
        Ok(child.map(Interval::negate))
    }

    fn visit_scale(&self, factor: f64, child: CurrencyVector) -> EvalResult<CurrencyVector> {
        Ok(child.map(|i| i.scale(factor)))
    }

    fn visit_scale_obs(
        &self,
        _gateway: &GatewayAddress,
        range: Option<ObsRange>,
        child: CurrencyVector,
    ) -> EvalResult<CurrencyVector> {
        let range = range.unwrap_or(self.default_range);
        Ok(child.map(|i| i.scale_range(range)))
    }

    fn visit_timebound(
        &self,
        _lower_bound: i64,
        upper_bound: i64,
        child: CurrencyVector,
    ) -> EvalResult<CurrencyVector> {
        // Past its upper bound the contract can no longer be acquired.
        if self.clock.now().is_after(upper_bound) {
            return Ok(CurrencyVector::zero(self.currency_count));
        }
        Ok(child)
    }

    fn visit_and(&self, left: CurrencyVector, right: CurrencyVector) -> EvalResult<CurrencyVector> {
        Ok(left.zip_with(right, Interval::sum))
    }

    fn visit_or(&self, left: CurrencyVector, right: CurrencyVector) -> EvalResult<CurrencyVector> {
        Ok(left.zip_with(right, Interval::union))
    }

    fn visit_if(
        &self,
        _gateway: &GatewayAddress,
        left: CurrencyVector,
        right: CurrencyVector,
    ) -> EvalResult<CurrencyVector> {
        Ok(left.zip_with(right, Interval::union))
    }
}

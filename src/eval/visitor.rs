use crate::ast::{GatewayAddress, Node, ObsRange};
use crate::eval::evaluator::EvalResult;

/// Per-combinator semantics plugged into [`visit`].
///
/// Each method receives the already-computed results of the node's children,
/// so an implementation only decides how a single combinator folds them.
pub trait NodeVisitor {
    type Output;

    fn visit_zero(&self) -> EvalResult<Self::Output>;

    fn visit_one(&self, currency: usize) -> EvalResult<Self::Output>;

    fn visit_give(&self, child: Self::Output) -> EvalResult<Self::Output>;

    fn visit_scale(&self, factor: f64, child: Self::Output) -> EvalResult<Self::Output>;

    fn visit_scale_obs(
        &self,
        gateway: &GatewayAddress,
        range: Option<ObsRange>,
        child: Self::Output,
    ) -> EvalResult<Self::Output>;

    fn visit_timebound(
        &self,
        lower_bound: i64,
        upper_bound: i64,
        child: Self::Output,
    ) -> EvalResult<Self::Output>;

    fn visit_and(&self, left: Self::Output, right: Self::Output) -> EvalResult<Self::Output>;

    fn visit_or(&self, left: Self::Output, right: Self::Output) -> EvalResult<Self::Output>;

    fn visit_if(
        &self,
        gateway: &GatewayAddress,
        left: Self::Output,
        right: Self::Output,
    ) -> EvalResult<Self::Output>;
}

/// Post-order traversal of `node`, routing every node to `visitor`.
///
/// Children are fully evaluated before their parent, left before right, so
/// any side effects a visitor performs happen in a fixed order.
pub fn visit<V: NodeVisitor>(visitor: &V, node: &Node) -> EvalResult<V::Output> {
    match node {
        Node::Zero => visitor.visit_zero(),
        Node::One { currency } => visitor.visit_one(*currency),
        Node::Give { child } => {
            let child = visit(visitor, child)?;
            visitor.visit_give(child)
        }
        Node::Scale { factor, child } => {
            let child = visit(visitor, child)?;
            visitor.visit_scale(*factor, child)
        }
        Node::ScaleObs {
            gateway,
            range,
            child,
        } => {
            let child = visit(visitor, child)?;
            visitor.visit_scale_obs(gateway, *range, child)
        }
        Node::Timebound {
            lower_bound,
            upper_bound,
            child,
        } => {
            let child = visit(visitor, child)?;
            visitor.visit_timebound(*lower_bound, *upper_bound, child)
        }
        Node::And { left, right } => {
            let left = visit(visitor, left)?;
            let right = visit(visitor, right)?;
            visitor.visit_and(left, right)
        }
        Node::Or { left, right } => {
            let left = visit(visitor, left)?;
            let right = visit(visitor, right)?;
            visitor.visit_or(left, right)
        }
        Node::If {
            gateway,
            left,
            right,
        } => {
            let left = visit(visitor, left)?;
            let right = visit(visitor, right)?;
            visitor.visit_if(gateway, left, right)
        }
    }
}

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::ast::{GatewayAddress, Node, NodeKind, ObsRange};
use crate::eval::evaluator::{EvalError, EvalResult};
use crate::eval::visitor::{visit, NodeVisitor};
use crate::gateway::{GatewayResult, Gateways};

/// An oracle referenced by the tree, with the kind of node that uses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRef {
    pub address: GatewayAddress,
    pub kind: NodeKind,
}

/// Collects every oracle referenced by `If` and `ScaleObs` nodes, in
/// traversal order. Rejects unusable addresses as soon as it meets one.
pub struct GatewayCollector;

impl GatewayCollector {
    fn reference(gateway: &GatewayAddress, kind: NodeKind) -> EvalResult<GatewayRef> {
        if !gateway.is_valid() {
            return Err(EvalError::InvalidGatewayAddress {
                kind,
                address: gateway.clone(),
            });
        }
        Ok(GatewayRef {
            address: gateway.clone(),
            kind,
        })
    }
}

impl NodeVisitor for GatewayCollector {
    type Output = Vec<GatewayRef>;

    fn visit_zero(&self) -> EvalResult<Vec<GatewayRef>> {
        Ok(Vec::new())
    }

    fn visit_one(&self, _currency: usize) -> EvalResult<Vec<GatewayRef>> {
        Ok(Vec::new())
    }

    fn visit_give(&self, child: Vec<GatewayRef>) -> EvalResult<Vec<GatewayRef>> {
        Ok(child)
    }

    fn visit_scale(&self, _factor: f64, child: Vec<GatewayRef>) -> EvalResult<Vec<GatewayRef>> {
        Ok(child)
    }

    fn visit_scale_obs(
        &self,
        gateway: &GatewayAddress,
        _range: Option<ObsRange>,
        mut child: Vec<GatewayRef>,
    ) -> EvalResult<Vec<GatewayRef>> {
        child.push(Self::reference(gateway, NodeKind::ScaleObs)?);
        Ok(child)
    }

    fn visit_timebound(
        &self,
        _lower_bound: i64,
        _upper_bound: i64,
        child: Vec<GatewayRef>,
    ) -> EvalResult<Vec<GatewayRef>> {
        Ok(child)
    }

    fn visit_and(
        &self,
        mut left: Vec<GatewayRef>,
        right: Vec<GatewayRef>,
    ) -> EvalResult<Vec<GatewayRef>> {
        left.extend(right);
        Ok(left)
    }

    fn visit_or(
        &self,
        mut left: Vec<GatewayRef>,
        right: Vec<GatewayRef>,
    ) -> EvalResult<Vec<GatewayRef>> {
        left.extend(right);
        Ok(left)
    }

    fn visit_if(
        &self,
        gateway: &GatewayAddress,
        mut left: Vec<GatewayRef>,
        right: Vec<GatewayRef>,
    ) -> EvalResult<Vec<GatewayRef>> {
        left.extend(right);
        left.push(Self::reference(gateway, NodeKind::If)?);
        Ok(left)
    }
}

/// Refreshes every oracle a tree depends on before it is valued directly.
///
/// All refreshes are started together and awaited together; one failure
/// fails the whole update, but only after every other refresh has settled.
pub struct GatewayUpdater {
    gateways: Arc<dyn Gateways>,
    deduplicate: bool,
    max_concurrent: Option<usize>,
}

impl GatewayUpdater {
    pub fn new(gateways: Arc<dyn Gateways>) -> Self {
        Self {
            gateways,
            deduplicate: true,
            max_concurrent: None,
        }
    }

    pub fn with_deduplication(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: Option<usize>) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Oracles to refresh for `root`, validated and (optionally) deduplicated.
    pub fn collect(&self, root: &Node) -> EvalResult<Vec<GatewayRef>> {
        let targets = visit(&GatewayCollector, root)?;
        if !self.deduplicate {
            return Ok(targets);
        }
        let mut seen = HashSet::new();
        Ok(targets
            .into_iter()
            .filter(|target| seen.insert(target.address.clone()))
            .collect())
    }

    /// Refresh all oracles referenced by `root`. Returns how many were refreshed.
    #[tracing::instrument(level = "debug", skip(self, root))]
    pub async fn update_all(&self, root: &Node) -> EvalResult<usize> {
        let targets = self.collect(root)?;
        let total = targets.len();
        debug!("Refreshing {} gateways", total);

        let refreshes: Vec<_> = targets.iter().map(|target| self.refresh(target)).collect();
        let results: Vec<GatewayResult<()>> = match self.max_concurrent {
            Some(limit) => {
                stream::iter(refreshes)
                    .buffered(limit.max(1))
                    .collect()
                    .await
            }
            None => join_all(refreshes).await,
        };

        let failures: Vec<_> = targets
            .into_iter()
            .zip(results)
            .filter_map(|(target, result)| result.err().map(|e| (target, e)))
            .collect();
        for (target, error) in &failures {
            warn!(
                "Failed to update {} gateway at {}: {}",
                target.kind, target.address, error
            );
        }

        let failed = failures.len();
        match failures.into_iter().next() {
            Some((target, source)) => Err(EvalError::OracleRefresh {
                address: target.address,
                failed,
                total,
                source,
            }),
            None => Ok(total),
        }
    }

    async fn refresh(&self, target: &GatewayRef) -> GatewayResult<()> {
        self.gateways.refresh(&target.address).await?;
        info!(
            "Finished updating {} gateway at: {}",
            target.kind, target.address
        );
        Ok(())
    }
}

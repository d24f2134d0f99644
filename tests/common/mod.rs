#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use fincontract_eval::gateway::{GatewayError, GatewayResult, GatewayValue, Gateways};
use fincontract_eval::GatewayAddress;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RefreshStarted(String),
    RefreshFinished(String),
    ReadBoolean(String),
    ReadScalar(String),
}

/// In-memory oracle set that records every call made against it.
#[derive(Default)]
pub struct RecordingGateways {
    values: HashMap<String, GatewayValue>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingGateways {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boolean(mut self, address: &str, value: bool) -> Self {
        self.values
            .insert(address.to_string(), GatewayValue::Boolean(value));
        self
    }

    pub fn with_scalar(mut self, address: &str, value: f64) -> Self {
        self.values
            .insert(address.to_string(), GatewayValue::Number(value));
        self
    }

    pub fn failing_refresh(mut self, address: &str) -> Self {
        self.failing.insert(address.to_string());
        self
    }

    pub fn with_delay(mut self, address: &str, delay: Duration) -> Self {
        self.delays.insert(address.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn refreshed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::RefreshFinished(address) => Some(address),
                _ => None,
            })
            .collect()
    }

    pub fn reads(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::ReadBoolean(_) | Call::ReadScalar(_)))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn value(&self, address: &GatewayAddress) -> GatewayResult<GatewayValue> {
        self.values
            .get(address.as_str())
            .copied()
            .ok_or_else(|| GatewayError::Unreachable(address.to_string()))
    }
}

#[async_trait]
impl Gateways for RecordingGateways {
    async fn refresh(&self, address: &GatewayAddress) -> GatewayResult<()> {
        self.record(Call::RefreshStarted(address.to_string()));
        if let Some(delay) = self.delays.get(address.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        self.record(Call::RefreshFinished(address.to_string()));
        if self.failing.contains(address.as_str()) {
            return Err(GatewayError::Unreachable(format!(
                "update of {} reverted",
                address
            )));
        }
        Ok(())
    }

    fn read_boolean(&self, address: &GatewayAddress) -> GatewayResult<bool> {
        self.record(Call::ReadBoolean(address.to_string()));
        match self.value(address)? {
            GatewayValue::Boolean(b) => Ok(b),
            other => Err(GatewayError::MalformedResponse(format!("{:?}", other))),
        }
    }

    fn read_scalar(&self, address: &GatewayAddress) -> GatewayResult<f64> {
        self.record(Call::ReadScalar(address.to_string()));
        match self.value(address)? {
            GatewayValue::Number(n) => Ok(n),
            other => Err(GatewayError::MalformedResponse(format!("{:?}", other))),
        }
    }
}

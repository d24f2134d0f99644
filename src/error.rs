use thiserror::Error;

use crate::config::ConfigError;
use crate::eval::evaluator::EvalError;
use crate::gateway::{GatewayError, LedgerError};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Eval error: {0}")]
    Eval(#[from] EvalError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_mode() -> InternalResult<()> {
        Err(EvalError::InvalidMode("bogus".to_string()))?;
        Ok(())
    }

    #[test]
    fn test_eval_error_converts() {
        let error = invalid_mode().unwrap_err();
        assert!(matches!(error, Error::Eval(EvalError::InvalidMode(_))));
        assert_eq!(
            error.to_string(),
            "Eval error: Invalid evaluation mode: bogus"
        );
    }

    #[test]
    fn test_internal_helper() {
        assert_eq!(
            Error::internal("boom").to_string(),
            "Internal error: boom"
        );
    }
}

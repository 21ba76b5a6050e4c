use thiserror::Error;

use crate::cache::CacheError;
use crate::gateway::GatewayError;

/// Request validation errors. These are returned before any upstream call
/// is made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("currency code cannot be empty")]
    EmptyCurrency,
    #[error("invalid currency code: '{value}'")]
    InvalidCurrencyCode { value: String },
    #[error("{native} cannot have an issuer")]
    NativeWithIssuer { native: &'static str },
    #[error("issuer is required for '{code}'")]
    IssuerRequired { code: String },
    #[error("unknown gateway '{name}' for currency '{code}'")]
    UnknownGateway { name: String, code: String },

    #[error("please specify a list of currency pairs or a base and counter currency")]
    MissingPairs,
    #[error("cannot retrieve more than {max} pairs (requested {requested})")]
    TooManyPairs { requested: usize, max: usize },

    #[error("invalid time range: '{value}'")]
    InvalidRange { value: String },
    #[error("invalid {field}: '{value}'")]
    InvalidTime { field: &'static str, value: String },
    #[error("please provide 2 distinct times")]
    EmptyWindow,
}

/// Top-level error type for report operations.
///
/// Variants map one-to-one onto the failure categories callers need to
/// tell apart: bad input, a broken upstream data tier, a broken cache
/// tier, and a conversion pair with no trades.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upstream(#[from] GatewayError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("cannot determine exchange rate")]
    NoExchangeRate,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

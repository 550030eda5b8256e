use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("statshub request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("statshub returned {status} for {url}")]
    Status { status: reqwest::StatusCode, url: String },

    #[error("statshub unavailable: {0}")]
    Unavailable(String),

    #[error("invalid statshub payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unable to read {metric}: {reason}")]
    Probe { metric: &'static str, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StatsError {
    pub fn probe(metric: &'static str, reason: impl Into<String>) -> Self {
        StatsError::Probe {
            metric,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StatsError>;

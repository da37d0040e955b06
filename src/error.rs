use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingEngineError {
    #[error("GL code '{code}' not found in {code_type} catalog")]
    GlCodeNotFound { code: String, code_type: String },

    #[error("Invalid job name '{0}': no matching salaried or non-salaried job code")]
    InvalidJobName(String),

    #[error("Invalid starting month '{0}': expected YYYY-MM")]
    InvalidStartingMonth(String),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Upstream fetch from {source_name} failed: {details}")]
    UpstreamFetchFailure {
        source_name: String,
        details: String,
    },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl BillingEngineError {
    /// Validation failures abort a contract mutation as a whole.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::GlCodeNotFound { .. }
                | Self::InvalidJobName(_)
                | Self::InvalidStartingMonth(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BillingEngineError>;

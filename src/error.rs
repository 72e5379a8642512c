use thiserror::Error;

#[derive(Error, Debug)]
pub enum BasketError {
    #[error("Invalid argument `{name}`: {message}")]
    InvalidArgument { name: &'static str, message: String },
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Operation was cancelled")]
    Cancelled,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Save of rule set `{name}` failed at {stage}: {message}")]
    Save { name: String, stage: String, message: String },
    #[error("Config error: {0}")]
    Config(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, BasketError>;

impl BasketError {
    pub(crate) fn invalid_argument(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument { name, message: message.into() }
    }
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// Helper conversions
impl From<config::ConfigError> for BasketError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl<T> From<std::sync::PoisonError<T>> for BasketError {
    fn from(e: std::sync::PoisonError<T>) -> Self { Self::Lock(e.to_string()) }
}

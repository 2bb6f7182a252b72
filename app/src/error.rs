use sprout_core::error::PayloadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DBError {
    #[error(transparent)]
    SQLError(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, std::string::String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Missing field: {0}")]
    Missing(&'static str),
    #[error("Invalid field {0}: {1}")]
    Malformed(&'static str, std::string::String),
}

impl From<PayloadError> for ValidationError {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::MissingField(field) => ValidationError::Missing(field),
            PayloadError::InvalidValue(field, reason) => ValidationError::Malformed(field, reason),
        }
    }
}

/// Outbound calls against a sensor node
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("Device answered with status {0}")]
    Status(u16),
    #[error("Invalid payload: {0}")]
    Payload(#[from] PayloadError),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Did not find plant: {0}")]
    PlantNotFound(std::string::String),
    #[error("Did not find device: {0}")]
    DeviceNotFound(std::string::String),
    #[error("Unknown device: {0}")]
    UnknownDevice(std::string::String),
    #[error("Could not generate a unique plant id after {0} attempts")]
    IdExhausted(usize),
    #[error(transparent)]
    Internal(#[from] DBError),
}

impl RegistryError {
    pub fn is_user_error(&self) -> bool {
        !matches!(self, RegistryError::Internal(_) | RegistryError::IdExhausted(_))
    }
}

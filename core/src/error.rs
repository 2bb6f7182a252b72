use std::error;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadError {
    MissingField(&'static str),
    InvalidValue(&'static str, std::string::String),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PayloadError::MissingField(field) => write!(f, "missing field: {}", field),
            PayloadError::InvalidValue(field, msg) => {
                write!(f, "invalid value for {}: {}", field, msg)
            }
        }
    }
}

impl error::Error for PayloadError {}

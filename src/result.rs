use serde::{Deserialize, Serialize};

use crate::error::ErrorValue;

/// Outcome of one load: exactly one of a value or an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum ResultEnvelope<T> {
    Success(T),
    Failure(ErrorValue),
}

impl<T> ResultEnvelope<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn response(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorValue> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }

    pub fn into_result(self) -> Result<T, ErrorValue> {
        self.into()
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ResultEnvelope<U> {
        match self {
            Self::Success(value) => ResultEnvelope::Success(f(value)),
            Self::Failure(error) => ResultEnvelope::Failure(error),
        }
    }
}

impl<T> From<Result<T, ErrorValue>> for ResultEnvelope<T> {
    fn from(result: Result<T, ErrorValue>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Failure(error),
        }
    }
}

impl<T> From<ResultEnvelope<T>> for Result<T, ErrorValue> {
    fn from(envelope: ResultEnvelope<T>) -> Self {
        match envelope {
            ResultEnvelope::Success(value) => Ok(value),
            ResultEnvelope::Failure(error) => Err(error),
        }
    }
}

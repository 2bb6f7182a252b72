use crate::error::ValidationError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// Time window of a reading query, `until` defaults to now and
/// `from` to one day before `until`
#[derive(Debug, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateQuery {
    /// RFC 3339, inclusive
    from: Option<DateTime<Utc>>,
    /// RFC 3339, exclusive
    until: Option<DateTime<Utc>>,
}

impl DateQuery {
    pub fn until(&self) -> DateTime<Utc> {
        self.until.unwrap_or_else(Utc::now)
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from_before(self.until())
    }

    /// Resolves both bounds against a single `now`
    pub fn window(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), ValidationError> {
        let until = self.until();
        let from = self.from_before(until);
        if from < until {
            Ok((from, until))
        } else {
            Err(ValidationError::Malformed(
                "from",
                format!("{} is not before {}", from, until),
            ))
        }
    }

    fn from_before(&self, until: DateTime<Utc>) -> DateTime<Utc> {
        self.from.unwrap_or(until - Duration::days(1))
    }
}

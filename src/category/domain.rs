//! Category models.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::Error;

/// A spending or income category, identified by a short code such as "food".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub code: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A category with the number and total of its transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub code: String,
    pub name: String,
    pub transaction_count: i64,
    pub total_amount: i64,
}

/// The data needed to create a category.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCategory {
    pub code: String,
    pub name: String,
}

impl NewCategory {
    /// Trim both fields and check that neither is empty.
    pub fn validated(self) -> Result<Self, Error> {
        let code = self.code.trim().to_owned();
        let name = self.name.trim().to_owned();

        match (code.is_empty(), name.is_empty()) {
            (false, false) => Ok(Self { code, name }),
            (true, true) => Err(Error::MissingFields("code, name".to_owned())),
            (true, false) => Err(Error::MissingFields("code".to_owned())),
            (false, true) => Err(Error::MissingFields("name".to_owned())),
        }
    }
}

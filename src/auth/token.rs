//! The token stored (encrypted) in the auth cookie.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::UserID;

/// Identifies the logged in user and when their session ends.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Token {
    pub user_id: UserID,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Token {
    /// Whether the session has ended at `now`.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, macros::datetime};

    use crate::auth::{UserID, token::Token};

    #[test]
    fn round_trips_through_json_at_midnight() {
        let token = Token {
            user_id: UserID::new(1),
            expires_at: datetime!(2025-12-21 00:00:00 UTC),
        };

        let json = serde_json::to_string(&token).unwrap();
        let parsed: Token = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, token);
    }

    #[test]
    fn deserialises_rfc3339_expiry() {
        let token: Token =
            serde_json::from_str(r#"{"user_id":1,"expires_at":"2025-12-21T03:54:00Z"}"#)
                .unwrap();

        assert_eq!(token.user_id, UserID::new(1));
        assert_eq!(token.expires_at, datetime!(2025-12-21 03:54:00 UTC));
    }

    #[test]
    fn expiry_is_inclusive() {
        let expires_at = datetime!(2025-12-21 03:54:00 UTC);
        let token = Token {
            user_id: UserID::new(1),
            expires_at,
        };

        assert!(!token.is_expired(expires_at - Duration::SECOND));
        assert!(token.is_expired(expires_at));
    }
}

//! Handles log-out requests.

use axum::Json;
use axum_extra::extract::PrivateCookieJar;
use serde_json::{Value, json};

use crate::auth::invalidate_auth_cookie;

/// Invalidate the auth cookie. Always succeeds, even if the user was not logged in.
pub async fn post_log_out(jar: PrivateCookieJar) -> (PrivateCookieJar, Json<Value>) {
    (
        invalidate_auth_cookie(jar),
        Json(json!({ "message": "Logged out" })),
    )
}

#[cfg(test)]
mod log_out_tests {
    use axum::{Router, routing::post};
    use axum_extra::extract::cookie::Key;
    use axum_test::TestServer;
    use sha2::{Digest, Sha512};
    use time::Duration;

    use crate::auth::{cookie::COOKIE_TOKEN, log_out::post_log_out};

    #[tokio::test]
    async fn log_out_expires_cookie() {
        let app = Router::new()
            .route("/log_out", post(post_log_out))
            .with_state(Key::from(&Sha512::digest("foobar")));
        let server = TestServer::new(app);

        let response = server.post("/log_out").await;

        response.assert_status_ok();
        let cookie = response.cookie(COOKIE_TOKEN);
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }
}

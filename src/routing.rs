//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    AppState,
    analytics::{get_monthly_endpoint, get_overview_endpoint},
    auth::{auth_guard, get_me, post_change_password, post_log_in, post_log_out},
    budget::{
        create_budget_endpoint, delete_budget_endpoint, edit_budget_endpoint,
        get_budget_summary_endpoint, get_budgets_endpoint,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, edit_category_endpoint,
        get_categories_endpoint, get_categories_with_stats_endpoint,
    },
    csv_import::{
        MAX_UPLOAD_REQUEST_SIZE, commit_import_endpoint, get_import_history_endpoint,
        preview_import_endpoint,
    },
    endpoints,
    not_found::get_404_not_found,
    settings::{
        delete_setting_endpoint, get_setting_endpoint, get_settings_endpoint,
        put_setting_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, edit_transaction_endpoint,
        get_transaction_endpoint, get_transaction_stats_endpoint, get_transactions_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, post(post_log_out));

    let import_routes = Router::new()
        .route(endpoints::IMPORT_PREVIEW, post(preview_import_endpoint))
        .route(endpoints::IMPORT_COMMIT, post(commit_import_endpoint))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_REQUEST_SIZE));

    let protected_routes = Router::new()
        .route(endpoints::ME, get(get_me))
        .route(endpoints::CHANGE_PASSWORD, post(post_change_password))
        .route(
            endpoints::TRANSACTIONS,
            get(get_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION_STATS,
            get(get_transaction_stats_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(edit_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::CATEGORIES,
            get(get_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORIES_WITH_STATS,
            get(get_categories_with_stats_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            put(edit_category_endpoint).delete(delete_category_endpoint),
        )
        .route(
            endpoints::BUDGETS,
            get(get_budgets_endpoint).post(create_budget_endpoint),
        )
        .route(endpoints::BUDGETS_SUMMARY, get(get_budget_summary_endpoint))
        .route(
            endpoints::BUDGET,
            put(edit_budget_endpoint).delete(delete_budget_endpoint),
        )
        .route(endpoints::SETTINGS, get(get_settings_endpoint))
        .route(
            endpoints::SETTING,
            get(get_setting_endpoint)
                .put(put_setting_endpoint)
                .delete(delete_setting_endpoint),
        )
        .merge(import_routes)
        .route(
            endpoints::IMPORT_HISTORY,
            get(get_import_history_endpoint),
        )
        .route(endpoints::ANALYTICS_OVERVIEW, get(get_overview_endpoint))
        .route(endpoints::ANALYTICS_MONTHLY, get(get_monthly_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Liveness check for load balancers and uptime monitors.
async fn get_health() -> Json<Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    Json(json!({ "status": "ok", "timestamp": timestamp }))
}

#[cfg(test)]
mod routing_tests {
    use axum::http::StatusCode;
    use axum_extra::extract::cookie::Cookie;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{
        AppState, DecimalSeparator, PaginationConfig,
        auth::{COOKIE_TOKEN, PasswordHash, ValidatedPassword, create_user},
        build_router,
        csv_import::MAX_UPLOAD_SIZE,
        endpoints::{self, format_endpoint},
        test_utils::multipart_csv_form,
    };

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        let state = AppState::new(
            connection,
            "nafstenoas",
            "Asia/Jakarta",
            DecimalSeparator::Dot,
            PaginationConfig::default(),
        )
        .unwrap();
        {
            let connection = state.db_connection.lock().unwrap();
            let hash = PasswordHash::new(ValidatedPassword::new_unchecked("averysafepassword"), 4)
                .unwrap();
            create_user("admin", "admin@example.com", &hash, &connection).unwrap();
        }

        TestServer::new(build_router(state))
    }

    async fn log_in(server: &TestServer) -> Cookie<'static> {
        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "username": "admin", "password": "averysafepassword" }))
            .await;
        response.assert_status_ok();

        response.cookie(COOKIE_TOKEN)
    }

    #[tokio::test]
    async fn health_does_not_need_auth() {
        let server = get_test_server();

        let response = server.get(endpoints::HEALTH).await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "ok");
    }

    #[tokio::test]
    async fn protected_route_needs_auth() {
        let server = get_test_server();

        let response = server.get(endpoints::TRANSACTIONS).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        response.assert_json(&json!({ "error": "Not authenticated" }));
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let server = get_test_server();

        let response = server.get("/api/nope").await;

        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&json!({ "error": "Route not found" }));
    }

    #[tokio::test]
    async fn transaction_crud_round_trip() {
        let server = get_test_server();
        let cookie = log_in(&server).await;

        let response = server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(cookie.clone())
            .json(&json!({
                "kind": "debit",
                "channel": "gopay",
                "status": "completed",
                "occurred_at": "2025-03-01T10:00:00+07:00",
                "amount": 25000,
                "fee": 1000,
                "reference_id": "GP-1",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let id = response.json::<Value>()["id"].as_i64().unwrap();
        assert_eq!(response.json::<Value>()["total"], 26000);

        let response = server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(cookie.clone())
            .json(&json!({
                "kind": "debit",
                "channel": "gopay",
                "status": "completed",
                "occurred_at": "2025-03-02T10:00:00+07:00",
                "reference_id": "GP-1",
            }))
            .await;
        response.assert_status(StatusCode::CONFLICT);

        let response = server
            .get(&format_endpoint(endpoints::TRANSACTION, id))
            .add_cookie(cookie.clone())
            .await;
        response.assert_status_ok();

        let response = server
            .delete(&format_endpoint(endpoints::TRANSACTION, id))
            .add_cookie(cookie.clone())
            .await;
        response.assert_status_ok();

        let response = server
            .get(&format_endpoint(endpoints::TRANSACTION, id))
            .add_cookie(cookie)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn category_in_use_cannot_be_deleted() {
        let server = get_test_server();
        let cookie = log_in(&server).await;
        server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(cookie.clone())
            .json(&json!({
                "kind": "credit",
                "channel": "bca",
                "status": "completed",
                "occurred_at": "2025-03-01T10:00:00Z",
                "amount": 100,
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .delete(&format_endpoint(endpoints::CATEGORY, "other"))
            .add_cookie(cookie)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn import_preview_then_commit() {
        let server = get_test_server();
        let cookie = log_in(&server).await;
        let csv = "Tanggal,Nominal,Jenis,Keterangan,Ref\n\
                   01/03/2025,50000,masuk,Gaji,R1\n\
                   02/03/2025,12000,keluar,Parkir,R2\n";

        let response = server
            .post(endpoints::IMPORT_PREVIEW)
            .add_cookie(cookie.clone())
            .multipart(multipart_csv_form(csv))
            .await;
        response.assert_status_ok();
        let preview = response.json::<Value>();
        assert_eq!(preview["totalRows"], 2);
        assert_eq!(preview["preview"][0]["kind"], "credit");

        let response = server
            .post(endpoints::IMPORT_COMMIT)
            .add_cookie(cookie.clone())
            .multipart(multipart_csv_form(csv))
            .await;
        response.assert_status_ok();
        let result = response.json::<Value>();
        assert_eq!(result["success"], true);
        assert_eq!(result["inserted"], 2);

        let response = server
            .get(endpoints::IMPORT_HISTORY)
            .add_cookie(cookie.clone())
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()[0]["row_count"], 2);

        let response = server
            .get(endpoints::ANALYTICS_OVERVIEW)
            .add_cookie(cookie)
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["summary"]["totalIncome"], 50000);
    }

    /// A CSV file of exactly `size` bytes with one data row, padded with blank lines.
    fn padded_csv(size: usize) -> String {
        let mut csv = "date,amount\n2025-03-01,1\n".to_owned();
        csv.push_str(&"\n".repeat(size - csv.len()));
        csv
    }

    #[tokio::test]
    async fn upload_at_size_limit_is_accepted() {
        let server = get_test_server();
        let cookie = log_in(&server).await;

        let response = server
            .post(endpoints::IMPORT_PREVIEW)
            .add_cookie(cookie)
            .multipart(multipart_csv_form(&padded_csv(MAX_UPLOAD_SIZE)))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["totalRows"], 1);
    }

    #[tokio::test]
    async fn upload_over_size_limit_is_rejected() {
        let server = get_test_server();
        let cookie = log_in(&server).await;

        let response = server
            .post(endpoints::IMPORT_PREVIEW)
            .add_cookie(cookie)
            .multipart(multipart_csv_form(&padded_csv(MAX_UPLOAD_SIZE + 1)))
            .await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn date_past_last_utc_year_is_bad_request() {
        let server = get_test_server();
        let cookie = log_in(&server).await;

        let response = server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(cookie.clone())
            .json(&json!({
                "kind": "debit",
                "channel": "bca",
                "status": "completed",
                "occurred_at": "9999-12-31T23:00:00-05:00",
                "amount": 100,
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .get(endpoints::TRANSACTIONS)
            .add_cookie(cookie.clone())
            .add_query_param("end_date", "9999-12-31T23:00:00-05:00")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // The database is still usable after the rejected requests.
        server
            .get(endpoints::TRANSACTIONS)
            .add_cookie(cookie)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn import_with_date_past_last_utc_year_leaves_database_usable() {
        let server = get_test_server();
        let cookie = log_in(&server).await;

        let response = server
            .post(endpoints::IMPORT_COMMIT)
            .add_cookie(cookie.clone())
            .multipart(multipart_csv_form(
                "date,amount\n9999-12-31T23:00:00-05:00,100\n",
            ))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "No valid rows found in CSV" }));

        server
            .get(endpoints::ANALYTICS_OVERVIEW)
            .add_cookie(cookie)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn oversized_amount_is_bad_request() {
        let server = get_test_server();
        let cookie = log_in(&server).await;

        let response = server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(cookie.clone())
            .json(&json!({
                "kind": "debit",
                "channel": "bca",
                "status": "completed",
                "occurred_at": "2025-03-01T10:00:00Z",
                "amount": i64::MAX,
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .post(endpoints::IMPORT_COMMIT)
            .add_cookie(cookie.clone())
            .multipart(multipart_csv_form(
                "date,amount\n2025-03-01,99999999999999999999999\n2025-03-02,1\n",
            ))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["inserted"], 1);
        assert_eq!(response.json::<Value>()["errors"], 1);

        let response = server
            .get(endpoints::ANALYTICS_OVERVIEW)
            .add_cookie(cookie)
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["summary"]["totalExpense"], 1);
    }

    #[tokio::test]
    async fn setting_round_trip() {
        let server = get_test_server();
        let cookie = log_in(&server).await;

        server
            .put(&format_endpoint(endpoints::SETTING, "budget_cycle_start_day"))
            .add_cookie(cookie.clone())
            .json(&json!({ "value": { "day": 30 } }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .put(&format_endpoint(endpoints::SETTING, "budget_cycle_start_day"))
            .add_cookie(cookie.clone())
            .json(&json!({ "value": { "day": 1 } }))
            .await
            .assert_status_ok();

        let response = server
            .get(endpoints::BUDGETS)
            .add_cookie(cookie)
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["period"]["startDay"], 1);
    }
}

use std::{env, error::Error, fs::OpenOptions, net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    http::{HeaderValue, Method, header},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use ledger_rs::{
    AppState, DecimalSeparator, PaginationConfig, PasswordHash, ValidatedPassword, build_router,
    ensure_default_user, graceful_shutdown, logging_middleware,
};

/// The REST API server for the ledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DB_PATH", default_value = "ledger.db")]
    db_path: String,

    /// The address to listen on.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// The port to serve the API from.
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// The canonical name of the local timezone, used for budget periods and daily totals.
    #[arg(long, env = "TZ_NAME", default_value = "Asia/Jakarta")]
    timezone: String,

    /// The decimal separator used in imported CSV files, "dot" or "comma".
    #[arg(long, env = "DECIMAL_SEPARATOR", default_value = "dot")]
    decimal_separator: DecimalSeparator,

    /// The origin of the dashboard that may call the API with credentials.
    #[arg(long, env = "ALLOWED_ORIGIN", default_value = "http://localhost:5173")]
    allowed_origin: String,

    /// The username of the user created when the database has no users.
    #[arg(long, env = "DEFAULT_ADMIN_USERNAME", default_value = "admin")]
    admin_username: String,

    /// The email of the user created when the database has no users.
    #[arg(long, env = "DEFAULT_ADMIN_EMAIL", default_value = "admin@example.com")]
    admin_email: String,

    /// The password of the user created when the database has no users.
    #[arg(long, env = "DEFAULT_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    setup_logging()?;

    let args = Args::parse();

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    let secret = env::var("SECRET").map_err(|_| "The environment variable 'SECRET' must be set")?;

    let conn = Connection::open(&args.db_path)?;
    let state = AppState::new(
        conn,
        &secret,
        &args.timezone,
        args.decimal_separator,
        PaginationConfig::default(),
    )?;

    create_default_user(&state, &args)?;

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state).layer(middleware::from_fn(logging_middleware));
    let router = add_cors_layer(router, &args.allowed_origin)?;
    let router = add_tracing_layer(router);

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}

fn create_default_user(state: &AppState, args: &Args) -> Result<(), Box<dyn Error>> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| "Could not acquire the database lock")?;

    let Some(password) = args.admin_password.as_deref() else {
        tracing::warn!("DEFAULT_ADMIN_PASSWORD is not set, skipping default user creation.");
        return Ok(());
    };

    let password_hash =
        PasswordHash::new(ValidatedPassword::new_unchecked(password), PasswordHash::DEFAULT_COST)?;
    ensure_default_user(
        &args.admin_username,
        &args.admin_email,
        &password_hash,
        &connection,
    )?;

    Ok(())
}

fn setup_logging() -> Result<(), Box<dyn Error>> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")?;

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();

    Ok(())
}

fn add_cors_layer(router: Router, allowed_origin: &str) -> Result<Router, Box<dyn Error>> {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Ok(router.layer(cors))
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged by the error responses themselves.
        .on_failure(());

    router.layer(tracing_layer)
}

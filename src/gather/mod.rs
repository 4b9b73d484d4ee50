//! HTTP service wiring: application state, middleware stack, router, and the
//! listeners.
//!
//! Layer order, outermost first: panic recovery, request id, request tracing,
//! security headers. Dynamic routes additionally get session activation, the
//! CSRF guard, and authentication resolution; routes that require a login sit
//! behind the authorization gate.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Extension, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::PropagateRequestIdLayer,
    services::ServeDir,
    set_header::{SetRequestHeaderLayer, SetResponseHeaderLayer},
    trace::TraceLayer,
};
use tower_sessions::{
    cookie::{time::Duration as CookieDuration, Key},
    Expiry, MemoryStore, SessionManagerLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod csrf;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod pages;

use crate::store::{EventStore, PgStore, UserStore};

pub const SESSION_COOKIE_NAME: &str = "session";

/// Runtime configuration resolved from the CLI.
#[derive(Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub dsn: String,
    pub secret: SecretString,
    pub https: bool,
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Dependencies shared by every request handler, constructed once at startup.
pub struct AppState {
    pub events: Arc<dyn EventStore>,
    pub users: Arc<dyn UserStore>,
    pub https: bool,
}

/// Build the application router around the given state.
///
/// Kept separate from the listener so tests can drive the full middleware
/// stack with in-memory stores.
pub fn router(state: Arc<AppState>, secret: &SecretString) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_secure(state.https)
        .with_expiry(Expiry::OnInactivity(CookieDuration::hours(12)))
        .with_private(Key::derive_from(secret.expose_secret().as_bytes()));

    // Routes behind the authorization gate.
    let gated = Router::new()
        .route(
            "/event/create",
            get(handlers::create_event_form).post(handlers::create_event),
        )
        .route("/user/logout", post(handlers::logout))
        .route_layer(axum::middleware::from_fn(
            middleware::require_authentication,
        ));

    // Everything that reads or writes the session.
    let dynamic = Router::new()
        .route("/", get(handlers::home))
        .route("/event/:id", get(handlers::show_event))
        .route(
            "/user/signup",
            get(handlers::signup_form).post(handlers::signup),
        )
        .route(
            "/user/login",
            get(handlers::login_form).post(handlers::login),
        )
        .merge(gated)
        .layer(
            ServiceBuilder::new()
                .layer(session_layer)
                .layer(axum::middleware::from_fn(csrf::guard))
                .layer(axum::middleware::from_fn(middleware::authenticate)),
        );

    Router::new()
        .route("/ping", get(handlers::ping))
        .nest_service("/static", ServeDir::new("static"))
        .merge(dynamic)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(middleware::handle_panic))
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("x-xss-protection"),
                    HeaderValue::from_static("1; mode=block"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("x-frame-options"),
                    HeaderValue::from_static("deny"),
                ))
                .layer(Extension(state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(config: ServerConfig) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&config.dsn)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let store = Arc::new(PgStore::new(pool));
    let state = Arc::new(AppState {
        events: store.clone(),
        users: store,
        https: config.https,
    });

    let app = router(state, &config.secret);

    if config.https {
        let tls = RustlsConfig::from_pem_file(&config.cert, &config.key)
            .await
            .context("Failed to load TLS certificate or key")?;

        let addr = SocketAddr::from((std::net::Ipv6Addr::UNSPECIFIED, config.port));

        info!("Starting TLS server on [::]:{}", config.port);

        axum_server::bind_rustls(addr, tls)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await?;
    } else {
        let listener = TcpListener::bind(format!("::0:{}", config.port)).await?;

        info!("Listening on [::]:{}", config.port);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;
    }

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |ConnectInfo(addr)| addr.to_string());

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        http.version = ?request.version(),
        remote_addr = %remote_addr,
        request_id
    )
}

use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use engage_service::{config, routes};
use tokio::signal;
use tower_http::{
    LatencyUnit,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        // Log to stdout
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();

    info!("Starting server...");

    let env_vars = config::EnvVars::new();
    let port = env_vars.port;
    let request_timeout_in_ms = env_vars.request_timeout_in_ms;
    let request_body_size_limit = env_vars.request_body_size_limit;

    let pool = models::db::connect(&env_vars.database_url)
        .await
        .expect("unable to open database");
    models::db::init_schema(&pool)
        .await
        .expect("unable to initialize schema");

    let app_state = config::AppState { pool, env_vars };

    let app = Router::new()
        .route("/status/ping", get(routes::get_status_ping))
        .route("/events", get(routes::get_events))
        .route("/events/{id}", get(routes::get_event))
        .route("/events/{id}/start", post(routes::post_start_event))
        .route("/events/{id}/submit-quiz", post(routes::post_submit_quiz))
        .route("/events/{id}/feedback", post(routes::post_feedback))
        .route("/completed-events", get(routes::get_completed_events))
        .route("/my-feedbacks", get(routes::get_my_feedbacks))
        .route("/merchandise", get(routes::get_merchandise_list))
        .route("/merchandise/{id}", get(routes::get_merchandise_item))
        .route("/merchandise/{id}/purchase", post(routes::post_purchase))
        .route("/orders", get(routes::get_orders))
        .route("/orders/{id}", get(routes::get_order))
        .route("/points", get(routes::get_points))
        .layer(TimeoutLayer::new(Duration::from_millis(
            request_timeout_in_ms,
        )))
        .layer(RequestBodyLimitLayer::new(request_body_size_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Micros),
                ),
        )
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .unwrap();
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    if let Err(err) = server.await {
        error!("Server error: {}", err);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

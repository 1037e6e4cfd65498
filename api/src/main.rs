use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod ai;
mod config;
mod error;
mod extract;
mod llm;
mod middleware;
mod routes;
mod state;
mod store;

use crate::store::DocumentStore;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PulseFit API",
        version = "0.1.0",
        description = "Workout plans, completion tracking and model-backed coaching."
    ),
    paths(
        routes::health::health_check,
        routes::status::root,
        routes::status::create_status_check,
        routes::status::list_status_checks,
        routes::users::create_user,
        routes::users::get_user,
        routes::users::update_user,
        routes::users::reset_progress,
        routes::workouts::create_workout,
        routes::workouts::list_workouts,
        routes::workouts::complete_workout,
        routes::workouts::delete_workout,
        routes::workouts::list_workout_logs,
        routes::ai::workout_recommendations,
        routes::ai::form_check,
        routes::ai::rest_day_suggestion,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::status::RootResponse,
        routes::users::ResetProgressResponse,
        routes::workouts::CompleteWorkoutResponse,
        routes::workouts::MessageResponse,
        pulsefit_core::error::ApiError,
        pulsefit_core::status::StatusCheck,
        pulsefit_core::status::StatusCheckCreate,
        pulsefit_core::users::UserProfile,
        pulsefit_core::users::UserProfileUpdate,
        pulsefit_core::workouts::Exercise,
        pulsefit_core::workouts::WorkoutPlan,
        pulsefit_core::workouts::CreateWorkoutPlan,
        pulsefit_core::workouts::WorkoutLog,
        pulsefit_core::ai::WorkoutRecommendationRequest,
        pulsefit_core::ai::FormCheckRequest,
        pulsefit_core::ai::RestDayRequest,
    ))
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulsefit_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = config::AppConfig::from_env()?;

    let store = Arc::new(store::postgres::PgDocumentStore::connect(&config.database).await?);
    let model = Arc::new(llm::OpenAiClient::new(config.llm.clone()));
    let app_state = state::AppState {
        store: store.clone(),
        model,
    };

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::cors::build_cors_layer(&config.cors_origins)),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("PulseFit API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    tracing::info!("Document store closed, shutting down");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

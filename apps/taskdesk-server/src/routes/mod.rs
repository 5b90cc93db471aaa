//! HTTP routes

pub mod accounts;
pub mod health;
pub mod tasks;

use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// The complete application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
        .route("/logout", post(accounts::logout))
        .route(
            "/profile",
            get(accounts::get_profile)
                .put(accounts::update_profile)
                .delete(accounts::delete_profile),
        )
        .route("/change-password", post(accounts::change_password))
        .route("/password-reset", post(accounts::request_password_reset))
        .route(
            "/password-reset/confirm",
            post(accounts::confirm_password_reset),
        )
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route(
            "/tasks/:id/file",
            get(tasks::download_file)
                .post(tasks::upload_file)
                .layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware as mw, Router};

use crate::server::endpoints::{classes, grades, schedule, status};
use crate::server::middleware::*;
use crate::types::AppState;

pub mod endpoints;
mod middleware;
pub mod types;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let schedule_router = Router::new()
        .route(
            "/teaching-schedules/import-excel",
            post(schedule::post_import_excel)
                .layer(DefaultBodyLimit::max(app_state.config.max_upload_bytes)),
        )
        .route("/teaching-schedules", get(schedule::get_schedules))
        .route("/time-slots", get(schedule::get_time_slots));

    let api_router = Router::new()
        .merge(schedule_router)
        .route(
            "/classes/create-combined",
            get(classes::get_create_combined).post(classes::post_create_combined),
        )
        .route(
            "/students/:student_id/grade-summary",
            get(grades::get_grade_summary),
        )
        .layer(mw::from_fn_with_state(
            app_state.clone(),
            auth_validator::auth,
        ));

    Router::new()
        .route("/health", get(status::get_health))
        .nest("/api", api_router)
        .with_state(app_state)
}

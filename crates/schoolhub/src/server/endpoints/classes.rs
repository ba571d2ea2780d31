use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::classes::{ClassError, CombinedClassPlanner, CombinedClassRequest};
use crate::server::types::ApiErrorType;
use crate::types::AppState;

/// GET /api/classes/create-combined
/// Previews the combined classes a creation would produce
pub async fn get_create_combined(
    Query(req): Query<CombinedClassRequest>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!(
        "GET /api/classes/create-combined year={} grade={:?} group={}",
        req.academic_year_id, req.grade_level, req.subject_group_code
    );

    match CombinedClassPlanner::new(&s.db, s.config.max_class_size).preview(&req) {
        Ok(preview) => (StatusCode::OK, Json(preview)).into_response(),
        Err(e) => class_error_to_response(e),
    }
}

/// POST /api/classes/create-combined
pub async fn post_create_combined(
    State(s): State<Arc<AppState>>,
    Json(req): Json<CombinedClassRequest>,
) -> Response {
    info!(
        "POST /api/classes/create-combined year={} grade={:?} group={}",
        req.academic_year_id, req.grade_level, req.subject_group_code
    );

    let planner = CombinedClassPlanner::new(&s.db, s.config.max_class_size);
    match planner.create(&req, &mut rand::thread_rng()) {
        Ok(result) => (StatusCode::CREATED, Json(result)).into_response(),
        Err(e) => class_error_to_response(e),
    }
}

fn class_error_to_response(error: ClassError) -> Response {
    let (status, message) = match &error {
        ClassError::MissingField(_) | ClassError::InvalidGradeLevel(_) => {
            (StatusCode::BAD_REQUEST, "Invalid combined class request")
        }
        ClassError::NoEligibleStudents { .. } => {
            (StatusCode::NOT_FOUND, "No eligible students found")
        }
        ClassError::Database(_) => {
            error!(error = %error, "Combined class creation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create combined classes",
            )
        }
    };

    ApiErrorType::from((status, message, Some(error.to_string()))).into_response()
}

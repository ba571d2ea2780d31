use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::grades;
use crate::server::types::ApiErrorType;
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct TermQuery {
    pub academic_term_id: Option<String>,
}

/// GET /api/students/:student_id/grade-summary
pub async fn get_grade_summary(
    Path(student_id): Path<String>,
    Query(q): Query<TermQuery>,
    State(s): State<Arc<AppState>>,
) -> Response {
    let Some(term) = q.academic_term_id.filter(|t| !t.is_empty()) else {
        return ApiErrorType::from((
            StatusCode::BAD_REQUEST,
            "Missing required parameter: academic_term_id",
            None,
        ))
        .into_response();
    };

    info!("GET /api/students/{}/grade-summary term={}", student_id, term);

    let grades = match s.db.student_exists(&student_id) {
        Ok(true) => s.db.get_student_grades(&student_id, &term),
        Ok(false) => {
            return ApiErrorType::from((
                StatusCode::NOT_FOUND,
                "Student not found",
                Some(student_id),
            ))
            .into_response()
        }
        Err(e) => Err(e),
    };

    match grades {
        Ok(grades) => (
            StatusCode::OK,
            Json(grades::summarize(&student_id, &term, &grades)),
        )
            .into_response(),
        Err(e) => ApiErrorType::from((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to fetch grades",
            Some(e.to_string()),
        ))
        .into_response(),
    }
}

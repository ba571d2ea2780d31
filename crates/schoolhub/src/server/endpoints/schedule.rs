use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::server::types::ApiErrorType;
use crate::timetable::{
    file_digest, read_workbook, ImportError, ImportOptions, SheetGrid, TimetableImporter,
};
use crate::types::AppState;

/// Fields of the import form once read from the multipart body.
#[derive(Debug)]
pub struct ImportForm {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
    pub options: ImportOptions,
}

/// POST /api/teaching-schedules/import-excel
pub async fn post_import_excel(State(s): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let form = match read_import_form(multipart).await {
        Ok(form) => form,
        Err(e) => return import_error_to_response(e),
    };

    info!(
        file = form.file_name.as_deref().unwrap_or("<unnamed>"),
        size = form.bytes.len(),
        term = %form.options.academic_term_id,
        week = form.options.week_number,
        "POST /api/teaching-schedules/import-excel"
    );

    let digest = file_digest(&form.bytes);
    let bytes = form.bytes;
    let sheets = match tokio::task::spawn_blocking(move || read_workbook(bytes)).await {
        Ok(Ok(sheets)) => sheets,
        Ok(Err(e)) => return import_error_to_response(e),
        Err(e) => return join_error_to_response(e),
    };

    import_sheets(s, form.options, sheets, digest).await
}

/// Runs a decoded import while holding the (term, week) lock.
///
/// 200 with the outcome when rows were written, 400 with the per-sheet
/// diagnostics when any sheet reported an error.
pub async fn import_sheets(
    state: Arc<AppState>,
    options: ImportOptions,
    sheets: Vec<SheetGrid>,
    file_sha256: String,
) -> Response {
    let term = options.academic_term_id.clone();
    let week = options.week_number;
    let lock = state.get_import_lock(&term, week);

    let result = {
        let _guard = lock.lock().await;
        let db_state = state.clone();
        tokio::task::spawn_blocking(move || {
            TimetableImporter::new(&db_state.db).import(&sheets, &options, &file_sha256)
        })
        .await
    };
    drop(lock);
    state.release_import_lock(&term, week);

    match result {
        Ok(Ok(outcome)) if outcome.success => (StatusCode::OK, Json(outcome)).into_response(),
        Ok(Ok(outcome)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "Import aborted: fix the reported errors and upload again",
                "import_id": outcome.import_id,
                "results": outcome.results,
                "summary": outcome.summary,
            })),
        )
            .into_response(),
        Ok(Err(e)) => import_error_to_response(e),
        Err(e) => join_error_to_response(e),
    }
}

/// Reads `file`, `academic_term_id`, `week_number` and `replace_existing`.
pub async fn read_import_form(mut multipart: Multipart) -> Result<ImportForm, ImportError> {
    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    let mut term: Option<String> = None;
    let mut week: Option<String> = None;
    let mut replace: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(malformed)?;
                file = Some((file_name, bytes.to_vec()));
            }
            "academic_term_id" => term = Some(field.text().await.map_err(malformed)?),
            "week_number" => week = Some(field.text().await.map_err(malformed)?),
            "replace_existing" => replace = Some(field.text().await.map_err(malformed)?),
            _ => {}
        }
    }

    let (file_name, bytes) = file
        .filter(|(_, bytes)| !bytes.is_empty())
        .ok_or(ImportError::MissingField("file"))?;
    let academic_term_id = term
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ImportError::MissingField("academic_term_id"))?;
    let week_number = parse_week_number(
        week.as_deref()
            .ok_or(ImportError::MissingField("week_number"))?,
    )?;
    let replace_existing = replace.as_deref().map(parse_flag).transpose()?.unwrap_or(false);

    Ok(ImportForm {
        file_name: file_name.clone(),
        bytes,
        options: ImportOptions {
            academic_term_id,
            week_number,
            replace_existing,
            file_name,
        },
    })
}

fn malformed(e: axum::extract::multipart::MultipartError) -> ImportError {
    ImportError::InvalidField {
        field: "file",
        message: e.to_string(),
    }
}

fn parse_week_number(text: &str) -> Result<i64, ImportError> {
    match text.trim().parse::<i64>() {
        Ok(week) if week >= 1 => Ok(week),
        _ => Err(ImportError::InvalidField {
            field: "week_number",
            message: format!("expected a positive integer, got '{}'", text.trim()),
        }),
    }
}

fn parse_flag(text: &str) -> Result<bool, ImportError> {
    match text.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(ImportError::InvalidField {
            field: "replace_existing",
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

/// Converts ImportError to API response.
fn import_error_to_response(error: ImportError) -> Response {
    let (status, message) = match &error {
        ImportError::TermNotFound(_) => (StatusCode::NOT_FOUND, "Academic term not found"),
        e if e.is_client_error() => (StatusCode::BAD_REQUEST, "Invalid import request"),
        ImportError::NoTimeSlots => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "No teaching time slots are configured",
        ),
        _ => {
            error!(error = %error, "Timetable import failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to import timetable")
        }
    };

    ApiErrorType::from((status, message, Some(error.to_string()))).into_response()
}

fn join_error_to_response(e: tokio::task::JoinError) -> Response {
    error!(error = %e, "Import task panicked");
    ApiErrorType::from((
        StatusCode::INTERNAL_SERVER_ERROR,
        "Import task failed",
        Some(e.to_string()),
    ))
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub academic_term_id: Option<String>,
    pub week_number: Option<i64>,
    pub class_id: Option<String>,
}

/// GET /api/teaching-schedules
/// Lists the active schedule rows of a term
pub async fn get_schedules(
    Query(q): Query<ScheduleQuery>,
    State(s): State<Arc<AppState>>,
) -> Response {
    let Some(term) = q.academic_term_id.as_deref().filter(|t| !t.is_empty()) else {
        return ApiErrorType::from((
            StatusCode::BAD_REQUEST,
            "Missing required parameter: academic_term_id",
            None,
        ))
        .into_response();
    };

    info!("GET /api/teaching-schedules term={} week={:?}", term, q.week_number);

    match s
        .db
        .get_schedule_entries(term, q.week_number, q.class_id.as_deref())
    {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => ApiErrorType::from((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to fetch teaching schedules",
            Some(e.to_string()),
        ))
        .into_response(),
    }
}

/// GET /api/time-slots
pub async fn get_time_slots(State(s): State<Arc<AppState>>) -> Response {
    match s.db.get_time_slots() {
        Ok(slots) => (StatusCode::OK, Json(slots)).into_response(),
        Err(e) => ApiErrorType::from((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to fetch time slots",
            Some(e.to_string()),
        ))
        .into_response(),
    }
}

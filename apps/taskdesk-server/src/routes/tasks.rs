//! Task list, export, CRUD and attachment handlers

use crate::error::{ApiError, ApiResult};
use crate::extract::AuthenticatedUser;
use crate::state::AppState;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::collections::HashMap;
use taskdesk_core::{
    download_name, run_task_listing, CreateTaskRequest, ExportFormat, Report, Task, TaskListing,
    TaskStore, TaskdeskError, UpdateTaskRequest,
};
use tracing::{error, info};
use uuid::Uuid;

/// Malformed ids are reported like any other unknown task
fn parse_task_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| TaskdeskError::task_not_found(raw).into())
}

fn report_response(report: Report) -> Response {
    (
        [
            (header::CONTENT_TYPE, report.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", report.filename),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        report.bytes,
    )
        .into_response()
}

/// Filtered listing, or a report download when `export` asks for one
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let format = ExportFormat::from_params(&params);
    match run_task_listing(&state.db, &state.renderers, user.id, &params).await {
        Ok(TaskListing::Page(tasks)) => Ok(Json(tasks).into_response()),
        Ok(TaskListing::Report(report)) => Ok(report_response(report)),
        Err(TaskdeskError::Render(e)) => {
            error!("{} report for user {} failed: {}", format.label(), user.id, e);
            Err(ApiError::Report(format.label()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn create_task(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(mut request): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    // Files are attached through the upload endpoint only
    request.file = None;
    let id = state.db.insert(user.id, request).await?;
    let task = state.db.get(id, user.id).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = parse_task_id(&id)?;
    Ok(Json(state.db.get(id, user.id).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
    Json(mut request): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let id = parse_task_id(&id)?;
    request.file = None;
    let previous = if request.clear_file {
        state.db.get(id, user.id).await?.file
    } else {
        None
    };

    let task = state.db.update(id, user.id, request).await?;
    if let Some(reference) = previous {
        state.attachments.remove(&reference).await;
    }
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_task_id(&id)?;
    let task = state.db.get(id, user.id).await?;
    state.db.delete(id, user.id).await?;
    if let Some(reference) = task.file {
        state.attachments.remove(&reference).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// First `file` part of a multipart body, as (client filename, bytes)
async fn read_file_part(multipart: &mut Multipart) -> ApiResult<(String, Vec<u8>)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest(
                "The submitted file is empty.".to_string(),
            ));
        }
        return Ok((name, bytes.to_vec()));
    }
    Err(ApiError::BadRequest("No file was submitted.".to_string()))
}

/// Store an uploaded file and attach it to the task, replacing any previous one
pub async fn upload_file(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<Task>> {
    let id = parse_task_id(&id)?;
    let previous = state.db.get(id, user.id).await?.file;
    let (name, bytes) = read_file_part(&mut multipart).await?;

    let reference = state.attachments.save(user.id, &name, &bytes).await?;
    let request = UpdateTaskRequest {
        file: Some(reference.clone()),
        ..UpdateTaskRequest::default()
    };
    let task = match state.db.update(id, user.id, request).await {
        Ok(task) => task,
        Err(e) => {
            state.attachments.remove(&reference).await;
            return Err(e.into());
        }
    };

    if let Some(old) = previous {
        state.attachments.remove(&old).await;
    }
    info!("Attached {} to task {}", reference, id);
    Ok(Json(task))
}

/// The task's attached file as a download
pub async fn download_file(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_task_id(&id)?;
    let reference = state
        .db
        .get(id, user.id)
        .await?
        .file
        .ok_or(ApiError::NotFound("No file attached"))?;
    let bytes = state.attachments.read(user.id, &reference).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download_name(&reference)),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Task endpoints (tenant-scoped)
///
/// # Endpoints
///
/// - `GET    /v1/tasks` - List tasks
/// - `POST   /v1/tasks` - Create
/// - `GET    /v1/tasks/:id` - Fetch one
/// - `PUT    /v1/tasks/:id` - Update
/// - `DELETE /v1/tasks/:id` - Delete

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use atrio_shared::auth::middleware::OrgContext;
use atrio_shared::models::task::{CreateTask, Task, TaskPriority, UpdateTask};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

/// Create-task request body
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub client_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
}

/// Lists all tasks of the organization
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = Task::list_by_organization(&state.db, organization_id).await?;
    Ok(Json(tasks))
}

/// Creates a task
pub async fn create_task(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Task title is required".to_string()));
    }

    let task = Task::create(
        &state.db,
        CreateTask {
            organization_id,
            client_id: req.client_id,
            title: req.title,
            description: req.description,
            assigned_to: req.assigned_to,
            priority: req.priority.unwrap_or(TaskPriority::Medium),
            due_date: req.due_date,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// Fetches a single task
pub async fn get_task(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = Task::find_by_id_and_organization(&state.db, id, organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task))
}

/// Updates a task
pub async fn update_task(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateTask>,
) -> ApiResult<Json<Task>> {
    let task = Task::update(&state.db, id, organization_id, data)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task))
}

/// Deletes a task
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let deleted = Task::delete(&state.db, id, organization_id).await?;

    if !deleted {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

//! Handover note endpoints
//!
//! # Endpoints
//!
//! - `POST /v1/handovers` - Create a note
//! - `GET /v1/handovers/:id` - Note detail
//! - `PUT /v1/handovers/:id` - Replace text and recipients
//! - `DELETE /v1/handovers/:id` - Delete a note (idempotent)
//! - `GET /v1/users/:user_id/handovers/sent` - Notes written by a user
//! - `GET /v1/users/:user_id/handovers/received` - Notes addressed to a user
//!
//! Identity is taken from the payload or path as given; authentication is
//! handled in front of this service.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use handover_shared::{
    pagination::PageRequest,
    service::{
        AuthorHandoverList, CreateHandover, HandoverDetail, RecipientHandoverList, UpdateHandover,
    },
    store::HandoverDatabase,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create handover request
///
/// ```json
/// {
///   "author_id": "uuid",
///   "recipient_ids": ["uuid", "uuid"],
///   "title": "Vacation handover",
///   "content": "Open tickets and who to ask."
/// }
/// ```
#[derive(Debug, Deserialize, Validate)]
pub struct CreateHandoverRequest {
    pub author_id: Uuid,

    #[validate(length(min = 1, message = "At least one recipient is required"))]
    pub recipient_ids: Vec<Uuid>,

    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 10000, message = "Content must be at most 10000 characters"))]
    pub content: Option<String>,
}

/// Update handover request
///
/// `recipient_ids` is the complete new recipient list.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateHandoverRequest {
    pub author_id: Uuid,

    #[validate(length(min = 1, message = "At least one recipient is required"))]
    pub recipient_ids: Vec<Uuid>,

    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 10000, message = "Content must be at most 10000 characters"))]
    pub content: Option<String>,
}

/// Page query parameters; pages are zero-based
#[derive(Debug, Deserialize, Validate)]
pub struct PageParams {
    #[serde(default)]
    pub page: u32,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100, message = "Size must be between 1 and 100"))]
    pub size: u32,
}

fn default_page_size() -> u32 {
    10
}

impl From<&PageParams> for PageRequest {
    fn from(params: &PageParams) -> Self {
        PageRequest::new(params.page, params.size)
    }
}

/// Create handover response
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateHandoverResponse {
    pub message: String,
    pub handover_id: i64,
}

/// Update and delete response
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Create a handover note
///
/// # Errors
///
/// - `404 Not Found`: Author or a recipient does not exist
/// - `422 Unprocessable Entity`: Validation failed
/// - `500 Internal Server Error`: The write was rolled back
pub async fn create_handover<D: HandoverDatabase>(
    State(state): State<AppState<D>>,
    Json(req): Json<CreateHandoverRequest>,
) -> ApiResult<(StatusCode, Json<CreateHandoverResponse>)> {
    req.validate()?;

    let note = state
        .handovers
        .create(CreateHandover {
            author_id: req.author_id,
            recipient_ids: req.recipient_ids,
            title: req.title,
            content: req.content,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateHandoverResponse {
            message: "Handover note created".to_string(),
            handover_id: note.id,
        }),
    ))
}

/// Handover note detail
pub async fn get_handover<D: HandoverDatabase>(
    State(state): State<AppState<D>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<HandoverDetail>> {
    Ok(Json(state.queries.detail(id).await?))
}

/// Replace title, content and recipients of a handover note
///
/// Recipients that stay on the note keep their original received time.
pub async fn update_handover<D: HandoverDatabase>(
    State(state): State<AppState<D>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateHandoverRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    state
        .handovers
        .update(
            id,
            UpdateHandover {
                author_id: req.author_id,
                recipient_ids: req.recipient_ids,
                title: req.title,
                content: req.content,
            },
        )
        .await?;

    Ok(Json(MessageResponse::new("Handover note updated")))
}

/// Delete a handover note; unknown ids succeed
pub async fn delete_handover<D: HandoverDatabase>(
    State(state): State<AppState<D>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.handovers.delete(id).await?;
    Ok(Json(MessageResponse::new("Handover note deleted")))
}

/// Notes written by `user_id`, newest first
pub async fn list_sent<D: HandoverDatabase>(
    State(state): State<AppState<D>>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<AuthorHandoverList>> {
    params.validate()?;
    let list = state
        .queries
        .author_list(user_id, PageRequest::from(&params))
        .await?;
    Ok(Json(list))
}

/// Notes addressed to `user_id`, most recently received first
pub async fn list_received<D: HandoverDatabase>(
    State(state): State<AppState<D>>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<RecipientHandoverList>> {
    params.validate()?;
    let list = state
        .queries
        .recipient_list(user_id, PageRequest::from(&params))
        .await?;
    Ok(Json(list))
}

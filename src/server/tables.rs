//! REST handlers, one per table operation.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::str::FromStr;
use uuid::Uuid;

use super::{error_response, AppState, AuthClient};
use crate::models::Bucket;
use crate::remote::wire::{CountResponse, CreateBody, PatchBody};
use crate::remote::{ChangeEvent, ChangeKind};
use crate::store::{RecordStore, StoreError, StoredRecord};

/// Failure of a table request, rendered as a JSON error body.
pub(super) enum ApiError {
    UnknownTable(String),
    BadId(String),
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::UnknownTable(table) => error_response(
                StatusCode::NOT_FOUND,
                "unknown_table",
                format!("Unknown table '{}'", table),
            ),
            ApiError::BadId(id) => error_response(
                StatusCode::BAD_REQUEST,
                "invalid_id",
                format!("Invalid record id '{}'", id),
            ),
            ApiError::Store(e @ StoreError::NotFound { .. }) => {
                error_response(StatusCode::NOT_FOUND, "not_found", e.to_string())
            }
            ApiError::Store(e @ StoreError::Validation(_)) => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, "invalid_record", e.to_string())
            }
            ApiError::Store(e) => {
                tracing::error!("Table request failed: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string())
            }
        }
    }
}

pub(super) fn parse_table(table: &str) -> Result<Bucket, ApiError> {
    Bucket::from_str(table).map_err(|_| ApiError::UnknownTable(table.to_string()))
}

fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::BadId(id.to_string()))
}

pub(super) async fn select(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Json<Vec<StoredRecord>>, ApiError> {
    let bucket = parse_table(&table)?;
    Ok(Json(state.store.list(bucket).await?))
}

pub(super) async fn count(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Json<CountResponse>, ApiError> {
    let bucket = parse_table(&table)?;
    let count = state.store.count(bucket).await?;
    Ok(Json(CountResponse { count }))
}

pub(super) async fn fetch(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> Result<Json<StoredRecord>, ApiError> {
    let bucket = parse_table(&table)?;
    let id = parse_id(&id)?;
    state
        .store
        .get(bucket, id)
        .await?
        .map(Json)
        .ok_or(ApiError::Store(StoreError::NotFound { bucket, id }))
}

pub(super) async fn insert(
    State(state): State<AppState>,
    Extension(client): Extension<AuthClient>,
    Path(table): Path<String>,
    Json(body): Json<CreateBody>,
) -> Result<(StatusCode, Json<StoredRecord>), ApiError> {
    let bucket = parse_table(&table)?;
    let record = state.store.create(bucket, body.data).await?;
    state.store.mark_clean(bucket, record.id).await?;
    tracing::info!(client = %client.name, "Inserted {} into {}", record.id, bucket);
    state
        .hub
        .broadcast(ChangeEvent::new(bucket, ChangeKind::Insert, record.id))
        .await;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Writes a record as sent, keeping the client's id and timestamps.
pub(super) async fn upsert(
    State(state): State<AppState>,
    Extension(client): Extension<AuthClient>,
    Path((table, id)): Path<(String, String)>,
    Json(mut record): Json<StoredRecord>,
) -> Result<Json<StoredRecord>, ApiError> {
    let bucket = parse_table(&table)?;
    let id = parse_id(&id)?;
    record.bucket = bucket;
    record.id = id;

    let existed = state.store.get(bucket, id).await?.is_some();
    state.store.upsert(&record, false).await?;

    let kind = if existed {
        ChangeKind::Update
    } else {
        ChangeKind::Insert
    };
    tracing::info!(client = %client.name, "Upserted {} in {} ({})", id, bucket, kind);
    state.hub.broadcast(ChangeEvent::new(bucket, kind, id)).await;
    Ok(Json(record))
}

pub(super) async fn update(
    State(state): State<AppState>,
    Extension(client): Extension<AuthClient>,
    Path((table, id)): Path<(String, String)>,
    Json(body): Json<PatchBody>,
) -> Result<Json<StoredRecord>, ApiError> {
    let bucket = parse_table(&table)?;
    let id = parse_id(&id)?;
    let record = state.store.update(bucket, id, body.patch).await?;
    state.store.mark_clean(bucket, id).await?;
    tracing::info!(client = %client.name, "Updated {} in {}", id, bucket);
    state
        .hub
        .broadcast(ChangeEvent::new(bucket, ChangeKind::Update, id))
        .await;
    Ok(Json(record))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Extension(client): Extension<AuthClient>,
    Path((table, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let bucket = parse_table(&table)?;
    let id = parse_id(&id)?;
    state.store.delete(bucket, id).await?;
    tracing::info!(client = %client.name, "Deleted {} from {}", id, bucket);
    state
        .hub
        .broadcast(ChangeEvent::new(bucket, ChangeKind::Delete, id))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{
    ApiError, ApiResponse, AppState, CardDto, VerifiedCardDto, VerifyCardResponse, auth::AuthUser,
};
use crate::db::InsertCardError;

#[derive(Deserialize)]
pub struct CardsQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCardRequest {
    pub uid: Option<String>,
    pub owner_name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardRequest {
    pub owner_name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyCardRequest {
    pub uid: Option<String>,
}

/// GET /rfid/cards
pub async fn list_cards(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CardsQuery>,
) -> Result<Json<ApiResponse<Vec<CardDto>>>, ApiError> {
    let cards = state
        .store()
        .list_cards(query.status.as_deref())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list cards: {e}")))?;

    let cards = cards.into_iter().map(CardDto::from).collect();

    Ok(Json(ApiResponse::success(cards)))
}

/// POST /rfid/cards
pub async fn add_card(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<AddCardRequest>,
) -> Result<Json<ApiResponse<CardDto>>, ApiError> {
    let uid = payload
        .uid
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("Card UID is required"))?;

    let card = state
        .store()
        .insert_card(
            &uid,
            payload.owner_name.as_deref().unwrap_or(""),
            payload.description.as_deref().unwrap_or(""),
            payload.status.as_deref().unwrap_or("active"),
            auth.id,
        )
        .await
        .map_err(|e| match e {
            InsertCardError::DuplicateUid => {
                ApiError::Duplicate("A card with this UID is already registered".to_string())
            }
            InsertCardError::Other(e) => {
                ApiError::internal(format!("Failed to add card: {e}"))
            }
        })?;

    tracing::info!(uid = %card.uid, "RFID card registered");

    Ok(Json(ApiResponse::success_with_message(
        "Card added",
        CardDto::from(card),
    )))
}

/// PUT /rfid/cards/{id}
pub async fn update_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCardRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    if payload.owner_name.is_none() && payload.description.is_none() && payload.status.is_none()
    {
        return Err(ApiError::validation("No fields to update"));
    }

    state
        .store()
        .update_card(
            id,
            payload.owner_name.as_deref(),
            payload.description.as_deref(),
            payload.status.as_deref(),
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to update card: {e}")))?;

    Ok(Json(ApiResponse::ack("Card updated")))
}

/// DELETE /rfid/cards/{id}
pub async fn delete_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .store()
        .delete_card(id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to delete card: {e}")))?;

    Ok(Json(ApiResponse::ack("Card deleted")))
}

/// POST /rfid/verify
/// Public: the door device calls this with a freshly scanned UID. The
/// response is HTTP 200 for both outcomes; only `valid` differs.
pub async fn verify_card(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyCardRequest>,
) -> Result<Json<VerifyCardResponse>, ApiError> {
    let uid = payload
        .uid
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("Card UID is required"))?;

    let card = state
        .store()
        .verify_card(&uid)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to verify card: {e}")))?;

    let response = match card {
        Some(card) => {
            tracing::info!(uid = %card.uid, owner = %card.owner_name, "Card accepted");
            VerifyCardResponse {
                success: true,
                valid: true,
                message: "Card accepted".to_string(),
                data: Some(VerifiedCardDto {
                    uid: card.uid,
                    owner_name: card.owner_name,
                    description: card.description,
                }),
            }
        }
        None => {
            tracing::warn!(uid = %uid, "Card rejected");
            VerifyCardResponse {
                success: true,
                valid: false,
                message: "Card rejected".to_string(),
                data: None,
            }
        }
    };

    Ok(Json(response))
}

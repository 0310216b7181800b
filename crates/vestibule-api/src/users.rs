use std::path::PathBuf;

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    response::IntoResponse,
};

use vestibule_auth::store::CredentialStore;
use vestibule_auth::token::AccessClaims;
use vestibule_types::api::{AccountProfile, UpdateAccountRequest};

use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::{AppState, run_blocking, uploads};

pub async fn current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let id = claims.sub;
    let account = run_blocking(move || db.find_by_id(id))
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(ApiResponse::new(
        200,
        AccountProfile::from(account),
        "current account",
    )))
}

pub async fn update_account(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let full_name = req.full_name.trim().to_owned();
    let email = req.email.trim().to_owned();
    if full_name.is_empty() || email.is_empty() {
        return Err(ApiError::Validation(
            "fullName and email are required".into(),
        ));
    }

    let db = state.db.clone();
    let id = claims.sub;
    let account = run_blocking(move || db.update_profile(id, &full_name, &email)).await?;

    Ok(Json(ApiResponse::new(
        200,
        AccountProfile::from(account),
        "account details updated",
    )))
}

pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let staged = stage_single_image(&state, multipart, "avatar").await?;
    let uploaded = state.media.upload(&staged, "avatar").await;
    uploads::discard(&staged).await;
    let asset = uploaded?;

    let db = state.db.clone();
    let id = claims.sub;
    let url = asset.url;
    let account = run_blocking(move || db.update_avatar_url(id, &url)).await?;

    Ok(Json(ApiResponse::new(
        200,
        AccountProfile::from(account),
        "avatar updated",
    )))
}

pub async fn update_cover_image(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let staged = stage_single_image(&state, multipart, "coverImage").await?;
    let uploaded = state.media.upload(&staged, "cover-image").await;
    uploads::discard(&staged).await;
    let asset = uploaded?;

    let db = state.db.clone();
    let id = claims.sub;
    let url = asset.url;
    let account = run_blocking(move || db.update_cover_image_url(id, &url)).await?;

    Ok(Json(ApiResponse::new(
        200,
        AccountProfile::from(account),
        "cover image updated",
    )))
}

/// Pull one named file part out of a multipart body and stage it.
async fn stage_single_image(
    state: &AppState,
    mut multipart: Multipart,
    field_name: &str,
) -> Result<PathBuf, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("malformed multipart body".into()))?
    {
        if field.name() == Some(field_name) {
            let bytes = field
                .bytes()
                .await
                .map_err(|_| ApiError::Validation("malformed multipart field".into()))?;
            return uploads::stage(&state.upload_dir, &bytes).await;
        }
    }

    Err(ApiError::Validation(format!("{field_name} image is required")))
}

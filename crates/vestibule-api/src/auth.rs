use std::path::PathBuf;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Multipart, State},
    extract::multipart::Field,
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::info;

use vestibule_auth::store::CredentialStore;
use vestibule_auth::token::AccessClaims;
use vestibule_auth::{NewAccount, TokenPair, password};
use vestibule_types::api::{
    AccountProfile, ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest,
    RefreshResponse,
};

use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::{AppState, run_blocking, uploads};

// ── Registration ────────────────────────────────────────────────────────

/// Raw multipart form as received: text fields plus staged file parts.
#[derive(Default)]
struct RegisterForm {
    username: Option<String>,
    email: Option<String>,
    full_name: Option<String>,
    password: Option<String>,
    avatar: Option<PathBuf>,
    cover_image: Option<PathBuf>,
}

impl RegisterForm {
    async fn discard_staged(&self) {
        if let Some(path) = &self.avatar {
            uploads::discard(path).await;
        }
        if let Some(path) = &self.cover_image {
            uploads::discard(path).await;
        }
    }

    /// Reject before anything reaches the core: every text field non-empty,
    /// avatar present. Usernames are stored lowercase.
    fn validate(&self) -> Result<RegisterInput, ApiError> {
        Ok(RegisterInput {
            username: required(&self.username, "username")?.to_lowercase(),
            email: required(&self.email, "email")?,
            full_name: required(&self.full_name, "fullName")?,
            password: match self.password.as_deref() {
                Some(p) if !p.is_empty() => p.to_owned(),
                _ => return Err(ApiError::Validation("password is required".into())),
            },
            avatar: self
                .avatar
                .clone()
                .ok_or_else(|| ApiError::Validation("avatar image is required".into()))?,
            cover_image: self.cover_image.clone(),
        })
    }
}

struct RegisterInput {
    username: String,
    email: String,
    full_name: String,
    password: String,
    avatar: PathBuf,
    cover_image: Option<PathBuf>,
}

fn required(value: &Option<String>, name: &str) -> Result<String, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_owned()),
        _ => Err(ApiError::Validation(format!("{name} is required"))),
    }
}

pub async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = collect_form(&state, multipart).await?;

    // Staged files are removed whether or not the account lands; by then the
    // media host holds the real copies.
    let result = create_account(&state, &form).await;
    form.discard_staged().await;
    result
}

async fn collect_form(state: &AppState, mut multipart: Multipart) -> Result<RegisterForm, ApiError> {
    let mut form = RegisterForm::default();

    let outcome: Result<(), ApiError> = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| ApiError::Validation("malformed multipart body".into()))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "username" => form.username = Some(text(field).await?),
                "email" => form.email = Some(text(field).await?),
                "fullName" => form.full_name = Some(text(field).await?),
                "password" => form.password = Some(text(field).await?),
                "avatar" => {
                    let bytes = file_bytes(field).await?;
                    form.avatar = Some(uploads::stage(&state.upload_dir, &bytes).await?);
                }
                "coverImage" => {
                    let bytes = file_bytes(field).await?;
                    form.cover_image = Some(uploads::stage(&state.upload_dir, &bytes).await?);
                }
                _ => {}
            }
        }
        Ok(())
    }
    .await;

    if let Err(e) = outcome {
        form.discard_staged().await;
        return Err(e);
    }
    Ok(form)
}

async fn text(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|_| ApiError::Validation("malformed multipart field".into()))
}

async fn file_bytes(field: Field<'_>) -> Result<Bytes, ApiError> {
    field
        .bytes()
        .await
        .map_err(|_| ApiError::Validation("malformed multipart field".into()))
}

async fn create_account(
    state: &AppState,
    form: &RegisterForm,
) -> Result<(StatusCode, Json<ApiResponse<AccountProfile>>), ApiError> {
    let input = form.validate()?;

    let db = state.db.clone();
    let (username, email) = (input.username.clone(), input.email.clone());
    if run_blocking(move || db.taken_username_or_email(&username, &email)).await? {
        return Err(ApiError::Conflict("username or email"));
    }

    let avatar = state.media.upload(&input.avatar, "avatar").await?;
    let cover_image_url = match &input.cover_image {
        Some(path) => Some(state.media.upload(path, "cover-image").await?.url),
        None => None,
    };

    let password = input.password;
    let password_hash = run_blocking(move || password::hash(&password)).await?;

    let db = state.db.clone();
    let new_account = NewAccount {
        username: input.username,
        email: input.email,
        full_name: input.full_name,
        password_hash,
        avatar_url: avatar.url,
        cover_image_url,
    };
    let account = run_blocking(move || db.create(new_account)).await?;

    info!(account = %account.username, "account registered");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            201,
            AccountProfile::from(account),
            "account registered",
        )),
    ))
}

// ── Sessions ────────────────────────────────────────────────────────────

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identifier = req.identifier.trim().to_owned();
    if identifier.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "identifier and password are required".into(),
        ));
    }

    let sessions = state.sessions.clone();
    let password = req.password;
    let (pair, account) = run_blocking(move || sessions.login(&identifier, &password)).await?;

    let jar = session_cookies(jar, &pair);
    Ok((
        jar,
        Json(ApiResponse::new(
            200,
            LoginResponse {
                user: AccountProfile::from(account),
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "login successful",
        )),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.sessions.clone();
    let account_id = claims.sub;
    run_blocking(move || sessions.logout(account_id)).await?;

    let jar = clear_session_cookies(jar);
    Ok((
        jar,
        Json(ApiResponse::new(200, serde_json::json!({}), "logged out")),
    ))
}

/// The refresh token may arrive as a cookie or in the JSON body.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let presented = jar
        .get("refreshToken")
        .map(|c| c.value().to_owned())
        .or_else(|| {
            serde_json::from_slice::<RefreshRequest>(&body)
                .ok()
                .and_then(|r| r.refresh_token)
        });

    let sessions = state.sessions.clone();
    let pair = run_blocking(move || sessions.refresh(presented.as_deref())).await?;

    let jar = session_cookies(jar, &pair);
    Ok((
        jar,
        Json(ApiResponse::new(
            200,
            RefreshResponse {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "session refreshed",
        )),
    ))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.old_password.is_empty() || req.new_password.is_empty() {
        return Err(ApiError::Validation(
            "oldPassword and newPassword are required".into(),
        ));
    }

    let sessions = state.sessions.clone();
    let account_id = claims.sub;
    run_blocking(move || sessions.change_password(account_id, &req.old_password, &req.new_password))
        .await?;

    Ok(Json(ApiResponse::new(
        200,
        serde_json::json!({}),
        "password changed",
    )))
}

// ── Cookies ─────────────────────────────────────────────────────────────

fn session_cookies(jar: CookieJar, pair: &TokenPair) -> CookieJar {
    jar.add(session_cookie("accessToken", pair.access_token.clone()))
        .add(session_cookie("refreshToken", pair.refresh_token.clone()))
}

fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(session_cookie("accessToken", String::new()))
        .remove(session_cookie("refreshToken", String::new()))
}

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .path("/")
        .build()
}

//! Registration, sign-in, profile and password handlers

use crate::error::{ApiError, ApiResult};
use crate::extract::AuthenticatedUser;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use taskdesk_core::{CreateUserRequest, Session, TaskdeskError, User};
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct PasswordResetConfirmRequest {
    pub token: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.accounts.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<Session>> {
    let session = state
        .accounts
        .login(&request.username, &request.password)
        .await?;
    Ok(Json(session))
}

/// Sessions are stateless tokens; the client discards its copy
pub async fn logout(AuthenticatedUser(user): AuthenticatedUser) -> StatusCode {
    info!("User {} signed out", user.id);
    StatusCode::NO_CONTENT
}

pub async fn get_profile(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    let user = state.accounts.update_email(user.id, &request.email).await?;
    Ok(Json(user))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> ApiResult<StatusCode> {
    state.accounts.delete_account(user.id).await?;
    state.attachments.remove_owner(user.id).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    state
        .accounts
        .change_password(
            user.id,
            &request.old_password,
            &request.new_password,
            &request.new_password_confirmation,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Always accepted, so the response does not reveal whether the address is registered
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetRequest>,
) -> StatusCode {
    if let Err(e) = state.accounts.request_password_reset(&request.email).await {
        error!("Password reset request failed: {}", e);
    }
    StatusCode::ACCEPTED
}

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetConfirmRequest>,
) -> ApiResult<StatusCode> {
    match state
        .accounts
        .confirm_password_reset(
            &request.token,
            &request.new_password,
            &request.new_password_confirmation,
        )
        .await
    {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(TaskdeskError::InvalidToken { .. }) => Err(ApiError::BadRequest(
            "The password reset link is invalid or has expired.".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

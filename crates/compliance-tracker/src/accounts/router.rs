use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::auth::{AuthError, AuthProvider};
use super::domain::{LoginForm, PasswordResetForm, RegistrationForm};
use super::repository::UserRepository;
use super::service::{AccountAction, AccountService, AccountServiceError};
use crate::notice::Notice;
use crate::store::StoreError;

type SharedService<A, U> = Arc<AccountService<A, U>>;

/// Router exposing registration, login, password reset and the user table.
pub fn account_router<A, U>(service: SharedService<A, U>) -> Router
where
    A: AuthProvider + 'static,
    U: UserRepository + 'static,
{
    Router::new()
        .route("/api/v1/accounts/register", post(register_handler::<A, U>))
        .route("/api/v1/accounts/login", post(login_handler::<A, U>))
        .route(
            "/api/v1/accounts/password-reset",
            post(password_reset_handler::<A, U>),
        )
        .route("/api/v1/accounts/users", get(users_handler::<A, U>))
        .with_state(service)
}

pub(crate) async fn register_handler<A, U>(
    State(service): State<SharedService<A, U>>,
    Json(form): Json<RegistrationForm>,
) -> Response
where
    A: AuthProvider + 'static,
    U: UserRepository + 'static,
{
    match service.register(form) {
        Ok(user) => {
            let payload = json!({
                "user": user,
                "notice": Notice::success("Registration successful!"),
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(err) => error_response(err, AccountAction::Register),
    }
}

pub(crate) async fn login_handler<A, U>(
    State(service): State<SharedService<A, U>>,
    Json(form): Json<LoginForm>,
) -> Response
where
    A: AuthProvider + 'static,
    U: UserRepository + 'static,
{
    match service.login(form) {
        Ok(identity) => {
            let payload = json!({
                "uid": identity.uid,
                "email": identity.email,
                "notice": Notice::success("Login successful!"),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err, AccountAction::Login),
    }
}

pub(crate) async fn password_reset_handler<A, U>(
    State(service): State<SharedService<A, U>>,
    Json(form): Json<PasswordResetForm>,
) -> Response
where
    A: AuthProvider + 'static,
    U: UserRepository + 'static,
{
    match service.request_password_reset(form) {
        Ok(()) => {
            let payload = json!({
                "notice": Notice::success("Password reset email sent."),
            });
            (StatusCode::ACCEPTED, Json(payload)).into_response()
        }
        Err(err) => error_response(err, AccountAction::PasswordReset),
    }
}

pub(crate) async fn users_handler<A, U>(State(service): State<SharedService<A, U>>) -> Response
where
    A: AuthProvider + 'static,
    U: UserRepository + 'static,
{
    match service.users() {
        Ok(users) => (StatusCode::OK, Json(json!({ "users": users }))).into_response(),
        Err(err) => error_response(err, AccountAction::ListUsers),
    }
}

fn error_response(err: AccountServiceError, action: AccountAction) -> Response {
    let notice = err.notice(action);
    let (status, payload) = match &err {
        AccountServiceError::Validation(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "errors": errors, "notice": notice }),
        ),
        AccountServiceError::EmailAlreadyRegistered(_)
        | AccountServiceError::Auth(AuthError::EmailAlreadyInUse)
        | AccountServiceError::Store(StoreError::Conflict) => {
            (StatusCode::CONFLICT, json!({ "notice": notice }))
        }
        AccountServiceError::Auth(AuthError::InvalidCredential) => {
            (StatusCode::UNAUTHORIZED, json!({ "notice": notice }))
        }
        AccountServiceError::Auth(AuthError::TooManyRequests) => {
            (StatusCode::TOO_MANY_REQUESTS, json!({ "notice": notice }))
        }
        AccountServiceError::Auth(AuthError::Unavailable(_))
        | AccountServiceError::Store(StoreError::Unavailable(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, json!({ "notice": notice }))
        }
        AccountServiceError::Store(StoreError::NotFound) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "notice": notice }),
        ),
    };
    tracing::warn!(status = status.as_u16(), error = %err, ?action, "account request failed");
    (status, Json(payload)).into_response()
}

//! Accounts: login, logout, registration and profile reads.
use explore_domain::{Credentials, Registration, User};
use explore_upstream::{DocumentStore, Value};
use salvo::http::StatusCode;
use salvo::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::read_json;
use crate::error::{AppError, AppResult, Message};
use crate::records::{USERS, user_fields};
use crate::session::{SessionDepotExt, TOKEN_COOKIE, removal_cookie, session_cookie};
use crate::state::StateDepotExt;

#[derive(Serialize)]
struct LoginReply<'a> {
    uid: &'a str,
    message: &'a str,
}

#[handler]
pub(crate) async fn check_connect() -> &'static str {
    "Database Server is running"
}

/// Profile fields of `users/{uid}` without Firestore type tags.
#[handler]
pub(crate) async fn user_data(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Map<String, JsonValue>>> {
    let uid = req.param::<String>("uid").unwrap_or_default();
    let state = depot.db_state()?.clone();
    match state.documents.get(USERS, &uid).await {
        Ok(Some(doc)) => Ok(Json(doc.to_plain())),
        Ok(None) => {
            tracing::warn!(%uid, "user document not found");
            Err(AppError::UserData)
        }
        Err(e) => {
            tracing::error!(%uid, error = ?e, "failed to fetch user data");
            Err(AppError::UserData)
        }
    }
}

#[handler]
pub(crate) async fn login(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let credentials: Credentials = read_json(req).await.unwrap_or_default();
    if !credentials.is_complete() {
        return Err(AppError::MissingCredentials);
    }
    let state = depot.db_state()?.clone();
    let session = state
        .identity
        .sign_in(credentials.email.trim(), &credentials.password)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "login rejected");
            AppError::InvalidCredentials
        })?;
    tracing::info!(uid = %session.uid, "user logged in");
    res.add_cookie(session_cookie(session.id_token, state.cookie_secure));
    res.render(Json(LoginReply {
        uid: &session.uid,
        message: "Login successful",
    }));
    Ok(())
}

#[handler]
pub(crate) async fn logout(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    if req.cookie(TOKEN_COOKIE).is_none() {
        return Err(AppError::NotLoggedIn);
    }
    let state = depot.db_state()?;
    res.add_cookie(removal_cookie(state.cookie_secure));
    res.render(Json(Message {
        message: "Logout successful",
    }));
    Ok(())
}

/// Creates the account, stores its profile under `users/{uid}` and signs it in.
///
/// The account is deleted again when the profile cannot be stored, so a failed
/// registration can be retried with the same e-mail.
#[handler]
pub(crate) async fn register(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let registration: Registration = read_json(req).await?;
    registration.validate()?;
    let state = depot.db_state()?.clone();
    let session = state
        .identity
        .sign_up(registration.email.trim(), &registration.password)
        .await?;
    let user = registration.into_user(&session.uid);
    let documents = state.documents.on_behalf_of(&session.id_token);
    if let Err(e) = store_profile(documents.as_ref(), &user).await {
        if let Err(rollback) = state.identity.delete(&session.id_token).await {
            tracing::error!(uid = %user.id, error = ?rollback, "failed to delete account after registration failure");
        } else {
            tracing::warn!(uid = %user.id, error = %e, "registration rolled back");
        }
        return Err(e);
    }
    tracing::info!(uid = %user.id, username = %user.username, "user registered");
    res.add_cookie(session_cookie(session.id_token, state.cookie_secure));
    res.status_code(StatusCode::CREATED);
    res.render(Json(user));
    Ok(())
}

/// Writes `users/{uid}` unless another profile already uses the username.
async fn store_profile(documents: &dyn DocumentStore, user: &User) -> AppResult<()> {
    let taken = documents
        .find_eq(USERS, "username", Value::from(user.username.as_str()))
        .await?
        .iter()
        .any(|doc| doc.id != user.id);
    if taken {
        return Err(AppError::UsernameTaken);
    }
    documents.create(USERS, Some(&user.id), user_fields(user)).await?;
    Ok(())
}

#[handler]
pub(crate) async fn profile(depot: &mut Depot) -> AppResult<Json<User>> {
    Ok(Json(depot.session()?.user.clone()))
}

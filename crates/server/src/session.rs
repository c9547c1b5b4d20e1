//! The `token` cookie and the per-request session built from it.
use explore_domain::User;
use salvo::http::cookie::{Cookie, SameSite};
use salvo::prelude::*;

use crate::error::{AppError, AppResult};
use crate::records::{USERS, user_from_document};
use crate::state::StateDepotExt;

pub const TOKEN_COOKIE: &str = "token";

/// The signed in caller, resolved from the `token` cookie. `token` is the ID token
/// upstream writes are made with.
#[derive(Clone, Debug)]
pub struct Session {
    pub uid: String,
    pub token: String,
    pub user: User,
}

pub trait SessionDepotExt {
    fn session(&self) -> AppResult<&Session>;
}

impl SessionDepotExt for Depot {
    fn session(&self) -> AppResult<&Session> {
        self.obtain::<Session>().map_err(|_| AppError::Unauthenticated)
    }
}

/// `httpOnly` cookie carrying the identity provider's ID token.
pub fn session_cookie(id_token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, id_token))
        .http_only(true)
        .path("/")
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Expired cookie that makes the browser drop the session cookie.
pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = session_cookie(String::new(), secure);
    cookie.make_removal();
    cookie
}

/// Hoop for routes that need a signed in caller. Injects a [`Session`] or answers 401.
#[handler]
pub async fn require_session(req: &mut Request, depot: &mut Depot, res: &mut Response, ctrl: &mut FlowCtrl) {
    let token = req
        .cookie(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|token| !token.is_empty());
    match resolve(token, depot).await {
        Ok(session) => {
            tracing::debug!(uid = %session.uid, "session resolved");
            depot.inject(session);
        }
        Err(e) => {
            e.write(req, depot, res).await;
            ctrl.skip_rest();
        }
    }
}

async fn resolve(token: Option<String>, depot: &Depot) -> AppResult<Session> {
    let token = token.ok_or(AppError::Unauthenticated)?;
    let state = depot.db_state()?;
    let uid = state.identity.lookup(&token).await.map_err(|e| {
        tracing::info!(error = %e, "session token rejected");
        AppError::Unauthenticated
    })?;
    let profile = state
        .documents
        .on_behalf_of(&token)
        .get(USERS, &uid)
        .await?
        .ok_or(AppError::NotFound("User profile"))?;
    Ok(Session {
        user: user_from_document(&profile),
        uid,
        token,
    })
}

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::{Form, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::session::{new_session_id, SessionData, SessionError, SessionStore, SessionUser};

use super::error::ApiError;
use super::state::{AppState, CookieSettings};

pub const SESSION_COOKIE: &str = "sid";

/// The caller's session, loaded from the store named by the `sid` cookie.
///
/// A request without a cookie, or with an id the store no longer knows, gets a
/// freshly minted id. Nothing is written to the store until [`SessionContext::set_user`].
#[derive(Debug)]
pub struct SessionContext {
    id: String,
    data: SessionData,
    store: Arc<dyn SessionStore>,
    cookie: CookieSettings,
}

impl SessionContext {
    pub async fn load(
        store: Arc<dyn SessionStore>,
        cookie: CookieSettings,
        presented: Option<&str>,
    ) -> Result<Self, SessionError> {
        let known = match presented.filter(|id| !id.is_empty()) {
            Some(id) => store.get(id).await?.map(|data| (id.to_string(), data)),
            None => None,
        };
        let (id, data) = known.unwrap_or_else(|| {
            debug!("starting new session");
            (new_session_id(), SessionData::default())
        });

        Ok(Self {
            id,
            data,
            store,
            cookie,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.data.user.as_ref()
    }

    pub async fn set_user(&mut self, user: SessionUser) -> Result<(), SessionError> {
        self.data.user = Some(user);
        self.store.set(&self.id, self.data.clone()).await
    }

    pub async fn destroy(self) -> Result<(), SessionError> {
        self.store.destroy(&self.id).await
    }

    pub fn cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, self.id.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.cookie.secure)
            .build()
    }

    pub fn removal_cookie() -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE).path("/").build()
    }
}

impl FromRequestParts<AppState> for SessionContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let presented = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_string());
        let session = SessionContext::load(
            Arc::clone(&state.sessions),
            state.cookie,
            presented.as_deref(),
        )
        .await?;
        Ok(session)
    }
}

/// Request body accepted either as JSON or as an urlencoded form.
///
/// Handlers take `Result<Payload<T>, ApiError>` and decide how an unreadable body is reported.
#[derive(Debug)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::UnreadableBody(rejection.body_text()))?;
            return Ok(Payload(value));
        }

        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::UnreadableBody(rejection.body_text()))?;
        Ok(Payload(value))
    }
}

use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, error, info, warn};

use crate::session::{Role, SessionUser};
use crate::users::NewUser;

use super::auth::require_admin;
use super::error::ApiError;
use super::extract::{Payload, SessionContext};
use super::responses::{found, Envelope, HealthResponse, LoginForm};
use super::state::AppState;

const ADMIN_DATA: &str = "Estos son los datos privados";
const REGISTERED: &str = "Usuario registrado exitosamente.";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/logout", get(logout))
        .route(
            "/admin",
            get(admin_data).route_layer(from_fn_with_state(state.clone(), require_admin)),
        )
        .route("/login", post(login))
        .route("/register", post(register))
        .layer(
            tower_http::request_id::SetRequestIdLayer::new(
                axum::http::header::HeaderName::from_static("x-request-id"),
                tower_http::request_id::MakeRequestUuid,
            ),
        )
        .layer(tower_http::request_id::PropagateRequestIdLayer::new(
            axum::http::header::HeaderName::from_static("x-request-id"),
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let users = state.users.find_all().await.map_err(|err| {
        error!(error = %err, "health check could not read users");
        ApiError::Internal
    })?;
    Ok(Json(HealthResponse {
        status: "ok",
        users: users.len(),
    }))
}

/// Sends first-time visitors to registration until at least one user exists.
async fn root(State(state): State<AppState>) -> Result<Response, ApiError> {
    let users = state.users.find_all().await.map_err(|err| {
        error!(error = %err, "failed to list users");
        ApiError::Internal
    })?;

    if users.is_empty() {
        debug!("no registered users; redirecting to register");
        return Ok(found("/register"));
    }
    debug!(users = users.len(), "redirecting to login");
    Ok(found("/login"))
}

async fn logout(session: SessionContext, jar: CookieJar) -> Result<(CookieJar, Response), ApiError> {
    let id = session.id().to_string();
    session.destroy().await.map_err(|err| {
        error!(error = %err, "failed to destroy session");
        ApiError::Failure(err.to_string())
    })?;
    debug!(session = %id, "session destroyed");

    Ok((jar.remove(SessionContext::removal_cookie()), found("/login")))
}

async fn admin_data() -> Json<Envelope> {
    Json(Envelope::ok(ADMIN_DATA))
}

async fn login(
    State(state): State<AppState>,
    mut session: SessionContext,
    jar: CookieJar,
    payload: Result<Payload<LoginForm>, ApiError>,
) -> Result<(CookieJar, Response), ApiError> {
    let Payload(form) = payload.map_err(|rejection| {
        warn!(error = %rejection, "unreadable login body");
        ApiError::Failure(rejection.to_string())
    })?;

    let user = state.users.find_by_email(&form.mail).await.map_err(|err| {
        error!(error = %err, "user lookup failed during login");
        ApiError::Failure(err.to_string())
    })?;

    let Some(user) = user.filter(|user| user.password_matches(&form.pass)) else {
        warn!("login rejected");
        return Err(ApiError::InvalidCredentials);
    };

    session
        .set_user(SessionUser {
            username: user.first_name.clone(),
            rol: Role::User,
        })
        .await?;
    info!(id = %user.id, "user logged in");

    Ok((jar.add(session.cookie()), found("/products")))
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Payload<NewUser>, ApiError>,
) -> Result<Json<Envelope>, ApiError> {
    let Payload(new_user) = payload.map_err(|rejection| {
        warn!(error = %rejection, "unreadable registration body");
        ApiError::RegistrationFailed
    })?;

    match state.users.insert(new_user).await {
        Ok(user) => {
            info!(id = %user.id, "user registered");
            Ok(Json(Envelope::ok(REGISTERED)))
        }
        Err(err) if err.is_conflict() => {
            warn!("registration rejected: email already registered");
            Err(ApiError::EmailTaken)
        }
        Err(err) => {
            error!(error = %err, "registration failed");
            Err(ApiError::RegistrationFailed)
        }
    }
}

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, warn};

use crate::session::SessionUser;

use super::error::ApiError;
use super::extract::SessionContext;

/// Middleware for routes restricted to `ADMIN` sessions.
pub async fn require_admin(
    session: SessionContext,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    ensure_admin(session.user())?;
    Ok(next.run(request).await)
}

pub fn ensure_admin(user: Option<&SessionUser>) -> Result<(), ApiError> {
    let Some(user) = user else {
        warn!("admin route requested without session user");
        return Err(ApiError::Unauthenticated);
    };

    if !user.is_admin() {
        warn!(username = %user.username, "admin route requested by non-admin");
        return Err(ApiError::Forbidden);
    }

    debug!(username = %user.username, "admin access granted");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use super::ensure_admin;
    use crate::http::error::ApiError;
    use crate::session::{Role, SessionUser};

    fn user(rol: Role) -> SessionUser {
        SessionUser {
            username: String::from("Ana"),
            rol,
        }
    }

    #[test]
    fn missing_user_is_unauthenticated() {
        let err = ensure_admin(None).unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Usuario no autorizado");
    }

    #[test]
    fn plain_user_is_forbidden() {
        let err = ensure_admin(Some(&user(Role::User))).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "Usuario no admin");
    }

    #[test]
    fn admin_passes() {
        assert!(ensure_admin(Some(&user(Role::Admin))).is_ok());
    }
}

use std::sync::Arc;

use crate::session::SessionStore;
use crate::users::UserStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct CookieSettings {
    pub secure: bool,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub cookie: CookieSettings,
}

pub mod middleware;
pub mod session;

pub use middleware::{redirect_if_authenticated, require_auth, CurrentUser};
pub use session::{CookieSession, SessionData, SessionManager};

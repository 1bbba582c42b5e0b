pub mod auth;
pub mod require_role;
pub mod response;

pub use auth::{require_auth, CurrentUser};
pub use require_role::{require_admin, require_staff};

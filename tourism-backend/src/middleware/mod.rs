pub mod session_auth;

pub use session_auth::{
    extract_token, optional_session, require_role, require_session, SESSION_COOKIE,
};

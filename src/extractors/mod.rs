pub mod auth_ctx;

pub use auth_ctx::{AuthContext, Authenticated, DefaultSink, USER_ID_HEADER, get_claims};

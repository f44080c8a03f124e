mod auth_session_manager_fake;
mod auth_session_manager_impl;
mod jwt_codec;

pub use auth_session_manager_fake::*;
pub use auth_session_manager_impl::*;
pub use jwt_codec::*;

mod auth_session_manager;
mod token_codec;

pub use auth_session_manager::*;
pub use token_codec::*;

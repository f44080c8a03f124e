mod access_blacklist_redis;
mod session_store_redis;

pub use access_blacklist_redis::*;
pub use session_store_redis::*;

mod access_blacklist_memory;
mod manual_clock;
mod session_store_memory;

pub use access_blacklist_memory::*;
pub use manual_clock::*;
pub use session_store_memory::*;

// clock

mod clock;

pub use clock::*;

// store

mod access_blacklist;
mod session_store;

pub use access_blacklist::*;
pub use session_store::*;

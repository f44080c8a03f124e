mod housekeeper;
mod runtime;

pub use housekeeper::*;
pub use runtime::*;

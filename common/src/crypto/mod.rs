mod hash;
mod key;

pub use hash::*;
pub use key::*;

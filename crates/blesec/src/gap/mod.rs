//! GAP addressing types shared by the security and privacy layers

pub mod constants;
pub mod types;

pub use constants::*;
pub use types::*;

pub mod constants;
pub mod serde_millis;

pub use constants::*;

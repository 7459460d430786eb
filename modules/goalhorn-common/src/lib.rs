pub mod config;
pub mod error;
pub mod format;
pub mod types;

pub use config::Config;
pub use error::GoalhornError;
pub use types::*;

pub mod error;
pub mod types;
pub mod config;
pub mod storage;
pub mod profile;
pub mod provider;
pub mod mailing;
pub mod relay;
pub mod service;
pub mod util;

pub use error::{InstareplyError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");

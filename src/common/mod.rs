//! Common utilities shared by the library and the scenario binaries

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{Error, Result};

// HBCI Core - Job & Message Protocol Engine
// NO infrastructure dependencies (hexagonal: domain, ports, application)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

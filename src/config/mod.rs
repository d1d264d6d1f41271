mod server;

pub use server::{ServerConfig, rate_limit_deactivated};

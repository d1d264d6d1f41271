mod account;
pub mod dto;
mod licenses;
pub mod rate_limit;
pub mod response;
mod router;
pub mod validation;

pub use rate_limit::{RateLimitConfig, RateLimiter, RateLimits};
pub use router::{AppState, create_router};

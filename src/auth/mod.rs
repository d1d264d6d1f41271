pub mod helpers;
mod middleware;
mod password;
mod token;

pub use middleware::{AuthError, CurrentUser, OptionalUser, RequireSuperuser};
pub use password::PasswordHasher;
pub use token::{TokenGenerator, parse_token};

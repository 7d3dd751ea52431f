mod middleware;
mod token;

pub use middleware::{AuthError, RequireAdmin};
pub use token::{digest, generate_token, load_token_digest, token_matches, write_new_token};

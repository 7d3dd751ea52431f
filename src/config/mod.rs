mod server;

pub use server::{ADMIN_TOKEN_FILE, CONFIG_FILE, ServerConfig};

pub mod handlers;
pub mod password;
pub mod service;
pub mod session;
pub mod tokens;

pub use service::AuthService;
pub use session::{CurrentSession, Session, SessionResolver};
#[cfg(test)]
pub use session::Identity;
pub use tokens::TokenManager;

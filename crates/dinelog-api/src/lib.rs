pub mod auth;
pub mod credentials;
pub mod error;
pub mod restaurants;
pub mod router;
pub mod session;
pub mod state;

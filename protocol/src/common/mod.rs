pub mod agent;
pub mod auth;

pub use agent::*;
pub use auth::*;

pub mod auth;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod questions;
pub mod routes;
pub mod session;

pub use auth::{AdminCredentials, AppState, AppStateInner};
pub use error::ApiError;
pub use routes::router;

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;

pub use error::{LotError, ValidationError};
pub use service::credential_ops::AdminToken;
pub use service::registry::{NewRegistration, Registry};

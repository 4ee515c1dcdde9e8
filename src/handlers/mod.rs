pub mod admin;
pub mod search;
pub mod session;

pub mod credential_ops;
pub mod image_store;
pub mod registry;
pub mod sessions;

pub mod cache;
pub mod errors;
pub mod models;
pub mod settings;

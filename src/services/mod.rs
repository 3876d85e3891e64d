pub mod broadcast;
pub mod engine;
pub mod store;

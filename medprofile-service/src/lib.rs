pub mod data;
pub mod llm;
pub mod models;
pub mod service;

pub use service::{AppState, build_router, create_app};

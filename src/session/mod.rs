pub mod engine_api;
pub mod http_session;

pub use engine_api::{ApiError, EngineApi};
pub use http_session::HttpEngine;

pub mod model;
pub mod service;

pub use model::{EngineJob, EngineOutcome, ServiceCommand};
pub use service::EngineService;

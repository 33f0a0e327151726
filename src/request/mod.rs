pub mod builder;
pub mod urls;

pub use builder::{
    build_request, catalog_request, EngineRequest, Method, Operation, SignalQuery,
};
pub use urls::{join_url, DEFAULT_API_URL};

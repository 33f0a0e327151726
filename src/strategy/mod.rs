pub mod alpha;
pub mod catalog;
pub mod params;

pub use alpha::{AlphaConfiguration, AlphaField, ConfigError};
pub use catalog::{AlphaDescriptor, StrategyTemplate};
pub use params::{ParamField, StrategyParameters};

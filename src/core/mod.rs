pub mod config;
pub mod lookup;
pub mod paths;
pub mod pipeline;
pub mod validator;

pub use config::Config;
pub use lookup::{LookupEngine, ProbabilityVector};
pub use pipeline::{BuildSummary, Pipeline};

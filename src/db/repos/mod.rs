mod metrics;
mod scope;

pub use metrics::*;
pub use scope::*;

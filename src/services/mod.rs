pub mod azure_openai;
pub mod gemini;
pub mod metrics;
pub mod token_quota;
pub mod usage_sweeper;

pub use azure_openai::*;
pub use gemini::*;
pub use metrics::*;
pub use token_quota::*;
pub use usage_sweeper::*;

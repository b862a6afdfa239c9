pub mod catalog;
pub mod format;
pub mod orchestrator;
pub mod pricing;
pub mod session;
pub mod task;
pub mod types;
pub mod utils;

pub use catalog::{CatalogError, CatalogSource, WebCatalog};
pub use orchestrator::{Orchestrator, OrchestratorConfig, RunEvent};
pub use pricing::{FetchError, PricingFetcher, WebPricingFetcher};
pub use session::Session;
pub use task::{Task, TaskError, TaskId, TaskStatus};

pub const BASE_URL: &str = "https://www.broadwayinbound.com";

use std::sync::Arc;
use std::time::Duration;

use rmcp::{
    ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{ErrorData as McpError, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::Deserialize;
use showgrid::format::{TaskReport, TextOptions};
use showgrid::utils::TaskSpec;
use showgrid::{
    CatalogSource, Orchestrator, OrchestratorConfig, Session, WebCatalog, WebPricingFetcher,
};

#[derive(Debug, Clone)]
pub struct McpServer {
    catalog: WebCatalog,
    fetcher: Arc<WebPricingFetcher>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl McpServer {
    pub fn new() -> Result<Self, anyhow::Error> {
        Ok(Self {
            catalog: WebCatalog::new()?,
            fetcher: Arc::new(WebPricingFetcher::new()?),
            tool_router: Self::tool_router(),
        })
    }

    #[tool(
        name = "list_shows",
        description = "List the Broadway shows that have published group pricing on Broadway Inbound, with their id, name, page url and bookable date range. Use the id and date range to build scrape_pricing tasks."
    )]
    pub async fn list_shows(&self) -> Result<String, McpError> {
        let shows = self
            .catalog
            .load_shows()
            .await
            .inspect_err(|e| log::error!("Failed to load show catalog: {e:?}"))
            .map_err(|e| McpError::internal_error(format!("Show catalog unavailable: {e}"), None))?;

        let json = serde_json::to_string_pretty(&shows)
            .inspect_err(|e| log::error!("Serialization error: {e:?}"))
            .map_err(|e| {
                McpError::internal_error(format!("Failed to serialize shows: {e:?}"), None)
            })?;

        Ok(json)
    }

    #[tool(
        name = "scrape_pricing",
        description = "Scrape group pricing for one or more tasks (show id + date range). Every date is fetched separately and concurrently. Returns per task the status (done/failed/cancelled), a flat {date, label, price} table, copy-ready email text per date and the dates that failed."
    )]
    pub async fn scrape_pricing(
        &self,
        Parameters(params): Parameters<ScrapePricingParams>,
    ) -> Result<String, McpError> {
        if params.tasks.is_empty() {
            return Err(McpError::invalid_params("At least one task is required", None));
        }

        let specs = params
            .tasks
            .iter()
            .map(|t| TaskSpec::new(&t.show_id, &t.start_date, t.end_date.as_deref()))
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| log::error!("Invalid params: {e}"))
            .map_err(|e| McpError::invalid_params(e, None))?;

        let mut session = Session::load(&self.catalog)
            .await
            .inspect_err(|e| log::error!("Failed to load show catalog: {e:?}"))
            .map_err(|e| {
                McpError::internal_error(format!("Show catalog unavailable: {e}"), None)
            })?;

        for spec in &specs {
            session
                .add_spec(spec)
                .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        }

        let defaults = OrchestratorConfig::default();
        let config = OrchestratorConfig {
            max_concurrency: params.max_concurrency.unwrap_or(defaults.max_concurrency),
            fetch_timeout: params
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
        };
        let orchestrator = Orchestrator::new(self.fetcher.clone(), config)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

        let tasks = session.run(&orchestrator).await;

        let reports: Vec<TaskReport> = tasks
            .iter()
            .map(|task| {
                let options = TextOptions {
                    show_name: params
                        .show_name_in_header
                        .then(|| task.show().name.clone()),
                    split_combined_labels: params.split_labels,
                    dedupe: params.dedupe,
                };
                TaskReport::new(task, &options)
            })
            .collect();

        let json = serde_json::to_string_pretty(&reports).map_err(|e| {
            McpError::internal_error(format!("Failed to serialize reports: {e}"), None)
        })?;

        Ok(json)
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TaskParams {
    /// Show id as returned by list_shows
    show_id: String,
    /// First date, MM/DD/YYYY or YYYY-MM-DD
    start_date: String,
    /// Last date, defaults to start_date
    end_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ScrapePricingParams {
    tasks: Vec<TaskParams>,
    /// Maximum number of dates fetched at the same time (default 5)
    max_concurrency: Option<usize>,
    /// Per-date timeout in seconds (default 60)
    timeout_secs: Option<u64>,
    #[serde(default)]
    show_name_in_header: bool,
    #[serde(default)]
    split_labels: bool,
    #[serde(default)]
    dedupe: bool,
}

#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(include_str!("./instructions.md").to_string()),
            ..Default::default()
        }
    }
}

//! HTTP admin client — list/get endpoints for executions and workflows.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use fd_core::execution::{
    NodeExecution, NodeExecutionId, TaskExecution, TaskExecutionId, WorkflowExecution,
    WorkflowExecutionId,
};
use fd_core::filter::{FilterSpec, FilterValue, PageLimit, RequestConfig, SortDirection};
use fd_core::graph::{CompiledWorkflow, WorkflowId};

use crate::config::AdminConfig;
use crate::AdminError;

/// One page of list results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub entities: Vec<T>,
}

/// Deck availability for a node execution. The API's "not found" on deck
/// lookups means "not yet published", not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckStatus {
    Ready { uri: String },
    NotReady,
}

/// Remote admin API contract consumed by the synchronizer.
#[async_trait]
pub trait AdminClient: Send + Sync {
    async fn get_workflow_execution(
        &self,
        id: &WorkflowExecutionId,
    ) -> Result<WorkflowExecution, AdminError>;

    async fn list_node_executions(
        &self,
        id: &WorkflowExecutionId,
        config: &RequestConfig,
    ) -> Result<Page<NodeExecution>, AdminError>;

    /// The single "list children by parent id" call used for parent-flagged
    /// nodes; returns all descendants of one parent in one page.
    async fn list_node_execution_children(
        &self,
        id: &WorkflowExecutionId,
        parent_node_id: &str,
        config: &RequestConfig,
    ) -> Result<Page<NodeExecution>, AdminError>;

    async fn list_task_executions(
        &self,
        id: &NodeExecutionId,
        config: &RequestConfig,
    ) -> Result<Page<TaskExecution>, AdminError>;

    async fn list_task_execution_children(
        &self,
        id: &TaskExecutionId,
        config: &RequestConfig,
    ) -> Result<Page<NodeExecution>, AdminError>;

    async fn get_workflow(&self, id: &WorkflowId) -> Result<CompiledWorkflow, AdminError>;

    /// Generated closure of a dynamic node. `None` until the backend has
    /// produced it.
    async fn get_dynamic_node_workflow(
        &self,
        id: &NodeExecutionId,
    ) -> Result<Option<CompiledWorkflow>, AdminError>;

    async fn get_deck(&self, id: &NodeExecutionId) -> Result<DeckStatus, AdminError>;
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

pub struct HttpAdminClient {
    http: HttpClient,
    base_url: Url,
}

impl HttpAdminClient {
    pub fn new(config: &AdminConfig) -> Result<Self, AdminError> {
        let http = HttpClient::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AdminError::Http(format!("failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AdminError::Endpoint(format!("{}: {e}", config.base_url)))?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AdminError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AdminError::Endpoint("base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, AdminError> {
        let request_id = uuid::Uuid::new_v4();
        tracing::debug!(%url, %request_id, "admin GET");
        let response = self
            .http
            .get(url.clone())
            .header("x-request-id", request_id.to_string())
            .send()
            .await
            .map_err(|e| AdminError::Http(format!("request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AdminError::NotFound(url.path().to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AdminError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AdminError::Decode(e.to_string()))
    }
}

/// Render a filter set in the admin API's query convention,
/// e.g. `eq(phase,RUNNING)+value_in(phase,QUEUED;RUNNING)`.
fn render_filters(filters: &[FilterSpec]) -> String {
    filters
        .iter()
        .map(|f| {
            let op = match f.operation {
                fd_core::filter::FilterOperation::Eq => "eq",
                fd_core::filter::FilterOperation::Neq => "neq",
                fd_core::filter::FilterOperation::ValueIn => "value_in",
                fd_core::filter::FilterOperation::Contains => "contains",
            };
            let value = match &f.value {
                FilterValue::Scalar(v) => v.clone(),
                FilterValue::List(vs) => vs.join(";"),
            };
            format!("{op}({},{value})", f.key)
        })
        .collect::<Vec<_>>()
        .join("+")
}

fn apply_request_config(mut url: Url, config: &RequestConfig) -> Url {
    {
        let mut query = url.query_pairs_mut();
        if !config.filter.is_empty() {
            query.append_pair("filters", &render_filters(&config.filter));
        }
        if let Some(sort) = &config.sort {
            query.append_pair("sort_by.key", &sort.key);
            let direction = match sort.direction {
                SortDirection::Ascending => "ASCENDING",
                SortDirection::Descending => "DESCENDING",
            };
            query.append_pair("sort_by.direction", direction);
        }
        if let PageLimit::Limited(n) = config.limit {
            query.append_pair("limit", &n.to_string());
        }
    }
    url
}

#[async_trait]
impl AdminClient for HttpAdminClient {
    async fn get_workflow_execution(
        &self,
        id: &WorkflowExecutionId,
    ) -> Result<WorkflowExecution, AdminError> {
        let url = self.endpoint(&["api", "v1", "executions", &id.project, &id.domain, &id.name])?;
        self.get_json(url).await
    }

    async fn list_node_executions(
        &self,
        id: &WorkflowExecutionId,
        config: &RequestConfig,
    ) -> Result<Page<NodeExecution>, AdminError> {
        let url = self.endpoint(&[
            "api",
            "v1",
            "node_executions",
            &id.project,
            &id.domain,
            &id.name,
        ])?;
        self.get_json(apply_request_config(url, config)).await
    }

    async fn list_node_execution_children(
        &self,
        id: &WorkflowExecutionId,
        parent_node_id: &str,
        config: &RequestConfig,
    ) -> Result<Page<NodeExecution>, AdminError> {
        let url = self.endpoint(&[
            "api",
            "v1",
            "node_executions",
            &id.project,
            &id.domain,
            &id.name,
        ])?;
        let mut url = apply_request_config(url, config);
        url.query_pairs_mut()
            .append_pair("unique_parent_id", parent_node_id);
        self.get_json(url).await
    }

    async fn list_task_executions(
        &self,
        id: &NodeExecutionId,
        config: &RequestConfig,
    ) -> Result<Page<TaskExecution>, AdminError> {
        let exec = &id.execution_id;
        let url = self.endpoint(&[
            "api",
            "v1",
            "task_executions",
            &exec.project,
            &exec.domain,
            &exec.name,
            &id.node_id,
        ])?;
        self.get_json(apply_request_config(url, config)).await
    }

    async fn list_task_execution_children(
        &self,
        id: &TaskExecutionId,
        config: &RequestConfig,
    ) -> Result<Page<NodeExecution>, AdminError> {
        let node = &id.node_execution_id;
        let exec = &node.execution_id;
        let attempt = id.retry_attempt.to_string();
        let url = self.endpoint(&[
            "api",
            "v1",
            "children",
            "task_executions",
            &exec.project,
            &exec.domain,
            &exec.name,
            &node.node_id,
            &id.task_id,
            &attempt,
        ])?;
        self.get_json(apply_request_config(url, config)).await
    }

    async fn get_workflow(&self, id: &WorkflowId) -> Result<CompiledWorkflow, AdminError> {
        let url = self.endpoint(&[
            "api",
            "v1",
            "workflows",
            &id.project,
            &id.domain,
            &id.name,
            &id.version,
        ])?;
        self.get_json(url).await
    }

    async fn get_dynamic_node_workflow(
        &self,
        id: &NodeExecutionId,
    ) -> Result<Option<CompiledWorkflow>, AdminError> {
        let exec = &id.execution_id;
        let url = self.endpoint(&[
            "api",
            "v1",
            "node_executions",
            &exec.project,
            &exec.domain,
            &exec.name,
            &id.node_id,
            "dynamic_workflow",
        ])?;
        match self.get_json(url).await {
            Ok(workflow) => Ok(Some(workflow)),
            Err(AdminError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_deck(&self, id: &NodeExecutionId) -> Result<DeckStatus, AdminError> {
        #[derive(Deserialize)]
        struct DeckResponse {
            uri: String,
        }

        let exec = &id.execution_id;
        let url = self.endpoint(&[
            "api",
            "v1",
            "data",
            "node_executions",
            &exec.project,
            &exec.domain,
            &exec.name,
            &id.node_id,
            "deck",
        ])?;
        match self.get_json::<DeckResponse>(url).await {
            Ok(deck) => Ok(DeckStatus::Ready { uri: deck.uri }),
            Err(AdminError::NotFound(_)) => Ok(DeckStatus::NotReady),
            Err(e) => Err(e),
        }
    }
}

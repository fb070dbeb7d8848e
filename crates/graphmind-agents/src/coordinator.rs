//! Agent registry and dispatch (spec.md §4.11).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// An agent's lifecycle state. Built-in agents (see [`crate::entity_search`],
/// [`crate::relationship_analysis`]) are stateless wrappers and report
/// [`AgentState::Ready`] for their whole lifetime; the enum exists so that
/// future, stateful agents have somewhere to report busy/error/shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Initializing,
    Ready,
    Busy,
    Error,
    Shutdown,
}

/// One unit of work offered to the coordinator.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub kind: String,
    pub description: String,
    pub context: HashMap<String, Value>,
}

impl TaskRequest {
    #[must_use]
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: HashMap<String, Value>) -> Self {
        self.context = context;
        self
    }
}

/// The outcome of one [`Agent::execute`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub success: bool,
    pub result: String,
    pub metadata: HashMap<String, Value>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl AgentResult {
    #[must_use]
    pub fn success(result: impl Into<String>, metadata: HashMap<String, Value>) -> Self {
        Self {
            success: true,
            result: result.into(),
            metadata,
            error: None,
            elapsed_ms: 0,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: String::new(),
            metadata: HashMap::new(),
            error: Some(error.into()),
            elapsed_ms: 0,
        }
    }
}

/// A registered worker. Implementors wrap one of the core capabilities (a
/// [`graphmind_search::engine::SearchEngine`], a [`graphmind_core::store::GraphStore`])
/// and declare which task kinds they accept.
#[async_trait]
pub trait Agent: Send + Sync {
    fn id(&self) -> &str;
    fn state(&self) -> AgentState;
    fn can_handle(&self, kind: &str, description: &str) -> bool;
    async fn execute(
        &self,
        kind: &str,
        description: &str,
        context: &HashMap<String, Value>,
    ) -> AgentResult;
}

/// Registry and dispatcher keyed by agent id.
pub struct Coordinator {
    agents: dashmap::DashMap<String, Arc<dyn Agent>>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            agents: dashmap::DashMap::new(),
        }
    }

    pub fn register(&self, agent: Arc<dyn Agent>) {
        debug!(agent_id = %agent.id(), "agent registered");
        self.agents.insert(agent.id().to_string(), agent);
    }

    pub fn unregister(&self, id: &str) {
        self.agents.remove(id);
    }

    #[must_use]
    pub fn agent_ids(&self) -> Vec<String> {
        self.agents.iter().map(|e| e.key().clone()).collect()
    }

    /// Pick the first ready agent that `can_handle`s `request.kind`, run it,
    /// and stamp the elapsed time. Returns a failure result carrying
    /// `no_agent_for_kind` if none matches.
    pub async fn execute_task(&self, request: TaskRequest) -> AgentResult {
        let chosen = self.agents.iter().find_map(|entry| {
            let agent = entry.value();
            (agent.state() == AgentState::Ready && agent.can_handle(&request.kind, &request.description))
                .then(|| Arc::clone(agent))
        });

        let Some(agent) = chosen else {
            warn!(kind = %request.kind, "no agent could handle task");
            return AgentResult::failure("no_agent_for_kind");
        };

        let start = Instant::now();
        let mut result = agent
            .execute(&request.kind, &request.description, &request.context)
            .await;
        result.elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        result
    }

    /// Dispatch every `(id, request)` pair concurrently. A failing task never
    /// cancels the others; its failure is reported in place. The input's
    /// ordering is preserved in the returned `Vec` — `Vec<(String, _)>` is
    /// this coordinator's translation of the spec's "map of id -> TaskRequest"
    /// into an order-preserving Rust collection, since `HashMap` has none.
    pub async fn execute_tasks_parallel(
        &self,
        requests: Vec<(String, TaskRequest)>,
    ) -> Vec<(String, AgentResult)> {
        let futures = requests.into_iter().map(|(id, request)| async move {
            let result = self.execute_task(request).await;
            (id, result)
        });
        futures::future::join_all(futures).await
    }
}

//! The engine facade: wires C1-C11 together from a graph store, an
//! embedding provider and an LLM provider, and exposes the session
//! lifecycle contract from spec.md §6 (`new_session`, `session.ask`,
//! `session.ask_batch`, `session.cancel`, `engine.shutdown`).

use graphmind_agents::coordinator::Coordinator;
use graphmind_agents::entity_search::EntitySearchAgent;
use graphmind_agents::relationship_analysis::RelationshipAnalysisAgent;
use graphmind_core::config::ReasoningConfig;
use graphmind_core::result::ReasoningResult;
use graphmind_core::store::GraphStore;
use graphmind_prompts::registry::PromptRegistry;
use graphmind_providers::cache::CachedEmbeddingProvider;
use graphmind_providers::embedding::EmbeddingProvider;
use graphmind_providers::llm::LlmProvider;
use graphmind_reasoning::reasoner::{Reasoner, SchemaAwareReasoner};
use graphmind_schema::inspector::SchemaInspector;
use graphmind_scheduler::scheduler::Scheduler;
use graphmind_search::basic::BasicSearch;
use graphmind_search::schema_guided::SchemaGuidedSearch;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::config::{EngineConfig, SearchStrategyKind};

/// One question's lifecycle: owns a session id, the shared reasoner and
/// scheduler, and the cancellation token the scheduler issued when the
/// session was registered (spec.md §3 `ReasoningContext` is per-question
/// and lives inside `reasoner.reason`; this handle is the per-*session*
/// wrapper spec.md §6 calls `session`).
pub struct SessionHandle {
    id: String,
    reasoner: Arc<dyn Reasoner>,
    scheduler: Arc<Scheduler>,
    cancellation: CancellationToken,
}

impl SessionHandle {
    /// Answer one question (spec.md §6 `session.ask`).
    pub async fn ask(&self, question: &str) -> ReasoningResult {
        let mut result = self.reasoner.reason(question, &self.id).await;
        if self.cancellation.is_cancelled() {
            result.cancelled = true;
        }
        result
    }

    /// Answer a batch of questions in parallel, preserving input order in
    /// the output (spec.md §6 `session.ask_batch`, testable property: index
    /// correspondence).
    pub async fn ask_batch(&self, questions: &[String]) -> Vec<ReasoningResult> {
        let futures = questions.iter().map(|q| self.ask(q));
        futures::future::join_all(futures).await
    }

    /// Cancel every in-flight task for this session (spec.md §6 `session.cancel`).
    pub fn cancel(&self) {
        self.scheduler.cancel_session(&self.id);
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Owns the shared, process-lifetime resources (schema cache, prompt
/// cache, embedding cache, scheduler) and builds one [`SessionHandle`] per
/// question-answering session. A single long-lived facade owns otherwise-
/// singleton caches so tests stay hermetic (SPEC_FULL.md Design Notes,
/// "Global state").
pub struct Engine<S, E, L> {
    store: Arc<S>,
    embeddings: Arc<CachedEmbeddingProvider<E>>,
    llm: Arc<L>,
    prompts: Arc<PromptRegistry>,
    scheduler: Arc<Scheduler>,
    inspector: Arc<SchemaInspector>,
    coordinator: Arc<Coordinator>,
    config: EngineConfig,
}

impl<S, E, L> Engine<S, E, L>
where
    S: GraphStore + 'static,
    E: EmbeddingProvider + 'static,
    L: LlmProvider + 'static,
{
    /// Build an engine from the three external collaborators spec.md §1
    /// treats as out of scope: a graph store, an embedding provider and an
    /// LLM provider.
    #[must_use]
    pub fn new(store: Arc<S>, embeddings: Arc<E>, llm: Arc<L>, config: EngineConfig) -> Self {
        let cached_embeddings = Arc::new(CachedEmbeddingProvider::new(
            embeddings,
            config.reasoning.embedding_cache_size,
        ));
        let prompts = Arc::new(config.prompt_asset_dir.clone().map_or_else(
            PromptRegistry::in_memory,
            PromptRegistry::new,
        ));
        let scheduler = Arc::new(Scheduler::new(
            config.reasoning.thread_pool_size,
            config.reasoning.io_pool_size,
        ));
        let inspector = Arc::new(SchemaInspector::new(
            Arc::clone(&store) as Arc<dyn GraphStore>,
            config.schema_cache_ttl(),
        ));

        let coordinator = Arc::new(Coordinator::new());
        coordinator.register(Arc::new(EntitySearchAgent::new(
            "entity-search",
            Arc::clone(&store),
            Arc::clone(&cached_embeddings),
        )));
        coordinator.register(Arc::new(RelationshipAnalysisAgent::new(
            "relationship-analysis",
            Arc::clone(&store),
        )));

        info!(
            search_strategy = ?config.search_strategy,
            "graphmind engine initialized",
        );

        Self {
            store,
            embeddings: cached_embeddings,
            llm,
            prompts,
            scheduler,
            inspector,
            coordinator,
            config,
        }
    }

    /// The shared agent coordinator (component C11), exposed so callers can
    /// dispatch ad hoc typed tasks outside the reasoning pipeline proper.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Current scheduler load classification.
    pub async fn load_level(&self) -> graphmind_scheduler::resource_monitor::LoadLevel {
        self.scheduler.load_level().await
    }

    fn build_reasoner(&self, reasoning_config: ReasoningConfig) -> Arc<dyn Reasoner> {
        match self.config.search_strategy {
            SearchStrategyKind::Basic => {
                let search = Arc::new(BasicSearch::new(
                    Arc::clone(&self.store),
                    Arc::clone(&self.embeddings),
                ));
                Arc::new(SchemaAwareReasoner::new(
                    Arc::clone(&self.store),
                    search,
                    Arc::clone(&self.llm),
                    Arc::clone(&self.prompts),
                    Arc::clone(&self.scheduler),
                    Arc::clone(&self.inspector),
                    reasoning_config,
                ))
            }
            SearchStrategyKind::SchemaGuided => {
                let search = Arc::new(SchemaGuidedSearch::new(
                    Arc::clone(&self.store),
                    Arc::clone(&self.embeddings),
                    Arc::clone(&self.inspector),
                ));
                Arc::new(SchemaAwareReasoner::new(
                    Arc::clone(&self.store),
                    search,
                    Arc::clone(&self.llm),
                    Arc::clone(&self.prompts),
                    Arc::clone(&self.scheduler),
                    Arc::clone(&self.inspector),
                    reasoning_config,
                ))
            }
        }
    }

    /// Start a new session using the engine's default [`ReasoningConfig`]
    /// (spec.md §6 `new_session`).
    #[must_use]
    pub fn new_session(&self) -> SessionHandle {
        self.new_session_with_config(self.config.reasoning.clone())
    }

    /// Start a new session with a per-call override of [`ReasoningConfig`],
    /// e.g. a tighter `session_budget_ms` for an interactive caller.
    #[must_use]
    pub fn new_session_with_config(&self, reasoning_config: ReasoningConfig) -> SessionHandle {
        let id = Uuid::new_v4().to_string();
        let cancellation = self.scheduler.register_session(&id);
        let reasoner = self.build_reasoner(reasoning_config);
        info!(session_id = %id, "session started");
        SessionHandle {
            id,
            reasoner,
            scheduler: Arc::clone(&self.scheduler),
            cancellation,
        }
    }

    /// Drain in-flight work within the configured shutdown timeout, then
    /// hard-cancel every remaining session (spec.md §6 `engine.shutdown()`).
    pub async fn shutdown(&self) {
        self.scheduler.shutdown(self.config.shutdown_timeout()).await;
        info!("graphmind engine shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphmind_core::entity::{Entity, Relation};
    use graphmind_core::memory_store::InMemoryGraphStore;
    use graphmind_providers::stub::{StubEmbeddingProvider, StubLlmProvider};

    async fn einstein_store() -> Arc<InMemoryGraphStore> {
        let store = InMemoryGraphStore::new();
        store
            .add_entity(Entity::new("einstein", "Einstein", "Person"))
            .await;
        store
            .add_entity(Entity::new("relativity", "Relativity", "Theory"))
            .await;
        store
            .add_relation(Relation::new("einstein", "relativity", "DEVELOPED"))
            .await;
        Arc::new(store)
    }

    fn engine_config() -> EngineConfig {
        let mut cfg = EngineConfig::default();
        cfg.search_strategy = SearchStrategyKind::Basic;
        cfg
    }

    #[tokio::test]
    async fn ask_single_hop_scenario() {
        let store = einstein_store().await;
        let embeddings = Arc::new(StubEmbeddingProvider::new(8));
        let llm = Arc::new(StubLlmProvider::echo());
        let engine = Engine::new(store, embeddings, llm, engine_config());

        let session = engine.new_session();
        let result = session.ask("Who developed the Theory of Relativity?").await;
        assert!(!result.fallback);
        assert!(result.evidence[0].contains("Einstein -[DEVELOPED]-> Relativity"));
    }

    #[tokio::test]
    async fn ask_batch_preserves_order() {
        let store = einstein_store().await;
        let embeddings = Arc::new(StubEmbeddingProvider::new(8));
        let llm = Arc::new(StubLlmProvider::echo());
        let engine = Engine::new(store, embeddings, llm, engine_config());

        let session = engine.new_session();
        let questions = vec![
            "Who developed the Theory of Relativity?".to_string(),
            "What did Einstein develop?".to_string(),
            "Unrelated question about nothing".to_string(),
        ];
        let results = session.ask_batch(&questions).await;
        assert_eq!(results.len(), 3);
        for (result, question) in results.iter().zip(questions.iter()) {
            assert_eq!(&result.question, question);
        }
    }

    #[tokio::test]
    async fn cancel_marks_subsequent_asks() {
        let store = einstein_store().await;
        let embeddings = Arc::new(StubEmbeddingProvider::new(8));
        let llm = Arc::new(StubLlmProvider::echo());
        let engine = Engine::new(store, embeddings, llm, engine_config());

        let session = engine.new_session();
        session.cancel();
        let result = session.ask("Who developed the Theory of Relativity?").await;
        assert!(result.cancelled);
    }

    #[tokio::test]
    async fn shutdown_drains_without_panicking() {
        let store = einstein_store().await;
        let embeddings = Arc::new(StubEmbeddingProvider::new(8));
        let llm = Arc::new(StubLlmProvider::echo());
        let engine = Engine::new(store, embeddings, llm, engine_config());
        let session = engine.new_session();
        let _ = session.ask("Who developed the Theory of Relativity?").await;
        engine.shutdown().await;
    }
}

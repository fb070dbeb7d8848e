//! End-to-end seed scenarios from spec.md §8, driven through the public
//! [`Engine`]/[`SessionHandle`] surface with a handcrafted in-memory store
//! and deterministic stub providers (scenarios 1, 4, 5 and 6 live as unit
//! tests alongside `Engine` itself; this file covers the remaining
//! multi-hop and relationship-query scenarios).

use graphmind_core::entity::{Entity, Relation};
use graphmind_core::memory_store::InMemoryGraphStore;
use graphmind_engine::config::{EngineConfig, SearchStrategyKind};
use graphmind_engine::engine::Engine;
use graphmind_providers::stub::{StubEmbeddingProvider, StubLlmProvider};
use std::sync::Arc;

fn basic_config() -> EngineConfig {
    let mut cfg = EngineConfig::default();
    cfg.search_strategy = SearchStrategyKind::Basic;
    cfg
}

/// Scenario 2: two-hop with pruning. Einstein developed Relativity, worked
/// at Princeton, which is located in the USA. With `max_reasoning_depth=2`
/// and `search_width=2`, both hops should surface as evidence and
/// "Princeton" should make it into the generated answer text.
#[tokio::test]
async fn two_hop_traversal_surfaces_both_hops() {
    let store = InMemoryGraphStore::new();
    store
        .add_entity(Entity::new("einstein", "Einstein", "Person"))
        .await;
    store
        .add_entity(Entity::new("relativity", "Relativity", "Theory"))
        .await;
    store
        .add_entity(Entity::new("princeton", "Princeton", "Location"))
        .await;
    store
        .add_entity(Entity::new("usa", "USA", "Location"))
        .await;
    store
        .add_relation(Relation::new("einstein", "relativity", "DEVELOPED"))
        .await;
    store
        .add_relation(Relation::new("einstein", "princeton", "WORKED_AT"))
        .await;
    store
        .add_relation(Relation::new("princeton", "usa", "LOCATED_IN"))
        .await;
    let store = Arc::new(store);

    let mut cfg = basic_config();
    cfg.reasoning.max_reasoning_depth = 2;
    cfg.reasoning.search_width = 2;
    // The stub embedding provider hashes text into a pseudo-random vector,
    // so relation-name cosine similarity against the question is not
    // predictable without running the embedder; force every relation to
    // survive scoring so the test exercises pruning/width/depth rather than
    // the (implementation-defined) cosine outcome.
    cfg.reasoning.relation_similarity_threshold = -1.0;

    let embeddings = Arc::new(StubEmbeddingProvider::new(8));
    let llm = Arc::new(StubLlmProvider::echo());
    let engine = Engine::new(store, embeddings, llm, cfg);

    let session = engine.new_session();
    let result = session
        .ask("Where did the developer of Relativity work?")
        .await;

    assert!(!result.fallback);
    let joined = result.evidence.join(" | ");
    assert!(
        joined.contains("Einstein") && joined.contains("Princeton"),
        "expected first hop in evidence, got: {joined}"
    );
    assert!(
        joined.contains("Princeton") && joined.contains("USA"),
        "expected second hop in evidence, got: {joined}"
    );
    assert!(result.answer.contains("Princeton"));
}

/// Scenario 3: relationship query with BFS augmentation. A knows B, B knows
/// C. Asking for the relationship between A and C (schema-guided reasoner,
/// which runs the BFS augmentation step) should produce an
/// `[Indirect Connection]` evidence line noting the 2-hop connection, on
/// top of the ordinary traversal evidence.
#[tokio::test]
async fn relationship_query_adds_indirect_connection_evidence() {
    let store = InMemoryGraphStore::new();
    store.add_entity(Entity::new("a", "A", "Person")).await;
    store.add_entity(Entity::new("b", "B", "Person")).await;
    store.add_entity(Entity::new("c", "C", "Person")).await;
    store.add_relation(Relation::new("a", "b", "KNOWS")).await;
    store.add_relation(Relation::new("b", "c", "KNOWS")).await;
    let store = Arc::new(store);

    let mut cfg = basic_config();
    cfg.reasoning.max_reasoning_depth = 3;
    cfg.reasoning.relation_similarity_threshold = -1.0;

    let embeddings = Arc::new(StubEmbeddingProvider::new(8));
    let llm = Arc::new(StubLlmProvider::new(
        r#"Entities: "A", "C". intent: "relation""#,
    ));
    let engine = Engine::new(store, embeddings, llm, cfg);

    let session = engine.new_session();
    let result = session
        .ask("What is the relationship between A and C?")
        .await;

    assert!(!result.fallback);
    let joined = result.evidence.join(" | ");
    assert!(
        joined.contains("[Indirect Connection]") && joined.contains("2"),
        "expected an indirect-connection evidence line, got: {joined}"
    );
}

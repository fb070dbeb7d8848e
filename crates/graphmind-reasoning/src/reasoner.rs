//! The schema-aware reasoner and its basic-reasoner fallback (spec.md §4.10,
//! component C10), wired together per spec.md §7's degradation policy: the
//! schema-aware reasoner catches every error from its own pipeline and
//! delegates entirely to the basic reasoner, which in turn never fails —
//! its own errors become a non-empty, explanatory [`ReasoningResult`].

use crate::context::ReasoningContext;
use crate::planner::{self, Strategy};
use crate::traversal::MultiHopEngine;
use async_trait::async_trait;
use graphmind_core::config::ReasoningConfig;
use graphmind_core::entity::{Entity, Relation};
use graphmind_core::error::Result;
use graphmind_core::result::{MultiHopResult, ReasoningPath, ReasoningResult, ReasoningStep};
use graphmind_core::schema::GraphSchema;
use graphmind_core::store::GraphStore;
use graphmind_core::task::{Task, TaskKind};
use graphmind_prompts::registry::PromptRegistry;
use graphmind_providers::llm::{GenerationParams, LlmProvider};
use graphmind_schema::inspector::SchemaInspector;
use graphmind_scheduler::scheduler::Scheduler;
use graphmind_search::engine::SearchEngine;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Answers one question end to end, given a session id already registered
/// with the shared [`Scheduler`].
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn reason(&self, question: &str, session_id: &str) -> ReasoningResult;
}

fn quoted_strings_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]+)""#).expect("static regex"))
}

fn intent_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)intent:\s*"([^"]+)""#).expect("static regex"))
}

fn question_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Alphabetic runs (covers both Latin tokens and CJK ideographs, which
    // `\p{L}` matches character-by-character rather than as whole words).
    RE.get_or_init(|| Regex::new(r"\p{L}+").expect("static regex"))
}

/// Keywords that mark a question as asking about a relationship between
/// entities rather than a single lookup (spec.md §4.10 step 5).
const RELATION_KEYWORDS: [&str; 2] = ["关系", "relation"];

/// Maximum BFS depth for the relationship-query indirect-connection sweep.
const RELATIONSHIP_BFS_MAX_DEPTH: u32 = 4;

/// Basic entity/type-confidence heuristic constants (spec.md §4.10 step 3
/// doesn't pin numbers; these are named, not inlined, per the same
/// resolution pattern as the traversal and planner modules).
const BASE_ENTITY_CONFIDENCE: f64 = 0.5;
const LENGTH_BONUS_PER_WORD: f64 = 0.05;
const MAX_LENGTH_BONUS: f64 = 0.2;
const POSITION_BONUS: f64 = 0.1;
const TYPED_BONUS: f64 = 0.15;

/// One entity candidate extracted from a question, with its inferred type
/// and recommended search properties.
#[derive(Debug, Clone)]
struct ExtractedEntity {
    text: String,
    inferred_type: String,
    confidence: f64,
    recommended_properties: Vec<String>,
}

/// The lowest-common-denominator reasoner: entity search plus canonical
/// multi-hop traversal, with no schema guidance. Used standalone and as the
/// schema-aware reasoner's fallback target.
pub struct BasicReasoner<S, Search, L> {
    store: Arc<S>,
    search: Arc<Search>,
    llm: Arc<L>,
    prompts: Arc<PromptRegistry>,
    scheduler: Arc<Scheduler>,
    config: ReasoningConfig,
}

impl<S, Search, L> BasicReasoner<S, Search, L>
where
    S: GraphStore + 'static,
    Search: SearchEngine + 'static,
    L: LlmProvider + 'static,
{
    #[must_use]
    pub fn new(
        store: Arc<S>,
        search: Arc<Search>,
        llm: Arc<L>,
        prompts: Arc<PromptRegistry>,
        scheduler: Arc<Scheduler>,
        config: ReasoningConfig,
    ) -> Self {
        Self {
            store,
            search,
            llm,
            prompts,
            scheduler,
            config,
        }
    }

    async fn generate_answer(
        &self,
        question: &str,
        entities: &[Entity],
        multi_hop: &MultiHopResult,
        relation_types: &[String],
        intent: &str,
    ) -> String {
        if !self.llm.available().await {
            let summary: Vec<String> = multi_hop
                .paths
                .iter()
                .take(3)
                .map(ReasoningPath::description)
                .collect();
            return format!(
                "LLM unavailable; top evidence: {}",
                if summary.is_empty() {
                    "none".to_string()
                } else {
                    summary.join("; ")
                }
            );
        }

        let mut values = HashMap::new();
        values.insert("question".to_string(), question.to_string());
        values.insert(
            "entities".to_string(),
            entities
                .iter()
                .map(|e| format!("{} ({})", e.name, e.entity_type))
                .collect::<Vec<_>>()
                .join(", "),
        );
        values.insert("relation_types".to_string(), relation_types.join(", "));
        values.insert("intent".to_string(), intent.to_string());
        values.insert(
            "evidence".to_string(),
            multi_hop
                .paths
                .iter()
                .flat_map(|p| p.steps.iter().map(ReasoningStep::evidence_line))
                .collect::<Vec<_>>()
                .join("\n"),
        );

        let prompt = match self.prompts.render("answer-generation", &values) {
            Ok(p) => p,
            Err(e) => return format!("unable to render answer prompt: {e}"),
        };

        let params = GenerationParams {
            temperature: self.config.llm_temperature,
            max_tokens: self.config.llm_max_tokens,
        };
        match self.llm.generate(&prompt, &params).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "answer generation failed, falling back to evidence summary");
                let summary: Vec<String> = multi_hop
                    .paths
                    .iter()
                    .take(3)
                    .map(ReasoningPath::description)
                    .collect();
                format!(
                    "Unable to generate a narrative answer; top evidence: {}",
                    if summary.is_empty() { "none".to_string() } else { summary.join("; ") }
                )
            }
        }
    }
}

#[async_trait]
impl<S, Search, L> Reasoner for BasicReasoner<S, Search, L>
where
    S: GraphStore + 'static,
    Search: SearchEngine + 'static,
    L: LlmProvider + 'static,
{
    async fn reason(&self, question: &str, session_id: &str) -> ReasoningResult {
        if question.trim().is_empty() {
            return ReasoningResult {
                question: question.to_string(),
                answer: "the question was empty".to_string(),
                steps: Vec::new(),
                evidence: Vec::new(),
                confidence: None,
                path_scores: Vec::new(),
                cancelled: false,
                fallback: true,
            };
        }

        let ctx = ReasoningContext::new(question, self.config.clone());

        let search = Arc::clone(&self.search);
        let question_owned = question.to_string();
        let search_task = Task::new(
            format!("{session_id}-entity-search"),
            TaskKind::EntityIdentification,
            0,
            self.config.session_budget(),
        );
        let scored = self
            .scheduler
            .submit(search_task, session_id, move || async move {
                search.search_entities(&question_owned, 10).await
            })
            .await;

        let start_entities: Vec<Entity> = match scored {
            Ok(scored) => scored
                .into_iter()
                .filter(|(_, score)| *score >= self.config.entity_similarity_threshold)
                .map(|(e, _)| e)
                .collect(),
            Err(e) => {
                debug!(error = %e, "entity search failed in basic reasoner");
                Vec::new()
            }
        };

        if start_entities.is_empty() {
            return ReasoningResult {
                question: question.to_string(),
                answer: "No relevant entities were found for this question.".to_string(),
                steps: Vec::new(),
                evidence: Vec::new(),
                confidence: None,
                path_scores: Vec::new(),
                cancelled: false,
                fallback: true,
            };
        }

        let engine = MultiHopEngine::new(Arc::clone(&self.store), Arc::clone(&self.search));
        let multi_hop = match engine
            .traverse(question, start_entities.clone(), &self.config, &ctx)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "traversal failed in basic reasoner");
                MultiHopResult {
                    question: question.to_string(),
                    paths: Vec::new(),
                    explored_entities: ctx.explored_entities(),
                }
            }
        };

        let relation_types: Vec<String> = {
            let mut set: Vec<String> = multi_hop
                .paths
                .iter()
                .flat_map(|p| p.steps.iter().map(|s| s.relation_type.clone()))
                .collect();
            set.sort_unstable();
            set.dedup();
            set
        };

        let answer = self
            .generate_answer(question, &start_entities, &multi_hop, &relation_types, "lookup")
            .await;

        ReasoningResult {
            question: question.to_string(),
            answer,
            steps: ctx.steps(),
            evidence: ctx.evidence_lines(),
            confidence: Some(ctx.confidence()),
            path_scores: multi_hop.paths.iter().map(|p| p.final_score).collect(),
            cancelled: false,
            fallback: false,
        }
    }
}

/// The richer, schema-guided reasoner: LLM-driven entity/relationship
/// extraction, schema-aware type inference, and relationship-query BFS
/// augmentation, falling back to [`BasicReasoner`] on any internal error or
/// unavailable schema.
pub struct SchemaAwareReasoner<S, Search, L> {
    store: Arc<S>,
    search: Arc<Search>,
    llm: Arc<L>,
    prompts: Arc<PromptRegistry>,
    scheduler: Arc<Scheduler>,
    inspector: Arc<SchemaInspector>,
    config: ReasoningConfig,
    fallback: Arc<BasicReasoner<S, Search, L>>,
}

impl<S, Search, L> SchemaAwareReasoner<S, Search, L>
where
    S: GraphStore + 'static,
    Search: SearchEngine + 'static,
    L: LlmProvider + 'static,
{
    #[must_use]
    pub fn new(
        store: Arc<S>,
        search: Arc<Search>,
        llm: Arc<L>,
        prompts: Arc<PromptRegistry>,
        scheduler: Arc<Scheduler>,
        inspector: Arc<SchemaInspector>,
        config: ReasoningConfig,
    ) -> Self {
        let fallback = Arc::new(BasicReasoner::new(
            Arc::clone(&store),
            Arc::clone(&search),
            Arc::clone(&llm),
            Arc::clone(&prompts),
            Arc::clone(&scheduler),
            config.clone(),
        ));
        Self {
            store,
            search,
            llm,
            prompts,
            scheduler,
            inspector,
            config,
            fallback,
        }
    }

    fn schema_context(schema: &GraphSchema) -> String {
        let nodes: Vec<String> = schema.node_types.iter().map(|n| n.label.clone()).collect();
        let relations: Vec<String> = schema
            .relationship_types
            .iter()
            .map(|r| r.relation_type.clone())
            .collect();
        format!("Node types: {}\nRelationship types: {}", nodes.join(", "), relations.join(", "))
    }

    /// Parse the entity-extraction LLM response tolerantly: every quoted
    /// string is either a known relation type or an entity candidate, plus
    /// an optional `intent: "..."` hint line (spec.md §4.10 step 2).
    fn parse_extraction_response(response: &str, schema: &GraphSchema) -> (Vec<String>, Vec<String>, Option<String>) {
        let relation_labels: HashSet<&str> = schema
            .relationship_types
            .iter()
            .map(|r| r.relation_type.as_str())
            .collect();

        let mut entities = Vec::new();
        let mut relations = Vec::new();
        for cap in quoted_strings_regex().captures_iter(response) {
            let value = cap[1].to_string();
            if relation_labels.contains(value.as_str()) {
                relations.push(value);
            } else {
                entities.push(value);
            }
        }

        let intent = intent_line_regex()
            .captures(response)
            .map(|c| c[1].to_string());

        (entities, relations, intent)
    }

    /// Question-side extraction: alphabetic tokens not in the schema's
    /// stop-word list (spec.md §4.10 step 2's "augment with question-side
    /// extraction", generalized away from the source's Chinese-specific
    /// regex to any schema-driven stop-word list — SPEC_FULL.md's Open
    /// Questions resolution).
    fn extract_question_tokens(question: &str, schema: &GraphSchema) -> Vec<String> {
        question_token_regex()
            .find_iter(question)
            .map(|m| m.as_str().to_string())
            .filter(|token| token.chars().count() > 1 && !schema.is_stop_word(token))
            .collect()
    }

    /// Infer an entity's type: first via the schema's extraction patterns
    /// matched against `question`, then schema label substring match, else
    /// `"ANY"` (spec.md §4.10 step 3).
    fn infer_entity_type(text: &str, question: &str, schema: &GraphSchema) -> String {
        if let Some(pattern_type) = Self::infer_type_from_patterns(text, question, schema) {
            return pattern_type;
        }
        let lower = text.to_lowercase();
        schema
            .node_types
            .iter()
            .find(|n| lower.contains(&n.label.to_lowercase()) || n.label.to_lowercase().contains(&lower))
            .map_or_else(|| "ANY".to_string(), |n| n.label.clone())
    }

    /// Match `question` against each schema extraction pattern's two capture
    /// groups (subject, object). If `text` is the subject of a match, the
    /// object names the type when it lines up with a known node label.
    fn infer_type_from_patterns(text: &str, question: &str, schema: &GraphSchema) -> Option<String> {
        let lower_text = text.to_lowercase();
        for extraction_pattern in &schema.extraction_patterns {
            let Ok(re) = Regex::new(&extraction_pattern.pattern) else {
                continue;
            };
            for cap in re.captures_iter(question) {
                let (Some(subject), Some(object)) = (cap.get(1), cap.get(2)) else {
                    continue;
                };
                if subject.as_str().to_lowercase() != lower_text {
                    continue;
                }
                let object_lower = object.as_str().to_lowercase();
                if let Some(node_type) = schema.node_types.iter().find(|n| {
                    let label_lower = n.label.to_lowercase();
                    object_lower.contains(&label_lower) || label_lower.contains(&object_lower)
                }) {
                    return Some(node_type.label.clone());
                }
            }
        }
        None
    }

    fn build_extracted_entities(raw: &[String], question: &str, schema: &GraphSchema) -> Vec<ExtractedEntity> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for text in raw {
            if !seen.insert(text.to_lowercase()) {
                continue;
            }
            let inferred_type = Self::infer_entity_type(text, question, schema);
            let word_count = text.split_whitespace().count();
            let length_bonus = (word_count as f64 * LENGTH_BONUS_PER_WORD).min(MAX_LENGTH_BONUS);
            let position_bonus = if question.to_lowercase().find(&text.to_lowercase()) == Some(0) {
                POSITION_BONUS
            } else {
                0.0
            };
            let typed_bonus = if inferred_type == "ANY" { 0.0 } else { TYPED_BONUS };
            let confidence = (BASE_ENTITY_CONFIDENCE + length_bonus + position_bonus + typed_bonus).min(1.0);
            let recommended_properties = schema
                .node_type(&inferred_type)
                .map(|n| {
                    let mut props: Vec<String> = n.properties.keys().cloned().collect();
                    props.sort_unstable();
                    props
                })
                .unwrap_or_default();

            out.push(ExtractedEntity {
                text: text.clone(),
                inferred_type,
                confidence,
                recommended_properties,
            });
        }
        out
    }

    /// Bounded BFS for the relationship-query augmentation, returning the
    /// chain of `(source, relation, target)` hops if a path within
    /// `max_depth` exists.
    async fn bfs_path(&self, from: &Entity, to: &Entity, max_depth: u32) -> Option<Vec<(Entity, Relation, Entity)>> {
        if from.id == to.id {
            return Some(Vec::new());
        }
        let mut visited: HashSet<String> = HashSet::from([from.id.clone()]);
        let mut parent: HashMap<String, (Entity, Relation, Entity)> = HashMap::new();
        let mut frontier = vec![from.clone()];

        for _ in 0..max_depth {
            if frontier.is_empty() {
                break;
            }
            let mut next_frontier = Vec::new();
            for entity in &frontier {
                let relations = self.store.entity_relations(&entity.id).await.unwrap_or_default();
                for relation in relations {
                    let Some(other_id) = relation.other_endpoint(&entity.id) else {
                        continue;
                    };
                    if visited.contains(other_id) {
                        continue;
                    }
                    let Ok(Some(other)) = self.store.find_entity(other_id).await else {
                        continue;
                    };
                    visited.insert(other.id.clone());
                    parent.insert(other.id.clone(), (entity.clone(), relation.clone(), other.clone()));
                    if other.id == to.id {
                        return Some(Self::reconstruct_bfs_path(&parent, &other));
                    }
                    next_frontier.push(other);
                }
            }
            frontier = next_frontier;
        }
        None
    }

    fn reconstruct_bfs_path(
        parent: &HashMap<String, (Entity, Relation, Entity)>,
        end: &Entity,
    ) -> Vec<(Entity, Relation, Entity)> {
        let mut chain = Vec::new();
        let mut current_id = end.id.clone();
        while let Some((source, relation, target)) = parent.get(&current_id) {
            chain.push((source.clone(), relation.clone(), target.clone()));
            current_id = source.id.clone();
        }
        chain.reverse();
        chain
    }

    /// The full schema-aware pipeline; any error here triggers delegation
    /// to [`BasicReasoner`] in [`Self::reason`].
    async fn reason_inner(&self, question: &str, session_id: &str) -> Result<ReasoningResult> {
        let schema = self.inspector.schema().await?;
        let ctx = ReasoningContext::new(question, self.config.clone());

        // C7: plan the canonical step DAG and pick a dispatch strategy
        // before submitting anything to the scheduler (spec.md §2's
        // dataflow: "... plans via C7 -> submits tasks to C8").
        let query_plan = planner::plan(question, &schema);
        debug!(
            strategy = ?query_plan.strategy,
            intent = %query_plan.intent,
            steps = query_plan.steps.len(),
            "query plan computed",
        );

        let mut values = HashMap::new();
        values.insert("schema_context".to_string(), Self::schema_context(&schema));
        values.insert("question".to_string(), question.to_string());
        let extraction_prompt = self.prompts.render("entity-extraction", &values)?;

        let llm = Arc::clone(&self.llm);
        let prompt_owned = extraction_prompt.clone();
        let extraction_task = Task::new(
            format!("{session_id}-entity-extraction"),
            TaskKind::LlmGeneration,
            0,
            self.config.session_budget(),
        );
        let extraction_response = self
            .scheduler
            .submit(extraction_task, session_id, move || async move {
                llm.generate(
                    &prompt_owned,
                    &GenerationParams {
                        temperature: 0.1,
                        max_tokens: self.config.llm_max_tokens,
                    },
                )
                .await
            })
            .await
            .unwrap_or_default();

        let (mut raw_entities, relation_hints, intent_hint) =
            Self::parse_extraction_response(&extraction_response, &schema);
        raw_entities.extend(Self::extract_question_tokens(question, &schema));

        let extracted = Self::build_extracted_entities(&raw_entities, question, &schema);
        info!(found = extracted.len(), "entities extracted from question");

        let search = Arc::clone(&self.search);
        let eligible: Vec<ExtractedEntity> = extracted
            .iter()
            .filter(|c| c.confidence >= self.config.confidence_threshold)
            .cloned()
            .collect();

        let build_search_task = |candidate: &ExtractedEntity| {
            let search = Arc::clone(&search);
            let text = candidate.text.clone();
            let entity_task = Task::new(
                format!("{session_id}-entity-search-{}", candidate.text),
                TaskKind::EntityIdentification,
                0,
                self.config.session_budget(),
            );
            (entity_task, move || async move { search.search_entities(&text, 10).await })
        };

        // Entity-search steps are mutually independent (spec.md §4.7's DAG
        // has a single `entity_identification` node feeding everything
        // downstream), so a `Parallel`/`Adaptive` plan fans them out
        // through C8's order-preserving batch submission; a `Sequential`
        // plan runs them one at a time.
        let scored_batches: Vec<Vec<(Entity, f64)>> = if query_plan.strategy == Strategy::Sequential {
            let mut out = Vec::with_capacity(eligible.len());
            for candidate in &eligible {
                let (task, work) = build_search_task(candidate);
                out.push(self.scheduler.submit(task, session_id, work).await.unwrap_or_default());
            }
            out
        } else {
            let batch: Vec<_> = eligible.iter().map(|c| build_search_task(c)).collect();
            self.scheduler
                .submit_batch(batch, session_id)
                .await
                .into_iter()
                .map(std::result::Result::unwrap_or_default)
                .collect()
        };

        let mut start_entities: Vec<Entity> = Vec::new();
        let mut seen_ids = HashSet::new();
        for scored in scored_batches {
            for (entity, score) in scored {
                if score < self.config.entity_similarity_threshold {
                    continue;
                }
                if seen_ids.insert(entity.id.clone()) {
                    start_entities.push(entity);
                }
            }
        }

        if start_entities.is_empty() {
            return Ok(ReasoningResult {
                question: question.to_string(),
                answer: "No relevant entities were found for this question.".to_string(),
                steps: Vec::new(),
                evidence: Vec::new(),
                confidence: None,
                path_scores: Vec::new(),
                cancelled: false,
                fallback: true,
            });
        }

        let engine = MultiHopEngine::new(Arc::clone(&self.store), Arc::clone(&self.search));
        let entities_for_traversal = start_entities.clone();
        let question_owned = question.to_string();
        let traversal_task = Task::new(
            format!("{session_id}-traversal"),
            TaskKind::GraphTraversal,
            0,
            self.config.session_budget(),
        );
        let engine_ref = &engine;
        let ctx_ref = &ctx;
        let config_ref = &self.config;
        let multi_hop = self
            .scheduler
            .submit(traversal_task, session_id, move || async move {
                engine_ref
                    .traverse(&question_owned, entities_for_traversal, config_ref, ctx_ref)
                    .await
            })
            .await
            .unwrap_or_else(|_| MultiHopResult {
                question: question.to_string(),
                paths: Vec::new(),
                explored_entities: start_entities.len(),
            });

        let is_relationship_question = RELATION_KEYWORDS.iter().any(|kw| question.contains(kw));
        if is_relationship_question && start_entities.len() >= 2 {
            for i in 0..start_entities.len() {
                for j in (i + 1)..start_entities.len() {
                    if let Some(chain) = self
                        .bfs_path(&start_entities[i], &start_entities[j], RELATIONSHIP_BFS_MAX_DEPTH)
                        .await
                    {
                        if chain.is_empty() {
                            continue;
                        }
                        let steps: Vec<ReasoningStep> = chain
                            .iter()
                            .enumerate()
                            .map(|(depth, (source, relation, target))| ReasoningStep {
                                source_id: source.id.clone(),
                                source_name: source.name.clone(),
                                relation_type: relation.relation_type.clone(),
                                target_id: target.id.clone(),
                                target_name: target.name.clone(),
                                score: 0.5,
                                depth: depth as u32,
                                confidence: 0.5 / (depth as f64 + 1.0),
                                rationale: "indirect connection discovered by BFS".to_string(),
                                timestamp: chrono::Utc::now(),
                            })
                            .collect();
                        let path = ReasoningPath::new(steps.clone(), 0.5);
                        let hop_count = steps.len();
                        ctx.add_indirect_evidence(
                            format!(
                                "[Indirect Connection] {} 与 {} 通过 {} 跳连接",
                                start_entities[i].name,
                                start_entities[j].name,
                                hop_count
                            ),
                            0.5,
                            hop_count as u32,
                        );
                        ctx.add_indirect_evidence(path.description(), 0.5, hop_count as u32);
                    }
                }
            }
        }

        // Prefer whatever the LLM's extraction response told us; fall back
        // to the planner's own pre-LLM classification (C7's `infer_intent`)
        // rather than re-deriving it ad hoc here.
        let intent = intent_hint.unwrap_or(query_plan.intent);

        let mut relation_types: Vec<String> = relation_hints;
        relation_types.extend(
            multi_hop
                .paths
                .iter()
                .flat_map(|p| p.steps.iter().map(|s| s.relation_type.clone())),
        );
        relation_types.sort_unstable();
        relation_types.dedup();

        let mut answer_values = HashMap::new();
        answer_values.insert("question".to_string(), question.to_string());
        answer_values.insert(
            "entities".to_string(),
            start_entities
                .iter()
                .map(|entity| {
                    let recommended = extracted
                        .iter()
                        .find(|c| entity.name.to_lowercase().contains(&c.text.to_lowercase()))
                        .map(|c| c.recommended_properties.as_slice())
                        .unwrap_or(&[]);
                    let shown: Vec<String> = recommended
                        .iter()
                        .take(3)
                        .filter_map(|p| entity.property_str(p).map(|v| format!("{p}={v}")))
                        .collect();
                    if shown.is_empty() {
                        format!("{} ({})", entity.name, entity.entity_type)
                    } else {
                        format!("{} ({}) [{}]", entity.name, entity.entity_type, shown.join(", "))
                    }
                })
                .collect::<Vec<_>>()
                .join(", "),
        );
        answer_values.insert("relation_types".to_string(), relation_types.join(", "));
        answer_values.insert("intent".to_string(), intent.clone());
        let mut evidence_lines = ctx.evidence_lines();
        evidence_lines.extend(
            multi_hop
                .paths
                .iter()
                .flat_map(|p| p.steps.iter().map(ReasoningStep::evidence_line)),
        );
        answer_values.insert("evidence".to_string(), evidence_lines.join("\n"));

        let answer_prompt = self.prompts.render("answer-generation", &answer_values)?;
        let answer = if self.llm.available().await {
            let llm = Arc::clone(&self.llm);
            let params = GenerationParams {
                temperature: self.config.llm_temperature,
                max_tokens: self.config.llm_max_tokens,
            };
            let answer_task = Task::new(
                format!("{session_id}-answer-generation"),
                TaskKind::AnswerGeneration,
                0,
                self.config.session_budget(),
            );
            self.scheduler
                .submit(answer_task, session_id, move || async move { llm.generate(&answer_prompt, &params).await })
                .await
                .unwrap_or_else(|e| format!("unable to generate answer: {e}"))
        } else {
            let summary: Vec<String> = multi_hop.paths.iter().take(3).map(ReasoningPath::description).collect();
            format!(
                "LLM unavailable; top evidence: {}",
                if summary.is_empty() { "none".to_string() } else { summary.join("; ") }
            )
        };

        // `multi_hop.paths` is reconstructed entirely from steps already
        // recorded in `ctx` (see `traversal::build_paths`), so `ctx.steps()`
        // alone already carries every unique (source, relation, target)
        // triple — extending with the path steps would duplicate each one.
        Ok(ReasoningResult {
            question: question.to_string(),
            answer,
            steps: ctx.steps(),
            evidence: ctx.evidence_lines(),
            confidence: Some(ctx.confidence()),
            path_scores: multi_hop.paths.iter().map(|p| p.final_score).collect(),
            cancelled: false,
            fallback: false,
        })
    }
}

#[async_trait]
impl<S, Search, L> Reasoner for SchemaAwareReasoner<S, Search, L>
where
    S: GraphStore + 'static,
    Search: SearchEngine + 'static,
    L: LlmProvider + 'static,
{
    async fn reason(&self, question: &str, session_id: &str) -> ReasoningResult {
        if question.trim().is_empty() {
            return ReasoningResult {
                question: question.to_string(),
                answer: "the question was empty".to_string(),
                steps: Vec::new(),
                evidence: Vec::new(),
                confidence: None,
                path_scores: Vec::new(),
                cancelled: false,
                fallback: true,
            };
        }

        match self.reason_inner(question, session_id).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "schema-aware reasoner failed, delegating to basic reasoner");
                self.fallback.reason(question, session_id).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphmind_core::memory_store::InMemoryGraphStore;
    use graphmind_providers::stub::{StubEmbeddingProvider, StubLlmProvider};
    use graphmind_search::basic::BasicSearch;

    async fn einstein_store() -> Arc<InMemoryGraphStore> {
        let store = InMemoryGraphStore::new();
        store.add_entity(Entity::new("einstein", "Einstein", "Person")).await;
        store.add_entity(Entity::new("relativity", "Relativity", "Theory")).await;
        store
            .add_relation(Relation::new("einstein", "relativity", "DEVELOPED"))
            .await;
        Arc::new(store)
    }

    #[tokio::test]
    async fn basic_reasoner_single_hop_scenario() {
        let store = einstein_store().await;
        let embeddings = Arc::new(StubEmbeddingProvider::new(8));
        let search = Arc::new(BasicSearch::new(store.clone(), embeddings));
        let llm = Arc::new(StubLlmProvider::echo());
        let prompts = Arc::new(PromptRegistry::in_memory());
        let scheduler = Arc::new(Scheduler::new(2, 2));
        scheduler.register_session("s1");

        let reasoner = BasicReasoner::new(store, search, llm, prompts, scheduler, ReasoningConfig::default());
        let result = reasoner.reason("Who developed the Theory of Relativity?", "s1").await;

        assert!(!result.fallback);
        assert_eq!(result.evidence.len(), 1);
        assert!(result.evidence[0].contains("Einstein -[DEVELOPED]-> Relativity"));
    }

    #[tokio::test]
    async fn basic_reasoner_empty_question_is_fallback() {
        let store = einstein_store().await;
        let embeddings = Arc::new(StubEmbeddingProvider::new(8));
        let search = Arc::new(BasicSearch::new(store.clone(), embeddings));
        let llm = Arc::new(StubLlmProvider::echo());
        let prompts = Arc::new(PromptRegistry::in_memory());
        let scheduler = Arc::new(Scheduler::new(1, 1));
        scheduler.register_session("s1");

        let reasoner = BasicReasoner::new(store, search, llm, prompts, scheduler, ReasoningConfig::default());
        let result = reasoner.reason("   ", "s1").await;
        assert!(result.fallback);
        assert!(result.evidence.is_empty());
    }

    #[tokio::test]
    async fn basic_reasoner_no_entities_degrades_gracefully() {
        let store = Arc::new(InMemoryGraphStore::new());
        let embeddings = Arc::new(StubEmbeddingProvider::new(8));
        let search = Arc::new(BasicSearch::new(store.clone(), embeddings));
        let llm = Arc::new(StubLlmProvider::echo());
        let prompts = Arc::new(PromptRegistry::in_memory());
        let scheduler = Arc::new(Scheduler::new(1, 1));
        scheduler.register_session("s1");

        let reasoner = BasicReasoner::new(store, search, llm, prompts, scheduler, ReasoningConfig::default());
        let result = reasoner.reason("Who discovered gravity?", "s1").await;
        assert!(result.fallback);
        assert!(result.evidence.is_empty());
    }

    #[tokio::test]
    async fn schema_fallback_still_produces_an_answer() {
        let store: Arc<InMemoryGraphStore> = Arc::new(InMemoryGraphStore::rejecting_enumeration());
        store.add_entity(Entity::new("einstein", "Einstein", "Person")).await;
        let embeddings = Arc::new(StubEmbeddingProvider::new(8));
        let search = Arc::new(BasicSearch::new(store.clone(), embeddings));
        let llm = Arc::new(StubLlmProvider::echo());
        let prompts = Arc::new(PromptRegistry::in_memory());
        let scheduler = Arc::new(Scheduler::new(2, 2));
        scheduler.register_session("s1");
        let inspector = Arc::new(SchemaInspector::new(store.clone(), Duration::from_secs(60)));

        let reasoner =
            SchemaAwareReasoner::new(store, search, llm, prompts, scheduler, inspector, ReasoningConfig::default());
        let result = reasoner.reason("Who is Einstein?", "s1").await;
        assert!(!result.answer.is_empty());
    }

    #[tokio::test]
    async fn schema_aware_reasoner_does_not_duplicate_steps() {
        let store = einstein_store().await;
        let embeddings = Arc::new(StubEmbeddingProvider::new(8));
        let search = Arc::new(BasicSearch::new(store.clone(), embeddings));
        let llm = Arc::new(StubLlmProvider::echo());
        let prompts = Arc::new(PromptRegistry::in_memory());
        let scheduler = Arc::new(Scheduler::new(2, 2));
        scheduler.register_session("s1");
        let inspector = Arc::new(SchemaInspector::new(store.clone(), Duration::from_secs(60)));
        let mut config = ReasoningConfig::default();
        config.relation_similarity_threshold = -1.0;

        let reasoner = SchemaAwareReasoner::new(store, search, llm, prompts, scheduler, inspector, config);
        let result = reasoner.reason("Who developed the Theory of Relativity?", "s1").await;

        assert!(!result.fallback);
        assert_eq!(result.steps.len(), 1, "steps: {:?}", result.steps);
        assert!(result.steps[0].evidence_line().contains("Einstein -[DEVELOPED]-> Relativity"));
    }

    #[tokio::test]
    async fn schema_aware_reasoner_fans_out_entity_search_under_a_larger_schema() {
        // Five distinct node types push `planner::select_strategy` off the
        // `Sequential` branch, so this exercises the `submit_batch` fan-out
        // path in `reason_inner` rather than the one-at-a-time loop.
        let store = InMemoryGraphStore::new();
        store.add_entity(Entity::new("einstein", "Einstein", "Person")).await;
        store.add_entity(Entity::new("relativity", "Relativity", "Theory")).await;
        store.add_entity(Entity::new("princeton", "Princeton", "Location")).await;
        store.add_entity(Entity::new("ias", "IAS", "Organization")).await;
        store.add_entity(Entity::new("usa", "USA", "Country")).await;
        store
            .add_relation(Relation::new("einstein", "relativity", "DEVELOPED"))
            .await;
        let store = Arc::new(store);

        let embeddings = Arc::new(StubEmbeddingProvider::new(8));
        let search = Arc::new(BasicSearch::new(store.clone(), embeddings));
        let llm = Arc::new(StubLlmProvider::echo());
        let prompts = Arc::new(PromptRegistry::in_memory());
        let scheduler = Arc::new(Scheduler::new(2, 2));
        scheduler.register_session("s1");
        let inspector = Arc::new(SchemaInspector::new(store.clone(), Duration::from_secs(60)));
        let mut config = ReasoningConfig::default();
        config.relation_similarity_threshold = -1.0;

        let schema = inspector.schema().await.unwrap();
        assert_ne!(planner::plan("Who developed the Theory of Relativity?", &schema).strategy, Strategy::Sequential);

        let reasoner = SchemaAwareReasoner::new(store, search, llm, prompts, scheduler, inspector, config);
        let result = reasoner.reason("Who developed the Theory of Relativity?", "s1").await;

        assert!(!result.fallback);
        assert!(result.evidence.iter().any(|e| e.contains("Einstein -[DEVELOPED]-> Relativity")));
    }

    #[test]
    fn infer_entity_type_falls_back_to_any() {
        let schema = GraphSchema::degenerate();
        assert_eq!(
            SchemaAwareReasoner::<InMemoryGraphStore, BasicSearch<InMemoryGraphStore, StubEmbeddingProvider>, StubLlmProvider>::infer_entity_type(
                "Einstein", "Who is Einstein?", &schema
            ),
            "ANY"
        );
    }

    #[test]
    fn infer_entity_type_matches_extraction_pattern_before_substring() {
        let mut schema = GraphSchema::degenerate();
        schema.node_types.push(graphmind_core::schema::NodeTypeInfo {
            label: "Physicist".to_string(),
            approximate_count: 0,
            properties: HashMap::new(),
        });
        schema.extraction_patterns.push(graphmind_core::schema::ExtractionPattern {
            name: "is_a".to_string(),
            pattern: r"(\w+) is a (\w+)".to_string(),
            relation_type: "IS_A".to_string(),
        });

        let inferred = SchemaAwareReasoner::<
            InMemoryGraphStore,
            BasicSearch<InMemoryGraphStore, StubEmbeddingProvider>,
            StubLlmProvider,
        >::infer_entity_type("Einstein", "Einstein is a Physicist", &schema);
        assert_eq!(inferred, "Physicist");
    }

    #[test]
    fn parse_extraction_response_splits_entities_and_relations() {
        let schema = GraphSchema {
            node_types: Vec::new(),
            relationship_types: vec![graphmind_core::schema::RelationshipTypeInfo {
                relation_type: "DEVELOPED".to_string(),
                total_count: 0,
                patterns: Vec::new(),
                properties: HashMap::new(),
            }],
            index_suggestions: Vec::new(),
            stop_words: Vec::new(),
            relation_weights: Vec::new(),
            extraction_patterns: Vec::new(),
        };
        let response = r#"Entities: "Einstein", "Relativity". Relation: "DEVELOPED". intent: "lookup""#;
        let (entities, relations, intent) = SchemaAwareReasoner::<
            InMemoryGraphStore,
            BasicSearch<InMemoryGraphStore, StubEmbeddingProvider>,
            StubLlmProvider,
        >::parse_extraction_response(response, &schema);
        assert_eq!(entities, vec!["Einstein".to_string(), "Relativity".to_string()]);
        assert_eq!(relations, vec!["DEVELOPED".to_string()]);
        assert_eq!(intent, Some("lookup".to_string()));
    }
}

mod config;
pub mod bracket;
pub mod comparison;
pub mod identity;
pub mod manual;
pub mod normalize;
pub mod records;
pub mod session;
pub mod store;
pub mod topics;

use log::info;
use std::sync::Arc;

pub use crate::bracket::{
    build_rounds, choose_winner, Decisions, DragSource, DropRejected, DropTarget,
};
pub use crate::config::*;
pub use crate::records::{CandidateRecord, Dataset, ProposalRecord, TopicRecord};
pub use crate::session::{ComparisonRequest, TournamentSession};
pub use crate::store::{DocumentStore, MemoryStore, StoreError};

/// Entry point for the server side of the comparison: topic resolution and
/// candidate comparison against one document store.
///
/// ```
/// use compare_engine::{CompareEngine, Dataset, EngineRules, MemoryStore};
/// # use compare_engine::EngineError;
///
/// let store = MemoryStore::new(Dataset::default());
/// let engine = CompareEngine::new(store, &EngineRules::DEFAULT_RULES);
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// let topics = rt.block_on(engine.resolve_topics("E1"))?;
/// assert!(topics.is_empty());
/// # Ok::<(), EngineError>(())
/// ```
#[derive(Clone)]
pub struct CompareEngine {
    store: Arc<dyn DocumentStore>,
    rules: EngineRules,
}

impl CompareEngine {
    pub fn new<S: DocumentStore>(store: S, rules: &EngineRules) -> CompareEngine {
        CompareEngine::from_shared(Arc::new(store), rules)
    }

    pub fn from_shared(store: Arc<dyn DocumentStore>, rules: &EngineRules) -> CompareEngine {
        info!(
            "CompareEngine: {} store, rules: {:?}",
            store.backend_tag(),
            rules
        );
        CompareEngine {
            store,
            rules: rules.clone(),
        }
    }

    pub fn rules(&self) -> &EngineRules {
        &self.rules
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// The topics of an election. See `topics::resolve_topics`.
    pub async fn resolve_topics(&self, election_id: &str) -> EngineResult<Vec<Topic>> {
        topics::resolve_topics(self.store.as_ref(), election_id).await
    }

    /// Compares candidates on a topic. See `comparison::compare`.
    pub async fn compare(
        &self,
        topic_value: &str,
        election_id: &str,
        candidate_ids: &[String],
    ) -> EngineResult<ComparisonResult> {
        comparison::compare(
            Arc::clone(&self.store),
            topic_value,
            election_id,
            candidate_ids,
            &self.rules,
        )
        .await
    }

    /// Runs the comparison prepared by a session.
    pub async fn run_request(&self, request: &ComparisonRequest) -> EngineResult<ComparisonResult> {
        self.compare(&request.topic, &request.election_id, &request.candidate_ids)
            .await
    }
}

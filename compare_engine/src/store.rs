use async_trait::async_trait;
use log::debug;
use snafu::Snafu;

use crate::identity::matches_election_ref;
use crate::records::{CandidateRecord, Dataset, ProposalRecord, TopicRecord};

#[derive(Eq, PartialEq, Debug, Clone, Snafu)]
pub enum StoreError {
    #[snafu(display("{collection}/{id} not found"))]
    NotFound { collection: String, id: String },

    /// The store cannot be reached at all.
    #[snafu(display("store unavailable: {message}"))]
    Unavailable { message: String },

    /// A single read failed.
    #[snafu(display("read failed: {message}"))]
    Failed { message: String },
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to the document collections owned by the content management side.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    fn backend_tag(&self) -> &'static str {
        "unknown"
    }

    /// The declared topic registry of an election, in storage order. May be empty.
    async fn get_topics(&self, election_id: &str) -> StoreResult<Vec<TopicRecord>>;

    /// Proposals whose `electionId` field is exactly the given string.
    async fn get_proposals_by_election(&self, election_id: &str)
        -> StoreResult<Vec<ProposalRecord>>;

    async fn get_all_proposals(&self) -> StoreResult<Vec<ProposalRecord>>;

    /// Fails with `StoreError::NotFound` for unknown ids.
    async fn get_candidate_by_id(&self, id: &str) -> StoreResult<CandidateRecord>;

    async fn get_proposals_by_candidate(&self, candidate_id: &str)
        -> StoreResult<Vec<ProposalRecord>>;
}

/// A store backed by an in-memory snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    dataset: Dataset,
}

impl MemoryStore {
    pub fn new(dataset: Dataset) -> MemoryStore {
        MemoryStore { dataset }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// All the candidates registered for an election, in storage order.
    pub fn candidates_of(&self, election_id: &str) -> Vec<CandidateRecord> {
        self.dataset
            .candidates
            .iter()
            .filter(|c| c.election_id.as_deref() == Some(election_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn get_topics(&self, election_id: &str) -> StoreResult<Vec<TopicRecord>> {
        Ok(self
            .dataset
            .topics
            .get(election_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_proposals_by_election(
        &self,
        election_id: &str,
    ) -> StoreResult<Vec<ProposalRecord>> {
        // Equality query: only plain string references are indexed.
        let res: Vec<ProposalRecord> = self
            .dataset
            .proposals
            .iter()
            .filter(|p| p.election_id.as_ref().and_then(|v| v.as_str()) == Some(election_id))
            .cloned()
            .collect();
        debug!(
            "get_proposals_by_election: {} -> {} proposals",
            election_id,
            res.len()
        );
        Ok(res)
    }

    async fn get_all_proposals(&self) -> StoreResult<Vec<ProposalRecord>> {
        Ok(self.dataset.proposals.clone())
    }

    async fn get_candidate_by_id(&self, id: &str) -> StoreResult<CandidateRecord> {
        self.dataset
            .candidates
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                collection: "candidates".to_string(),
                id: id.to_string(),
            })
    }

    async fn get_proposals_by_candidate(
        &self,
        candidate_id: &str,
    ) -> StoreResult<Vec<ProposalRecord>> {
        Ok(self
            .dataset
            .proposals
            .iter()
            .filter(|p| p.candidate_id.as_deref() == Some(candidate_id))
            .cloned()
            .collect())
    }
}

/// Proposals of an election, whatever the shape of their election reference.
pub fn scan_proposals_of<'a>(
    proposals: &'a [ProposalRecord],
    election_id: &'a str,
) -> impl Iterator<Item = &'a ProposalRecord> {
    proposals
        .iter()
        .filter(move |p| matches_election_ref(p.election_id.as_ref(), election_id))
}

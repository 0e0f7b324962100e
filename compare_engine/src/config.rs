// ******** Output data structures *********

use serde::{Deserialize, Serialize};
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use snafu::Snafu;

use crate::records::{CandidateRecord, ProposalRecord};

/// A discussable subject of an election.
///
/// `value` is the stable comparison key sent back when comparing, `label` is
/// the display text. Declared topics also carry the other fields of their
/// registry entry in `extra`.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub label: String,
    pub value: String,
    #[serde(flatten)]
    pub extra: JSMap<String, JSValue>,
}

impl Topic {
    /// A topic synthesized from a proposal keyword: id, value and label are the same text.
    pub fn derived(raw_label: &str) -> Topic {
        let label = raw_label.trim().to_string();
        Topic {
            id: label.clone(),
            label: label.clone(),
            value: label,
            extra: JSMap::new(),
        }
    }

    /// The key used to select this topic: the value, or the id when the value is empty.
    pub fn selection_key(&self) -> &str {
        if self.value.is_empty() {
            self.id.as_str()
        } else {
            self.value.as_str()
        }
    }

    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            self.id.as_str()
        } else {
            self.label.as_str()
        }
    }
}

/// Finds the topic selected by `value` in a topic list.
pub fn find_topic<'a>(topics: &'a [Topic], value: &str) -> Option<&'a Topic> {
    if value.is_empty() {
        return None;
    }
    topics.iter().find(|t| t.selection_key() == value)
}

/// The outcome of comparing candidates on a topic, for one candidate.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonEntry {
    #[serde(rename = "candidateId")]
    pub candidate_id: String,
    pub answered: bool,
    pub proposals: Vec<ProposalRecord>,
}

impl ComparisonEntry {
    pub fn new(candidate_id: String, proposals: Vec<ProposalRecord>) -> ComparisonEntry {
        ComparisonEntry {
            candidate_id,
            answered: !proposals.is_empty(),
            proposals,
        }
    }

    pub fn unanswered(candidate_id: String) -> ComparisonEntry {
        ComparisonEntry::new(candidate_id, Vec::new())
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub topic: String,
    pub candidates: Vec<CandidateRecord>,
    pub comparison: Vec<ComparisonEntry>,
}

impl ComparisonResult {
    /// The matched proposals of a candidate. Empty for unknown candidates.
    pub fn proposals_of(&self, candidate_id: &str) -> &[ProposalRecord] {
        self.comparison
            .iter()
            .find(|e| e.candidate_id == candidate_id)
            .map(|e| e.proposals.as_slice())
            .unwrap_or(&[])
    }

    pub fn candidate(&self, candidate_id: &str) -> Option<&CandidateRecord> {
        self.candidates.iter().find(|c| c.id == candidate_id)
    }
}

/// One pairing of a bracket round. `None` slots are byes.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub key: String,
    pub a: Option<String>,
    pub b: Option<String>,
    pub winner: Option<String>,
}

impl Match {
    /// The occupant of slot 0 (`a`) or slot 1 (`b`).
    pub fn slot(&self, slot: usize) -> Option<&str> {
        match slot {
            0 => self.a.as_deref(),
            1 => self.b.as_deref(),
            _ => None,
        }
    }

    pub fn has_participant(&self, candidate_id: &str) -> bool {
        self.a.as_deref() == Some(candidate_id) || self.b.as_deref() == Some(candidate_id)
    }
}

pub type Round = Vec<Match>;

/// Errors that prevent a topic resolution or a comparison from completing.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EngineError {
    #[snafu(display("{field} is required"))]
    Validation { field: String },

    #[snafu(display("The document store is unavailable: {message}"))]
    UpstreamUnavailable { message: String },
}

impl EngineError {
    /// The name of the missing input, for validation errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            EngineError::Validation { field } => Some(field.as_str()),
            _ => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

// ********* Configuration **********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct EngineRules {
    /// Drop resolved candidates whose own election is not the requested one.
    pub restrict_candidates_to_election: bool,
    /// The minimum number of selected candidates to start a tournament.
    pub minimum_participants: usize,
    /// How many proposal headlines a bracket slot shows.
    pub proposal_preview_limit: usize,
}

impl EngineRules {
    pub const DEFAULT_RULES: EngineRules = EngineRules {
        restrict_candidates_to_election: true,
        minimum_participants: 2,
        proposal_preview_limit: 2,
    };
}

impl Default for EngineRules {
    fn default() -> Self {
        EngineRules::DEFAULT_RULES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_topics_by_value_then_id() {
        let mut declared = Topic::derived("x");
        declared.id = "t1".to_string();
        declared.value = String::new();
        declared.label = "Salud".to_string();
        let topics = vec![Topic::derived(" Educación "), declared];
        assert_eq!(
            find_topic(&topics, "Educación").map(|t| t.display_label()),
            Some("Educación")
        );
        assert_eq!(find_topic(&topics, "t1").map(|t| t.display_label()), Some("Salud"));
        assert_eq!(find_topic(&topics, ""), None);
        assert_eq!(find_topic(&topics, "salud"), None);
    }

    #[test]
    fn validation_error_names_field() {
        let e = ValidationSnafu { field: "electionId" }.build();
        assert_eq!(e.field(), Some("electionId"));
        assert_eq!(e.to_string(), "electionId is required");
    }
}

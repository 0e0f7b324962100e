// ********* Records, as stored by the content management side ***********

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use crate::identity::{canonical_reference, coerce_to_string};

/// An entry of an election's topic registry.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TopicRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: JSMap<String, JSValue>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: String,
    #[serde(
        rename = "electionId",
        default,
        deserialize_with = "lenient_reference",
        skip_serializing_if = "Option::is_none"
    )]
    pub election_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
    #[serde(rename = "photoUrl", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(flatten)]
    pub extra: JSMap<String, JSValue>,
}

/// A government-program proposal.
///
/// `election_id` is kept as raw JSON because older records store an embedded
/// reference object instead of a plain id. See `identity::matches_election_id`.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub id: String,
    #[serde(rename = "candidateId", default, skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<String>,
    #[serde(rename = "electionId", default, skip_serializing_if = "Option::is_none")]
    pub election_id: Option<JSValue>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub topic: Option<String>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(rename = "sourceUrl", default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(flatten)]
    pub extra: JSMap<String, JSValue>,
}

impl ProposalRecord {
    /// The topic this proposal belongs to: `topic`, or `type` when the topic is blank.
    pub fn topic_label(&self) -> Option<&str> {
        non_blank(&self.topic).or_else(|| non_blank(&self.kind))
    }

    /// All the keyword fields that are filled in (`topic` then `type`).
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        [non_blank(&self.topic), non_blank(&self.kind)]
            .into_iter()
            .flatten()
    }

    /// Short text shown when the proposal is previewed.
    pub fn headline(&self) -> &str {
        non_blank(&self.title)
            .or_else(|| non_blank(&self.summary))
            .unwrap_or("Proposal")
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

// Keyword fields were sometimes saved as numbers. Read any scalar as text.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<JSValue> = Option::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(coerce_to_string))
}

// Candidates of older generations embed the election reference. Keep its id.
fn lenient_reference<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<JSValue> = Option::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(canonical_reference))
}

/// A full snapshot of the document collections this engine reads.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    /// Topic registries, by election id.
    #[serde(default)]
    pub topics: BTreeMap<String, Vec<TopicRecord>>,
    #[serde(default)]
    pub candidates: Vec<CandidateRecord>,
    #[serde(default)]
    pub proposals: Vec<ProposalRecord>,
}

impl Dataset {
    /// Appends the content of another snapshot. Registries of the same election are concatenated.
    pub fn merge(&mut self, other: Dataset) {
        for (election_id, mut entries) in other.topics {
            self.topics
                .entry(election_id)
                .or_default()
                .append(&mut entries);
        }
        self.candidates.extend(other.candidates);
        self.proposals.extend(other.proposals);
    }
}

// Resolution of the topics that can be discussed in an election.
//
// Topics come from an ordered chain of strategies. The first strategy that
// resolves wins:
// 1. the declared topic registry of the election
// 2. the keywords of the proposals stored with a plain election id
// 3. the keywords of all the proposals whose election reference matches, in any shape
//
// The last step accepts every reference shape the identity matcher accepts. A
// record whose reference coincidentally reads as the election id is picked up as well.

use std::collections::HashSet;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Map as JSMap;

use crate::config::*;
use crate::normalize::normalize;
use crate::records::{ProposalRecord, TopicRecord};
use crate::store::{scan_proposals_of, DocumentStore, StoreError};

/// The outcome of one strategy.
#[derive(PartialEq, Debug, Clone)]
pub enum Resolution {
    Resolved(Vec<Topic>),
    TryNext,
}

#[async_trait]
pub trait TopicStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, store: &dyn DocumentStore, election_id: &str)
        -> EngineResult<Resolution>;
}

/// Topics from the per-election registry, as stored.
pub struct DeclaredTopics;

/// Topics derived from the proposals returned by the election equality query.
pub struct ScopedProposalScan;

/// Topics derived from a scan of all the proposals, filtered by reference matching.
pub struct GlobalProposalScan;

#[async_trait]
impl TopicStrategy for DeclaredTopics {
    fn name(&self) -> &'static str {
        "declared"
    }

    async fn resolve(
        &self,
        store: &dyn DocumentStore,
        election_id: &str,
    ) -> EngineResult<Resolution> {
        let Some(records) = absorb(self.name(), store.get_topics(election_id).await)? else {
            return Ok(Resolution::TryNext);
        };
        if records.is_empty() {
            return Ok(Resolution::TryNext);
        }
        Ok(Resolution::Resolved(
            records.into_iter().map(declared_topic).collect(),
        ))
    }
}

#[async_trait]
impl TopicStrategy for ScopedProposalScan {
    fn name(&self) -> &'static str {
        "scoped-scan"
    }

    async fn resolve(
        &self,
        store: &dyn DocumentStore,
        election_id: &str,
    ) -> EngineResult<Resolution> {
        let Some(proposals) = absorb(
            self.name(),
            store.get_proposals_by_election(election_id).await,
        )?
        else {
            return Ok(Resolution::TryNext);
        };
        // Zero rows usually means the proposals use the embedded reference shape.
        if proposals.is_empty() {
            return Ok(Resolution::TryNext);
        }
        Ok(Resolution::Resolved(derive_topics(proposals.iter())))
    }
}

#[async_trait]
impl TopicStrategy for GlobalProposalScan {
    fn name(&self) -> &'static str {
        "global-scan"
    }

    async fn resolve(
        &self,
        store: &dyn DocumentStore,
        election_id: &str,
    ) -> EngineResult<Resolution> {
        let Some(proposals) = absorb(self.name(), store.get_all_proposals().await)? else {
            return Ok(Resolution::TryNext);
        };
        Ok(Resolution::Resolved(derive_topics(scan_proposals_of(
            &proposals,
            election_id,
        ))))
    }
}

// Outages are fatal. Any other failure skips the strategy.
fn absorb<T>(strategy: &str, res: Result<T, StoreError>) -> EngineResult<Option<T>> {
    match res {
        Ok(x) => Ok(Some(x)),
        Err(StoreError::Unavailable { message }) => UpstreamUnavailableSnafu { message }.fail(),
        Err(e) => {
            warn!("topic strategy {}: skipping after read error: {}", strategy, e);
            Ok(None)
        }
    }
}

fn declared_topic(record: TopicRecord) -> Topic {
    let label = record
        .title
        .clone()
        .or_else(|| record.name.clone())
        .unwrap_or_else(|| record.id.clone());
    let mut extra = JSMap::new();
    if let Some(title) = record.title {
        extra.insert("title".to_string(), title.into());
    }
    if let Some(name) = record.name {
        extra.insert("name".to_string(), name.into());
    }
    for (k, v) in record.extra {
        // id, label and value are set by the registry entry itself.
        if !matches!(k.as_str(), "id" | "label" | "value") {
            extra.insert(k, v);
        }
    }
    Topic {
        id: record.id.clone(),
        label,
        value: record.id,
        extra,
    }
}

/// Synthesizes topics from proposal keywords (`topic`, else `type`).
///
/// Keywords are deduplicated on their normalized form; the first raw label seen
/// for a key is kept and order of first appearance is preserved.
pub fn derive_topics<'a>(proposals: impl Iterator<Item = &'a ProposalRecord>) -> Vec<Topic> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut res: Vec<Topic> = Vec::new();
    for p in proposals {
        let Some(raw) = p.topic_label() else {
            continue;
        };
        let key = normalize(raw);
        if key.is_empty() {
            continue;
        }
        if seen.insert(key) {
            res.push(Topic::derived(raw));
        }
    }
    res
}

pub fn default_strategies() -> Vec<Box<dyn TopicStrategy>> {
    vec![
        Box::new(DeclaredTopics),
        Box::new(ScopedProposalScan),
        Box::new(GlobalProposalScan),
    ]
}

/// Resolves the topic list of an election with the default strategies.
///
/// An election without any topic gives an empty list, not an error.
pub async fn resolve_topics(
    store: &dyn DocumentStore,
    election_id: &str,
) -> EngineResult<Vec<Topic>> {
    resolve_topics_with(store, election_id, &default_strategies()).await
}

pub async fn resolve_topics_with(
    store: &dyn DocumentStore,
    election_id: &str,
    strategies: &[Box<dyn TopicStrategy>],
) -> EngineResult<Vec<Topic>> {
    if election_id.trim().is_empty() {
        return ValidationSnafu { field: "electionId" }.fail();
    }
    for strategy in strategies {
        match strategy.resolve(store, election_id).await? {
            Resolution::Resolved(topics) => {
                info!(
                    "resolve_topics: election {}: {} topics from {}",
                    election_id,
                    topics.len(),
                    strategy.name()
                );
                return Ok(topics);
            }
            Resolution::TryNext => {
                debug!(
                    "resolve_topics: election {}: {} has nothing, trying next",
                    election_id,
                    strategy.name()
                );
            }
        }
    }
    info!("resolve_topics: election {}: no topics available", election_id);
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{CandidateRecord, Dataset};
    use crate::store::{MemoryStore, StoreResult};
    use serde_json::json;

    fn store(js: serde_json::Value) -> MemoryStore {
        MemoryStore::new(serde_json::from_value::<Dataset>(js).unwrap())
    }

    fn labels(topics: &[Topic]) -> Vec<&str> {
        topics.iter().map(|t| t.label.as_str()).collect()
    }

    #[tokio::test]
    async fn declared_registry_wins() {
        let s = store(json!({
            "topics": {"E1": [
                {"id": "t2", "title": "Salud", "icon": "heart"},
                {"id": "t1", "name": "Empleo"},
                {"id": "t3"}
            ]},
            "proposals": [{"id": "p1", "electionId": "E1", "topic": "Vivienda"}]
        }));
        let topics = resolve_topics(&s, "E1").await.unwrap();
        assert_eq!(labels(&topics), vec!["Salud", "Empleo", "t3"]);
        assert_eq!(topics[0].value, "t2");
        assert_eq!(topics[0].extra.get("icon"), Some(&json!("heart")));
    }

    #[tokio::test]
    async fn derived_topics_dedup_in_first_seen_order() {
        let s = store(json!({
            "proposals": [
                {"id": "p1", "electionId": "E1", "topic": "Salud"},
                {"id": "p2", "electionId": "E1", "topic": "salud "},
                {"id": "p3", "electionId": "E1", "topic": "Educación"},
                {"id": "p4", "electionId": "E2", "topic": "Transporte"}
            ]
        }));
        let topics = resolve_topics(&s, "E1").await.unwrap();
        assert_eq!(labels(&topics), vec!["Salud", "Educación"]);
        assert_eq!(topics[1].value, "Educación");
        assert_eq!(topics[1].id, "Educación");
    }

    #[tokio::test]
    async fn falls_back_to_global_scan_for_embedded_references() {
        let s = store(json!({
            "proposals": [
                {"id": "p1", "electionId": {"id": "E1"}, "type": " Seguridad "},
                {"id": "p2", "electionId": {"id": "E2"}, "topic": "Salud"},
                {"id": "p3", "electionId": "E9", "topic": "Empleo"}
            ]
        }));
        let topics = resolve_topics(&s, "E1").await.unwrap();
        assert_eq!(labels(&topics), vec!["Seguridad"]);
    }

    #[tokio::test]
    async fn nothing_gives_empty_list() {
        let s = store(json!({}));
        assert!(resolve_topics(&s, "E1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_election_id_is_rejected() {
        let s = store(json!({}));
        let err = resolve_topics(&s, " ").await.unwrap_err();
        assert_eq!(err.field(), Some("electionId"));
    }

    #[derive(Clone, Copy)]
    enum Tier {
        Up,
        Down,
        Broken,
    }

    fn reach(tier: Tier) -> StoreResult<()> {
        match tier {
            Tier::Up => Ok(()),
            Tier::Down => Err(StoreError::Unavailable {
                message: "connection refused".to_string(),
            }),
            Tier::Broken => Err(StoreError::Failed {
                message: "malformed index".to_string(),
            }),
        }
    }

    /// A store whose registry, election query and full scan fail independently.
    struct TieredStore {
        inner: MemoryStore,
        registry: Tier,
        scoped: Tier,
        global: Tier,
    }

    impl TieredStore {
        fn new(registry: Tier, scoped: Tier, global: Tier) -> TieredStore {
            TieredStore {
                inner: store(json!({
                    "topics": {"E1": [{"id": "t1", "title": "Salud"}]},
                    "proposals": [
                        {"id": "p1", "electionId": "E1", "topic": "Empleo"},
                        {"id": "p2", "electionId": {"id": "E1"}, "topic": "Vivienda"}
                    ]
                })),
                registry,
                scoped,
                global,
            }
        }
    }

    #[async_trait]
    impl DocumentStore for TieredStore {
        async fn get_topics(&self, election_id: &str) -> StoreResult<Vec<TopicRecord>> {
            reach(self.registry)?;
            self.inner.get_topics(election_id).await
        }
        async fn get_proposals_by_election(
            &self,
            election_id: &str,
        ) -> StoreResult<Vec<ProposalRecord>> {
            reach(self.scoped)?;
            self.inner.get_proposals_by_election(election_id).await
        }
        async fn get_all_proposals(&self) -> StoreResult<Vec<ProposalRecord>> {
            reach(self.global)?;
            self.inner.get_all_proposals().await
        }
        async fn get_candidate_by_id(&self, id: &str) -> StoreResult<CandidateRecord> {
            self.inner.get_candidate_by_id(id).await
        }
        async fn get_proposals_by_candidate(
            &self,
            candidate_id: &str,
        ) -> StoreResult<Vec<ProposalRecord>> {
            self.inner.get_proposals_by_candidate(candidate_id).await
        }
    }

    async fn resolve(registry: Tier, scoped: Tier, global: Tier) -> EngineResult<Vec<Topic>> {
        resolve_topics(&TieredStore::new(registry, scoped, global), "E1").await
    }

    fn is_outage(res: EngineResult<Vec<Topic>>) -> bool {
        matches!(res, Err(EngineError::UpstreamUnavailable { .. }))
    }

    #[tokio::test]
    async fn outage_in_any_tier_is_fatal() {
        assert!(is_outage(resolve(Tier::Down, Tier::Up, Tier::Up).await));
        assert!(is_outage(resolve(Tier::Broken, Tier::Down, Tier::Up).await));
        assert!(is_outage(
            resolve(Tier::Broken, Tier::Broken, Tier::Down).await
        ));
    }

    #[tokio::test]
    async fn outage_after_a_resolved_tier_is_not_reached() {
        let topics = resolve(Tier::Up, Tier::Down, Tier::Down).await.unwrap();
        assert_eq!(labels(&topics), vec!["Salud"]);
    }

    #[tokio::test]
    async fn failed_read_tries_the_next_tier() {
        let topics = resolve(Tier::Broken, Tier::Up, Tier::Up).await.unwrap();
        assert_eq!(labels(&topics), vec!["Empleo"]);

        // The full scan also sees the embedded reference.
        let topics = resolve(Tier::Broken, Tier::Broken, Tier::Up).await.unwrap();
        assert_eq!(labels(&topics), vec!["Empleo", "Vivienda"]);

        let topics = resolve(Tier::Broken, Tier::Broken, Tier::Broken)
            .await
            .unwrap();
        assert!(topics.is_empty());
    }
}

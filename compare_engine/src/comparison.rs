use std::future::Future;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::task::JoinSet;

use crate::config::*;
use crate::identity::matches_election_ref;
use crate::normalize::{loosely_contains, normalize};
use crate::records::{CandidateRecord, ProposalRecord};
use crate::store::{DocumentStore, StoreError, StoreResult};

/// Compares candidates on a topic.
///
/// Arguments:
/// * `topic_value` the selected topic. Proposals match when their `topic` or `type`
/// contains it, after normalization on both sides.
/// * `election_id` the election the proposals must belong to
/// * `candidate_ids` the candidates to compare, at least one
///
/// The comparison holds one entry per requested id, in request order, even for
/// ids that do not resolve to a candidate. Reads that fail for one candidate make
/// that candidate unanswered. Only a store that cannot be reached at all fails the call.
pub async fn compare(
    store: Arc<dyn DocumentStore>,
    topic_value: &str,
    election_id: &str,
    candidate_ids: &[String],
    rules: &EngineRules,
) -> EngineResult<ComparisonResult> {
    if election_id.trim().is_empty() {
        return ValidationSnafu { field: "electionId" }.fail();
    }
    if normalize(topic_value).is_empty() {
        return ValidationSnafu { field: "topic" }.fail();
    }
    if candidate_ids.is_empty() {
        return ValidationSnafu {
            field: "candidateIds",
        }
        .fail();
    }
    info!(
        "compare: topic {:?}, election {}, {} candidates",
        topic_value,
        election_id,
        candidate_ids.len()
    );

    let candidates = resolve_candidates(&store, election_id, candidate_ids, rules).await?;

    let fetched = fan_out(&store, candidate_ids, |s, id| async move {
        s.get_proposals_by_candidate(&id).await
    })
    .await;
    ensure_reachable(&fetched)?;

    let mut comparison: Vec<ComparisonEntry> = Vec::new();
    for (candidate_id, outcome) in candidate_ids.iter().zip(fetched) {
        let entry = match outcome {
            Some(Ok(proposals)) => {
                let total = proposals.len();
                let matched = filter_proposals(proposals, election_id, topic_value);
                debug!(
                    "compare: candidate {}: {}/{} proposals match",
                    candidate_id,
                    matched.len(),
                    total
                );
                ComparisonEntry::new(candidate_id.clone(), matched)
            }
            Some(Err(e)) => {
                warn!(
                    "compare: candidate {}: proposals unavailable, not answered: {}",
                    candidate_id, e
                );
                ComparisonEntry::unanswered(candidate_id.clone())
            }
            None => {
                warn!(
                    "compare: candidate {}: proposal fetch aborted, not answered",
                    candidate_id
                );
                ComparisonEntry::unanswered(candidate_id.clone())
            }
        };
        comparison.push(entry);
    }

    Ok(ComparisonResult {
        topic: topic_value.to_string(),
        candidates,
        comparison,
    })
}

async fn resolve_candidates(
    store: &Arc<dyn DocumentStore>,
    election_id: &str,
    candidate_ids: &[String],
    rules: &EngineRules,
) -> EngineResult<Vec<CandidateRecord>> {
    let lookups = fan_out(store, candidate_ids, |s, id| async move {
        s.get_candidate_by_id(&id).await
    })
    .await;
    ensure_reachable(&lookups)?;

    let mut res: Vec<CandidateRecord> = Vec::new();
    for (candidate_id, outcome) in candidate_ids.iter().zip(lookups) {
        match outcome {
            Some(Ok(c)) => {
                if rules.restrict_candidates_to_election
                    && c.election_id.as_deref() != Some(election_id)
                {
                    debug!(
                        "resolve_candidates: {} belongs to election {:?}, dropped",
                        candidate_id, c.election_id
                    );
                } else {
                    res.push(c);
                }
            }
            Some(Err(StoreError::NotFound { .. })) => {
                debug!("resolve_candidates: {} not found, dropped", candidate_id);
            }
            Some(Err(e)) => {
                warn!("resolve_candidates: {}: lookup failed: {}", candidate_id, e);
            }
            None => {
                warn!("resolve_candidates: {}: lookup aborted", candidate_id);
            }
        }
    }
    Ok(res)
}

/// Keeps the proposals of `election_id` whose keywords contain the topic.
pub fn filter_proposals(
    proposals: Vec<ProposalRecord>,
    election_id: &str,
    topic_value: &str,
) -> Vec<ProposalRecord> {
    proposals
        .into_iter()
        .filter(|p| {
            matches_election_ref(p.election_id.as_ref(), election_id)
                && p.keywords().any(|k| loosely_contains(k, topic_value))
        })
        .collect()
}

// Runs one read per id concurrently. The outcomes are in the order of `ids`;
// `None` marks a task that did not complete.
async fn fan_out<T, F, Fut>(
    store: &Arc<dyn DocumentStore>,
    ids: &[String],
    read: F,
) -> Vec<Option<StoreResult<T>>>
where
    T: Send + 'static,
    F: Fn(Arc<dyn DocumentStore>, String) -> Fut,
    Fut: Future<Output = StoreResult<T>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for (idx, id) in ids.iter().enumerate() {
        let fut = read(Arc::clone(store), id.clone());
        set.spawn(async move { (idx, fut.await) });
    }
    let mut outcomes: Vec<Option<StoreResult<T>>> = ids.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, res)) => outcomes[idx] = Some(res),
            Err(e) => warn!("fan_out: task failed: {}", e),
        }
    }
    outcomes
}

// A phase where every single read reported an outage means the store is down.
fn ensure_reachable<T>(outcomes: &[Option<StoreResult<T>>]) -> EngineResult<()> {
    let all_down = !outcomes.is_empty()
        && outcomes
            .iter()
            .all(|o| matches!(o, Some(Err(e)) if e.is_unavailable()));
    if all_down {
        let message = outcomes
            .iter()
            .find_map(|o| match o {
                Some(Err(e)) => Some(e.to_string()),
                _ => None,
            })
            .unwrap_or_default();
        return UpstreamUnavailableSnafu { message }.fail();
    }
    Ok(())
}

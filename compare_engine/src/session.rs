// The state a visitor holds while comparing candidates or running a tournament.
//
// Fetches are asynchronous and their results may arrive after the visitor has
// moved on. Every fetch is issued with a ticket carrying the generation of the
// state it was started from; a result whose ticket is no longer current is dropped.

use std::collections::HashSet;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::bracket::{self, Decisions, DragSource, DropRejected, DropTarget, SlotView};
use crate::config::*;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum FetchKind {
    /// Topic list and candidate list of the election.
    ElectionData,
    /// Proposals compared on the selected topic.
    Comparison,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct RequestTicket {
    kind: FetchKind,
    generation: u64,
}

/// Everything needed to run `compare` for the session.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ComparisonRequest {
    pub ticket: RequestTicket,
    pub topic: String,
    pub election_id: String,
    pub candidate_ids: Vec<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MatchView {
    pub key: String,
    pub slots: [SlotView; 2],
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RoundView {
    pub label: String,
    pub matches: Vec<MatchView>,
}

#[derive(Debug, Clone)]
pub struct TournamentSession {
    rules: EngineRules,
    election_id: String,
    topics: Vec<Topic>,
    // Candidates of the election, in display order.
    candidates: Vec<String>,
    selected: HashSet<String>,
    selection_initialized: bool,
    topic: Option<String>,
    participants: Vec<String>,
    decisions: Decisions,
    comparison: Option<ComparisonResult>,
    // The pending comparison loads the bracket, not the selection.
    tournament_fetch: bool,
    election_generation: u64,
    comparison_generation: u64,
}

impl TournamentSession {
    pub fn new(election_id: &str, rules: &EngineRules) -> TournamentSession {
        TournamentSession {
            rules: rules.clone(),
            election_id: election_id.to_string(),
            topics: Vec::new(),
            candidates: Vec::new(),
            selected: HashSet::new(),
            selection_initialized: false,
            topic: None,
            participants: Vec::new(),
            decisions: Decisions::new(),
            comparison: None,
            tournament_fetch: false,
            election_generation: 0,
            comparison_generation: 0,
        }
    }

    pub fn election_id(&self) -> &str {
        &self.election_id
    }

    /// Switches to another election. All the state of the previous one is dropped.
    pub fn set_election(&mut self, election_id: &str) {
        if self.election_id == election_id {
            return;
        }
        info!("session: election {} -> {}", self.election_id, election_id);
        let rules = self.rules.clone();
        let election_generation = self.election_generation + 1;
        let comparison_generation = self.comparison_generation + 1;
        *self = TournamentSession::new(election_id, &rules);
        self.election_generation = election_generation;
        self.comparison_generation = comparison_generation;
    }

    // ******** Tickets **********

    pub fn begin_election_fetch(&self) -> RequestTicket {
        RequestTicket {
            kind: FetchKind::ElectionData,
            generation: self.election_generation,
        }
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        let current = match ticket.kind {
            FetchKind::ElectionData => self.election_generation,
            FetchKind::Comparison => self.comparison_generation,
        };
        ticket.generation == current
    }

    fn invalidate_comparison(&mut self) {
        self.comparison_generation += 1;
    }

    // A selection change only makes a side-by-side comparison stale. The bracket
    // keeps the participants it was started with.
    fn selection_changed(&mut self) {
        if !self.tournament_fetch {
            self.invalidate_comparison();
        }
    }

    // ******** Election data **********

    /// Installs the topic list of the election. Returns false if the result is stale.
    pub fn accept_topics(&mut self, ticket: &RequestTicket, topics: Vec<Topic>) -> bool {
        if ticket.kind != FetchKind::ElectionData || !self.is_current(ticket) {
            warn!("session: stale topic list discarded");
            return false;
        }
        self.topics = topics;
        true
    }

    /// Installs the candidate list of the election. Returns false if the result is stale.
    ///
    /// The first list received selects every candidate.
    pub fn accept_candidates(
        &mut self,
        ticket: &RequestTicket,
        candidate_ids: Vec<String>,
    ) -> bool {
        if ticket.kind != FetchKind::ElectionData || !self.is_current(ticket) {
            warn!("session: stale candidate list discarded");
            return false;
        }
        self.candidates = candidate_ids;
        if !self.candidates.is_empty() && !self.selection_initialized {
            self.selected = self.candidates.iter().cloned().collect();
            self.selection_initialized = true;
        }
        true
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn current_topic(&self) -> Option<&Topic> {
        self.topic
            .as_deref()
            .and_then(|value| find_topic(&self.topics, value))
    }

    // ******** Selection **********

    pub fn toggle_candidate(&mut self, candidate_id: &str) {
        if !self.selected.remove(candidate_id) {
            self.selected.insert(candidate_id.to_string());
        }
        self.selection_changed();
    }

    pub fn select_all(&mut self) {
        self.selected = self.candidates.iter().cloned().collect();
        self.selection_changed();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
        self.selection_changed();
    }

    /// The selected candidates, in display order.
    pub fn selected_ids(&self) -> Vec<String> {
        self.candidates
            .iter()
            .filter(|id| self.selected.contains(*id))
            .cloned()
            .collect()
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Selects a topic. A different topic drops the decisions and the loaded proposals.
    pub fn set_topic(&mut self, value: &str) {
        let next = Some(value.to_string()).filter(|v| !v.is_empty());
        if next == self.topic {
            return;
        }
        debug!("session: topic {:?} -> {:?}", self.topic, next);
        self.topic = next;
        self.decisions.clear();
        self.comparison = None;
        self.invalidate_comparison();
    }

    pub fn clear_topic(&mut self) {
        self.set_topic("");
    }

    // ******** Comparison **********

    /// Prepares a side-by-side comparison of the selected candidates on the selected topic.
    pub fn request_comparison(&mut self) -> EngineResult<ComparisonRequest> {
        let topic = self.required_topic()?;
        let candidate_ids = self.selected_ids();
        if candidate_ids.is_empty() {
            return ValidationSnafu {
                field: "candidateIds",
            }
            .fail();
        }
        self.comparison = None;
        self.tournament_fetch = false;
        self.invalidate_comparison();
        Ok(self.comparison_request(topic, candidate_ids))
    }

    /// Starts a tournament between the selected candidates.
    ///
    /// Requires a topic and at least `minimum_participants` candidates. The decisions
    /// are reset and the returned request loads the proposals shown in the bracket.
    pub fn start_tournament(&mut self) -> EngineResult<ComparisonRequest> {
        self.decisions.clear();
        self.comparison = None;
        let topic = self.required_topic()?;
        let candidate_ids = self.selected_ids();
        if candidate_ids.len() < self.rules.minimum_participants.max(1) {
            return ValidationSnafu {
                field: "candidateIds",
            }
            .fail();
        }
        info!(
            "session: tournament on {:?} with {} participants",
            topic,
            candidate_ids.len()
        );
        self.participants = candidate_ids.clone();
        self.tournament_fetch = true;
        self.invalidate_comparison();
        Ok(self.comparison_request(topic, candidate_ids))
    }

    /// Replaces the tournament participants and returns the request that loads
    /// their proposals.
    ///
    /// Decisions and loaded proposals do not survive a new participant set. The
    /// same checks as `start_tournament` apply, and a rejected list changes nothing.
    pub fn set_participants(
        &mut self,
        candidate_ids: Vec<String>,
    ) -> EngineResult<ComparisonRequest> {
        let topic = self.required_topic()?;
        if candidate_ids.len() < self.rules.minimum_participants.max(1) {
            return ValidationSnafu {
                field: "candidateIds",
            }
            .fail();
        }
        if candidate_ids != self.participants {
            debug!(
                "session: participants {:?} -> {:?}",
                self.participants, candidate_ids
            );
            self.participants = candidate_ids.clone();
            self.decisions.clear();
            self.comparison = None;
        }
        self.tournament_fetch = true;
        self.invalidate_comparison();
        Ok(self.comparison_request(topic, candidate_ids))
    }

    pub fn reset_tournament(&mut self) {
        self.participants.clear();
        self.decisions.clear();
        self.comparison = None;
        self.tournament_fetch = false;
        self.invalidate_comparison();
    }

    fn required_topic(&self) -> EngineResult<String> {
        match self.topic.as_deref() {
            Some(t) if !t.trim().is_empty() => Ok(t.to_string()),
            _ => ValidationSnafu { field: "topic" }.fail(),
        }
    }

    fn comparison_request(&self, topic: String, candidate_ids: Vec<String>) -> ComparisonRequest {
        ComparisonRequest {
            ticket: RequestTicket {
                kind: FetchKind::Comparison,
                generation: self.comparison_generation,
            },
            topic,
            election_id: self.election_id.clone(),
            candidate_ids,
        }
    }

    /// Installs a comparison result. Returns false, and keeps the current state, if the
    /// result was requested before the last change of topic or selection.
    pub fn accept_comparison(
        &mut self,
        ticket: &RequestTicket,
        result: ComparisonResult,
    ) -> bool {
        if ticket.kind != FetchKind::Comparison || !self.is_current(ticket) {
            warn!(
                "session: stale comparison for topic {:?} discarded",
                result.topic
            );
            return false;
        }
        self.comparison = Some(result);
        true
    }

    pub fn comparison(&self) -> Option<&ComparisonResult> {
        self.comparison.as_ref()
    }

    // ******** Bracket **********

    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    pub fn decisions(&self) -> &Decisions {
        &self.decisions
    }

    pub fn rounds(&self) -> Vec<Round> {
        bracket::build_rounds(&self.participants, &self.decisions)
    }

    pub fn choose_winner(&mut self, round_index: usize, match_index: usize, candidate_id: &str) {
        bracket::choose_winner(&mut self.decisions, round_index, match_index, candidate_id);
    }

    pub fn drop_winner(
        &mut self,
        source: &DragSource,
        target: &DropTarget,
    ) -> Result<(), DropRejected> {
        let rounds = self.rounds();
        bracket::drop_winner(&mut self.decisions, &rounds, source, target)
    }

    pub fn champion(&self) -> Option<String> {
        bracket::champion(&self.rounds()).map(|s| s.to_string())
    }

    /// The bracket with the data each slot displays.
    pub fn bracket_view(&self) -> Vec<RoundView> {
        let rounds = self.rounds();
        let count = rounds.len();
        rounds
            .iter()
            .enumerate()
            .map(|(idx, round)| RoundView {
                label: bracket::round_label(idx, count),
                matches: round
                    .iter()
                    .map(|m| MatchView {
                        key: m.key.clone(),
                        slots: bracket::slot_views(
                            m,
                            self.comparison.as_ref(),
                            self.rules.proposal_preview_limit,
                        ),
                    })
                    .collect(),
            })
            .collect()
    }
}

// Single-elimination brackets over any number of candidates.
//
// The bracket is never stored. It is rebuilt from the participant list and the
// decision map each time either changes, so a decision is only ever read through
// the shape it was made against.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt, Snafu};

use crate::config::*;

/// The smallest power of two holding `n` slots. 1 for 0 or 1.
pub fn next_power_of_two(n: usize) -> usize {
    if n <= 1 {
        1
    } else {
        n.next_power_of_two()
    }
}

/// The stable address of a match: `"<round>-<index in round>"`.
pub fn match_key(round_index: usize, match_index: usize) -> String {
    format!("{}-{}", round_index, match_index)
}

/// Winners picked by the user, by match key.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Decisions(BTreeMap<String, String>);

impl Decisions {
    pub fn new() -> Decisions {
        Decisions(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl FromIterator<(String, String)> for Decisions {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Decisions(iter.into_iter().collect())
    }
}

/// Builds the rounds of the bracket.
///
/// The participants are padded with byes up to the next power of two and paired
/// in order. A candidate facing a bye advances on its own. A match between two
/// candidates has the winner recorded in `decisions` for its key, provided it is
/// one of the two; otherwise it is undecided and its slot in the next round stays empty.
/// The next round cannot tell that empty slot from a bye, so the opponent waiting
/// there advances on its own until the earlier match is decided.
///
/// No participant gives no rounds; a single participant gives no rounds either.
pub fn build_rounds(candidate_ids: &[String], decisions: &Decisions) -> Vec<Round> {
    if candidate_ids.is_empty() {
        return Vec::new();
    }
    let size = next_power_of_two(candidate_ids.len());
    let mut slots: Vec<Option<String>> = candidate_ids
        .iter()
        .map(|id| Some(id.clone()).filter(|s| !s.is_empty()))
        .collect();
    slots.resize(size, None);

    let mut rounds: Vec<Round> = Vec::new();
    while slots.len() > 1 {
        let round_index = rounds.len();
        let round: Round = slots
            .chunks(2)
            .enumerate()
            .map(|(match_index, pair)| {
                let key = match_key(round_index, match_index);
                let a = pair[0].clone();
                let b = pair.get(1).cloned().flatten();
                let winner = match (&a, &b) {
                    (Some(x), None) | (None, Some(x)) => Some(x.clone()),
                    (None, None) => None,
                    (Some(x), Some(y)) => decisions
                        .get(&key)
                        .filter(|d| *d == x.as_str() || *d == y.as_str())
                        .map(|d| d.to_string()),
                };
                Match { key, a, b, winner }
            })
            .collect();
        slots = round.iter().map(|m| m.winner.clone()).collect();
        rounds.push(round);
    }
    debug!(
        "build_rounds: {} participants, {} slots, {} rounds",
        candidate_ids.len(),
        size,
        rounds.len()
    );
    rounds
}

/// Records `candidate_id` as the winner of a match.
///
/// The write is not checked: a candidate that does not play in the match is
/// ignored by the next `build_rounds`.
pub fn choose_winner(
    decisions: &mut Decisions,
    round_index: usize,
    match_index: usize,
    candidate_id: &str,
) {
    decisions
        .0
        .insert(match_key(round_index, match_index), candidate_id.to_string());
}

/// The winner of the final, once decided.
pub fn champion(rounds: &[Round]) -> Option<&str> {
    rounds
        .last()
        .and_then(|r| r.first())
        .and_then(|m| m.winner.as_deref())
}

pub fn round_label(round_index: usize, round_count: usize) -> String {
    if round_index + 1 >= round_count {
        "Final".to_string()
    } else {
        format!("Round {}", round_index + 1)
    }
}

// ******** Drag and drop **********

/// A winner token picked up from a match.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DragSource {
    pub round_index: usize,
    pub match_index: usize,
    pub candidate_id: String,
}

/// A slot of a match in a later round. Slot 0 is `a`, slot 1 is `b`.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct DropTarget {
    pub round_index: usize,
    pub match_index: usize,
    pub slot: usize,
}

impl DropTarget {
    /// The match whose winner occupies this slot: `(round - 1, 2 * match + slot)`.
    pub fn feeder(&self) -> Option<(usize, usize)> {
        if self.round_index == 0 || self.slot > 1 {
            return None;
        }
        let feeder_index = self.match_index.checked_mul(2)?.checked_add(self.slot)?;
        Some((self.round_index - 1, feeder_index))
    }
}

#[derive(Eq, PartialEq, Debug, Snafu)]
pub enum DropRejected {
    #[snafu(display("round {round_index} has no feeder matches"))]
    NoFeeder { round_index: usize },

    #[snafu(display("a match only has slots 0 and 1, not {slot}"))]
    InvalidSlot { slot: usize },

    #[snafu(display("match {key} does not exist"))]
    UnknownMatch { key: String },

    #[snafu(display("slot {slot} of match {target} is fed by match {expected}, not {actual}"))]
    WrongFeeder {
        target: String,
        slot: usize,
        expected: String,
        actual: String,
    },

    #[snafu(display("candidate {candidate_id} does not play in match {key}"))]
    NotInFeeder { candidate_id: String, key: String },
}

/// Drops a winner token onto a slot of a later round.
///
/// A slot is the winner of exactly one earlier match, so the token is only
/// accepted when it comes from that match and belongs to one of its players.
/// An accepted drop records the token as that match's winner. A rejected drop
/// leaves `decisions` untouched.
pub fn drop_winner(
    decisions: &mut Decisions,
    rounds: &[Round],
    source: &DragSource,
    target: &DropTarget,
) -> Result<(), DropRejected> {
    ensure!(target.slot <= 1, InvalidSlotSnafu { slot: target.slot });
    ensure!(
        target.round_index > 0,
        NoFeederSnafu {
            round_index: target.round_index,
        }
    );
    let target_key = match_key(target.round_index, target.match_index);
    rounds
        .get(target.round_index)
        .and_then(|r| r.get(target.match_index))
        .context(UnknownMatchSnafu {
            key: target_key.clone(),
        })?;
    let (feeder_round, feeder_index) = target.feeder().context(UnknownMatchSnafu {
        key: target_key.clone(),
    })?;

    let expected = match_key(feeder_round, feeder_index);
    let actual = match_key(source.round_index, source.match_index);
    if expected != actual {
        warn!(
            "drop_winner: rejected drop of {} from {} onto {}/{}",
            source.candidate_id, actual, target_key, target.slot
        );
        return WrongFeederSnafu {
            target: target_key,
            slot: target.slot,
            expected,
            actual,
        }
        .fail();
    }

    let feeder = rounds
        .get(feeder_round)
        .and_then(|r| r.get(feeder_index))
        .context(UnknownMatchSnafu {
            key: expected.clone(),
        })?;
    ensure!(
        feeder.has_participant(&source.candidate_id),
        NotInFeederSnafu {
            candidate_id: source.candidate_id.clone(),
            key: expected,
        }
    );

    choose_winner(decisions, feeder_round, feeder_index, &source.candidate_id);
    Ok(())
}

// ******** Presentation data **********

/// What a bracket slot shows: its candidate, whether it won the match, and a
/// preview of the candidate's proposals on the selected topic.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SlotView {
    #[serde(rename = "candidateId")]
    pub candidate_id: Option<String>,
    pub name: Option<String>,
    pub party: Option<String>,
    #[serde(rename = "isWinner")]
    pub is_winner: bool,
    pub headlines: Vec<String>,
}

pub fn slot_views(
    m: &Match,
    comparison: Option<&ComparisonResult>,
    preview_limit: usize,
) -> [SlotView; 2] {
    [
        slot_view(m, m.a.as_deref(), comparison, preview_limit),
        slot_view(m, m.b.as_deref(), comparison, preview_limit),
    ]
}

fn slot_view(
    m: &Match,
    occupant: Option<&str>,
    comparison: Option<&ComparisonResult>,
    preview_limit: usize,
) -> SlotView {
    let Some(candidate_id) = occupant else {
        return SlotView {
            candidate_id: None,
            name: None,
            party: None,
            is_winner: false,
            headlines: Vec::new(),
        };
    };
    let record = comparison.and_then(|c| c.candidate(candidate_id));
    let headlines = comparison
        .map(|c| {
            c.proposals_of(candidate_id)
                .iter()
                .take(preview_limit)
                .map(|p| p.headline().to_string())
                .collect()
        })
        .unwrap_or_default();
    SlotView {
        candidate_id: Some(candidate_id.to_string()),
        name: record.and_then(|r| r.name.clone()),
        party: record.and_then(|r| r.party.clone()),
        is_winner: m.winner.as_deref() == Some(candidate_id),
        headlines,
    }
}

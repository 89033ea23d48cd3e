//! Vote counting.
//!
//! Ties are broken deterministically: among the targets sharing the top count,
//! the lexicographically lowest name leads. Day eliminations additionally ask
//! for a unique leader and treat a tie as "nobody is voted out".

use std::collections::{BTreeMap, HashMap};

/// Counted votes for one round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    counts: BTreeMap<String, usize>,
}

impl Tally {
    /// Count a voter → target mapping. Empty targets are abstentions.
    pub fn new(votes: &HashMap<String, String>) -> Self {
        let mut counts = BTreeMap::new();
        for target in votes.values().filter(|t| !t.is_empty()) {
            *counts.entry(target.clone()).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn count(&self, target: &str) -> usize {
        self.counts.get(target).copied().unwrap_or(0)
    }

    fn top(&self) -> Option<usize> {
        self.counts.values().copied().max()
    }

    /// Highest count, lowest name among ties.
    pub fn leader(&self) -> Option<&str> {
        let top = self.top()?;
        self.counts
            .iter()
            .find(|(_, count)| **count == top)
            .map(|(name, _)| name.as_str())
    }

    /// The leader only if nobody else shares the top count.
    pub fn unique_leader(&self) -> Option<&str> {
        let top = self.top()?;
        let mut leaders = self.counts.iter().filter(|(_, count)| **count == top);
        match (leaders.next(), leaders.next()) {
            (Some((name, _)), None) => Some(name.as_str()),
            _ => None,
        }
    }

    /// "target:count" pairs ordered by name, e.g. "Player2:3, Player5:1".
    pub fn detail(&self) -> String {
        self.counts
            .iter()
            .map(|(name, count)| format!("{name}:{count}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Plurality winner and a printable breakdown.
///
/// Returns empty strings for an empty (or all-abstain) vote; callers treat an
/// empty winner as no elimination.
pub fn majority_vote(votes: &HashMap<String, String>) -> (String, String) {
    let tally = Tally::new(votes);
    let winner = tally.leader().unwrap_or_default().to_string();
    (winner, tally.detail())
}

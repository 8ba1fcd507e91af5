/*!
Vote tally and aggregation engine for polling-station electoral records.

Raw counts are entered per polling station in an [`ElectoralRecord`], which is
sealed once complete. Sealed records are submitted to an [`Election`], which
derives candidate totals, the winner and an [`ElectionReport`]. The
[`registry::Registry`] ties the entities together the way an application
service would.

See the [manual] for the semantics and the [quick_start] for the command line
tool.
*/
pub mod access;
pub mod builder;
mod election;
pub mod manual;
mod party;
pub mod quick_start;
mod record;
pub mod registry;
mod station;
mod types;

use log::debug;

use std::{
    collections::HashMap,
    ops::{Add, AddAssign},
};

pub use crate::election::*;
pub use crate::party::*;
pub use crate::record::*;
pub use crate::station::*;
pub use crate::types::*;

// **** Ledger ****

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash, Default)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);

    fn checked_add(self, rhs: VoteCount) -> Option<VoteCount> {
        self.0.checked_add(rhs.0).map(VoteCount)
    }
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

impl Add for VoteCount {
    type Output = VoteCount;
    fn add(self: VoteCount, rhs: VoteCount) -> VoteCount {
        VoteCount(self.0 + rhs.0)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
struct CandidateTally {
    votes: VoteCount,
    preferential: VoteCount,
}

/// Replays the finalized records from zero and returns the absolute totals of
/// every candidate that appears in them.
///
/// Nothing is accumulated across calls, so replaying twice gives the same
/// result as replaying once.
fn replay_ledger(records: &[ElectoralRecord]) -> HashMap<CandidateId, CandidateTally> {
    let mut ledger: HashMap<CandidateId, CandidateTally> = HashMap::new();
    for record in records.iter().filter(|r| r.is_finalized()) {
        for vr in record.vote_records() {
            let e = ledger.entry(vr.candidate_id).or_default();
            e.votes += VoteCount(vr.votes);
            e.preferential += VoteCount(vr.preferential_votes);
        }
    }
    debug!(
        "replay_ledger: {} records, {} candidates",
        records.len(),
        ledger.len()
    );
    ledger
}

/// True if every total derived from these records fits in a `u64`.
///
/// All the vote totals of an election (per candidate, per station, blank,
/// null, effective) are bounded by the sum of the effective voters of its
/// records, and the preferential totals by the sum of the preferential votes.
/// Once this holds, the replay and the report can add without checking.
fn ledger_fits<'a>(records: impl Iterator<Item = &'a ElectoralRecord>) -> bool {
    let mut effective = VoteCount::EMPTY;
    let mut preferential = VoteCount::EMPTY;
    for record in records {
        let next = record.checked_totals().and_then(|(eff, pref)| {
            Some((
                effective.checked_add(VoteCount(eff))?,
                preferential.checked_add(VoteCount(pref))?,
            ))
        });
        match next {
            Some((eff, pref)) => {
                effective = eff;
                preferential = pref;
            }
            None => return false,
        }
    }
    true
}

/// Writes the replayed totals into the candidates. Candidates without any
/// counted line get zero; lines for unknown candidates are dropped.
fn apply_ledger(candidates: &mut [Candidate], records: &[ElectoralRecord]) {
    let ledger = replay_ledger(records);
    for c in candidates.iter_mut() {
        let t = ledger.get(&c.id()).cloned().unwrap_or_default();
        c.set_totals(t.votes.0, t.preferential.0);
    }
    let unknown: VoteCount = ledger
        .iter()
        .filter(|(cid, _)| !candidates.iter().any(|c| c.id() == **cid))
        .map(|(_, t)| t.votes)
        .sum();
    if unknown > VoteCount::EMPTY {
        debug!(
            "apply_ledger: {} votes for candidates outside the election were ignored",
            unknown.0
        );
    }
}

/// `part / whole * 100`, defined as 0 when `whole` is 0.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealed(station: &PollingStation, lines: &[(CandidateId, u64, u64)]) -> ElectoralRecord {
        let mut r = ElectoralRecord::new("Record", station, "School", "A-1");
        for (cid, v, p) in lines {
            r.add_vote_record(*cid, *v, *p).unwrap();
        }
        r.finalize("SEAL").unwrap();
        r
    }

    #[test]
    fn percentage_of_nothing_is_zero() {
        assert_eq!(percentage(10, 0), 0.0);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(50, 80), 62.5);
    }

    #[test]
    fn replay_is_absolute() {
        let station = PollingStation::new("001", "School", "Main", 100);
        let a = CandidateId::new();
        let b = CandidateId::new();
        let records = vec![
            sealed(&station, &[(a, 10, 1), (b, 5, 0)]),
            sealed(&station, &[(a, 3, 0)]),
        ];
        let first = replay_ledger(&records);
        let second = replay_ledger(&records);
        assert_eq!(first, second);
        assert_eq!(first[&a].votes, VoteCount(13));
        assert_eq!(first[&a].preferential, VoteCount(1));
        assert_eq!(first[&b].votes, VoteCount(5));
    }

    #[test]
    fn ledger_bounds() {
        let station = PollingStation::new("001", "School", "Main", 100);
        let a = CandidateId::new();
        let half = u64::MAX / 2;
        let first = sealed(&station, &[(a, half, 0)]);
        let second = sealed(&station, &[(a, half, 0)]);
        let third = sealed(&station, &[(a, 2, 0)]);
        assert!(ledger_fits([&first, &second].into_iter()));
        assert!(!ledger_fits([&first, &second, &third].into_iter()));
        assert_eq!(VoteCount(u64::MAX).checked_add(VoteCount(1)), None);
        assert_eq!(VoteCount(1).checked_add(VoteCount(2)), Some(VoteCount(3)));
    }

    #[test]
    fn drafts_are_not_replayed() {
        let station = PollingStation::new("001", "School", "Main", 100);
        let a = CandidateId::new();
        let mut draft = ElectoralRecord::new("Draft", &station, "School", "A-2");
        draft.add_vote_record(a, 40, 0).unwrap();
        let ledger = replay_ledger(&[draft]);
        assert!(ledger.is_empty());
    }
}

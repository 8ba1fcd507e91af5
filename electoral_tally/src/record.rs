use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::percentage;
use crate::station::PollingStation;
use crate::types::*;

/// The tally sheet filed for one polling station.
///
/// A record starts as a draft and accepts vote entries until it is finalized
/// with an official seal. Every mutator rejects a finalized record with
/// [`TallyError::AlreadyFinalized`].
///
/// The number of registered voters is copied from the station when the record
/// is created. Later changes to the station do not affect it.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectoralRecord {
    id: RecordId,
    title: String,
    created_at: DateTime<Utc>,
    place: String,
    station_id: StationId,
    record_number: String,
    total_registered_voters: u64,
    // One entry per candidate.
    vote_records: BTreeMap<CandidateId, VoteRecord>,
    blank_votes: u64,
    null_votes: u64,
    observations: String,
    signatures: Vec<String>,
    state: RecordState,
    updated_at: DateTime<Utc>,
}

impl ElectoralRecord {
    pub fn new(title: &str, station: &PollingStation, place: &str, record_number: &str) -> Self {
        let now = Utc::now();
        ElectoralRecord {
            id: RecordId::new(),
            title: title.to_string(),
            created_at: now,
            place: place.to_string(),
            station_id: station.id(),
            record_number: record_number.to_string(),
            total_registered_voters: station.registered_voters(),
            vote_records: BTreeMap::new(),
            blank_votes: 0,
            null_votes: 0,
            observations: String::new(),
            signatures: Vec::new(),
            state: RecordState::Draft,
            updated_at: now,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn place(&self) -> &str {
        &self.place
    }

    pub fn station_id(&self) -> StationId {
        self.station_id
    }

    pub fn record_number(&self) -> &str {
        &self.record_number
    }

    pub fn total_registered_voters(&self) -> u64 {
        self.total_registered_voters
    }

    pub fn vote_records(&self) -> impl Iterator<Item = &VoteRecord> {
        self.vote_records.values()
    }

    pub fn vote_record(&self, candidate_id: CandidateId) -> Option<&VoteRecord> {
        self.vote_records.get(&candidate_id)
    }

    pub fn blank_votes(&self) -> u64 {
        self.blank_votes
    }

    pub fn null_votes(&self) -> u64 {
        self.null_votes
    }

    pub fn observations(&self) -> &str {
        &self.observations
    }

    pub fn signatures(&self) -> &[String] {
        &self.signatures
    }

    pub fn state(&self) -> &RecordState {
        &self.state
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, RecordState::Finalized { .. })
    }

    /// The seal token, empty until the record is finalized.
    pub fn official_seal(&self) -> Option<&str> {
        match &self.state {
            RecordState::Draft => None,
            RecordState::Finalized { seal, .. } => Some(seal.as_str()),
        }
    }

    fn ensure_draft(&self) -> TallyResult<()> {
        if self.is_finalized() {
            warn!("electoral record {}: rejected mutation after finalization", self.id);
        }
        ensure!(
            !self.is_finalized(),
            AlreadyFinalizedSnafu {
                kind: EntityKind::Record,
                id: self.id.to_string()
            }
        );
        Ok(())
    }

    /// Sets the count for a candidate. A second call for the same candidate
    /// overwrites the first one; counts are never summed.
    pub fn add_vote_record(
        &mut self,
        candidate_id: CandidateId,
        votes: u64,
        preferential_votes: u64,
    ) -> TallyResult<()> {
        self.ensure_draft()?;
        let line = VoteRecord {
            candidate_id,
            votes,
            preferential_votes,
        };
        let lines = self
            .vote_records
            .values()
            .filter(|vr| vr.candidate_id != candidate_id)
            .chain(std::iter::once(&line));
        ensure_fits(lines, self.blank_votes, self.null_votes)?;
        if preferential_votes > votes {
            warn!(
                "electoral record {}: candidate {} has more preferential votes ({}) than votes ({})",
                self.id, candidate_id, preferential_votes, votes
            );
        }
        let previous = self.vote_records.insert(candidate_id, line);
        if let Some(p) = previous {
            debug!(
                "add_vote_record: record {}: candidate {} overwritten ({} -> {})",
                self.id, candidate_id, p.votes, votes
            );
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Absolute counts, not deltas.
    pub fn set_blank_and_null_votes(&mut self, blank_votes: u64, null_votes: u64) -> TallyResult<()> {
        self.ensure_draft()?;
        ensure_fits(self.vote_records.values(), blank_votes, null_votes)?;
        self.blank_votes = blank_votes;
        self.null_votes = null_votes;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn add_signature(&mut self, signature: &str) -> TallyResult<()> {
        self.ensure_draft()?;
        self.signatures.push(signature.to_string());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replaces the observations.
    pub fn add_observation(&mut self, observations: &str) -> TallyResult<()> {
        self.ensure_draft()?;
        self.observations = observations.to_string();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Seals the record. There is no way back.
    pub fn finalize(&mut self, official_seal: &str) -> TallyResult<()> {
        self.ensure_draft()?;
        required("officialSeal", official_seal)?;
        let now = Utc::now();
        self.state = RecordState::Finalized {
            seal: official_seal.to_string(),
            finalized_at: now,
        };
        self.updated_at = now;
        info!(
            "electoral record {} ({}) finalized with {} effective voters",
            self.record_number,
            self.id,
            self.total_effective_voters()
        );
        Ok(())
    }

    /// Effective voters and preferential votes, or `None` if either does not
    /// fit in a `u64`. Always `Some` for a record built through its mutators.
    pub(crate) fn checked_totals(&self) -> Option<(u64, u64)> {
        checked_totals(self.vote_records.values(), self.blank_votes, self.null_votes)
    }

    /// Sum of the regular votes of all candidates. Blank, null and preferential
    /// votes are not included.
    pub fn total_valid_votes(&self) -> u64 {
        self.vote_records.values().map(|vr| vr.votes).sum()
    }

    pub fn total_effective_voters(&self) -> u64 {
        self.total_valid_votes() + self.blank_votes + self.null_votes
    }

    /// Effective over registered voters, in percent. 0 when nobody is registered.
    pub fn turnout_percentage(&self) -> f64 {
        percentage(self.total_effective_voters(), self.total_registered_voters)
    }
}

fn checked_totals<'a>(
    lines: impl Iterator<Item = &'a VoteRecord>,
    blank_votes: u64,
    null_votes: u64,
) -> Option<(u64, u64)> {
    let mut effective = blank_votes.checked_add(null_votes)?;
    let mut preferential: u64 = 0;
    for vr in lines {
        effective = effective.checked_add(vr.votes)?;
        preferential = preferential.checked_add(vr.preferential_votes)?;
    }
    Some((effective, preferential))
}

fn ensure_fits<'a>(
    lines: impl Iterator<Item = &'a VoteRecord>,
    blank_votes: u64,
    null_votes: u64,
) -> TallyResult<()> {
    let fits = checked_totals(lines, blank_votes, null_votes).is_some();
    if !fits {
        warn!("electoral record: rejected counts that overflow the record totals");
    }
    ensure!(fits, CountOverflowSnafu { field: "votes" });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(registered: u64) -> ElectoralRecord {
        let station = PollingStation::new("001", "School 4", "Main St 12", registered);
        ElectoralRecord::new("Record 1", &station, "School 4", "A-001")
    }

    #[test]
    fn resubmission_overwrites() {
        let mut r = record(200);
        let c = CandidateId::new();
        r.add_vote_record(c, 10, 2).unwrap();
        r.add_vote_record(c, 10, 2).unwrap();
        assert_eq!(r.vote_records().count(), 1);
        assert_eq!(
            r.vote_record(c),
            Some(&VoteRecord {
                candidate_id: c,
                votes: 10,
                preferential_votes: 2
            })
        );
        r.add_vote_record(c, 7, 0).unwrap();
        assert_eq!(r.vote_record(c).map(|vr| vr.votes), Some(7));
        assert_eq!(r.total_valid_votes(), 7);
    }

    #[test]
    fn effective_voters_follow_every_mutation() {
        let mut r = record(200);
        let a = CandidateId::new();
        let b = CandidateId::new();
        r.add_vote_record(a, 50, 4).unwrap();
        r.add_vote_record(b, 30, 0).unwrap();
        assert_eq!(r.total_effective_voters(), 80);
        r.set_blank_and_null_votes(5, 2).unwrap();
        assert_eq!(r.total_effective_voters(), 87);
        r.set_blank_and_null_votes(1, 1).unwrap();
        assert_eq!(r.total_effective_voters(), 82);
        // Preferential votes are not part of the valid total.
        assert_eq!(r.total_valid_votes(), 80);
    }

    #[test]
    fn turnout() {
        let mut r = record(200);
        r.add_vote_record(CandidateId::new(), 90, 0).unwrap();
        r.set_blank_and_null_votes(8, 2).unwrap();
        assert_eq!(r.turnout_percentage(), 50.0);

        let mut empty = record(0);
        empty.add_vote_record(CandidateId::new(), 3, 0).unwrap();
        assert_eq!(empty.turnout_percentage(), 0.0);
    }

    #[test]
    fn registered_voters_are_a_snapshot() {
        let mut station = PollingStation::new("002", "Club", "Side St 1", 100);
        let r = ElectoralRecord::new("Record 2", &station, "Club", "A-002");
        station.update(crate::station::StationUpdate {
            registered_voters: Some(500),
            ..Default::default()
        });
        assert_eq!(r.total_registered_voters(), 100);
        assert_eq!(r.station_id(), station.id());
    }

    #[test]
    fn finalization_is_terminal() {
        let mut r = record(200);
        let c = CandidateId::new();
        r.add_vote_record(c, 12, 1).unwrap();
        r.add_signature("President").unwrap();
        assert_eq!(r.official_seal(), None);
        r.finalize("SEAL-001").unwrap();
        assert!(r.is_finalized());
        assert_eq!(r.official_seal(), Some("SEAL-001"));

        let expected = TallyError::AlreadyFinalized {
            kind: EntityKind::Record,
            id: r.id().to_string(),
        };
        assert_eq!(r.add_vote_record(c, 99, 0), Err(expected.clone()));
        assert_eq!(r.set_blank_and_null_votes(1, 1), Err(expected.clone()));
        assert_eq!(r.add_signature("Secretary"), Err(expected.clone()));
        assert_eq!(r.add_observation("late"), Err(expected.clone()));
        assert_eq!(r.finalize("SEAL-002"), Err(expected));

        assert!(r.is_finalized());
        assert_eq!(r.official_seal(), Some("SEAL-001"));
        assert_eq!(r.vote_record(c).map(|vr| vr.votes), Some(12));
        assert_eq!(r.signatures(), &["President".to_string()]);
    }

    #[test]
    fn seal_must_not_be_blank() {
        let mut r = record(10);
        assert_eq!(
            r.finalize(" "),
            Err(TallyError::EmptyField {
                field: "officialSeal"
            })
        );
        assert!(!r.is_finalized());
    }

    #[test]
    fn totals_cannot_overflow() {
        let mut r = record(100);
        let big = i64::MAX as u64;
        let (a, b, c) = (CandidateId::new(), CandidateId::new(), CandidateId::new());
        r.add_vote_record(a, big, 0).unwrap();
        r.add_vote_record(b, big, 0).unwrap();
        assert_eq!(
            r.add_vote_record(c, 5, 0),
            Err(TallyError::CountOverflow { field: "votes" })
        );
        assert!(r.vote_record(c).is_none());
        assert_eq!(r.total_valid_votes(), u64::MAX - 1);

        assert_eq!(
            r.set_blank_and_null_votes(1, 1),
            Err(TallyError::CountOverflow { field: "votes" })
        );
        assert_eq!(r.blank_votes(), 0);
        r.set_blank_and_null_votes(1, 0).unwrap();
        assert_eq!(r.total_effective_voters(), u64::MAX);

        // Replacing a line only counts the new value.
        r.set_blank_and_null_votes(0, 0).unwrap();
        r.add_vote_record(b, 1, 0).unwrap();
        assert_eq!(r.total_valid_votes(), big + 1);
        assert_eq!(r.checked_totals(), Some((big + 1, 0)));
    }

    #[test]
    fn preferential_totals_cannot_overflow() {
        let mut r = record(100);
        r.add_vote_record(CandidateId::new(), 1, u64::MAX).unwrap();
        assert_eq!(
            r.add_vote_record(CandidateId::new(), 1, 1),
            Err(TallyError::CountOverflow { field: "votes" })
        );
    }

    #[test]
    fn observations_are_replaced() {
        let mut r = record(10);
        r.add_observation("ink shortage").unwrap();
        r.add_observation("resolved").unwrap();
        assert_eq!(r.observations(), "resolved");
    }
}

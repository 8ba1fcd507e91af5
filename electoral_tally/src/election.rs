use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::party::Candidate;
use crate::record::ElectoralRecord;
use crate::station::PollingStation;
use crate::types::*;
use crate::{apply_ledger, ledger_fits, percentage};

/// The aggregation root.
///
/// An election owns copies of its candidates and polling stations and the
/// finalized electoral records submitted to it. The candidate totals are
/// recomputed from the records after every change, so a record can only ever
/// count once.
///
/// Once finalized, every change to the candidate, station and record lists is
/// rejected with [`TallyError::AlreadyFinalized`].
#[derive(PartialEq, Debug, Clone)]
pub struct Election {
    id: ElectionId,
    pub name: String,
    pub date: NaiveDate,
    pub election_type: ElectionType,
    pub description: String,
    candidates: Vec<Candidate>,
    polling_stations: Vec<PollingStation>,
    records: Vec<ElectoralRecord>,
    lifecycle: Lifecycle,
    state: ElectionState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// The flat form of an election: everything it owns is referenced by id.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSnapshot {
    pub id: ElectionId,
    pub name: String,
    pub date: NaiveDate,
    pub election_type: ElectionType,
    pub description: String,
    pub candidate_ids: Vec<CandidateId>,
    pub station_ids: Vec<StationId>,
    pub record_ids: Vec<RecordId>,
    pub lifecycle: Lifecycle,
    pub state: ElectionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of the descriptive data of an election.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ElectionUpdate {
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub election_type: Option<ElectionType>,
    pub description: Option<String>,
}

impl Election {
    pub fn new(name: &str, date: NaiveDate, election_type: ElectionType, description: &str) -> Self {
        let now = Utc::now();
        Election {
            id: ElectionId::new(),
            name: name.to_string(),
            date,
            election_type,
            description: description.to_string(),
            candidates: Vec::new(),
            polling_stations: Vec::new(),
            records: Vec::new(),
            lifecycle: Lifecycle::Active,
            state: ElectionState::Open,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds an election from its flat form. The references must already be
    /// resolved, in the order of the snapshot.
    pub(crate) fn restore(
        snapshot: ElectionSnapshot,
        candidates: Vec<Candidate>,
        polling_stations: Vec<PollingStation>,
        records: Vec<ElectoralRecord>,
    ) -> Self {
        let mut election = Election {
            id: snapshot.id,
            name: snapshot.name,
            date: snapshot.date,
            election_type: snapshot.election_type,
            description: snapshot.description,
            candidates,
            polling_stations,
            records,
            lifecycle: snapshot.lifecycle,
            state: snapshot.state,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        };
        election.rebuild_totals();
        election
    }

    pub fn to_snapshot(&self) -> ElectionSnapshot {
        ElectionSnapshot {
            id: self.id,
            name: self.name.clone(),
            date: self.date,
            election_type: self.election_type,
            description: self.description.clone(),
            candidate_ids: self.candidates.iter().map(|c| c.id()).collect(),
            station_ids: self.polling_stations.iter().map(|s| s.id()).collect(),
            record_ids: self.records.iter().map(|r| r.id()).collect(),
            lifecycle: self.lifecycle,
            state: self.state.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn id(&self) -> ElectionId {
        self.id
    }

    pub fn state(&self) -> &ElectionState {
        &self.state
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, ElectionState::Finalized { .. })
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Only touches the descriptive data, so it is allowed after finalization.
    pub fn update(&mut self, update: ElectionUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(election_type) = update.election_type {
            self.election_type = election_type;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        self.touch();
    }

    pub fn deactivate(&mut self) {
        self.set_lifecycle(Lifecycle::Deactivated);
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
        self.updated_at = Utc::now();
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidate(&self, candidate_id: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id() == candidate_id)
    }

    pub fn polling_stations(&self) -> &[PollingStation] {
        &self.polling_stations
    }

    pub fn records(&self) -> &[ElectoralRecord] {
        &self.records
    }

    fn ensure_open(&self) -> TallyResult<()> {
        if self.is_finalized() {
            warn!("election {}: rejected change after finalization", self.id);
        }
        ensure!(
            !self.is_finalized(),
            AlreadyFinalizedSnafu {
                kind: EntityKind::Election,
                id: self.id.to_string()
            }
        );
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn rebuild_totals(&mut self) {
        apply_ledger(&mut self.candidates, &self.records);
    }

    pub fn add_candidate(&mut self, candidate: Candidate) -> TallyResult<()> {
        self.ensure_open()?;
        ensure!(
            self.candidate(candidate.id()).is_none(),
            DuplicateSnafu {
                kind: EntityKind::Candidate,
                id: candidate.id().to_string()
            }
        );
        self.candidates.push(candidate);
        // Records submitted earlier may already carry lines for this candidate.
        self.rebuild_totals();
        self.touch();
        Ok(())
    }

    /// Returns the removed candidate, or `None` if it was not part of the election.
    pub fn remove_candidate(&mut self, candidate_id: CandidateId) -> TallyResult<Option<Candidate>> {
        self.ensure_open()?;
        let removed = self
            .candidates
            .iter()
            .position(|c| c.id() == candidate_id)
            .map(|idx| self.candidates.remove(idx));
        self.touch();
        Ok(removed)
    }

    pub fn add_polling_station(&mut self, station: PollingStation) -> TallyResult<()> {
        self.ensure_open()?;
        ensure!(
            !self.polling_stations.iter().any(|s| s.id() == station.id()),
            DuplicateSnafu {
                kind: EntityKind::PollingStation,
                id: station.id().to_string()
            }
        );
        let capacity = self
            .polling_stations
            .iter()
            .try_fold(station.registered_voters(), |acc, s| {
                acc.checked_add(s.registered_voters())
            });
        ensure!(
            capacity.is_some(),
            CountOverflowSnafu {
                field: "registeredVoters"
            }
        );
        self.polling_stations.push(station);
        self.touch();
        Ok(())
    }

    pub fn remove_polling_station(
        &mut self,
        station_id: StationId,
    ) -> TallyResult<Option<PollingStation>> {
        self.ensure_open()?;
        let removed = self
            .polling_stations
            .iter()
            .position(|s| s.id() == station_id)
            .map(|idx| self.polling_stations.remove(idx));
        self.touch();
        Ok(removed)
    }

    /// Replaces the descriptive data of a candidate copy, keeping its totals.
    /// This does not count as a change of the candidate list.
    pub(crate) fn sync_candidate(&mut self, candidate: &Candidate) {
        if let Some(c) = self.candidates.iter_mut().find(|c| c.id() == candidate.id()) {
            *c = candidate.clone();
            self.rebuild_totals();
        }
    }

    pub(crate) fn sync_station(&mut self, station: &PollingStation) {
        if let Some(s) = self
            .polling_stations
            .iter_mut()
            .find(|s| s.id() == station.id())
        {
            *s = station.clone();
        }
    }

    /// Counts a finalized record in this election.
    ///
    /// The record is rejected if it is still a draft, if it was already
    /// submitted, if its station is not enrolled in the election, or if its
    /// counts would push a total of the election past `u64::MAX`. Lines for
    /// candidates that are not part of the election are kept in the record but
    /// do not count.
    pub fn add_electoral_record(&mut self, record: ElectoralRecord) -> TallyResult<()> {
        self.ensure_open()?;
        ensure!(
            record.is_finalized(),
            RecordNotFinalizedSnafu {
                id: record.id().to_string()
            }
        );
        ensure!(
            !self.records.iter().any(|r| r.id() == record.id()),
            DuplicateSnafu {
                kind: EntityKind::Record,
                id: record.id().to_string()
            }
        );
        if !self
            .polling_stations
            .iter()
            .any(|s| s.id() == record.station_id())
        {
            warn!(
                "add_electoral_record: record {} is for station {} which is not enrolled in election {}",
                record.id(),
                record.station_id(),
                self.id
            );
            return NotFoundSnafu {
                kind: EntityKind::PollingStation,
                id: record.station_id().to_string(),
            }
            .fail();
        }
        ensure!(
            ledger_fits(self.records.iter().chain(std::iter::once(&record))),
            CountOverflowSnafu { field: "votes" }
        );
        if let Some(other) = self
            .records
            .iter()
            .find(|r| r.station_id() == record.station_id())
        {
            warn!(
                "add_electoral_record: station {} already has record {} in election {}",
                record.station_id(),
                other.record_number(),
                self.id
            );
        }
        info!(
            "election {}: counting record {} ({} valid votes)",
            self.id,
            record.record_number(),
            record.total_valid_votes()
        );
        self.records.push(record);
        self.rebuild_totals();
        self.touch();
        Ok(())
    }

    /// Sum of the candidate totals.
    pub fn total_votes(&self) -> u64 {
        self.candidates.iter().map(|c| c.votes()).sum()
    }

    pub fn total_blank_votes(&self) -> u64 {
        self.records.iter().map(|r| r.blank_votes()).sum()
    }

    pub fn total_null_votes(&self) -> u64 {
        self.records.iter().map(|r| r.null_votes()).sum()
    }

    /// Registered voters over the enrolled stations. Saturates at `u64::MAX`
    /// if the stations were resized after enrollment.
    pub fn total_registered_voters(&self) -> u64 {
        self.polling_stations
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.registered_voters()))
    }

    /// The candidate with the most votes.
    ///
    /// On a tie, the candidate that comes first in the candidate list wins.
    /// There is no other tie-break.
    pub fn winner(&self) -> Option<&Candidate> {
        let mut winner: Option<&Candidate> = None;
        for c in self.candidates.iter() {
            match winner {
                Some(w) if c.votes() <= w.votes() => {}
                _ => winner = Some(c),
            }
        }
        winner
    }

    fn station_results(&self) -> Vec<StationResult> {
        self.polling_stations
            .iter()
            .map(|station| {
                let counted: Vec<&ElectoralRecord> = self
                    .records
                    .iter()
                    .filter(|r| r.station_id() == station.id())
                    .collect();
                let valid_votes: u64 = counted.iter().map(|r| r.total_valid_votes()).sum();
                let blank_votes: u64 = counted.iter().map(|r| r.blank_votes()).sum();
                let null_votes: u64 = counted.iter().map(|r| r.null_votes()).sum();
                let total_votes = valid_votes + blank_votes + null_votes;
                StationResult {
                    station_id: station.id(),
                    station_number: station.station_number.clone(),
                    records_counted: counted.len(),
                    valid_votes,
                    blank_votes,
                    null_votes,
                    total_votes,
                    registered_voters: station.registered_voters(),
                    participation: percentage(total_votes, station.registered_voters()),
                }
            })
            .collect()
    }

    /// One entry per party with candidates in the election, in the order the
    /// parties first appear in the candidate list, then sorted by votes.
    fn party_results(&self, total_votes: u64) -> Vec<PartyResult> {
        let mut parties: Vec<PartyResult> = Vec::new();
        for c in self.candidates.iter() {
            let idx = match parties.iter().position(|p| p.party_id == c.party_id()) {
                Some(idx) => idx,
                None => {
                    parties.push(PartyResult {
                        party_id: c.party_id(),
                        candidates: 0,
                        votes: 0,
                        preferential_votes: 0,
                        percentage: 0.0,
                    });
                    parties.len() - 1
                }
            };
            let p = &mut parties[idx];
            p.candidates += 1;
            p.votes += c.votes();
            p.preferential_votes += c.preferential_votes();
        }
        for p in parties.iter_mut() {
            p.percentage = percentage(p.votes, total_votes);
        }
        parties.sort_by(|a, b| b.votes.cmp(&a.votes));
        parties
    }

    /// A snapshot of the current results. Does not modify the election.
    pub fn generate_report(&self) -> ElectionReport {
        let total_votes = self.total_votes();
        let blank_votes = self.total_blank_votes();
        let null_votes = self.total_null_votes();

        let mut results: Vec<CandidateResult> = self
            .candidates
            .iter()
            .map(|c| CandidateResult {
                candidate_id: c.id(),
                party_id: c.party_id(),
                candidate_name: c.full_name(),
                votes: c.votes(),
                preferential_votes: c.preferential_votes(),
                percentage: percentage(c.votes(), total_votes),
            })
            .collect();
        // Stable: equal counts keep the candidate order.
        results.sort_by(|a, b| b.votes.cmp(&a.votes));

        let parties = self.party_results(total_votes);
        let registered_voters = self.total_registered_voters();
        let effective_voters = total_votes + blank_votes + null_votes;

        ElectionReport {
            election_id: self.id,
            total_votes,
            blank_votes,
            null_votes,
            results,
            parties,
            winner: self.winner().map(|c| c.id()),
            turnout: TurnoutSummary {
                registered_voters,
                effective_voters,
                percentage: percentage(effective_voters, registered_voters),
            },
            stations: self.station_results(),
            records_counted: self.records.len(),
            finalized: self.is_finalized(),
            generated_at: Utc::now(),
        }
    }

    /// Freezes the election. There is no way back.
    pub fn finalize(&mut self) -> TallyResult<()> {
        self.ensure_open()?;
        let now = Utc::now();
        self.state = ElectionState::Finalized { finalized_at: now };
        self.updated_at = now;
        info!(
            "election {} ({}) finalized: {} votes from {} records",
            self.name,
            self.id,
            self.total_votes(),
            self.records.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::party::PoliticalParty;

    struct Fixture {
        election: Election,
        station: PollingStation,
        a: CandidateId,
        b: CandidateId,
    }

    fn fixture() -> Fixture {
        let _ = env_logger::builder().is_test(true).try_init();
        let party = PoliticalParty::new("Partido Nacional", "PN", "Juan Perez", None);
        let a = Candidate::new("Ana", "Silva", "1", &party, None);
        let b = Candidate::new("Pedro", "Lopez", "2", &party, None);
        let station = PollingStation::new("001", "School", "Main St", 200);
        let date = NaiveDate::from_ymd_opt(2024, 5, 12).unwrap();
        let mut election = Election::new("Mayor 2024", date, ElectionType::Municipal, "");
        let (a_id, b_id) = (a.id(), b.id());
        election.add_candidate(a).unwrap();
        election.add_candidate(b).unwrap();
        election.add_polling_station(station.clone()).unwrap();
        Fixture {
            election,
            station,
            a: a_id,
            b: b_id,
        }
    }

    fn sealed(
        station: &PollingStation,
        lines: &[(CandidateId, u64, u64)],
        blank: u64,
        null: u64,
    ) -> ElectoralRecord {
        let mut r = ElectoralRecord::new("Record", station, "School", "A-1");
        for (cid, v, p) in lines {
            r.add_vote_record(*cid, *v, *p).unwrap();
        }
        r.set_blank_and_null_votes(blank, null).unwrap();
        r.finalize("SEAL").unwrap();
        r
    }

    #[test]
    fn aggregation() {
        let mut f = fixture();
        let r = sealed(&f.station, &[(f.a, 50, 0), (f.b, 30, 0)], 5, 2);
        f.election.add_electoral_record(r).unwrap();
        assert_eq!(f.election.total_votes(), 80);
        assert_eq!(f.election.total_blank_votes(), 5);
        assert_eq!(f.election.total_null_votes(), 2);
        assert_eq!(f.election.winner().map(|c| c.id()), Some(f.a));
    }

    #[test]
    fn the_same_record_counts_once() {
        let mut f = fixture();
        let r = sealed(&f.station, &[(f.a, 50, 3)], 0, 0);
        f.election.add_electoral_record(r.clone()).unwrap();
        let err = f.election.add_electoral_record(r.clone()).unwrap_err();
        assert_eq!(
            err,
            TallyError::Duplicate {
                kind: EntityKind::Record,
                id: r.id().to_string()
            }
        );
        assert_eq!(f.election.total_votes(), 50);
        assert_eq!(f.election.candidate(f.a).unwrap().preferential_votes(), 3);
        assert_eq!(f.election.records().len(), 1);
    }

    #[test]
    fn drafts_are_not_counted() {
        let mut f = fixture();
        let mut draft = ElectoralRecord::new("Draft", &f.station, "School", "A-2");
        draft.add_vote_record(f.a, 10, 0).unwrap();
        let err = f.election.add_electoral_record(draft.clone()).unwrap_err();
        assert_eq!(
            err,
            TallyError::RecordNotFinalized {
                id: draft.id().to_string()
            }
        );
        assert_eq!(f.election.total_votes(), 0);
    }

    #[test]
    fn report_is_sorted_by_votes() {
        let mut f = fixture();
        let r = sealed(&f.station, &[(f.a, 30, 1), (f.b, 50, 2)], 5, 2);
        f.election.add_electoral_record(r).unwrap();
        let report = f.election.generate_report();
        assert_eq!(report.total_votes, 80);
        assert_eq!(report.results[0].candidate_id, f.b);
        assert_eq!(report.results[0].percentage, 62.5);
        assert_eq!(report.results[1].candidate_id, f.a);
        assert_eq!(report.results[1].percentage, 37.5);
        assert_eq!(report.winner, Some(f.b));
        assert_eq!(report.turnout.registered_voters, 200);
        assert_eq!(report.turnout.effective_voters, 87);
        assert_eq!(report.turnout.percentage, 43.5);
        assert_eq!(report.stations.len(), 1);
        assert_eq!(report.stations[0].records_counted, 1);
        assert_eq!(report.stations[0].total_votes, 87);
        assert!(!report.finalized);
        // Generating a report changes nothing.
        assert_eq!(f.election.generate_report().results, report.results);
    }

    #[test]
    fn empty_report_has_zero_percentages() {
        let f = fixture();
        let report = f.election.generate_report();
        assert_eq!(report.total_votes, 0);
        assert!(report.results.iter().all(|r| r.percentage == 0.0));
        assert_eq!(report.turnout.percentage, 0.0);
    }

    #[test]
    fn tie_goes_to_the_first_candidate() {
        let mut f = fixture();
        let r = sealed(&f.station, &[(f.a, 40, 0), (f.b, 40, 9)], 0, 0);
        f.election.add_electoral_record(r).unwrap();
        for _ in 0..5 {
            assert_eq!(f.election.winner().map(|c| c.id()), Some(f.a));
        }
        let report = f.election.generate_report();
        assert_eq!(report.results[0].candidate_id, f.a);
        assert_eq!(report.results[1].candidate_id, f.b);
    }

    #[test]
    fn no_candidates_no_winner() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 12).unwrap();
        let election = Election::new("Referendum", date, ElectionType::Referendum, "");
        assert!(election.winner().is_none());
    }

    #[test]
    fn late_candidates_pick_up_counted_votes() {
        let mut f = fixture();
        let party = PoliticalParty::new("Frente Amplio", "FA", "Carlos", None);
        let late = Candidate::new("Laura", "Fernandez", "3", &party, None);
        let r = sealed(&f.station, &[(f.a, 10, 0), (late.id(), 25, 4)], 0, 0);
        f.election.add_electoral_record(r).unwrap();
        assert_eq!(f.election.total_votes(), 10);
        let late_id = late.id();
        f.election.add_candidate(late).unwrap();
        assert_eq!(f.election.candidate(late_id).unwrap().votes(), 25);
        assert_eq!(f.election.total_votes(), 35);
        assert_eq!(f.election.winner().map(|c| c.id()), Some(late_id));
    }

    #[test]
    fn duplicate_candidates_are_rejected() {
        let mut f = fixture();
        let copy = f.election.candidate(f.a).unwrap().clone();
        assert!(matches!(
            f.election.add_candidate(copy),
            Err(TallyError::Duplicate { .. })
        ));
        assert_eq!(f.election.candidates().len(), 2);
    }

    #[test]
    fn remove_candidate() {
        let mut f = fixture();
        let r = sealed(&f.station, &[(f.a, 10, 0), (f.b, 20, 0)], 0, 0);
        f.election.add_electoral_record(r).unwrap();
        let removed = f.election.remove_candidate(f.b).unwrap();
        assert_eq!(removed.map(|c| c.id()), Some(f.b));
        assert_eq!(f.election.total_votes(), 10);
        assert!(f.election.remove_candidate(f.b).unwrap().is_none());
    }

    #[test]
    fn finalized_election_is_frozen() {
        let mut f = fixture();
        let r = sealed(&f.station, &[(f.a, 10, 0)], 1, 0);
        f.election.add_electoral_record(r).unwrap();
        f.election.finalize().unwrap();
        assert!(f.election.is_finalized());

        let party = PoliticalParty::new("Frente Amplio", "FA", "Carlos", None);
        let late = Candidate::new("Laura", "Fernandez", "3", &party, None);
        let other = sealed(&f.station, &[(f.b, 99, 0)], 0, 0);

        let is_frozen = |res: TallyResult<()>| {
            matches!(
                res,
                Err(TallyError::AlreadyFinalized {
                    kind: EntityKind::Election,
                    ..
                })
            )
        };
        assert!(is_frozen(f.election.add_candidate(late)));
        assert!(is_frozen(f.election.add_electoral_record(other)));
        assert!(is_frozen(f.election.finalize()));
        assert!(is_frozen(f.election.remove_candidate(f.a).map(|_| ())));
        assert!(is_frozen(
            f.election
                .add_polling_station(PollingStation::new("002", "Club", "Side", 10))
        ));
        assert!(is_frozen(
            f.election.remove_polling_station(f.station.id()).map(|_| ())
        ));

        assert!(f.election.is_finalized());
        assert_eq!(f.election.total_votes(), 10);
        assert_eq!(f.election.records().len(), 1);
        assert!(f.election.generate_report().finalized);
    }

    #[test]
    fn totals_cannot_overflow() {
        let mut f = fixture();
        let half = u64::MAX / 2;
        let r1 = sealed(&f.station, &[(f.a, half, 0)], 0, 0);
        let r2 = sealed(&f.station, &[(f.b, half, 0)], 0, 0);
        f.election.add_electoral_record(r1).unwrap();
        f.election.add_electoral_record(r2).unwrap();
        let r3 = sealed(&f.station, &[(f.a, 2, 0)], 0, 0);
        assert_eq!(
            f.election.add_electoral_record(r3),
            Err(TallyError::CountOverflow { field: "votes" })
        );
        assert_eq!(f.election.records().len(), 2);
        assert_eq!(f.election.total_votes(), half * 2);
        assert_eq!(f.election.candidate(f.a).unwrap().votes(), half);
    }

    #[test]
    fn registered_voters_cannot_overflow() {
        let mut f = fixture();
        let huge = PollingStation::new("002", "Club", "Side", u64::MAX);
        assert_eq!(
            f.election.add_polling_station(huge),
            Err(TallyError::CountOverflow {
                field: "registeredVoters"
            })
        );
        assert_eq!(f.election.polling_stations().len(), 1);
        assert_eq!(f.election.total_registered_voters(), 200);
    }

    #[test]
    fn records_need_an_enrolled_station() {
        let mut f = fixture();
        let stranger = PollingStation::new("099", "Elsewhere", "Far St", 50);
        let r = sealed(&stranger, &[(f.a, 10, 0)], 0, 0);
        assert_eq!(
            f.election.add_electoral_record(r),
            Err(TallyError::NotFound {
                kind: EntityKind::PollingStation,
                id: stranger.id().to_string()
            })
        );
        assert!(f.election.records().is_empty());
        assert_eq!(f.election.total_votes(), 0);
    }

    #[test]
    fn party_results() {
        let mut f = fixture();
        let fa = PoliticalParty::new("Frente Amplio", "FA", "Carlos", None);
        let laura = Candidate::new("Laura", "Fernandez", "3", &fa, None);
        let laura_id = laura.id();
        f.election.add_candidate(laura).unwrap();
        let pn = f.election.candidate(f.a).unwrap().party_id();
        let r = sealed(
            &f.station,
            &[(f.a, 20, 1), (f.b, 15, 2), (laura_id, 45, 6)],
            0,
            0,
        );
        f.election.add_electoral_record(r).unwrap();
        let report = f.election.generate_report();
        assert_eq!(report.parties.len(), 2);
        assert_eq!(report.parties[0].party_id, fa.id());
        assert_eq!(report.parties[0].candidates, 1);
        assert_eq!(report.parties[0].votes, 45);
        assert_eq!(report.parties[0].percentage, 56.25);
        assert_eq!(report.parties[1].party_id, pn);
        assert_eq!(report.parties[1].candidates, 2);
        assert_eq!(report.parties[1].votes, 35);
        assert_eq!(report.parties[1].preferential_votes, 3);
        assert_eq!(report.parties[1].percentage, 43.75);
    }

    #[test]
    fn empty_parties_have_zero_percentage() {
        let f = fixture();
        let report = f.election.generate_report();
        assert_eq!(report.parties.len(), 1);
        assert_eq!(report.parties[0].candidates, 2);
        assert_eq!(report.parties[0].votes, 0);
        assert_eq!(report.parties[0].percentage, 0.0);
    }

    #[test]
    fn descriptive_update_after_finalize() {
        let mut f = fixture();
        f.election.finalize().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        f.election.update(ElectionUpdate {
            name: Some("Mayor 2024 (runoff)".to_string()),
            date: Some(date),
            ..Default::default()
        });
        assert_eq!(f.election.name, "Mayor 2024 (runoff)");
        assert_eq!(f.election.date, date);
        assert_eq!(f.election.election_type, ElectionType::Municipal);
        assert!(f.election.is_finalized());
    }

    #[test]
    fn snapshot_round_trip_replays_totals() {
        let mut f = fixture();
        let r = sealed(&f.station, &[(f.a, 12, 2), (f.b, 8, 0)], 0, 0);
        f.election.add_electoral_record(r).unwrap();
        let snapshot = f.election.to_snapshot();
        assert_eq!(snapshot.candidate_ids, vec![f.a, f.b]);

        // Copies as they would come back from storage: without totals.
        let candidates: Vec<Candidate> = f
            .election
            .candidates()
            .iter()
            .map(|c| serde_json::from_str(&serde_json::to_string(c).unwrap()).unwrap())
            .collect();
        assert!(candidates.iter().all(|c| c.votes() == 0));

        let restored = Election::restore(
            snapshot,
            candidates,
            f.election.polling_stations().to_vec(),
            f.election.records().to_vec(),
        );
        assert_eq!(restored.total_votes(), 20);
        assert_eq!(restored.candidate(f.a).unwrap().preferential_votes(), 2);
        assert_eq!(restored.id(), f.election.id());
    }
}

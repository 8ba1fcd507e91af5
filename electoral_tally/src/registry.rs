/*!
In-memory persistence for the entities of the engine.

The [`Registry`] plays the role of the application service: it owns one
[`Catalog`] per entity kind, resolves identifiers to entities, and forwards
the operations to them. Elections hold copies of the candidates, stations and
finalized records enrolled in them; the registry keeps those copies in sync
when the originals are updated.

```
use chrono::NaiveDate;
use electoral_tally::registry::Registry;
use electoral_tally::{ElectionType, TallyError};

let mut reg = Registry::new();
let pn = reg.create_party("Partido Nacional", "pn", "Juan Perez", None)?;
let ana = reg.create_candidate("Ana", "Silva", "1234", pn, None)?;
let station = reg.create_station("001", "School 4", "Main St 12", 200)?;
let date = NaiveDate::from_ymd_opt(2024, 5, 12).unwrap();
let election = reg.create_election("Mayor", date, ElectionType::Municipal, "")?;
reg.enroll_candidate(election, ana)?;
reg.enroll_station(election, station)?;

let record = reg.create_record("Record 1", station, "School 4", "A-001")?;
reg.register_votes(record, ana, 120, 7)?;
reg.set_blank_and_null_votes(record, 4, 1)?;
reg.finalize_record(record, "SEAL-001")?;
reg.submit_record(election, record)?;

let report = reg.report(election)?;
assert_eq!(report.total_votes, 120);
assert_eq!(report.winner, Some(ana));
# Ok::<(), TallyError>(())
```
*/

use std::fmt::Display;

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::types::*;
use crate::{
    CandidateUpdate, Candidate, Election, ElectionSnapshot, ElectionUpdate, ElectoralRecord,
    MemberUpdate, PartyUpdate, PoliticalParty, PollingStation, PollingStationMember,
    StationUpdate,
};

/// Anything stored in a [`Catalog`].
pub trait Entity {
    type Id: Copy + Eq + Display;
    const KIND: EntityKind;

    fn entity_id(&self) -> Self::Id;
}

/// Entities that are deactivated instead of deleted.
pub trait SoftDelete: Entity {
    fn is_active(&self) -> bool;
    fn soft_delete(&mut self);
}

macro_rules! entity {
    ($t:ty, $id:ty, $kind:expr) => {
        impl Entity for $t {
            type Id = $id;
            const KIND: EntityKind = $kind;

            fn entity_id(&self) -> $id {
                self.id()
            }
        }
    };
    ($t:ty, $id:ty, $kind:expr, soft_delete) => {
        entity!($t, $id, $kind);

        impl SoftDelete for $t {
            fn is_active(&self) -> bool {
                self.lifecycle().is_active()
            }

            fn soft_delete(&mut self) {
                self.deactivate()
            }
        }
    };
}

entity!(PoliticalParty, PartyId, EntityKind::Party, soft_delete);
entity!(Candidate, CandidateId, EntityKind::Candidate, soft_delete);
entity!(PollingStation, StationId, EntityKind::PollingStation, soft_delete);
entity!(PollingStationMember, MemberId, EntityKind::Member, soft_delete);
entity!(Election, ElectionId, EntityKind::Election, soft_delete);
entity!(ElectoralRecord, RecordId, EntityKind::Record);

/// An ordered collection of entities with unique ids.
#[derive(PartialEq, Debug, Clone)]
pub struct Catalog<T> {
    items: Vec<T>,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Catalog { items: Vec::new() }
    }
}

impl<T: Entity> Catalog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, item: T) -> TallyResult<T::Id> {
        let id = item.entity_id();
        ensure!(
            !self.contains(id),
            DuplicateSnafu {
                kind: T::KIND,
                id: id.to_string()
            }
        );
        self.items.push(item);
        Ok(id)
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.items.iter().any(|it| it.entity_id() == id)
    }

    pub fn get(&self, id: T::Id) -> TallyResult<&T> {
        self.items
            .iter()
            .find(|it| it.entity_id() == id)
            .context(NotFoundSnafu {
                kind: T::KIND,
                id: id.to_string(),
            })
    }

    pub fn get_mut(&mut self, id: T::Id) -> TallyResult<&mut T> {
        self.items
            .iter_mut()
            .find(|it| it.entity_id() == id)
            .context(NotFoundSnafu {
                kind: T::KIND,
                id: id.to_string(),
            })
    }

    /// Every entity, including the deactivated ones, in insertion order.
    pub fn all(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }
}

impl<T: SoftDelete> Catalog<T> {
    pub fn list_active(&self) -> Vec<&T> {
        self.items.iter().filter(|it| it.is_active()).collect()
    }

    pub fn deactivate(&mut self, id: T::Id) -> TallyResult<()> {
        self.get_mut(id)?.soft_delete();
        debug!("deactivate: {} {}", T::KIND, id);
        Ok(())
    }
}

/// The flat, serializable form of a [`Registry`].
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    pub parties: Vec<PoliticalParty>,
    pub candidates: Vec<Candidate>,
    pub stations: Vec<PollingStation>,
    pub members: Vec<PollingStationMember>,
    pub records: Vec<ElectoralRecord>,
    pub elections: Vec<ElectionSnapshot>,
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct Registry {
    parties: Catalog<PoliticalParty>,
    candidates: Catalog<Candidate>,
    stations: Catalog<PollingStation>,
    members: Catalog<PollingStationMember>,
    records: Catalog<ElectoralRecord>,
    elections: Catalog<Election>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ******** Parties ********

    pub fn create_party(
        &mut self,
        name: &str,
        acronym: &str,
        legal_representative: &str,
        logo: Option<&str>,
    ) -> TallyResult<PartyId> {
        required("name", name)?;
        required("acronym", acronym)?;
        let party = PoliticalParty::new(name, acronym, legal_representative, logo);
        info!("create_party: {} ({})", party.name, party.acronym());
        self.parties.append(party)
    }

    pub fn parties(&self) -> Vec<&PoliticalParty> {
        self.parties.list_active()
    }

    pub fn party(&self, id: PartyId) -> TallyResult<&PoliticalParty> {
        self.parties.get(id)
    }

    /// Looks a party up by acronym, case-insensitively.
    pub fn party_by_acronym(&self, acronym: &str) -> Option<&PoliticalParty> {
        let acronym = acronym.to_uppercase();
        self.parties.all().iter().find(|p| p.acronym() == acronym)
    }

    pub fn update_party(&mut self, id: PartyId, update: PartyUpdate) -> TallyResult<()> {
        if let Some(name) = update.name.as_deref() {
            required("name", name)?;
        }
        if let Some(acronym) = update.acronym.as_deref() {
            required("acronym", acronym)?;
        }
        self.parties.get_mut(id)?.update(update);
        Ok(())
    }

    pub fn deactivate_party(&mut self, id: PartyId) -> TallyResult<()> {
        self.parties.deactivate(id)
    }

    // ******** Candidates ********

    /// Fails with `NotFound` if the party is unknown. Nothing is created then.
    pub fn create_candidate(
        &mut self,
        first_name: &str,
        last_name: &str,
        national_id: &str,
        party_id: PartyId,
        position: Option<&str>,
    ) -> TallyResult<CandidateId> {
        required("firstName", first_name)?;
        required("lastName", last_name)?;
        let party = self.parties.get(party_id)?;
        let candidate = Candidate::new(first_name, last_name, national_id, party, position);
        info!(
            "create_candidate: {} for {}",
            candidate.full_name(),
            party.acronym()
        );
        self.candidates.append(candidate)
    }

    pub fn candidates(&self) -> Vec<&Candidate> {
        self.candidates.list_active()
    }

    /// The catalog copy. Its vote counters are always zero: totals only exist
    /// inside an election.
    pub fn candidate(&self, id: CandidateId) -> TallyResult<&Candidate> {
        self.candidates.get(id)
    }

    pub fn update_candidate(&mut self, id: CandidateId, update: CandidateUpdate) -> TallyResult<()> {
        if let Some(first_name) = update.first_name.as_deref() {
            required("firstName", first_name)?;
        }
        if let Some(last_name) = update.last_name.as_deref() {
            required("lastName", last_name)?;
        }
        let candidate = self.candidates.get_mut(id)?;
        candidate.update(update);
        let candidate = candidate.clone();
        self.propagate_candidate(&candidate);
        Ok(())
    }

    pub fn deactivate_candidate(&mut self, id: CandidateId) -> TallyResult<()> {
        self.candidates.deactivate(id)?;
        let candidate = self.candidates.get(id)?.clone();
        self.propagate_candidate(&candidate);
        Ok(())
    }

    fn propagate_candidate(&mut self, candidate: &Candidate) {
        for election in self.elections.iter_mut() {
            election.sync_candidate(candidate);
        }
    }

    // ******** Polling stations ********

    pub fn create_station(
        &mut self,
        station_number: &str,
        location: &str,
        address: &str,
        registered_voters: u64,
    ) -> TallyResult<StationId> {
        required("stationNumber", station_number)?;
        let station = PollingStation::new(station_number, location, address, registered_voters);
        info!(
            "create_station: {} ({} registered voters)",
            station.station_number, registered_voters
        );
        self.stations.append(station)
    }

    pub fn stations(&self) -> Vec<&PollingStation> {
        self.stations.list_active()
    }

    pub fn station(&self, id: StationId) -> TallyResult<&PollingStation> {
        self.stations.get(id)
    }

    pub fn update_station(&mut self, id: StationId, update: StationUpdate) -> TallyResult<()> {
        if let Some(number) = update.station_number.as_deref() {
            required("stationNumber", number)?;
        }
        self.with_station(id, |s| s.update(update))?;
        Ok(())
    }

    pub fn update_station_voter_count(
        &mut self,
        id: StationId,
        effective_voters: u64,
    ) -> TallyResult<()> {
        self.with_station(id, |s| s.update_voter_count(effective_voters))?;
        Ok(())
    }

    pub fn deactivate_station(&mut self, id: StationId) -> TallyResult<()> {
        self.with_station(id, |s| s.deactivate())?;
        Ok(())
    }

    /// Applies `f` to the catalog station and pushes the result to the elections.
    fn with_station<R>(
        &mut self,
        id: StationId,
        f: impl FnOnce(&mut PollingStation) -> R,
    ) -> TallyResult<R> {
        let station = self.stations.get_mut(id)?;
        let res = f(station);
        let station = station.clone();
        for election in self.elections.iter_mut() {
            election.sync_station(&station);
        }
        Ok(res)
    }

    // ******** Polling station members ********

    pub fn create_member(
        &mut self,
        first_name: &str,
        last_name: &str,
        national_id: &str,
        member_type: MemberType,
        phone_number: Option<&str>,
        email: Option<&str>,
    ) -> TallyResult<MemberId> {
        required("firstName", first_name)?;
        required("lastName", last_name)?;
        let member = PollingStationMember::new(
            first_name,
            last_name,
            national_id,
            member_type,
            phone_number,
            email,
        );
        self.members.append(member)
    }

    pub fn members(&self) -> Vec<&PollingStationMember> {
        self.members.list_active()
    }

    pub fn member(&self, id: MemberId) -> TallyResult<&PollingStationMember> {
        self.members.get(id)
    }

    pub fn update_member(&mut self, id: MemberId, update: MemberUpdate) -> TallyResult<()> {
        if let Some(first_name) = update.first_name.as_deref() {
            required("firstName", first_name)?;
        }
        if let Some(last_name) = update.last_name.as_deref() {
            required("lastName", last_name)?;
        }
        let member = self.members.get_mut(id)?;
        member.update(update);
        let member = member.clone();
        self.propagate_member(&member)
    }

    /// The member stays in the slots it holds, marked as deactivated.
    pub fn deactivate_member(&mut self, id: MemberId) -> TallyResult<()> {
        self.members.deactivate(id)?;
        let member = self.members.get(id)?.clone();
        self.propagate_member(&member)
    }

    /// Refreshes the roster copies of the member, in the catalog stations and
    /// in the elections they are enrolled in.
    fn propagate_member(&mut self, member: &PollingStationMember) -> TallyResult<()> {
        let holders: Vec<StationId> = self
            .stations
            .all()
            .iter()
            .filter(|s| s.roster().contains(member.id()))
            .map(|s| s.id())
            .collect();
        for station_id in holders {
            debug!(
                "propagate_member: {} in station {}",
                member.full_name(),
                station_id
            );
            self.with_station(station_id, |s| s.refresh_member(member))?;
        }
        Ok(())
    }

    /// Puts the member in the station slot of its type. Returns the member
    /// that held the slot before, if any.
    pub fn assign_member(
        &mut self,
        station_id: StationId,
        member_id: MemberId,
    ) -> TallyResult<Option<PollingStationMember>> {
        let member = self.members.get(member_id)?.clone();
        self.with_station(station_id, |s| s.add_member(member))
    }

    pub fn unassign_member(
        &mut self,
        station_id: StationId,
        member_type: MemberType,
    ) -> TallyResult<Option<PollingStationMember>> {
        self.with_station(station_id, |s| s.remove_member(member_type))
    }

    // ******** Electoral records ********

    /// Fails with `NotFound` if the station is unknown. Nothing is created then.
    pub fn create_record(
        &mut self,
        title: &str,
        station_id: StationId,
        place: &str,
        record_number: &str,
    ) -> TallyResult<RecordId> {
        required("title", title)?;
        let station = self.stations.get(station_id)?;
        let record = ElectoralRecord::new(title, station, place, record_number);
        debug!(
            "create_record: {} for station {}",
            record.record_number(),
            station.station_number
        );
        self.records.append(record)
    }

    /// Stores a record assembled elsewhere, for example with the
    /// [`crate::builder::Builder`]. The station and every candidate it names
    /// must be known.
    pub fn file_record(&mut self, record: ElectoralRecord) -> TallyResult<RecordId> {
        required("title", record.title())?;
        self.stations.get(record.station_id())?;
        for vr in record.vote_records() {
            self.candidates.get(vr.candidate_id)?;
        }
        self.records.append(record)
    }

    /// Every record, drafts included. Records are never deleted.
    pub fn records(&self) -> &[ElectoralRecord] {
        self.records.all()
    }

    pub fn record(&self, id: RecordId) -> TallyResult<&ElectoralRecord> {
        self.records.get(id)
    }

    pub fn register_votes(
        &mut self,
        record_id: RecordId,
        candidate_id: CandidateId,
        votes: u64,
        preferential_votes: u64,
    ) -> TallyResult<()> {
        self.candidates.get(candidate_id)?;
        self.records
            .get_mut(record_id)?
            .add_vote_record(candidate_id, votes, preferential_votes)
    }

    pub fn set_blank_and_null_votes(
        &mut self,
        record_id: RecordId,
        blank_votes: u64,
        null_votes: u64,
    ) -> TallyResult<()> {
        self.records
            .get_mut(record_id)?
            .set_blank_and_null_votes(blank_votes, null_votes)
    }

    pub fn sign_record(&mut self, record_id: RecordId, signature: &str) -> TallyResult<()> {
        self.records.get_mut(record_id)?.add_signature(signature)
    }

    pub fn annotate_record(&mut self, record_id: RecordId, observations: &str) -> TallyResult<()> {
        self.records.get_mut(record_id)?.add_observation(observations)
    }

    pub fn finalize_record(&mut self, record_id: RecordId, official_seal: &str) -> TallyResult<()> {
        self.records.get_mut(record_id)?.finalize(official_seal)
    }

    // ******** Elections ********

    pub fn create_election(
        &mut self,
        name: &str,
        date: NaiveDate,
        election_type: ElectionType,
        description: &str,
    ) -> TallyResult<ElectionId> {
        required("name", name)?;
        let election = Election::new(name, date, election_type, description);
        info!("create_election: {} ({}, {})", name, election_type, date);
        self.elections.append(election)
    }

    pub fn elections(&self) -> Vec<&Election> {
        self.elections.list_active()
    }

    pub fn election(&self, id: ElectionId) -> TallyResult<&Election> {
        self.elections.get(id)
    }

    /// Descriptive changes only, so a finalized election accepts them too.
    pub fn update_election(&mut self, id: ElectionId, update: ElectionUpdate) -> TallyResult<()> {
        if let Some(name) = update.name.as_deref() {
            required("name", name)?;
        }
        self.elections.get_mut(id)?.update(update);
        Ok(())
    }

    pub fn deactivate_election(&mut self, id: ElectionId) -> TallyResult<()> {
        self.elections.deactivate(id)
    }

    pub fn enroll_candidate(
        &mut self,
        election_id: ElectionId,
        candidate_id: CandidateId,
    ) -> TallyResult<()> {
        let candidate = self.candidates.get(candidate_id)?.clone();
        self.elections.get_mut(election_id)?.add_candidate(candidate)
    }

    pub fn withdraw_candidate(
        &mut self,
        election_id: ElectionId,
        candidate_id: CandidateId,
    ) -> TallyResult<()> {
        self.elections
            .get_mut(election_id)?
            .remove_candidate(candidate_id)?
            .context(NotFoundSnafu {
                kind: EntityKind::Candidate,
                id: candidate_id.to_string(),
            })?;
        Ok(())
    }

    pub fn enroll_station(&mut self, election_id: ElectionId, station_id: StationId) -> TallyResult<()> {
        let station = self.stations.get(station_id)?.clone();
        self.elections
            .get_mut(election_id)?
            .add_polling_station(station)
    }

    pub fn withdraw_station(
        &mut self,
        election_id: ElectionId,
        station_id: StationId,
    ) -> TallyResult<()> {
        self.elections
            .get_mut(election_id)?
            .remove_polling_station(station_id)?
            .context(NotFoundSnafu {
                kind: EntityKind::PollingStation,
                id: station_id.to_string(),
            })?;
        Ok(())
    }

    /// The single entry point for aggregation: counts a finalized record in
    /// an election.
    pub fn submit_record(&mut self, election_id: ElectionId, record_id: RecordId) -> TallyResult<()> {
        let record = self.records.get(record_id)?.clone();
        self.elections
            .get_mut(election_id)?
            .add_electoral_record(record)
    }

    pub fn finalize_election(&mut self, election_id: ElectionId) -> TallyResult<()> {
        self.elections.get_mut(election_id)?.finalize()
    }

    pub fn report(&self, election_id: ElectionId) -> TallyResult<ElectionReport> {
        Ok(self.elections.get(election_id)?.generate_report())
    }

    // ******** Snapshots ********

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            parties: self.parties.all().to_vec(),
            candidates: self.candidates.all().to_vec(),
            stations: self.stations.all().to_vec(),
            members: self.members.all().to_vec(),
            records: self.records.all().to_vec(),
            elections: self
                .elections
                .all()
                .iter()
                .map(|e| e.to_snapshot())
                .collect(),
        }
    }

    /// Rebuilds a registry. Every reference held by an election must resolve,
    /// and the candidate totals are replayed from the records.
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> TallyResult<Registry> {
        let mut reg = Registry::new();
        for p in snapshot.parties {
            reg.parties.append(p)?;
        }
        for c in snapshot.candidates {
            reg.parties.get(c.party_id())?;
            reg.candidates.append(c)?;
        }
        for s in snapshot.stations {
            reg.stations.append(s)?;
        }
        for m in snapshot.members {
            reg.members.append(m)?;
        }
        for r in snapshot.records {
            reg.stations.get(r.station_id())?;
            reg.records.append(r)?;
        }
        for es in snapshot.elections {
            let candidates = es
                .candidate_ids
                .iter()
                .map(|id| reg.candidates.get(*id).cloned())
                .collect::<TallyResult<Vec<_>>>()?;
            let stations = es
                .station_ids
                .iter()
                .map(|id| reg.stations.get(*id).cloned())
                .collect::<TallyResult<Vec<_>>>()?;
            let mut records = Vec::with_capacity(es.record_ids.len());
            for id in es.record_ids.iter() {
                let record = reg.records.get(*id)?;
                ensure!(
                    record.is_finalized(),
                    RecordNotFinalizedSnafu { id: id.to_string() }
                );
                records.push(record.clone());
            }
            let election = Election::restore(es, candidates, stations, records);
            reg.elections.append(election)?;
        }
        info!(
            "from_snapshot: {} elections, {} records",
            reg.elections.len(),
            reg.records.len()
        );
        Ok(reg)
    }
}

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::percentage;
use crate::types::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingStationMember {
    id: MemberId,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    member_type: MemberType,
    pub phone_number: String,
    pub email: String,
    lifecycle: Lifecycle,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Partial update of a member. The member type is fixed at creation.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct MemberUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub national_id: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

impl PollingStationMember {
    pub fn new(
        first_name: &str,
        last_name: &str,
        national_id: &str,
        member_type: MemberType,
        phone_number: Option<&str>,
        email: Option<&str>,
    ) -> Self {
        let now = Utc::now();
        PollingStationMember {
            id: MemberId::new(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            national_id: national_id.to_string(),
            member_type,
            phone_number: phone_number.unwrap_or_default().to_string(),
            email: email.unwrap_or_default().to_string(),
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> MemberId {
        self.id
    }

    pub fn member_type(&self) -> MemberType {
        self.member_type
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn member_type_label(&self) -> &'static str {
        self.member_type.label()
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

    pub fn update(&mut self, update: MemberUpdate) {
        if let Some(first_name) = update.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            self.last_name = last_name;
        }
        if let Some(national_id) = update.national_id {
            self.national_id = national_id;
        }
        if let Some(phone_number) = update.phone_number {
            self.phone_number = phone_number;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        self.updated_at = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.set_lifecycle(Lifecycle::Deactivated);
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
        self.updated_at = Utc::now();
    }
}

/// The personnel of a station: one slot per member type.
///
/// Adding a member to an occupied slot replaces the previous occupant.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    president: Option<PollingStationMember>,
    secretary: Option<PollingStationMember>,
    at_large: Option<PollingStationMember>,
}

impl Roster {
    fn slot(&self, member_type: MemberType) -> &Option<PollingStationMember> {
        match member_type {
            MemberType::President => &self.president,
            MemberType::Secretary => &self.secretary,
            MemberType::AtLarge => &self.at_large,
        }
    }

    fn slot_mut(&mut self, member_type: MemberType) -> &mut Option<PollingStationMember> {
        match member_type {
            MemberType::President => &mut self.president,
            MemberType::Secretary => &mut self.secretary,
            MemberType::AtLarge => &mut self.at_large,
        }
    }

    pub fn get(&self, member_type: MemberType) -> Option<&PollingStationMember> {
        self.slot(member_type).as_ref()
    }

    /// Returns the member previously holding the slot, if any.
    pub fn insert(&mut self, member: PollingStationMember) -> Option<PollingStationMember> {
        self.slot_mut(member.member_type()).replace(member)
    }

    pub fn remove(&mut self, member_type: MemberType) -> Option<PollingStationMember> {
        self.slot_mut(member_type).take()
    }

    /// Overwrites the slot copy of `member` if the slot holds that same member.
    pub fn refresh(&mut self, member: &PollingStationMember) -> bool {
        match self.slot_mut(member.member_type()) {
            Some(m) if m.id() == member.id() => {
                *m = member.clone();
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, member_id: MemberId) -> bool {
        self.iter().any(|m| m.id() == member_id)
    }

    /// Members in role order: president, secretary, at-large.
    pub fn iter(&self) -> impl Iterator<Item = &PollingStationMember> {
        MemberType::ALL
            .into_iter()
            .filter_map(move |t| self.get(t))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A voting venue.
///
/// `effective_voters` is entered independently at the station level. It is
/// not derived from the turnout of the electoral records filed for the station.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingStation {
    id: StationId,
    pub station_number: String,
    pub location: String,
    pub address: String,
    registered_voters: u64,
    effective_voters: u64,
    roster: Roster,
    lifecycle: Lifecycle,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct StationUpdate {
    pub station_number: Option<String>,
    pub location: Option<String>,
    pub address: Option<String>,
    pub registered_voters: Option<u64>,
}

impl PollingStation {
    pub fn new(station_number: &str, location: &str, address: &str, registered_voters: u64) -> Self {
        let now = Utc::now();
        PollingStation {
            id: StationId::new(),
            station_number: station_number.to_string(),
            location: location.to_string(),
            address: address.to_string(),
            registered_voters,
            effective_voters: 0,
            roster: Roster::default(),
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> StationId {
        self.id
    }

    pub fn registered_voters(&self) -> u64 {
        self.registered_voters
    }

    pub fn effective_voters(&self) -> u64 {
        self.effective_voters
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
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

    /// Upsert keyed by member type. Returns the replaced member, if any.
    pub fn add_member(&mut self, member: PollingStationMember) -> Option<PollingStationMember> {
        let previous = self.roster.insert(member);
        if let Some(p) = previous.as_ref() {
            debug!(
                "add_member: station {}: {} replaced as {}",
                self.station_number,
                p.full_name(),
                p.member_type_label()
            );
        }
        self.updated_at = Utc::now();
        previous
    }

    pub fn remove_member(&mut self, member_type: MemberType) -> Option<PollingStationMember> {
        let removed = self.roster.remove(member_type);
        self.updated_at = Utc::now();
        removed
    }

    /// Brings the roster copy of `member` up to date. Returns false if the
    /// member does not sit at this station.
    pub fn refresh_member(&mut self, member: &PollingStationMember) -> bool {
        let refreshed = self.roster.refresh(member);
        if refreshed {
            self.updated_at = Utc::now();
        }
        refreshed
    }

    pub fn president(&self) -> Option<&PollingStationMember> {
        self.roster.get(MemberType::President)
    }

    pub fn secretary(&self) -> Option<&PollingStationMember> {
        self.roster.get(MemberType::Secretary)
    }

    pub fn at_large(&self) -> Option<&PollingStationMember> {
        self.roster.get(MemberType::AtLarge)
    }

    pub fn update_voter_count(&mut self, effective_voters: u64) {
        self.effective_voters = effective_voters;
        self.updated_at = Utc::now();
    }

    /// Effective over registered voters, in percent. 0 when nobody is registered.
    pub fn turnout_percentage(&self) -> f64 {
        percentage(self.effective_voters, self.registered_voters)
    }

    pub fn update(&mut self, update: StationUpdate) {
        if let Some(number) = update.station_number {
            self.station_number = number;
        }
        if let Some(location) = update.location {
            self.location = location;
        }
        if let Some(address) = update.address {
            self.address = address;
        }
        if let Some(registered) = update.registered_voters {
            self.registered_voters = registered;
        }
        self.updated_at = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.set_lifecycle(Lifecycle::Deactivated);
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(first: &str, member_type: MemberType) -> PollingStationMember {
        PollingStationMember::new(first, "Doe", "1000", member_type, None, None)
    }

    #[test]
    fn second_president_replaces_the_first() {
        let mut station = PollingStation::new("001", "School 4", "Main St 12", 300);
        assert!(station.add_member(member("Alba", MemberType::President)).is_none());
        let replaced = station.add_member(member("Bruno", MemberType::President));
        assert_eq!(replaced.map(|m| m.first_name), Some("Alba".to_string()));
        assert_eq!(station.president().map(|m| m.first_name.as_str()), Some("Bruno"));
        assert_eq!(station.roster().len(), 1);
    }

    #[test]
    fn at_large_is_a_single_slot() {
        let mut station = PollingStation::new("002", "Club", "Side St 1", 100);
        station.add_member(member("Carla", MemberType::AtLarge));
        station.add_member(member("Dario", MemberType::AtLarge));
        station.add_member(member("Elena", MemberType::Secretary));
        assert_eq!(station.at_large().map(|m| m.first_name.as_str()), Some("Dario"));
        let names: Vec<&str> = station.roster().iter().map(|m| m.first_name.as_str()).collect();
        assert_eq!(names, vec!["Elena", "Dario"]);
    }

    #[test]
    fn remove_member_empties_the_slot() {
        let mut station = PollingStation::new("003", "Library", "Park Av 3", 50);
        station.add_member(member("Fabio", MemberType::Secretary));
        assert!(station.remove_member(MemberType::Secretary).is_some());
        assert!(station.remove_member(MemberType::Secretary).is_none());
        assert!(station.roster().is_empty());
    }

    #[test]
    fn turnout() {
        let mut station = PollingStation::new("004", "Gym", "North 9", 200);
        assert_eq!(station.turnout_percentage(), 0.0);
        station.update_voter_count(150);
        assert_eq!(station.turnout_percentage(), 75.0);

        let mut empty = PollingStation::new("005", "Hall", "South 1", 0);
        empty.update_voter_count(10);
        assert_eq!(empty.turnout_percentage(), 0.0);
    }

    #[test]
    fn refresh_only_touches_the_same_member() {
        let mut station = PollingStation::new("006", "Club", "East 2", 80);
        let mut alba = member("Alba", MemberType::President);
        station.add_member(alba.clone());

        let stranger = member("Bruno", MemberType::President);
        assert!(!station.refresh_member(&stranger));
        assert_eq!(station.president().map(|m| m.first_name.as_str()), Some("Alba"));

        alba.update(MemberUpdate {
            phone_number: Some("099 123 456".to_string()),
            ..Default::default()
        });
        alba.deactivate();
        assert!(station.refresh_member(&alba));
        let copy = station.president().unwrap();
        assert_eq!(copy.phone_number, "099 123 456");
        assert!(!copy.is_active());
        assert!(station.roster().contains(alba.id()));
        assert!(!station.roster().contains(stranger.id()));
    }

    #[test]
    fn member_labels() {
        let m = member("Gina", MemberType::AtLarge);
        assert_eq!(m.member_type_label(), "At-large member");
        assert_eq!(m.full_name(), "Gina Doe");
    }
}

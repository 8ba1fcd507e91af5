use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoliticalParty {
    id: PartyId,
    pub name: String,
    acronym: String,
    pub logo: String,
    pub legal_representative: String,
    pub founded_date: NaiveDate,
    lifecycle: Lifecycle,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Partial update of a party. Unset fields are left untouched.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct PartyUpdate {
    pub name: Option<String>,
    pub acronym: Option<String>,
    pub logo: Option<String>,
    pub legal_representative: Option<String>,
    pub founded_date: Option<NaiveDate>,
}

impl PoliticalParty {
    pub fn new(name: &str, acronym: &str, legal_representative: &str, logo: Option<&str>) -> Self {
        let now = Utc::now();
        PoliticalParty {
            id: PartyId::new(),
            name: name.to_string(),
            acronym: acronym.to_uppercase(),
            logo: logo.unwrap_or_default().to_string(),
            legal_representative: legal_representative.to_string(),
            founded_date: now.date_naive(),
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> PartyId {
        self.id
    }

    /// Always uppercase.
    pub fn acronym(&self) -> &str {
        &self.acronym
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

    pub fn update(&mut self, update: PartyUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(acronym) = update.acronym {
            self.acronym = acronym.to_uppercase();
        }
        if let Some(logo) = update.logo {
            self.logo = logo;
        }
        if let Some(rep) = update.legal_representative {
            self.legal_representative = rep;
        }
        if let Some(date) = update.founded_date {
            self.founded_date = date;
        }
        self.updated_at = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.set_lifecycle(Lifecycle::Deactivated);
    }

    pub fn activate(&mut self) {
        self.set_lifecycle(Lifecycle::Active);
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
        self.updated_at = Utc::now();
    }
}

/// A candidate running for a party.
///
/// The vote counters are derived data: they are only ever written by the
/// ledger replay of the election that holds this candidate, and they are not
/// persisted. A candidate in the registry catalog always reads zero.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    id: CandidateId,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    party_id: PartyId,
    pub position: String,
    lifecycle: Lifecycle,
    #[serde(skip)]
    votes: u64,
    #[serde(skip)]
    preferential_votes: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CandidateUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub national_id: Option<String>,
    pub position: Option<String>,
}

impl Candidate {
    pub const DEFAULT_POSITION: &'static str = "Candidate";

    /// The party is required: a candidate cannot exist without one.
    pub fn new(
        first_name: &str,
        last_name: &str,
        national_id: &str,
        party: &PoliticalParty,
        position: Option<&str>,
    ) -> Self {
        let now = Utc::now();
        Candidate {
            id: CandidateId::new(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            national_id: national_id.to_string(),
            party_id: party.id(),
            position: position.unwrap_or(Self::DEFAULT_POSITION).to_string(),
            lifecycle: Lifecycle::Active,
            votes: 0,
            preferential_votes: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> CandidateId {
        self.id
    }

    pub fn party_id(&self) -> PartyId {
        self.party_id
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn votes(&self) -> u64 {
        self.votes
    }

    pub fn preferential_votes(&self) -> u64 {
        self.preferential_votes
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

    pub fn update(&mut self, update: CandidateUpdate) {
        if let Some(first_name) = update.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            self.last_name = last_name;
        }
        if let Some(national_id) = update.national_id {
            self.national_id = national_id;
        }
        if let Some(position) = update.position {
            self.position = position;
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

    /// Absolute totals, as computed by a ledger replay.
    pub(crate) fn set_totals(&mut self, votes: u64, preferential_votes: u64) {
        self.votes = votes;
        self.preferential_votes = preferential_votes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acronym_is_uppercase() {
        let mut party = PoliticalParty::new("Frente Amplio", "fa", "Carlos Rodriguez", None);
        assert_eq!(party.acronym(), "FA");
        assert_eq!(party.logo, "");
        party.update(PartyUpdate {
            acronym: Some("fa-1".to_string()),
            ..Default::default()
        });
        assert_eq!(party.acronym(), "FA-1");
        assert_eq!(party.name, "Frente Amplio");
    }

    #[test]
    fn deactivation_is_soft() {
        let mut party = PoliticalParty::new("Partido Nacional", "PN", "Juan Perez", None);
        let candidate = Candidate::new("Ana", "Silva", "12345678", &party, Some("Mayor"));
        party.deactivate();
        assert!(!party.is_active());
        assert_eq!(candidate.party_id(), party.id());
        party.activate();
        assert!(party.is_active());
    }

    #[test]
    fn candidate_defaults() {
        let party = PoliticalParty::new("Partido Colorado", "PC", "Maria Gonzalez", None);
        let c = Candidate::new("Pedro", "Lopez", "87654321", &party, None);
        assert_eq!(c.full_name(), "Pedro Lopez");
        assert_eq!(c.position, Candidate::DEFAULT_POSITION);
        assert_eq!(c.votes(), 0);
        assert_eq!(c.preferential_votes(), 0);
    }

    #[test]
    fn totals_are_not_persisted() {
        let party = PoliticalParty::new("Partido Colorado", "PC", "Maria Gonzalez", None);
        let mut c = Candidate::new("Pedro", "Lopez", "87654321", &party, None);
        c.set_totals(40, 3);
        let js = serde_json::to_string(&c).unwrap();
        let back: Candidate = serde_json::from_str(&js).unwrap();
        assert_eq!(back.id(), c.id());
        assert_eq!(back.votes(), 0);
        assert_eq!(back.preferential_votes(), 0);
    }
}

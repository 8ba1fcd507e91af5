// ********* Identities ***********

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// A fresh random identifier.
            pub fn new() -> Self {
                $name(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map($name)
            }
        }
    };
}

entity_id!(
    /// Identifies a political party.
    PartyId
);
entity_id!(
    /// Identifies a candidate.
    CandidateId
);
entity_id!(
    /// Identifies a polling station.
    StationId
);
entity_id!(
    /// Identifies a polling station member.
    MemberId
);
entity_id!(
    /// Identifies an electoral record.
    RecordId
);
entity_id!(
    /// Identifies an election.
    ElectionId
);

// ********* States ***********

/// Soft-delete state shared by the reference entities.
///
/// Nothing is ever physically removed: references held by other entities must
/// survive a deactivation.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Active,
    Deactivated,
}

impl Lifecycle {
    pub fn is_active(self) -> bool {
        self == Lifecycle::Active
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionType {
    Municipal,
    National,
    Referendum,
}

impl Display for ElectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ElectionType::Municipal => "municipal",
            ElectionType::National => "national",
            ElectionType::Referendum => "referendum",
        };
        write!(f, "{}", s)
    }
}

/// The roles a polling station member can hold. Each role is a single slot in
/// the station roster.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    #[serde(alias = "presidente")]
    President,
    #[serde(alias = "secretario")]
    Secretary,
    #[serde(alias = "vocal")]
    AtLarge,
}

impl MemberType {
    pub const ALL: [MemberType; 3] = [
        MemberType::President,
        MemberType::Secretary,
        MemberType::AtLarge,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MemberType::President => "President",
            MemberType::Secretary => "Secretary",
            MemberType::AtLarge => "At-large member",
        }
    }
}

/// Draft -> Finalized, one way.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RecordState {
    Draft,
    Finalized {
        seal: String,
        finalized_at: DateTime<Utc>,
    },
}

/// Open -> Finalized, one way.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ElectionState {
    Open,
    Finalized { finalized_at: DateTime<Utc> },
}

// ********* Input data structures ***********

/// One line of an electoral record: the count for a single candidate.
///
/// Preferential votes are an annotation on top of the regular count and are
/// kept as an independent counter.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub candidate_id: CandidateId,
    pub votes: u64,
    pub preferential_votes: u64,
}

/// Converts a count coming from outside the engine, rejecting negative values.
pub fn checked_count(field: &'static str, value: i64) -> TallyResult<u64> {
    ensure!(value >= 0, NegativeCountSnafu { field, value });
    Ok(value as u64)
}

/// Rejects blank required text.
pub(crate) fn required(field: &'static str, value: &str) -> TallyResult<()> {
    ensure!(!value.trim().is_empty(), EmptyFieldSnafu { field });
    Ok(())
}

// ******** Output data structures *********

/// The result line of one candidate in a report.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    pub candidate_id: CandidateId,
    pub party_id: PartyId,
    pub candidate_name: String,
    pub votes: u64,
    pub preferential_votes: u64,
    /// Share of the election total, 0 when nothing was counted.
    pub percentage: f64,
}

/// Counted votes for a single polling station.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationResult {
    pub station_id: StationId,
    pub station_number: String,
    pub records_counted: usize,
    pub valid_votes: u64,
    pub blank_votes: u64,
    pub null_votes: u64,
    pub total_votes: u64,
    pub registered_voters: u64,
    pub participation: f64,
}

/// The votes of all the candidates of one party.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyResult {
    pub party_id: PartyId,
    /// Number of candidates of the party in the election.
    pub candidates: usize,
    pub votes: u64,
    pub preferential_votes: u64,
    /// Share of the election total, 0 when nothing was counted.
    pub percentage: f64,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnoutSummary {
    pub registered_voters: u64,
    pub effective_voters: u64,
    pub percentage: f64,
}

/// Immutable snapshot of an election's results at generation time.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionReport {
    pub election_id: ElectionId,
    pub total_votes: u64,
    pub blank_votes: u64,
    pub null_votes: u64,
    /// Sorted by decreasing votes. Ties keep the candidate order of the election.
    pub results: Vec<CandidateResult>,
    /// Sorted like `results`. Ties keep the order in which the parties first
    /// appear in the candidate list.
    pub parties: Vec<PartyResult>,
    pub winner: Option<CandidateId>,
    pub turnout: TurnoutSummary,
    pub stations: Vec<StationResult>,
    pub records_counted: usize,
    pub finalized: bool,
    pub generated_at: DateTime<Utc>,
}

// ********* Errors **********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum EntityKind {
    Party,
    Candidate,
    PollingStation,
    Member,
    Record,
    Election,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntityKind::Party => "political party",
            EntityKind::Candidate => "candidate",
            EntityKind::PollingStation => "polling station",
            EntityKind::Member => "polling station member",
            EntityKind::Record => "electoral record",
            EntityKind::Election => "election",
        };
        write!(f, "{}", s)
    }
}

/// Errors reported by the engine. None of them is fatal: the caller can correct
/// the input and submit again.
#[derive(Eq, PartialEq, Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TallyError {
    #[snafu(display("{kind} {id} not found"))]
    NotFound { kind: EntityKind, id: String },

    #[snafu(display("{kind} {id} is already finalized"))]
    AlreadyFinalized { kind: EntityKind, id: String },

    #[snafu(display("electoral record {id} must be finalized before it is counted"))]
    RecordNotFinalized { id: String },

    #[snafu(display("{kind} {id} is already present"))]
    Duplicate { kind: EntityKind, id: String },

    #[snafu(display("required field {field} is empty"))]
    EmptyField { field: &'static str },

    #[snafu(display("{field} cannot be negative (got {value})"))]
    NegativeCount { field: &'static str, value: i64 },

    #[snafu(display("unknown role {name:?}"))]
    UnknownRole { name: String },

    #[snafu(display("{field} total exceeds the largest supported count"))]
    CountOverflow { field: &'static str },
}

pub type TallyResult<T> = Result<T, TallyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_counts_are_rejected() {
        assert_eq!(checked_count("votes", 12), Ok(12));
        assert_eq!(checked_count("votes", 0), Ok(0));
        assert_eq!(
            checked_count("blankVotes", -1),
            Err(TallyError::NegativeCount {
                field: "blankVotes",
                value: -1
            })
        );
    }

    #[test]
    fn ids_are_unique_and_round_trip_as_strings() {
        let a = CandidateId::new();
        let b = CandidateId::new();
        assert_ne!(a, b);
        let parsed: CandidateId = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
    }

    #[test]
    fn member_types_accept_original_labels() {
        let m: MemberType = serde_json::from_str("\"presidente\"").unwrap();
        assert_eq!(m, MemberType::President);
        let m: MemberType = serde_json::from_str("\"at_large\"").unwrap();
        assert_eq!(m, MemberType::AtLarge);
        let m: MemberType = serde_json::from_str("\"vocal\"").unwrap();
        assert_eq!(m, MemberType::AtLarge);
    }

    #[test]
    fn blank_text_is_required() {
        assert!(required("name", "Frente Amplio").is_ok());
        assert_eq!(
            required("name", "   "),
            Err(TallyError::EmptyField { field: "name" })
        );
    }
}

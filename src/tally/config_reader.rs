use crate::tally::*;

use chrono::NaiveDate;
use electoral_tally::{ElectionType, MemberType};
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSettings {
    pub name: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub election_type: ElectionType,
    pub description: Option<String>,
    /// Finalize the election once every record is counted.
    pub finalize: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PartyEntry {
    pub name: String,
    pub acronym: String,
    #[serde(rename = "legalRepresentative")]
    pub legal_representative: String,
    pub logo: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateEntry {
    /// Local name used by the records of the sheet.
    pub code: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(rename = "nationalId")]
    pub national_id: String,
    /// Acronym of the party.
    pub party: String,
    pub position: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MemberEntry {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(rename = "nationalId")]
    pub national_id: String,
    pub role: MemberType,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StationEntry {
    pub number: String,
    pub location: String,
    pub address: String,
    #[serde(rename = "registeredVoters")]
    pub registered_voters: i64,
    #[serde(rename = "effectiveVoters")]
    pub effective_voters: Option<i64>,
    #[serde(default)]
    pub members: Vec<MemberEntry>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoteEntry {
    /// Code of the candidate.
    pub candidate: String,
    pub votes: i64,
    #[serde(rename = "preferentialVotes")]
    pub preferential_votes: Option<i64>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RecordEntry {
    pub title: String,
    /// Number of the station.
    pub station: String,
    pub place: String,
    #[serde(rename = "recordNumber")]
    pub record_number: String,
    #[serde(default)]
    pub votes: Vec<VoteEntry>,
    #[serde(rename = "blankVotes")]
    pub blank_votes: i64,
    #[serde(rename = "nullVotes")]
    pub null_votes: i64,
    pub observations: Option<String>,
    #[serde(default)]
    pub signatures: Vec<String>,
    /// Without a seal the record stays a draft.
    pub seal: Option<String>,
}

/// The description of one election, as read from the JSON tally sheet.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TallySheet {
    pub election: ElectionSettings,
    #[serde(default)]
    pub parties: Vec<PartyEntry>,
    #[serde(default)]
    pub candidates: Vec<CandidateEntry>,
    #[serde(default)]
    pub stations: Vec<StationEntry>,
    #[serde(default)]
    pub records: Vec<RecordEntry>,
}

pub fn read_sheet(path: &str) -> TallyRunResult<TallySheet> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let sheet: TallySheet = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    debug!(
        "read_sheet: {}: {} parties, {} candidates, {} stations, {} records",
        path,
        sheet.parties.len(),
        sheet.candidates.len(),
        sheet.stations.len(),
        sheet.records.len()
    );
    Ok(sheet)
}

pub fn read_summary(path: &str) -> TallyRunResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read content: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

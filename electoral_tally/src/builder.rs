pub use crate::record::ElectoralRecord;
use crate::station::PollingStation;
use crate::types::*;

/// A builder for filling an electoral record.
///
/// Counts coming from the outside are checked on the way in, so a negative
/// count is an error rather than a panic.
///
/// ```
/// use electoral_tally::builder::Builder;
/// use electoral_tally::{CandidateId, PollingStation, TallyError};
///
/// let station = PollingStation::new("001", "School 4", "Main St 12", 200);
/// let ana = CandidateId::new();
///
/// let record = Builder::new("Record 1", &station, "School 4", "A-001")?
///     .votes(ana, 120, 7)?
///     .blank_and_null(4, 1)?
///     .signature("Alba Diaz")
///     .seal("SEAL-001")
///     .build()?;
///
/// assert!(record.is_finalized());
/// assert_eq!(record.total_effective_voters(), 125);
/// # Ok::<(), TallyError>(())
/// ```
pub struct Builder {
    pub(crate) _record: ElectoralRecord,
    pub(crate) _signatures: Vec<String>,
    pub(crate) _observations: Option<String>,
    pub(crate) _seal: Option<String>,
}

impl Builder {
    pub fn new(
        title: &str,
        station: &PollingStation,
        place: &str,
        record_number: &str,
    ) -> TallyResult<Builder> {
        required("title", title)?;
        Ok(Builder {
            _record: ElectoralRecord::new(title, station, place, record_number),
            _signatures: Vec::new(),
            _observations: None,
            _seal: None,
        })
    }

    /// Sets the count of a candidate. Calling it again for the same candidate
    /// replaces the count.
    pub fn votes(
        mut self,
        candidate_id: CandidateId,
        votes: i64,
        preferential_votes: i64,
    ) -> TallyResult<Builder> {
        let votes = checked_count("votes", votes)?;
        let preferential_votes = checked_count("preferentialVotes", preferential_votes)?;
        self._record
            .add_vote_record(candidate_id, votes, preferential_votes)?;
        Ok(self)
    }

    pub fn blank_and_null(mut self, blank_votes: i64, null_votes: i64) -> TallyResult<Builder> {
        let blank_votes = checked_count("blankVotes", blank_votes)?;
        let null_votes = checked_count("nullVotes", null_votes)?;
        self._record.set_blank_and_null_votes(blank_votes, null_votes)?;
        Ok(self)
    }

    pub fn observations(mut self, observations: &str) -> Builder {
        self._observations = Some(observations.to_string());
        self
    }

    pub fn signature(mut self, signature: &str) -> Builder {
        self._signatures.push(signature.to_string());
        self
    }

    /// The record is finalized with this seal when built. Without a seal the
    /// record stays a draft.
    pub fn seal(mut self, official_seal: &str) -> Builder {
        self._seal = Some(official_seal.to_string());
        self
    }

    pub fn build(self) -> TallyResult<ElectoralRecord> {
        let mut record = self._record;
        if let Some(obs) = self._observations.as_deref() {
            record.add_observation(obs)?;
        }
        for s in self._signatures.iter() {
            record.add_signature(s)?;
        }
        if let Some(seal) = self._seal.as_deref() {
            record.finalize(seal)?;
        }
        Ok(record)
    }
}

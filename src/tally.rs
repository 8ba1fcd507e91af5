use log::{debug, info, warn};

use electoral_tally::access::{Action, Authorizer, Role, RoleHierarchy};
use electoral_tally::registry::Registry;
use electoral_tally::*;
use snafu::{prelude::*, ErrorCompat, Snafu};

use std::collections::HashMap;
use std::fs;

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::tally::config_reader::*;

mod config_reader;

#[derive(Debug, Snafu)]
pub enum TallyRunError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{source}"))]
    Engine { source: TallyError },
    #[snafu(display("role {role} is not allowed to {action}"))]
    Unauthorized { role: Role, action: Action },
    #[snafu(display("the tally sheet refers to an unknown {kind} {reference:?}"))]
    UnknownReference {
        kind: &'static str,
        reference: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type TallyRunResult<T> = Result<T, TallyRunError>;

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RunOptions {
    /// File path for the summary. `None` or "stdout" prints it.
    pub out: Option<String>,
    /// File path for the registry snapshot.
    pub snapshot: Option<String>,
    /// Reference summary to compare with.
    pub reference: Option<String>,
    pub role: String,
}

fn authorize(role: Role, action: Action) -> TallyRunResult<()> {
    ensure!(
        RoleHierarchy.is_allowed(role, action),
        UnauthorizedSnafu { role, action }
    );
    Ok(())
}

fn count(field: &'static str, value: i64) -> TallyRunResult<u64> {
    checked_count(field, value).context(EngineSnafu)
}

/// Loads the tally sheet into a fresh registry and counts the sealed records.
fn import(sheet: &TallySheet, role: Role) -> TallyRunResult<(Registry, ElectionId)> {
    authorize(role, Action::ManageEntities)?;
    let mut reg = Registry::new();

    for p in sheet.parties.iter() {
        reg.create_party(&p.name, &p.acronym, &p.legal_representative, p.logo.as_deref())
            .context(EngineSnafu)?;
    }

    let mut candidates: HashMap<&str, CandidateId> = HashMap::new();
    for c in sheet.candidates.iter() {
        let party_id = reg
            .party_by_acronym(&c.party)
            .map(|p| p.id())
            .context(UnknownReferenceSnafu {
                kind: "party",
                reference: c.party.clone(),
            })?;
        let cid = reg
            .create_candidate(
                &c.first_name,
                &c.last_name,
                &c.national_id,
                party_id,
                c.position.as_deref(),
            )
            .context(EngineSnafu)?;
        if candidates.insert(c.code.as_str(), cid).is_some() {
            whatever!("Candidate code {:?} is used more than once", c.code);
        }
    }

    let mut stations: HashMap<&str, StationId> = HashMap::new();
    for s in sheet.stations.iter() {
        let registered = count("registeredVoters", s.registered_voters)?;
        let sid = reg
            .create_station(&s.number, &s.location, &s.address, registered)
            .context(EngineSnafu)?;
        if let Some(effective) = s.effective_voters {
            let effective = count("effectiveVoters", effective)?;
            reg.update_station_voter_count(sid, effective)
                .context(EngineSnafu)?;
        }
        for m in s.members.iter() {
            let mid = reg
                .create_member(
                    &m.first_name,
                    &m.last_name,
                    &m.national_id,
                    m.role,
                    m.phone.as_deref(),
                    m.email.as_deref(),
                )
                .context(EngineSnafu)?;
            if let Some(previous) = reg.assign_member(sid, mid).context(EngineSnafu)? {
                warn!(
                    "station {}: {} replaced by {} as {}",
                    s.number,
                    previous.full_name(),
                    m.first_name,
                    previous.member_type_label()
                );
            }
        }
        if stations.insert(s.number.as_str(), sid).is_some() {
            whatever!("Station number {:?} is used more than once", s.number);
        }
    }

    let settings = &sheet.election;
    let eid = reg
        .create_election(
            &settings.name,
            settings.date,
            settings.election_type,
            settings.description.as_deref().unwrap_or_default(),
        )
        .context(EngineSnafu)?;
    for c in sheet.candidates.iter() {
        reg.enroll_candidate(eid, candidates[c.code.as_str()])
            .context(EngineSnafu)?;
    }
    for s in sheet.stations.iter() {
        reg.enroll_station(eid, stations[s.number.as_str()])
            .context(EngineSnafu)?;
    }

    for r in sheet.records.iter() {
        let sid = *stations
            .get(r.station.as_str())
            .context(UnknownReferenceSnafu {
                kind: "station",
                reference: r.station.clone(),
            })?;
        let rid = reg
            .create_record(&r.title, sid, &r.place, &r.record_number)
            .context(EngineSnafu)?;

        authorize(role, Action::RegisterVotes)?;
        for v in r.votes.iter() {
            let cid = *candidates
                .get(v.candidate.as_str())
                .context(UnknownReferenceSnafu {
                    kind: "candidate",
                    reference: v.candidate.clone(),
                })?;
            let votes = count("votes", v.votes)?;
            let preferential = count("preferentialVotes", v.preferential_votes.unwrap_or(0))?;
            reg.register_votes(rid, cid, votes, preferential)
                .context(EngineSnafu)?;
        }
        let blank = count("blankVotes", r.blank_votes)?;
        let null = count("nullVotes", r.null_votes)?;
        reg.set_blank_and_null_votes(rid, blank, null)
            .context(EngineSnafu)?;
        if let Some(obs) = r.observations.as_deref() {
            reg.annotate_record(rid, obs).context(EngineSnafu)?;
        }
        for sig in r.signatures.iter() {
            reg.sign_record(rid, sig).context(EngineSnafu)?;
        }

        match r.seal.as_deref() {
            Some(seal) => {
                authorize(role, Action::FinalizeRecord)?;
                reg.finalize_record(rid, seal).context(EngineSnafu)?;
                reg.submit_record(eid, rid).context(EngineSnafu)?;
            }
            None => {
                info!(
                    "record {} for station {} has no seal and is not counted",
                    r.record_number, r.station
                );
            }
        }
    }

    if settings.finalize.unwrap_or(false) {
        authorize(role, Action::FinalizeElection)?;
        reg.finalize_election(eid).context(EngineSnafu)?;
    }

    Ok((reg, eid))
}

fn fmt_percentage(p: f64) -> String {
    format!("{:.2}", p)
}

/// The summary only holds data derived from the tally sheet: no identifiers
/// and no timestamps, so that two runs on the same sheet give the same output.
fn build_summary_js(reg: &Registry, election_id: ElectionId) -> TallyRunResult<JSValue> {
    let election = reg.election(election_id).context(EngineSnafu)?;
    let report = reg.report(election_id).context(EngineSnafu)?;

    let mut results: Vec<JSValue> = Vec::new();
    for r in report.results.iter() {
        let party = reg.party(r.party_id).context(EngineSnafu)?;
        results.push(json!({
            "candidate": r.candidate_name,
            "party": party.acronym(),
            "votes": r.votes.to_string(),
            "preferentialVotes": r.preferential_votes.to_string(),
            "percentage": fmt_percentage(r.percentage),
        }));
    }

    let mut parties: Vec<JSValue> = Vec::new();
    for p in report.parties.iter() {
        let party = reg.party(p.party_id).context(EngineSnafu)?;
        parties.push(json!({
            "party": party.acronym(),
            "candidates": p.candidates.to_string(),
            "votes": p.votes.to_string(),
            "preferentialVotes": p.preferential_votes.to_string(),
            "percentage": fmt_percentage(p.percentage),
        }));
    }

    let winner = match report.winner {
        Some(cid) => {
            let c = election.candidate(cid).context(UnknownReferenceSnafu {
                kind: "candidate",
                reference: cid.to_string(),
            })?;
            json!(c.full_name())
        }
        None => JSValue::Null,
    };

    let stations: Vec<JSValue> = report
        .stations
        .iter()
        .map(|s| {
            json!({
                "station": s.station_number,
                "recordsCounted": s.records_counted.to_string(),
                "validVotes": s.valid_votes.to_string(),
                "blankVotes": s.blank_votes.to_string(),
                "nullVotes": s.null_votes.to_string(),
                "totalVotes": s.total_votes.to_string(),
                "registeredVoters": s.registered_voters.to_string(),
                "participation": fmt_percentage(s.participation),
            })
        })
        .collect();

    Ok(json!({
        "election": {
            "name": election.name,
            "type": election.election_type.to_string(),
            "date": election.date.to_string(),
            "finalized": report.finalized,
        },
        "totals": {
            "votes": report.total_votes.to_string(),
            "blankVotes": report.blank_votes.to_string(),
            "nullVotes": report.null_votes.to_string(),
            "recordsCounted": report.records_counted.to_string(),
        },
        "results": results,
        "parties": parties,
        "winner": winner,
        "participation": {
            "registeredVoters": report.turnout.registered_voters.to_string(),
            "effectiveVoters": report.turnout.effective_voters.to_string(),
            "percentage": fmt_percentage(report.turnout.percentage),
        },
        "stations": stations,
    }))
}

fn write_or_print(path: Option<&str>, contents: &str) -> TallyRunResult<()> {
    match path {
        None | Some("stdout") => {
            println!("{}", contents);
            Ok(())
        }
        Some(p) => {
            info!("Writing summary to {}", p);
            fs::write(p, contents).context(WritingOutputSnafu { path: p })
        }
    }
}

pub fn run_tally(config_path: &str, opts: &RunOptions) -> TallyRunResult<()> {
    let role: Role = opts.role.parse().context(EngineSnafu)?;
    let sheet = read_sheet(config_path)?;
    info!("Tallying {} as {}", sheet.election.name, role);

    let (reg, eid) = import(&sheet, role)?;

    authorize(role, Action::ViewReports)?;
    let result_js = build_summary_js(&reg, eid)?;
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    write_or_print(opts.out.as_deref(), &pretty_js_stats)?;

    if let Some(snapshot_p) = opts.snapshot.as_deref() {
        let js = serde_json::to_string_pretty(&reg.snapshot()).context(ParsingJsonSnafu {})?;
        fs::write(snapshot_p, js).context(WritingOutputSnafu { path: snapshot_p })?;
        debug!("snapshot written to {}", snapshot_p);
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = opts.reference.as_deref() {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

fn run_tally_test(test_name: &str, config_lpath: &str, summary_lpath: &str) -> TallyRunResult<()> {
    let test_dir = option_env!("ETALLY_TEST_DIR")
        .unwrap_or(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data"));
    info!("Running test {}", test_name);
    let res = run_tally(
        &format!("{}/{}/{}", test_dir, test_name, config_lpath),
        &RunOptions {
            out: Some(std::env::temp_dir().join(format!("{}_summary.json", test_name)).display().to_string()),
            reference: Some(format!("{}/{}/{}", test_dir, test_name, summary_lpath)),
            snapshot: None,
            role: "admin".to_string(),
        },
    );
    if let Err(e) = &res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(e) {
            eprintln!("trace: {}", bt);
        }
    }
    res
}

pub fn test_wrapper(test_name: &str) -> TallyRunResult<()> {
    run_tally_test(
        test_name,
        format!("{}_config.json", test_name).as_str(),
        format!("{}_expected_summary.json", test_name).as_str(),
    )
}

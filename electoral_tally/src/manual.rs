/*!

This is the long-form manual for `electoral_tally` and `etally`.

## Concepts

* a **political party** is registered once and referred to by its acronym, which is always stored in uppercase.
* a **candidate** runs for exactly one party.
* a **polling station** is a voting venue with a number of registered voters and a roster of three
  members: a president, a secretary and an at-large member. Each role holds a single person; assigning
  a second president replaces the first one.
* an **electoral record** is the tally sheet filed for one station: the number of votes of each
  candidate, the blank and null votes, signatures and observations.
* an **election** collects candidates, stations and records and derives the results.

Parties, candidates, stations, members and elections are never deleted, only deactivated.
Records are never deleted at all.

## Records

A record is created for a station and copies the number of registered voters of the station at that
moment. Later changes to the station do not change the record.

Entering the count of a candidate a second time **replaces** the first count. Counts are never summed
inside a record, so submitting the same line twice is harmless.

Preferential votes are an annotation on top of the regular count. They are stored and reported on their
own and are not part of the valid votes. A line with more preferential votes than votes is accepted
(and logged as a warning).

A record is finalized with a non-empty official seal. After that, every change is refused, including
signatures and observations, and a second finalization is refused too.

## Aggregation

Only finalized records are counted. Submitting a draft, or submitting the same record twice, is refused.

The totals of the candidates are recomputed from all the counted records each time a record or a
candidate is added to the election. This means:
- a record can never be counted twice;
- a candidate added after some records were counted picks up the votes those records already hold for them;
- lines for candidates that are not part of the election are kept in the record but do not count.

Two records for the same station are both counted (a warning is logged).

Once the election is finalized, adding or removing candidates, stations and records is refused.
Reports can still be generated.

## Reports

A report is a snapshot and never changes the election. It contains:

- the total of the candidate votes, and the blank and null votes of the counted records;
- one line per candidate with votes, preferential votes and percentage of the total, sorted by
  decreasing votes. Candidates with the same number of votes keep the order in which they were added to
  the election;
- the winner: the candidate with the most votes. On a tie, the candidate added first wins. There is no
  other tie-break and no runoff;
- the participation: registered voters of the stations, effective voters (valid, blank and null votes),
  and their ratio;
- one line per station with the counted records and their votes.

All percentages are 0 when the total they are taken from is 0.

## Tally sheets

`etally` reads an election from a JSON file. Counts are whole numbers; negative counts are refused.

```text
{
  "election": { "name": "Municipal 2024", "date": "2024-05-12", "type": "municipal",
                "description": "", "finalize": true },
  "parties": [ { "name": "Partido Nacional", "acronym": "PN", "legalRepresentative": "Juan Perez" } ],
  "candidates": [ { "code": "ana", "firstName": "Ana", "lastName": "Silva",
                    "nationalId": "1234", "party": "PN" } ],
  "stations": [ { "number": "001", "location": "School 4", "address": "Main St 12",
                  "registeredVoters": 200,
                  "members": [ { "firstName": "Alba", "lastName": "Diaz",
                                 "nationalId": "10", "role": "president" } ] } ],
  "records": [ { "title": "Record 1", "station": "001", "place": "School 4",
                 "recordNumber": "A-001",
                 "votes": [ { "candidate": "ana", "votes": 120, "preferentialVotes": 7 } ],
                 "blankVotes": 4, "nullVotes": 1, "signatures": ["Alba Diaz"],
                 "seal": "SEAL-001" } ]
}
```

Notes:
- candidates are referred to by their `code`, parties by their acronym and stations by their number.
- `type` is one of `municipal`, `national`, `referendum`.
- member `role` is one of `president`, `secretary`, `at_large`. The labels `presidente`, `secretario`
  and `vocal` are accepted too.
- a record without `seal` stays a draft and is not counted.
- `position`, `logo`, `phone`, `email`, `observations` and `effectiveVoters` are optional.
- every record must name a station listed in `stations`. Counts that do not fit in an unsigned 64-bit
  total are rejected.

The summary lists the candidates under `results` and, under `parties`, one entry per party with its
number of candidates, its summed votes and its share of the total votes.

## Roles

`etally` checks the `--role` flag before each class of operation:

| action             | least role |
|--------------------|------------|
| view reports       | observer   |
| manage entities    | operator   |
| register votes     | operator   |
| finalize records   | operator   |
| finalize elections | admin      |

 */

/*!

# Quick start

This example runs a small municipal election end to end with the `etally` command line tool.

We would like to count the results of two polling stations, `001` and `002`, for three candidates:
Ana, Pedro and Laura. Each station files one record, signed by its members and closed with a seal.

**Writing the tally sheet** Everything is described in a single JSON file. See the
[manual](../manual/index.html#tally-sheets) for the complete format. A full example lives in the
`tests/data/municipal_sample` directory of the repository.

**Counting** Run `etally` with the tally sheet:

```bash
etally --config municipal_sample_config.json
```

The summary of the election is printed on the standard output:

```text
{
  "election": { "name": "Municipal 2024", "type": "municipal", "date": "2024-05-12", "finalized": true },
  "results": [
    { "candidate": "Pedro Lopez", "party": "PC", "votes": "70", "preferentialVotes": "10", "percentage": "42.42" },
    ...
  ],
  "winner": "Pedro Lopez",
  ...
}
```

Percentages are computed over the votes of the candidates. Blank and null votes only count towards the
participation.

Add `--verbose` to follow what is counted:

```text
[2024-05-12T20:15:02Z INFO  electoral_tally::record] electoral record A-001 (...) finalized with 107 effective voters
[2024-05-12T20:15:02Z INFO  electoral_tally::election] election ...: counting record A-001 (100 valid votes)
```

**Keeping the results** The `--out` flag writes the summary to a file instead, and `--snapshot` writes the complete
state (parties, candidates, stations, records and elections) so that it can be inspected or loaded again with
`Registry::from_snapshot`.

**Checking against a reference** When the results were already published, `--reference` compares the
summary with a file and prints the differences. The command fails if they do not match:

```bash
etally --config municipal_sample_config.json --reference municipal_sample_expected_summary.json
```

**Roles** By default the tool runs as `admin`. With `--role operator` the records are counted but the
election cannot be finalized; with `--role observer` nothing can be entered.

*/

use clap::Parser;

/// This is a tabulation program for polling-station electoral records.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The tally sheet describing the election, in JSON format.
    /// For more information about the file format, read the manual of the electoral_tally crate.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path) A reference file containing the summary of an election in JSON format. If provided, etally will
    /// check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the election will be written in JSON format to the given
    /// location. Otherwise it is printed on the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the complete state of the registry (parties, candidates, stations,
    /// records and elections) is written in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub snapshot: Option<String>,

    /// (default admin) The role to run as: observer, operator or admin.
    #[clap(long, value_parser, default_value = "admin")]
    pub role: String,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

use clap::Parser;
use log::{info, LevelFilter};
use snafu::ErrorCompat;

mod args;
mod tally;

use crate::args::Args;
use crate::tally::{run_tally, RunOptions};

fn main() {
    let args = Args::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if args.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();

    info!("args: {:?}", args);

    let opts = RunOptions {
        out: args.out.clone(),
        snapshot: args.snapshot.clone(),
        reference: args.reference.clone(),
        role: args.role.clone(),
    };

    if let Err(e) = run_tally(&args.config, &opts) {
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}

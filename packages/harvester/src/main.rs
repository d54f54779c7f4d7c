//! CLI entry point for the harvester.

use ibptax_harvester::cli;

fn main() {
    // Tracing is installed by the CLI once the log file location is known.
    if let Err(e) = cli::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

use clap::Parser;

use tuitter::cli::{self, Args};

fn main() {
    let args = Args::parse();
    if let Err(e) = cli::run(args) {
        log::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

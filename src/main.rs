use anyhow::Result;
use clap::Parser;

use petalcard::config::Args;
use petalcard::{app, logging};

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        logging::init_file_logging(path)?;
    }
    app::run(&args)
}

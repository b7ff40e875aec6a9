use anyhow::Result;
use clap::Parser;

use campus_inbox::{app, cli};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    app::run(cli)
}

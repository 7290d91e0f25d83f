use anyhow::Result;

use myna_reader::cli::commands::run_cli;

fn main() -> Result<()> {
    run_cli()
}

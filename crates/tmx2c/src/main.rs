use clap::Parser;

use tmx2c::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tmx2c::logging::init(cli.verbose)?;
    tmx2c::run(&cli)
}

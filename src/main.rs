use anyhow::Result;
use clap::Parser;

use bizsearch::cli::{Cli, Command};
use bizsearch::utils::logging;
use bizsearch::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.verbose {
        config.verbose_logging = true;
    }

    logging::init(config.verbose_logging);

    let app = App::initialize(config).await?;
    match cli.command {
        Command::Run(args) => {
            app.run(&args).await?;
        }
        Command::Fetch(args) => {
            app.fetch(&args).await?;
        }
    }

    Ok(())
}

use clap::Parser;
use dotenvy::dotenv;

use edutrak::cli::Cli;
use edutrak::commands::run;
use edutrak::config::Config;
use edutrak::error::AppError;
use edutrak::logging::init_logging;

fn main() {
    dotenv().ok();
    init_logging();

    let cli = Cli::parse();

    let config = Config::from_env()
        .map_err(AppError::Config)
        .unwrap_or_else(|err| {
            tracing::error!("{}", err);
            std::process::exit(1);
        });

    tracing::debug!("Loaded config: {:?}", config);

    if let Err(err) = run(cli, config) {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

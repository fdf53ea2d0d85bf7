mod cli;
mod config;
mod error;
mod harvest;
mod logging;
mod pipeline;
mod report;
mod resolve;
mod score;
mod store;
mod types;

use crate::error::PkgScoreError;
use clap::Parser;
use std::sync::Arc;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const PACKAGE_FAILURES: i32 = 1;
    pub const RUNTIME_FAILURE: i32 = 3;
}

fn runtime() -> Result<tokio::runtime::Runtime, PkgScoreError> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn run() -> Result<i32, PkgScoreError> {
    let cli = cli::Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match cli.command {
        cli::Commands::Score(cmd) => {
            if !cmd.file.is_file() {
                return Err(PkgScoreError::InputNotFound(cmd.file.display().to_string()));
            }
            let input = std::fs::read_to_string(&cmd.file)?;

            let mut cfg = config::load_config(cmd.config.as_deref())?;
            if let Some(jobs) = cmd.jobs {
                cfg.run.concurrency = jobs;
            }
            if let Some(database) = cmd.database {
                cfg.run.database = Some(database);
            }
            cfg.validate()?;

            let runtime = runtime()?;
            let summary = runtime.block_on(async {
                let pipeline = pipeline::Pipeline::from_config(&cfg)?;
                pipeline
                    .run(&input, &mut std::io::stdout(), &mut std::io::stderr())
                    .await
            })?;

            if summary.failed > 0 {
                Ok(exit_code::PACKAGE_FAILURES)
            } else {
                Ok(exit_code::SUCCESS)
            }
        }
        cli::Commands::Resolve(cmd) => {
            let cfg = config::load_config(cmd.config.as_deref())?;
            let runtime = runtime()?;
            let resolved = runtime.block_on(async {
                let transport = Arc::new(harvest::client::ReqwestTransport::new(&cfg.http)?);
                let client = harvest::client::RestClient::new(transport, &cfg, cfg.github_token());
                resolve::resolve(&client, &cmd.url).await
            });

            match resolved {
                Ok(coords) => {
                    println!("{coords}");
                    Ok(exit_code::SUCCESS)
                }
                Err(e @ PkgScoreError::ResolutionFailed { .. }) => {
                    eprintln!("error: {e}");
                    Ok(exit_code::PACKAGE_FAILURES)
                }
                Err(e) => Err(e),
            }
        }
    }
}

fn main() {
    match run() {
        Ok(code) => {
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(exit_code::RUNTIME_FAILURE);
        }
    }
}

//! newsdesk CLI: ranks topics by live search volume, gathers sources,
//! and writes a model-generated article as a Markdown post.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;
use newsdesk_shared::NewsdeskError;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);

    match commands::run(cli).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(report) => {
            let code = report
                .downcast_ref::<NewsdeskError>()
                .map_or(1, NewsdeskError::exit_code);
            eprintln!("Error: {report:?}");
            Ok(ExitCode::from(code))
        }
    }
}

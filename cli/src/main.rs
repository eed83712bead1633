mod arg_parser;
mod client_cli;

use arg_parser::{ArgParser, SubCommand};
use client_cli::ClientCli;

use clap::Parser;
use std::error;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn error::Error>> {
    let args = ArgParser::parse();
    let client = ClientCli::connect(&args.server);

    match args.sub_command {
        SubCommand::Build {
            platform,
            config,
            sets,
            follow,
        } => {
            let job_id = client
                .start_build(&platform, config.as_deref(), &sets)
                .await?;
            if follow {
                client.follow_logs(job_id).await?;
                client.query_status(job_id).await?;
            }
        }
        SubCommand::Status { job_id } => {
            client.query_status(job_id).await?;
        }
        SubCommand::Logs { job_id } => {
            client.follow_logs(job_id).await?;
        }
        SubCommand::Wait {
            job_id,
            interval_ms,
        } => {
            let job = client
                .wait(job_id, Duration::from_millis(interval_ms))
                .await?;
            if let Some(file_path) = job.file_path {
                println!("artifact: {}", file_path.display());
            }
        }
        SubCommand::Download { job_id, out } => {
            client.download(job_id, out).await?;
        }
    }

    Ok(())
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// Request desktop app builds from a packaging server
#[derive(Debug, Parser)]
#[command(name = "packager", version)]
pub struct ArgParser {
    /// The base URL of the server
    #[arg(
        short = 's',
        long = "server",
        env = "PACKAGER_SERVER",
        default_value = "http://127.0.0.1:3000"
    )]
    pub server: String,
    /// The sub-command to use
    #[command(subcommand)]
    pub sub_command: SubCommand,
}

#[derive(Clone, Debug, PartialEq, Eq, Subcommand)]
pub enum SubCommand {
    /// start a new build
    Build {
        #[arg(long)]
        /// target platform, e.g. mac, win or linux
        platform: String,

        #[arg(long)]
        /// JSON file with the app configuration
        config: Option<PathBuf>,

        #[arg(long = "set", value_parser = key_eq_val)]
        /// extra string fields for the configuration, as KEY=VALUE
        sets: Vec<(String, String)>,

        #[arg(long)]
        /// follow the build log until the job finishes
        follow: bool,
    },
    /// print a job's status
    Status {
        /// Uuid v4 string
        job_id: Uuid,
    },
    /// follow a job's log until it finishes
    Logs {
        /// Uuid v4 string
        job_id: Uuid,
    },
    /// poll until a job finishes
    Wait {
        /// Uuid v4 string
        job_id: Uuid,

        #[arg(long, default_value_t = 1000)]
        /// polling interval in milliseconds
        interval_ms: u64,
    },
    /// download a finished job's package
    Download {
        /// Uuid v4 string
        job_id: Uuid,

        #[arg(short, long)]
        /// output path, defaults to the package's file name
        out: Option<PathBuf>,
    },
}

/// value parser for KEY=VALUE config fields
fn key_eq_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err("Required format is KEY=VALUE".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_pairs() {
        assert_eq!(
            key_eq_val("title=My App").unwrap(),
            ("title".to_string(), "My App".to_string())
        );
        assert_eq!(
            key_eq_val("url=http://x/?a=b").unwrap(),
            ("url".to_string(), "http://x/?a=b".to_string())
        );
        assert!(key_eq_val("novalue").is_err());
        assert!(key_eq_val("=oops").is_err());
    }

    #[test]
    fn parses_build() {
        let args = ArgParser::try_parse_from([
            "packager",
            "--server",
            "http://build-box:3000",
            "build",
            "--platform",
            "mac",
            "--set",
            "title=Demo",
            "--follow",
        ])
        .unwrap();
        assert_eq!(args.server, "http://build-box:3000");
        assert_eq!(
            args.sub_command,
            SubCommand::Build {
                platform: "mac".into(),
                config: None,
                sets: vec![("title".into(), "Demo".into())],
                follow: true,
            }
        );
    }

    #[test]
    fn rejects_bad_job_id() {
        assert!(ArgParser::try_parse_from(["packager", "status", "not-a-uuid"]).is_err());
    }
}

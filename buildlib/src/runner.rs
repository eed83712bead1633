mod classifier;
mod diagnostics;
mod resolver;

pub use classifier::{KeywordClassifier, LineClassifier, LineKind};
pub use resolver::{CommandResolver, HostPlatform, PlatformResolver, ResolvedCommand};

use crate::types::{Args, Envs, LogLine, Program};
use async_trait::async_trait;
use bytes::BytesMut;
use std::{
    fmt, io,
    path::Path,
    process::{ExitStatus, Stdio},
    sync::Arc,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process,
    sync::mpsc,
};
use tracing::debug;

pub const ERROR_TAG: &str = "[ERROR] ";
pub const INFO_TAG: &str = "[stderr] ";

/// Where the runner delivers log lines, in the order each stream produced them.
///
/// Each message is a group of lines that must stay adjacent in the job log, such as an error
/// line and the hints that explain it.
pub type LogSink = mpsc::UnboundedSender<Vec<LogLine>>;

/// A command as the pipeline asks for it, before any host-specific rewriting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: Program,
    pub args: Args,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<Program>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("could not launch `{program}`: {source}")]
    Spawn {
        program: Program,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with code {code}")]
    Exited { program: Program, code: i32 },
    #[error("`{program}` was killed by signal {signal}")]
    Killed { program: Program, signal: i32 },
    #[error("lost track of `{program}`: {source}")]
    Wait {
        program: Program,
        #[source]
        source: io::Error,
    },
}

/// Runs one command to completion, streaming its output into `sink`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec, dir: &Path, sink: LogSink) -> Result<(), RunError>;
}

/// Runs commands as child processes of the server.
///
/// Every child inherits the server's environment plus `envs`, which is where download mirror
/// overrides are injected.
pub struct ProcessRunner {
    resolver: Box<dyn CommandResolver>,
    classifier: Arc<dyn LineClassifier>,
    envs: Envs,
}

impl ProcessRunner {
    pub fn new(envs: Envs) -> Self {
        Self {
            resolver: Box::new(PlatformResolver::host()),
            classifier: Arc::new(KeywordClassifier::default()),
            envs,
        }
    }

    pub fn with_resolver(mut self, resolver: impl CommandResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn with_classifier(mut self, classifier: impl LineClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &CommandSpec, dir: &Path, sink: LogSink) -> Result<(), RunError> {
        let resolved = self.resolver.resolve(command);
        debug!(
            program = %resolved.program,
            args = ?resolved.args,
            dir = %dir.display(),
            "spawning"
        );

        let mut child = process::Command::new(&resolved.program)
            .args(&resolved.args)
            .current_dir(dir)
            .envs(self.envs.iter().map(|(key, val)| (key, val)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        // pipe stdout to the sink
        let stdout_task = child.stdout.take().map(|stdout| {
            let sink = sink.clone();
            tokio::spawn(read_lines(stdout, move |line| {
                if let Some(entry) = stdout_entry(line) {
                    let _ = sink.send(vec![entry]);
                }
            }))
        });

        // pipe stderr to the sink, tagged by the classifier
        let stderr_task = child.stderr.take().map(|stderr| {
            let sink = sink.clone();
            let classifier = Arc::clone(&self.classifier);
            tokio::spawn(read_lines(stderr, move |line| {
                let entries = stderr_entries(classifier.as_ref(), line);
                if !entries.is_empty() {
                    let _ = sink.send(entries);
                }
            }))
        });

        let status = child.wait().await.map_err(|source| RunError::Wait {
            program: command.program.clone(),
            source,
        })?;

        // the outcome is only reported once every line has reached the sink
        for task in [stdout_task, stderr_task].into_iter().flatten() {
            let _ = task.await;
        }
        debug!(program = %resolved.program, %status, "exited");
        exit_outcome(&command.program, status)
    }
}

fn exit_outcome(program: &str, status: ExitStatus) -> Result<(), RunError> {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err(RunError::Exited {
            program: program.to_string(),
            code,
        });
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(RunError::Killed {
                program: program.to_string(),
                signal,
            });
        }
    }
    Err(RunError::Exited {
        program: program.to_string(),
        code: -1,
    })
}

/// Read a stream to the end, calling `on_line` for every newline-terminated chunk and for any
/// unterminated tail. Invalid UTF-8 is replaced rather than dropped.
async fn read_lines<R, F>(mut reader: R, mut on_line: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        match reader.read_buf(&mut buf).await {
            Ok(n) if n > 0 => {
                while let Some(pos) = buf.iter().position(|byte| *byte == b'\n') {
                    let line = buf.split_to(pos + 1);
                    on_line(&String::from_utf8_lossy(&line));
                }
            }
            _ => {
                break;
            }
        }
    }
    if !buf.is_empty() {
        on_line(&String::from_utf8_lossy(&buf));
    }
}

fn stdout_entry(line: &str) -> Option<LogLine> {
    let line = line.trim_end();
    (!line.is_empty()).then(|| line.to_string())
}

fn stderr_entries(classifier: &dyn LineClassifier, line: &str) -> Vec<LogLine> {
    let line = line.trim_end();
    if line.is_empty() {
        return Vec::new();
    }
    match classifier.classify(line) {
        LineKind::Error => std::iter::once(format!("{}{}", ERROR_TAG, line))
            .chain(diagnostics::hints_for(line).map(str::to_string))
            .collect(),
        LineKind::Info => vec![format!("{}{}", INFO_TAG, line)],
    }
}

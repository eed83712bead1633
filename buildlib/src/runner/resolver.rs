use super::CommandSpec;
use crate::types::{Args, Program};

/// The host families whose process model differs in how a bare command name is launched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostPlatform {
    Windows,
    Unix,
}

impl HostPlatform {
    pub fn current() -> Self {
        if cfg!(windows) {
            HostPlatform::Windows
        } else {
            HostPlatform::Unix
        }
    }
}

/// The program and arguments actually handed to the OS.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub program: Program,
    pub args: Args,
}

/// Maps a requested command onto the form the host can execute.
pub trait CommandResolver: Send + Sync {
    fn resolve(&self, command: &CommandSpec) -> ResolvedCommand;
}

/// Package manager entry points such as `npm` are batch shims on Windows and cannot be spawned
/// by name, so there they are routed through `cmd /C`. Each original argument stays a separate
/// element; nothing is joined into a single string.
#[derive(Clone, Copy, Debug)]
pub struct PlatformResolver {
    platform: HostPlatform,
}

impl PlatformResolver {
    pub fn new(platform: HostPlatform) -> Self {
        Self { platform }
    }

    pub fn host() -> Self {
        Self::new(HostPlatform::current())
    }
}

impl CommandResolver for PlatformResolver {
    fn resolve(&self, command: &CommandSpec) -> ResolvedCommand {
        match self.platform {
            HostPlatform::Windows => {
                let mut args = Vec::with_capacity(command.args.len() + 2);
                args.push("/C".to_string());
                args.push(command.program.clone());
                args.extend(command.args.iter().cloned());
                ResolvedCommand {
                    program: "cmd".to_string(),
                    args,
                }
            }
            HostPlatform::Unix => ResolvedCommand {
                program: command.program.clone(),
                args: command.args.clone(),
            },
        }
    }
}

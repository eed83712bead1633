use crate::runner::CommandSpec;
use crate::types::{Args, Program};
use std::path::PathBuf;

/// Platform specific arguments for the packaging command, picked when the requested platform
/// contains `family`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildVariant {
    pub family: String,
    pub args: Args,
}

impl BuildVariant {
    pub fn new<S: Into<String>>(family: &str, args: impl IntoIterator<Item = S>) -> Self {
        Self {
            family: family.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BuildCommand {
    pub program: Program,
    pub args: Args,
    /// Checked in order; the first family contained in the platform string wins.
    pub variants: Vec<BuildVariant>,
    pub default_args: Args,
}

impl BuildCommand {
    /// The packaging command for `platform`.
    ///
    /// Matching is a case-sensitive substring test, so `"mac-arm64"` selects the `mac` variant
    /// while `"Mac"` falls through to the default. Variant order matters: `"darwin"` contains
    /// `"win"`.
    pub fn for_platform(&self, platform: &str) -> CommandSpec {
        let extra = self
            .variants
            .iter()
            .find(|variant| platform.contains(variant.family.as_str()))
            .map(|variant| &variant.args)
            .unwrap_or(&self.default_args);
        CommandSpec::new(
            self.program.clone(),
            self.args.iter().chain(extra.iter()).cloned(),
        )
    }
}

impl Default for BuildCommand {
    fn default() -> Self {
        Self {
            program: "npx".to_string(),
            args: vec!["electron-builder".to_string()],
            variants: vec![
                BuildVariant::new("mac", ["--mac"]),
                BuildVariant::new("win", ["--win"]),
                BuildVariant::new("linux", ["--linux"]),
            ],
            default_args: Vec::new(),
        }
    }
}

/// Where a pipeline finds its template, builds, and what it runs.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub template_dir: PathBuf,
    /// Parent of the per-job workspaces, each named after its job id.
    pub workspace_root: PathBuf,
    /// Relative to the workspace.
    pub data_file: PathBuf,
    /// Relative to the workspace.
    pub dist_dir: PathBuf,
    pub install: CommandSpec,
    pub build: BuildCommand,
}

impl PipelineConfig {
    pub fn new(template_dir: impl Into<PathBuf>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            workspace_root: workspace_root.into(),
            data_file: PathBuf::from("src/data/config.json"),
            dist_dir: PathBuf::from("dist"),
            install: CommandSpec::new("npm", ["install"]),
            build: BuildCommand::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_selects_variant_by_substring() {
        let build = BuildCommand::default();
        assert_eq!(
            build.for_platform("mac-arm64").to_string(),
            "npx electron-builder --mac"
        );
        assert_eq!(build.for_platform("win32").to_string(), "npx electron-builder --win");
        assert_eq!(
            build.for_platform("linux-x64").to_string(),
            "npx electron-builder --linux"
        );
    }

    #[test]
    fn unmatched_platform_uses_default() {
        let build = BuildCommand::default();
        assert_eq!(build.for_platform("freebsd").to_string(), "npx electron-builder");
        // matching is case sensitive
        assert_eq!(build.for_platform("MAC").to_string(), "npx electron-builder");
    }

    #[test]
    fn first_matching_family_wins() {
        let build = BuildCommand::default();
        assert_eq!(build.for_platform("darwin").to_string(), "npx electron-builder --win");
        assert_eq!(build.for_platform("mac-win").to_string(), "npx electron-builder --mac");
    }
}

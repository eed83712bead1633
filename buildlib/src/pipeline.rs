mod config;
mod workspace;

pub use config::{BuildCommand, BuildVariant, PipelineConfig};

use crate::actors::store::JobStoreHandle;
use crate::artifact::resolve_artifact;
use crate::error;
use crate::runner::{CommandRunner, CommandSpec, LogSink, RunError};
use crate::types::JobId;
use serde_json::Value;
use std::{
    fmt, io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::mpsc;
use tracing::{info, info_span, warn, Instrument};

/// The ordered steps of a build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    WorkspaceSetup,
    DataInjection,
    DependencyInstall,
    BuildPackage,
    ArtifactLocation,
}

impl Stage {
    /// Job progress once this stage has succeeded.
    pub fn checkpoint(self) -> u8 {
        match self {
            Stage::WorkspaceSetup => 5,
            Stage::DataInjection => 10,
            Stage::DependencyInstall => 40,
            Stage::BuildPackage => 90,
            Stage::ArtifactLocation => 100,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::WorkspaceSetup => "workspace setup",
            Stage::DataInjection => "data injection",
            Stage::DependencyInstall => "dependency install",
            Stage::BuildPackage => "build",
            Stage::ArtifactLocation => "artifact location",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("template directory {} does not exist", .0.display())]
    TemplateMissing(PathBuf),
    #[error("could not prepare workspace: {0}")]
    Workspace(#[source] io::Error),
    #[error("could not write build data: {0}")]
    DataFile(#[source] io::Error),
    #[error("{stage} failed: {source}")]
    Command {
        stage: Stage,
        #[source]
        source: RunError,
    },
    #[error("output directory {} does not exist, the build likely failed", .0.display())]
    DistMissing(PathBuf),
    #[error("no artifact found in {}", .0.display())]
    NoArtifact(PathBuf),
    #[error(transparent)]
    Store(#[from] error::Error),
    #[error("build task aborted: {0}")]
    Aborted(String),
}

/// Drives jobs from submission to a finished state.
///
/// Cloning is cheap; every clone shares the same store, runner and configuration.
#[derive(Clone)]
pub struct BuildPipeline {
    store: JobStoreHandle,
    runner: Arc<dyn CommandRunner>,
    config: Arc<PipelineConfig>,
}

impl BuildPipeline {
    pub fn new(
        store: JobStoreHandle,
        runner: Arc<dyn CommandRunner>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            runner,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &JobStoreHandle {
        &self.store
    }

    /// Register a new job and start building it in the background.
    ///
    /// Returns as soon as the job exists; progress is observed through the store.
    pub async fn submit(&self, platform: String, payload: Value) -> error::Result<JobId> {
        let job_id = uuid::Uuid::new_v4();
        self.store.create(job_id).await?;

        let pipeline = self.clone();
        let span = info_span!("build", %job_id, %platform);
        tokio::spawn(
            async move { pipeline.supervise(job_id, platform, payload).await }.instrument(span),
        );
        Ok(job_id)
    }

    /// Run the stages in their own task and settle the job whatever happens to it, panics
    /// included.
    async fn supervise(self, job_id: JobId, platform: String, payload: Value) {
        let stages = {
            let pipeline = self.clone();
            tokio::spawn(
                async move { pipeline.run(job_id, &platform, &payload).await }.in_current_span(),
            )
        };
        let outcome = match stages.await {
            Ok(outcome) => outcome,
            Err(err) => Err(PipelineError::Aborted(err.to_string())),
        };

        let settled = match outcome {
            Ok(artifact) => {
                info!(artifact = %artifact.display(), "build completed");
                self.store.complete(job_id, artifact).await
            }
            Err(err) => {
                warn!(error = %err, "build failed");
                self.store.fail(job_id, format!("Build failed: {}", err)).await
            }
        };
        if let Err(err) = settled {
            warn!(error = %err, "could not record build outcome");
        }
    }

    async fn run(
        &self,
        job_id: JobId,
        platform: &str,
        payload: &Value,
    ) -> Result<PathBuf, PipelineError> {
        self.store.mark_building(job_id).await?;
        let workspace_dir = self.config.workspace_root.join(job_id.to_string());

        self.begin(job_id, Stage::WorkspaceSetup, "Preparing workspace").await?;
        if !tokio::fs::metadata(&self.config.template_dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
        {
            return Err(PipelineError::TemplateMissing(self.config.template_dir.clone()));
        }
        workspace::copy_template(&self.config.template_dir, &workspace_dir)
            .await
            .map_err(PipelineError::Workspace)?;
        self.finish(job_id, Stage::WorkspaceSetup).await?;

        self.begin(job_id, Stage::DataInjection, "Injecting build data").await?;
        let data_file = workspace::write_data_file(&workspace_dir, &self.config.data_file, payload)
            .await
            .map_err(PipelineError::DataFile)?;
        self.store
            .append_log(job_id, format!("Wrote {}", data_file.display()))
            .await?;
        self.finish(job_id, Stage::DataInjection).await?;

        let install = self.config.install.clone();
        let description = format!("Installing dependencies ({})", install);
        self.begin(job_id, Stage::DependencyInstall, &description).await?;
        self.run_command(job_id, Stage::DependencyInstall, &install, &workspace_dir)
            .await?;
        self.finish(job_id, Stage::DependencyInstall).await?;

        let build = self.config.build.for_platform(platform);
        self.begin(job_id, Stage::BuildPackage, &format!("Building for {} ({})", platform, build))
            .await?;
        self.run_command(job_id, Stage::BuildPackage, &build, &workspace_dir)
            .await?;
        self.finish(job_id, Stage::BuildPackage).await?;

        self.begin(job_id, Stage::ArtifactLocation, "Locating artifact").await?;
        let dist = workspace_dir.join(&self.config.dist_dir);
        if tokio::fs::metadata(&dist).await.is_err() {
            return Err(PipelineError::DistMissing(dist));
        }
        let artifact = resolve_artifact(&dist)
            .await
            .ok_or_else(|| PipelineError::NoArtifact(dist.clone()))?;
        let artifact = absolute(&artifact).await;
        self.store
            .append_log(job_id, format!("Artifact ready: {}", artifact.display()))
            .await?;
        Ok(artifact)
    }

    async fn begin(&self, job_id: JobId, stage: Stage, description: &str) -> error::Result<()> {
        info!(%stage, "stage started");
        self.store.append_log(job_id, format!(">> {}", description)).await
    }

    async fn finish(&self, job_id: JobId, stage: Stage) -> error::Result<()> {
        self.store.set_progress(job_id, stage.checkpoint()).await
    }

    /// Run one command, forwarding its output into the job log as it arrives.
    async fn run_command(
        &self,
        job_id: JobId,
        stage: Stage,
        command: &CommandSpec,
        dir: &Path,
    ) -> Result<(), PipelineError> {
        let (sink, mut lines) = mpsc::unbounded_channel();
        let store = self.store.clone();
        let forward = async move {
            while let Some(group) = lines.recv().await {
                for line in group {
                    store.append_log(job_id, line).await?;
                }
            }
            Ok::<_, error::Error>(())
        };
        // the runner drops its sink when it returns, which ends the forwarding loop
        let (outcome, forwarded) = tokio::join!(self.runner.run(command, dir, sink), forward);
        forwarded?;
        outcome.map_err(|source| PipelineError::Command { stage, source })
    }
}

async fn absolute(path: &Path) -> PathBuf {
    match tokio::fs::canonicalize(path).await {
        Ok(path) => path,
        Err(_) => std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf()),
    }
}

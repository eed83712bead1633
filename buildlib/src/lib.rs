mod actors;
pub mod artifact;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod runner;
pub mod types;

// re-export the store handle as if it is the job store itself.
pub use actors::store::JobStoreHandle as JobStore;
pub use job::{Job, JobStatus};
pub use pipeline::{BuildPipeline, PipelineConfig, PipelineError};
pub use runner::{CommandRunner, CommandSpec, ProcessRunner};

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::{fs, sync::Arc, time::Duration};

    // drives a whole build through real child processes, with `sh` standing in for npm
    #[tokio::test]
    async fn end_to_end_with_real_processes() {
        let template = tempfile::tempdir().unwrap();
        fs::write(template.path().join("package.json"), "{}").unwrap();
        let workspaces = tempfile::tempdir().unwrap();

        let mut config = PipelineConfig::new(template.path(), workspaces.path());
        config.install = CommandSpec::new(
            "sh",
            ["-c", "echo installing; test -f src/data/config.json"],
        );
        config.build.program = "sh".into();
        config.build.args = vec![
            "-c".into(),
            "mkdir -p dist && touch dist/app-1.0.0.deb dist/latest.yml && echo packaged".into(),
        ];
        config.build.variants.clear();

        let pipeline = BuildPipeline::new(
            JobStore::spawn(64),
            Arc::new(ProcessRunner::new(vec![])),
            config,
        );
        let job_id = pipeline
            .submit("linux".into(), serde_json::json!({ "title": "e2e" }))
            .await
            .unwrap();

        let mut job = pipeline.store().get(job_id).await.unwrap();
        while !job.status.is_terminal() {
            tokio::time::sleep(Duration::from_millis(10)).await;
            job = pipeline.store().get(job_id).await.unwrap();
        }

        assert_eq!(job.status, JobStatus::Completed, "logs: {:#?}", job.logs);
        assert!(job.logs.iter().any(|line| line == "installing"));
        assert!(job.logs.iter().any(|line| line == "packaged"));
        assert!(job.file_path.unwrap().ends_with("dist/app-1.0.0.deb"));
    }
}

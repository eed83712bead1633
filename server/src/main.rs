mod config;
mod services;
mod telemetry;

use buildlib::{BuildPipeline, JobStore, ProcessRunner};
use clap::Parser;
use config::Settings;
use services::buildservice::{router, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::parse();
    telemetry::init_tracing(settings.log_json);
    serve(settings).await
}

async fn serve(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    tokio::fs::create_dir_all(&settings.workspace_root).await?;
    if !settings.template_dir.is_dir() {
        // jobs will fail individually until the template shows up
        warn!(template_dir = %settings.template_dir.display(), "template directory missing");
    }

    let runner = ProcessRunner::new(settings.mirror_envs());
    let pipeline = BuildPipeline::new(
        JobStore::spawn(settings.queue_capacity),
        Arc::new(runner),
        settings.pipeline_config(),
    );
    let app = router(AppState::new(pipeline));

    let listener = TcpListener::bind(settings.listen).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for ctrl-c");
        futures::future::pending::<()>().await;
    }
}

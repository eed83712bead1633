use buildlib::types::Envs;
use buildlib::PipelineConfig;
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf};

/// Serve desktop app packaging jobs over HTTP
#[derive(Clone, Debug, Parser)]
#[command(name = "packager-server", version)]
pub struct Settings {
    /// Address to listen on
    #[arg(long, env = "PACKAGER_LISTEN", default_value = "127.0.0.1:3000")]
    pub listen: SocketAddr,

    /// Template project copied into every build workspace
    #[arg(long, env = "PACKAGER_TEMPLATE_DIR", default_value = "template")]
    pub template_dir: PathBuf,

    /// Directory holding one workspace per job
    #[arg(long, env = "PACKAGER_WORKSPACE_ROOT", default_value = "builds")]
    pub workspace_root: PathBuf,

    /// Where the request's config lands, relative to the workspace
    #[arg(long, env = "PACKAGER_DATA_FILE", default_value = "src/data/config.json")]
    pub data_file: PathBuf,

    /// Mirror for Electron binary downloads, passed to every build command
    #[arg(long, env = "ELECTRON_MIRROR")]
    pub electron_mirror: Option<String>,

    /// Mirror for electron-builder tool downloads, passed to every build command
    #[arg(long, env = "ELECTRON_BUILDER_BINARIES_MIRROR")]
    pub builder_binaries_mirror: Option<String>,

    /// Capacity of the job store's message queue
    #[arg(long, env = "PACKAGER_QUEUE_CAPACITY", default_value_t = 1024)]
    pub queue_capacity: usize,

    /// Emit logs as JSON lines
    #[arg(long, env = "PACKAGER_LOG_JSON")]
    pub log_json: bool,
}

impl Settings {
    /// Extra environment for spawned build commands.
    pub fn mirror_envs(&self) -> Envs {
        [
            ("ELECTRON_MIRROR", &self.electron_mirror),
            ("ELECTRON_BUILDER_BINARIES_MIRROR", &self.builder_binaries_mirror),
        ]
        .into_iter()
        .filter_map(|(key, val)| val.as_ref().map(|val| (key.to_string(), val.clone())))
        .collect()
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(&self.template_dir, &self.workspace_root);
        config.data_file = self.data_file.clone();
        config
    }
}

use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}: {message}")]
    Server { status: StatusCode, message: String },
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Config(#[from] serde_json::Error),
    #[error("job {0} failed")]
    JobFailed(Uuid),
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildResponse {
    job_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: Uuid,
    pub status: String,
    pub progress: u8,
    pub logs: Vec<String>,
    pub file_path: Option<PathBuf>,
}

impl JobView {
    fn is_finished(&self) -> bool {
        self.status == "completed" || self.status == "error"
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct ClientCli {
    http: Client,
    base: String,
}

impl ClientCli {
    pub fn connect(server: &str) -> Self {
        Self {
            http: Client::new(),
            base: server.trim_end_matches('/').to_string(),
        }
    }

    /// Start a build. The config file, if any, must hold a JSON object; `sets` are layered on
    /// top of it as string fields.
    pub async fn start_build(
        &self,
        platform: &str,
        config: Option<&Path>,
        sets: &[(String, String)],
    ) -> Result<Uuid> {
        let config = build_config(config, sets).await?;
        let response = self
            .http
            .post(format!("{}/build", self.base))
            .json(&serde_json::json!({ "platform": platform, "config": config }))
            .send()
            .await?;
        let BuildResponse { job_id } = check(response).await?.json::<BuildResponse>().await?;
        println!("Started job id: {}", job_id);
        Ok(job_id)
    }

    pub async fn job(&self, job_id: Uuid) -> Result<JobView> {
        let response = self
            .http
            .get(format!("{}/job/{}", self.base, job_id))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn query_status(&self, job_id: Uuid) -> Result<()> {
        let job = self.job(job_id).await?;
        println!("{} {} {}%", job.id, job.status, job.progress);
        if let Some(file_path) = &job.file_path {
            println!("artifact: {}", file_path.display());
        }
        if job.status == "error" {
            if let Some(line) = job.logs.last() {
                println!("{}", line);
            }
        }
        Ok(())
    }

    /// Print the job's log as the server streams it.
    pub async fn follow_logs(&self, job_id: Uuid) -> Result<()> {
        let response = self
            .http
            .get(format!("{}/job/{}/logs", self.base, job_id))
            .send()
            .await?;
        let mut stream = check(response).await?.bytes_stream();
        let mut stdout = tokio::io::stdout();
        while let Some(chunk) = stream.next().await {
            stdout.write_all(&chunk?).await?;
            stdout.flush().await?;
        }
        Ok(())
    }

    pub async fn wait(&self, job_id: Uuid, interval: Duration) -> Result<JobView> {
        let mut last_progress = None;
        loop {
            let job = self.job(job_id).await?;
            if last_progress != Some(job.progress) {
                println!("{} {}%", job.status, job.progress);
                last_progress = Some(job.progress);
            }
            if job.is_finished() {
                if job.status == "error" {
                    return Err(ClientError::JobFailed(job_id));
                }
                return Ok(job);
            }
            tokio::time::sleep(interval).await;
        }
    }

    pub async fn download(&self, job_id: Uuid, out: Option<PathBuf>) -> Result<PathBuf> {
        let out = match out {
            Some(out) => out,
            None => self
                .job(job_id)
                .await?
                .file_path
                .and_then(|path| path.file_name().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(format!("{}.bin", job_id))),
        };
        let response = self
            .http
            .get(format!("{}/download/{}", self.base, job_id))
            .send()
            .await?;
        let mut stream = check(response).await?.bytes_stream();
        let mut file = tokio::fs::File::create(&out).await?;
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        println!("Saved {}", out.display());
        Ok(out)
    }
}

/// Turn non-success responses into errors carrying the server's message.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(ClientError::Server { status, message })
}

async fn build_config(
    file: Option<&Path>,
    sets: &[(String, String)],
) -> Result<Map<String, Value>> {
    let mut config = match file {
        Some(file) => serde_json::from_slice(&tokio::fs::read(file).await?)?,
        None => Map::new(),
    };
    for (key, val) in sets {
        config.insert(key.clone(), Value::String(val.clone()));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn sets_override_file_fields() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("app.json");
        tokio::fs::write(&file, r#"{"title":"From file","width":800}"#)
            .await
            .unwrap();

        let config = build_config(Some(file.as_path()), &[("title".into(), "Override".into())])
            .await
            .unwrap();
        assert_eq!(config["title"], "Override");
        assert_eq!(config["width"], 800);
    }

    #[tokio::test]
    async fn config_file_must_be_an_object() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("app.json");
        tokio::fs::write(&file, "[1, 2]").await.unwrap();

        let err = build_config(Some(file.as_path()), &[]).await.unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn job_view_reads_server_json() {
        let job: JobView = serde_json::from_str(
            r#"{"id":"67e55044-10b1-426f-9247-bb680e5fe0c8","status":"completed","progress":100,
                "logs":[">> Preparing workspace"],"filePath":"/srv/builds/x/dist/app.dmg"}"#,
        )
        .unwrap();
        assert!(job.is_finished());
        assert_eq!(job.file_path.unwrap(), PathBuf::from("/srv/builds/x/dist/app.dmg"));
    }
}

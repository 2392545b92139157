// Backend communication with the ReDefine image-editing service over HTTP

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::upload::PickedFile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl UploadResponse {
    /// Server-side reference of the stored file, if the upload was accepted.
    pub fn accepted_path(&self) -> Option<&str> {
        if self.status == "success" {
            self.file_path.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub status: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl GenerateResponse {
    pub fn processing_task(&self) -> Option<&str> {
        if self.status == "processing" {
            self.task_id.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Processing,
    Completed,
    Error,
    NotFound,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub ssim: f64,
    pub psnr: f64,
}

impl Metrics {
    pub fn ssim_label(&self) -> String {
        format!("{:.4}", self.ssim)
    }

    pub fn psnr_label(&self) -> String {
        format!("{:.2} dB", self.psnr)
    }
}

/// One polled status response for a generation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub metrics: Option<Metrics>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub device: Option<String>,
}

/// Parameters for one `POST /generate/` call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub file_ref: String,
    pub instruction: String,
    pub guidance_scale: f32,
    pub inference_steps: u32,
}

impl GenerationRequest {
    fn into_form(self) -> Form {
        Form::new()
            .text("file_path", self.file_ref)
            .text("instruction", self.instruction)
            .text("guidance_scale", self.guidance_scale.to_string())
            .text("num_inference_steps", self.inference_steps.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    Transport(String),
    Status { code: u16, body: String },
    Parse(String),
    Io(String),
    InvalidUrl(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Transport(e) => write!(f, "Transport error: {}", e),
            BackendError::Status { code, body } => write!(f, "HTTP {}: {}", code, body),
            BackendError::Parse(e) => write!(f, "Parse error: {}", e),
            BackendError::Io(e) => write!(f, "IO error: {}", e),
            BackendError::InvalidUrl(e) => write!(f, "Invalid URL: {}", e),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Transport(e.to_string())
    }
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        BackendError::Io(e.to_string())
    }
}

pub struct Backend {
    client: reqwest::Client,
    base_url: Url,
}

impl Backend {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        // Url::join drops the last segment unless the base ends in '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url =
            Url::parse(&normalized).map_err(|e| BackendError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        // Server references such as "/results/x.png" are rooted at the host
        self.base_url
            .join(path)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Decode a JSON body whatever the HTTP status; the service reports
    /// logical failures as JSON with a 500.
    async fn decode<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let code = response.status();
        let body = response.text().await?;
        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) if code.is_success() => Err(BackendError::Parse(e.to_string())),
            Err(_) => Err(BackendError::Status {
                code: code.as_u16(),
                body,
            }),
        }
    }

    pub async fn upload(&self, file: &PickedFile) -> Result<UploadResponse, BackendError> {
        let bytes = tokio::fs::read(&file.path).await?;
        debug!(path = %file.path.display(), size = bytes.len(), "uploading file");

        let part = Part::bytes(bytes)
            .file_name(file.name.clone())
            .mime_str(&file.mime)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("upload/")?)
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerateResponse, BackendError> {
        let response = self
            .client
            .post(self.endpoint("generate/")?)
            .multipart(request.into_form())
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn progress(&self, task_id: &str) -> Result<ProgressSnapshot, BackendError> {
        let url = self.endpoint(&format!("progress/{}", task_id))?;
        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }

    pub async fn health(&self) -> Result<HealthResponse, BackendError> {
        let response = self.client.get(self.endpoint("health")?).send().await?;
        Self::decode(response).await
    }

    /// Fetch a result image and write it to `dest`. Returns the byte count.
    pub async fn download(&self, result_ref: &str, dest: &Path) -> Result<u64, BackendError> {
        let response = self.client.get(self.endpoint(result_ref)?).send().await?;
        let code = response.status();
        if !code.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%code, result_ref, "download rejected");
            return Err(BackendError::Status {
                code: code.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;
        Ok(bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Multipart, Path as AxumPath, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    #[derive(Clone, Default)]
    struct MockState {
        uploads: Arc<Mutex<Vec<(String, String, usize)>>>,
        generate_fields: Arc<Mutex<HashMap<String, String>>>,
    }

    async fn upload_handler(
        State(state): State<MockState>,
        mut multipart: Multipart,
    ) -> (StatusCode, Json<Value>) {
        while let Ok(Some(field)) = multipart.next_field().await {
            if field.name() != Some("file") {
                continue;
            }
            let name = field.file_name().unwrap_or_default().to_string();
            let mime = field.content_type().unwrap_or_default().to_string();
            let data = field.bytes().await.unwrap_or_default();
            if name == "broken.png" {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"status": "error", "message": "disk full"})),
                );
            }
            state.uploads.lock().unwrap().push((name.clone(), mime, data.len()));
            return (
                StatusCode::OK,
                Json(json!({"status": "success", "file_id": "f1", "file_path": format!("/uploads/{}", name)})),
            );
        }
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"status": "error", "message": "missing file"})),
        )
    }

    async fn generate_handler(
        State(state): State<MockState>,
        mut multipart: Multipart,
    ) -> Json<Value> {
        let mut fields = HashMap::new();
        while let Ok(Some(field)) = multipart.next_field().await {
            let name = field.name().unwrap_or_default().to_string();
            let value = field.text().await.unwrap_or_default();
            fields.insert(name, value);
        }
        *state.generate_fields.lock().unwrap() = fields;
        Json(json!({"status": "processing", "task_id": "t1"}))
    }

    async fn progress_handler(AxumPath(task_id): AxumPath<String>) -> Json<Value> {
        match task_id.as_str() {
            "t1" => Json(json!({
                "status": "completed",
                "progress": 100,
                "output_path": "/results/t1.png",
                "metrics": {"ssim": 0.91, "psnr": 32.4}
            })),
            "busy" => Json(json!({"status": "processing", "progress": 40})),
            _ => Json(json!({"status": "not_found"})),
        }
    }

    async fn spawn_mock() -> (String, MockState) {
        let state = MockState::default();
        let app = Router::new()
            .route("/upload/", post(upload_handler))
            .route("/generate/", post(generate_handler))
            .route("/progress/{task_id}", get(progress_handler))
            .route("/health", get(|| async { Json(json!({"status": "healthy", "device": "cpu"})) }))
            .route("/results/t1.png", get(|| async { vec![0x89u8, b'P', b'N', b'G'] }))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), state)
    }

    fn picked(dir: &tempfile::TempDir, name: &str) -> PickedFile {
        let path = dir.path().join(name);
        std::fs::write(&path, b"fake image bytes").unwrap();
        PickedFile::from_path(&path)
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let backend = Backend::new("http://localhost:8000/api").unwrap();
        assert_eq!(backend.base_url().as_str(), "http://localhost:8000/api/");
        assert_eq!(
            backend.endpoint("generate/").unwrap().as_str(),
            "http://localhost:8000/api/generate/"
        );
        assert_eq!(
            backend.endpoint("/results/a.png").unwrap().as_str(),
            "http://localhost:8000/results/a.png"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(Backend::new("not a url"), Err(BackendError::InvalidUrl(_))));
    }

    #[test]
    fn test_progress_snapshot_parsing() {
        let snapshot: ProgressSnapshot = serde_json::from_str(
            r#"{"status":"completed","progress":100,"output_path":"/out/a.png","metrics":{"ssim":0.91,"psnr":32.4}}"#,
        )
        .unwrap();
        assert_eq!(snapshot.status, TaskStatus::Completed);
        assert_eq!(snapshot.progress, Some(100));
        let metrics = snapshot.metrics.unwrap();
        assert_eq!(metrics.ssim_label(), "0.9100");
        assert_eq!(metrics.psnr_label(), "32.40 dB");

        let missing: ProgressSnapshot = serde_json::from_str(r#"{"status":"not_found"}"#).unwrap();
        assert_eq!(missing.status, TaskStatus::NotFound);
        assert_eq!(missing.progress, None);

        let odd: ProgressSnapshot = serde_json::from_str(r#"{"status":"queued"}"#).unwrap();
        assert_eq!(odd.status, TaskStatus::Unknown);
    }

    #[test]
    fn test_response_gates() {
        let upload = UploadResponse {
            status: "error".into(),
            file_path: Some("/uploads/x.png".into()),
            file_id: None,
            message: Some("nope".into()),
        };
        assert_eq!(upload.accepted_path(), None);

        let generate = GenerateResponse {
            status: "processing".into(),
            task_id: Some("t9".into()),
            message: None,
        };
        assert_eq!(generate.processing_task(), Some("t9"));
    }

    #[tokio::test]
    async fn test_upload_sends_file_field() {
        let (base, state) = spawn_mock().await;
        let backend = Backend::new(&base).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let response = backend.upload(&picked(&dir, "cat.png")).await.unwrap();
        assert_eq!(response.accepted_path(), Some("/uploads/cat.png"));

        let uploads = state.uploads.lock().unwrap().clone();
        assert_eq!(uploads, vec![("cat.png".to_string(), "image/png".to_string(), 16)]);
    }

    #[tokio::test]
    async fn test_upload_error_body_is_surfaced() {
        let (base, _) = spawn_mock().await;
        let backend = Backend::new(&base).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let response = backend.upload(&picked(&dir, "broken.png")).await.unwrap();
        assert_eq!(response.accepted_path(), None);
        assert_eq!(response.message.as_deref(), Some("disk full"));
    }

    #[tokio::test]
    async fn test_upload_missing_local_file() {
        let (base, _) = spawn_mock().await;
        let backend = Backend::new(&base).unwrap();
        let file = PickedFile::from_path(Path::new("/definitely/not/here.png"));

        assert!(matches!(backend.upload(&file).await, Err(BackendError::Io(_))));
    }

    #[tokio::test]
    async fn test_generate_sends_form_fields() {
        let (base, state) = spawn_mock().await;
        let backend = Backend::new(&base).unwrap();

        let response = backend
            .generate(GenerationRequest {
                file_ref: "/files/a.png".into(),
                instruction: "make it blue".into(),
                guidance_scale: 12.0,
                inference_steps: 50,
            })
            .await
            .unwrap();
        assert_eq!(response.processing_task(), Some("t1"));

        let fields = state.generate_fields.lock().unwrap().clone();
        assert_eq!(fields["file_path"], "/files/a.png");
        assert_eq!(fields["instruction"], "make it blue");
        assert_eq!(fields["guidance_scale"], "12");
        assert_eq!(fields["num_inference_steps"], "50");
    }

    #[tokio::test]
    async fn test_progress_and_health() {
        let (base, _) = spawn_mock().await;
        let backend = Backend::new(&base).unwrap();

        let busy = backend.progress("busy").await.unwrap();
        assert_eq!(busy.status, TaskStatus::Processing);
        assert_eq!(busy.progress, Some(40));

        let gone = backend.progress("nope").await.unwrap();
        assert_eq!(gone.status, TaskStatus::NotFound);

        let health = backend.health().await.unwrap();
        assert_eq!(health.device.as_deref(), Some("cpu"));
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let (base, _) = spawn_mock().await;
        let backend = Backend::new(&base).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out").join("redefined_image.png");

        let written = backend.download("/results/t1.png", &dest).await.unwrap();
        assert_eq!(written, 4);
        assert_eq!(std::fs::read(&dest).unwrap(), vec![0x89u8, b'P', b'N', b'G']);

        let missing = backend.download("/results/none.png", &dest).await;
        assert!(matches!(missing, Err(BackendError::Status { code: 404, .. })));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let backend = Backend::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(backend.health().await, Err(BackendError::Transport(_))));
    }
}

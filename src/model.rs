use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Connection settings for the highlight service, built from CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    #[serde(default, with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,
}

/// The step of the workflow a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Processing,
    Results,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::Processing => "processing",
            Stage::Results => "results",
        }
    }
}

/// Client session state. Exactly one is active; nothing survives a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum WorkflowPhase {
    Idle,
    Uploading,
    UploadedReady,
    /// Covers the run call and the results fetch that follows it.
    Processing,
    ResultsReady,
    Failed { stage: Stage, message: String },
}

impl WorkflowPhase {
    pub fn accepts_upload(&self) -> bool {
        matches!(
            self,
            WorkflowPhase::Idle | WorkflowPhase::Failed { .. } | WorkflowPhase::ResultsReady
        )
    }

    pub fn accepts_start_processing(&self) -> bool {
        matches!(self, WorkflowPhase::UploadedReady)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, WorkflowPhase::Uploading | WorkflowPhase::Processing)
    }

    /// Short label for status bars.
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowPhase::Idle => "Idle",
            WorkflowPhase::Uploading => "Uploading",
            WorkflowPhase::UploadedReady => "Ready",
            WorkflowPhase::Processing => "Processing",
            WorkflowPhase::ResultsReady => "Results",
            WorkflowPhase::Failed { .. } => "Failed",
        }
    }
}

/// A local video selected for upload.
#[derive(Clone)]
pub struct VideoAsset {
    pub file_name: String,
    pub mime_type: &'static str,
    pub contents: Bytes,
}

impl std::fmt::Debug for VideoAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoAsset")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.contents.len())
            .finish()
    }
}

impl VideoAsset {
    pub fn new(file_name: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_for(&file_name);
        Self {
            file_name,
            mime_type,
            contents: contents.into(),
        }
    }

    /// Read a video file from disk.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let contents = tokio::fs::read(path)
            .await
            .with_context(|| format!("read video file {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();
        Ok(Self::new(file_name, contents))
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// One produced clip as returned by `GET /results`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightResult {
    pub clip_url: String,
    pub caption: String,
}

/// Results arrive as one unit in server order and are never merged.
pub type ResultSet = Vec<HighlightResult>;

/// Commands emitted by presentation layers.
#[derive(Debug, Clone)]
pub enum UiCommand {
    /// `None` when the user submitted without choosing a file.
    SubmitUpload(Option<VideoAsset>),
    StartProcessing,
    Quit,
}

/// Rendering instructions emitted by the controller for presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowEvent {
    PhaseChanged(WorkflowPhase),
    Status(String),
    StartProcessingEnabled(bool),
    ClearResults,
    Render(ResultSet),
}

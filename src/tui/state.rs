use crate::model::{WorkflowEvent, WorkflowPhase};
use crate::render::{self, ResultCard};
use std::path::PathBuf;

/// Feedback from work the UI thread hands to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    /// The selected video could not be read; no upload was submitted.
    UploadReadFailed(String),
}

/// What pressing upload should do in the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadAction {
    /// Busy or already reading a file: nothing is sent.
    Ignore,
    /// No file chosen; the controller treats this as a no-op.
    SubmitNothing,
    /// Read this file off the UI thread, then submit it.
    Load(PathBuf),
}

pub struct UiState {
    pub tab: usize,
    pub phase: WorkflowPhase,
    /// Latest status line from the controller.
    pub status: String,
    /// UI-local feedback (downloads, clipboard, input errors).
    pub info: String,
    pub start_enabled: bool,

    pub video_path: Option<PathBuf>,
    pub path_input: String,
    pub path_editing: bool,
    /// A file read for upload is running on the runtime.
    pub upload_loading: bool,

    pub cards: Vec<ResultCard>,
    pub selected: usize,

    pub base_url: String,
    pub download_dir: PathBuf,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            phase: WorkflowPhase::Idle,
            status: "Choose a video and press u to upload.".into(),
            info: String::new(),
            start_enabled: false,
            video_path: None,
            path_input: String::new(),
            path_editing: false,
            upload_loading: false,
            cards: Vec::new(),
            selected: 0,
            base_url: String::new(),
            download_dir: PathBuf::from("."),
        }
    }
}

impl UiState {
    pub fn apply_event(&mut self, ev: WorkflowEvent) {
        match ev {
            WorkflowEvent::PhaseChanged(phase) => {
                self.phase = phase;
                self.upload_loading = false;
            }
            WorkflowEvent::Status(s) => self.status = s,
            WorkflowEvent::StartProcessingEnabled(enabled) => self.start_enabled = enabled,
            WorkflowEvent::ClearResults => {
                self.cards.clear();
                self.selected = 0;
            }
            WorkflowEvent::Render(set) => {
                self.cards = render::cards(&set);
                self.selected = 0;
            }
        }
    }

    pub fn apply_notice(&mut self, notice: Notice) {
        match notice {
            Notice::Info(msg) => self.info = msg,
            Notice::UploadReadFailed(msg) => {
                self.info = msg;
                self.upload_loading = false;
            }
        }
    }

    /// Decide what an upload press does. The file is only read when the controller would
    /// accept the submission.
    pub fn request_upload(&mut self) -> UploadAction {
        if self.upload_loading || !self.phase.accepts_upload() {
            self.info = format!("{}: upload unavailable", self.phase.label());
            return UploadAction::Ignore;
        }
        match self.video_path.clone() {
            Some(path) => {
                self.info = format!("Reading {}…", path.display());
                self.upload_loading = true;
                UploadAction::Load(path)
            }
            None => {
                self.info = "No video selected (press o)".into();
                UploadAction::SubmitNothing
            }
        }
    }

    pub fn selected_card(&self) -> Option<&ResultCard> {
        self.cards.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.cards.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn begin_path_edit(&mut self) {
        self.path_input = self
            .video_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.path_editing = true;
    }

    /// Commit the typed path. An empty input clears the selection.
    pub fn commit_path_edit(&mut self) {
        let typed = self.path_input.trim();
        self.video_path = if typed.is_empty() {
            None
        } else {
            Some(PathBuf::from(typed))
        };
        self.path_editing = false;
    }

    pub fn cancel_path_edit(&mut self) {
        self.path_input.clear();
        self.path_editing = false;
    }
}

use std::path::PathBuf;

use crate::backend::{BackendError, GenerateResponse, HealthResponse, ProgressSnapshot, UploadResponse};
use crate::ui_state::Screen;
use crate::upload::PickedFile;

/// Everything that can change session state: user input and backend completions.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Intro "start" button
    Start,
    /// Previous screen
    Back,
    /// Upload screen "continue" button
    Continue,
    /// Jump straight to a screen
    ShowScreen(Screen),

    AcquireFile(PickedFile),
    UploadFinished {
        seq: u64,
        result: Result<UploadResponse, BackendError>,
    },
    ChangeImage,

    SetInstruction(String),
    SetGuidanceScale(f32),
    SetInferenceSteps(u32),

    StartGeneration,
    GenerateFinished {
        seq: u64,
        result: Result<GenerateResponse, BackendError>,
    },
    /// Poll timer fired
    PollTick,
    ProgressReceived {
        task_id: String,
        result: Result<ProgressSnapshot, BackendError>,
    },
    NewEdit,

    Download,
    DownloadFinished(Result<PathBuf, BackendError>),

    CheckHealth,
    HealthChecked(Result<HealthResponse, BackendError>),

    DismissAlert,
    Help,
    Quit,
    /// Generic status line message (fallback)
    SystemMessage(String),
}

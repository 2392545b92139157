use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use crate::backend::{GenerationRequest, Metrics, ProgressSnapshot};
use crate::config::Config;
use crate::ui_state::Screen;
use crate::upload::PickedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationPhase {
    #[default]
    Idle,
    Submitting,
    Polling,
    Completed,
    Failed,
}

/// What the right-hand results pane shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsPanel {
    Hidden,
    Loading,
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditForm {
    pub instruction: String,
    pub guidance_scale: f32,
    pub inference_steps: u32,
}

impl EditForm {
    pub fn with_defaults(config: &Config) -> Self {
        Self {
            instruction: String::new(),
            guidance_scale: config.default_guidance_scale,
            inference_steps: config.default_inference_steps,
        }
    }

    pub fn guidance_label(&self) -> String {
        self.guidance_scale.to_string()
    }

    pub fn steps_label(&self) -> String {
        self.inference_steps.to_string()
    }

    pub fn trimmed_instruction(&self) -> &str {
        self.instruction.trim()
    }
}

/// A finished edit, kept for the sidebar history
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedEdit {
    pub instruction: String,
    pub output_ref: String,
    pub metrics: Option<Metrics>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendHealth {
    pub connected: bool,
    pub device: Option<String>,
}

/// The in-memory record of the wizard's file, task and result state.
#[derive(Debug, Clone)]
pub struct Session {
    pub screen: Screen,

    pub uploaded_file_ref: Option<String>,
    // Local file behind the preview
    pub preview: Option<PickedFile>,
    // Upload in flight, tagged with its sequence number
    pub pending_upload: Option<(u64, PickedFile)>,

    pub form: EditForm,

    pub phase: GenerationPhase,
    pub active_task_id: Option<String>,
    // What was sent for the task being tracked; the form stays editable meanwhile
    pub submitted: Option<GenerationRequest>,
    pub result_ref: Option<String>,
    pub progress: u8,
    pub latest: Option<ProgressSnapshot>,

    pub history: VecDeque<CompletedEdit>,
    pub health: BackendHealth,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            screen: Screen::Intro,
            uploaded_file_ref: None,
            preview: None,
            pending_upload: None,
            form: EditForm::with_defaults(config),
            phase: GenerationPhase::Idle,
            active_task_id: None,
            submitted: None,
            result_ref: None,
            progress: 0,
            latest: None,
            history: VecDeque::new(),
            health: BackendHealth::default(),
        }
    }

    /// The sole gate on starting a generation.
    pub fn can_generate(&self) -> bool {
        !self.form.trimmed_instruction().is_empty() && self.uploaded_file_ref.is_some()
    }

    pub fn can_continue(&self) -> bool {
        self.uploaded_file_ref.is_some()
    }

    pub fn download_enabled(&self) -> bool {
        self.result_ref.is_some()
    }

    pub fn results_panel(&self) -> ResultsPanel {
        match self.phase {
            GenerationPhase::Idle | GenerationPhase::Failed => ResultsPanel::Hidden,
            GenerationPhase::Submitting | GenerationPhase::Polling => ResultsPanel::Loading,
            GenerationPhase::Completed => ResultsPanel::Ready,
        }
    }

    pub fn progress_label(&self) -> String {
        format!("Processing... {}%", self.progress)
    }

    /// Metrics of the displayed result, formatted for display.
    pub fn metric_labels(&self) -> Option<(String, String)> {
        if self.phase != GenerationPhase::Completed {
            return None;
        }
        self.latest
            .as_ref()
            .and_then(|s| s.metrics)
            .map(|m| (m.ssim_label(), m.psnr_label()))
    }

    pub fn generation_request(&self) -> Option<GenerationRequest> {
        if !self.can_generate() {
            return None;
        }
        Some(GenerationRequest {
            file_ref: self.uploaded_file_ref.clone()?,
            instruction: self.form.trimmed_instruction().to_string(),
            guidance_scale: self.form.guidance_scale,
            inference_steps: self.form.inference_steps,
        })
    }

    pub fn push_history(&mut self, entry: CompletedEdit, limit: usize) {
        self.history.push_back(entry);
        while self.history.len() > limit {
            self.history.pop_front();
        }
    }
}

//! Session state machine.
//!
//! [`Controller::update`] is the only place session state changes. It never
//! performs I/O; it returns [`Effect`]s for the runtime to carry out, and the
//! runtime feeds the outcomes back in as [`Action`]s.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::backend::{GenerationRequest, ProgressSnapshot, TaskStatus};
use crate::config::Config;
use crate::session::{CompletedEdit, EditForm, GenerationPhase, Session};
use crate::ui_state::Screen;
use crate::upload::PickedFile;

/// Work requested by a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Upload { seq: u64, file: PickedFile },
    Generate { seq: u64, request: GenerationRequest },
    /// Replace any running poll timer with a fresh one
    ArmPollTimer,
    CancelPollTimer,
    FetchProgress { task_id: String },
    Download { result_ref: String, file_name: String },
    CheckHealth,
    /// Blocking, user-visible error
    Alert(String),
    Status(String),
    Quit,
}

pub struct Controller {
    pub session: Session,
    config: Config,
    timer_armed: bool,
    poll_in_flight: bool,
    upload_seq: u64,
    generate_seq: u64,
}

impl Controller {
    pub fn new(config: Config) -> Self {
        Self {
            session: Session::new(&config),
            config,
            timer_armed: false,
            poll_in_flight: false,
            upload_seq: 0,
            generate_seq: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn timer_armed(&self) -> bool {
        self.timer_armed
    }

    pub fn update(&mut self, action: Action) -> Vec<Effect> {
        let mut effects = Vec::new();

        match action {
            Action::Start => self.show_screen(Screen::Upload),
            Action::Back => match self.session.screen {
                Screen::Intro => {}
                Screen::Upload => self.show_screen(Screen::Intro),
                Screen::Edit => self.show_screen(Screen::Upload),
            },
            Action::Continue => {
                if self.session.can_continue() {
                    self.show_screen(Screen::Edit);
                }
            }
            Action::ShowScreen(screen) => self.show_screen(screen),

            Action::AcquireFile(file) => self.acquire_file(file, &mut effects),
            Action::UploadFinished { seq, result } => {
                let pending = match self.session.pending_upload.take() {
                    Some((pending_seq, file)) if pending_seq == seq => file,
                    other => {
                        debug!(seq, "ignoring superseded upload result");
                        self.session.pending_upload = other;
                        return effects;
                    }
                };

                match result {
                    Ok(response) => match response.accepted_path() {
                        Some(path) => {
                            info!(
                                file = %pending.name,
                                file_ref = path,
                                file_id = ?response.file_id,
                                "upload accepted"
                            );
                            self.session.uploaded_file_ref = Some(path.to_string());
                            self.session.preview = Some(pending);
                        }
                        None => {
                            let message = response.message.as_deref().unwrap_or("unknown error");
                            warn!(status = %response.status, message, "upload rejected");
                            effects.push(Effect::Alert(format!("Error uploading file: {}", message)));
                        }
                    },
                    Err(e) => {
                        warn!(error = %e, "upload failed");
                        effects.push(Effect::Alert("Error uploading file".to_string()));
                    }
                }
            }
            Action::ChangeImage => {
                self.session.uploaded_file_ref = None;
                self.session.preview = None;
                self.session.pending_upload = None;
            }

            Action::SetInstruction(text) => self.session.form.instruction = text,
            Action::SetGuidanceScale(value) => {
                self.session.form.guidance_scale = self.config.clamp_guidance(value);
            }
            Action::SetInferenceSteps(value) => {
                self.session.form.inference_steps = self.config.clamp_steps(value);
            }

            Action::StartGeneration => self.start_generation(&mut effects),
            Action::GenerateFinished { seq, result } => {
                if seq != self.generate_seq || self.session.phase != GenerationPhase::Submitting {
                    debug!(seq, current = self.generate_seq, "ignoring superseded generation response");
                    return effects;
                }

                match result {
                    Ok(response) => match response.processing_task() {
                        Some(task_id) => {
                            info!(task_id, "generation started, polling");
                            self.session.active_task_id = Some(task_id.to_string());
                            self.session.phase = GenerationPhase::Polling;
                            self.arm_timer(&mut effects);
                        }
                        None => {
                            let message = response.message.as_deref().unwrap_or("unknown error");
                            warn!(status = %response.status, message, "generation rejected");
                            effects.push(Effect::Alert(format!("Error starting generation: {}", message)));
                            self.reset_generation(GenerationPhase::Idle, &mut effects);
                        }
                    },
                    Err(e) => {
                        warn!(error = %e, "generation request failed");
                        effects.push(Effect::Alert("Error starting generation".to_string()));
                        self.reset_generation(GenerationPhase::Idle, &mut effects);
                    }
                }
            }
            Action::PollTick => self.poll_tick(&mut effects),
            Action::ProgressReceived { task_id, result } => {
                if self.session.active_task_id.as_deref() != Some(task_id.as_str())
                    || self.session.phase != GenerationPhase::Polling
                {
                    debug!(%task_id, "ignoring stale progress response");
                    return effects;
                }
                self.poll_in_flight = false;

                match result {
                    Ok(snapshot) => self.apply_snapshot(snapshot, &mut effects),
                    Err(e) => {
                        warn!(%task_id, error = %e, "progress query failed");
                        effects.push(Effect::Alert("Error checking progress".to_string()));
                        self.reset_generation(GenerationPhase::Idle, &mut effects);
                    }
                }
            }
            Action::NewEdit => self.reset_to_new_edit(&mut effects),

            Action::Download => {
                if let Some(result_ref) = &self.session.result_ref {
                    effects.push(Effect::Download {
                        result_ref: result_ref.clone(),
                        file_name: self.config.download_file_name.clone(),
                    });
                }
            }
            Action::DownloadFinished(result) => match result {
                Ok(path) => {
                    info!(path = %path.display(), "result saved");
                    effects.push(Effect::Status(format!("Saved to {}", path.display())));
                }
                Err(e) => {
                    warn!(error = %e, "download failed");
                    effects.push(Effect::Alert(format!("Error downloading image: {}", e)));
                }
            },

            Action::CheckHealth => effects.push(Effect::CheckHealth),
            Action::HealthChecked(result) => match result {
                Ok(health) => {
                    info!(status = %health.status, device = ?health.device, "backend reachable");
                    self.session.health.connected = true;
                    self.session.health.device = health.device;
                }
                Err(e) => {
                    warn!(error = %e, "backend health check failed");
                    self.session.health.connected = false;
                    self.session.health.device = None;
                    effects.push(Effect::Status("Backend unreachable".to_string()));
                }
            },

            Action::Quit => effects.push(Effect::Quit),
            Action::SystemMessage(message) => effects.push(Effect::Status(message)),
            // Presentation-only, handled by the app
            Action::DismissAlert | Action::Help => {}
        }

        effects
    }

    fn show_screen(&mut self, screen: Screen) {
        if self.session.screen != screen {
            debug!(from = self.session.screen.name(), to = screen.name(), "screen change");
        }
        self.session.screen = screen;
    }

    fn acquire_file(&mut self, file: PickedFile, effects: &mut Vec<Effect>) {
        if !file.is_image() {
            debug!(file = %file.name, mime = %file.mime, "rejected non-image file");
            effects.push(Effect::Alert("Please upload an image file".to_string()));
            return;
        }

        self.upload_seq += 1;
        let seq = self.upload_seq;
        info!(seq, file = %file.name, "uploading");
        self.session.pending_upload = Some((seq, file.clone()));
        effects.push(Effect::Status(format!("Uploading {}...", file.name)));
        effects.push(Effect::Upload { seq, file });
    }

    fn start_generation(&mut self, effects: &mut Vec<Effect>) {
        let Some(request) = self.session.generation_request() else {
            return;
        };

        self.cancel_timer(effects);
        self.poll_in_flight = false;
        self.session.active_task_id = None;
        self.session.submitted = Some(request.clone());
        self.session.result_ref = None;
        self.session.latest = None;
        self.session.progress = 0;
        self.session.phase = GenerationPhase::Submitting;

        self.generate_seq += 1;
        let seq = self.generate_seq;
        info!(
            seq,
            file_ref = %request.file_ref,
            guidance_scale = request.guidance_scale,
            inference_steps = request.inference_steps,
            "submitting generation"
        );
        effects.push(Effect::Generate { seq, request });
    }

    fn poll_tick(&mut self, effects: &mut Vec<Effect>) {
        // A tick queued before its timer was cancelled
        if !self.timer_armed {
            return;
        }

        let Some(task_id) = self.session.active_task_id.clone() else {
            self.cancel_timer(effects);
            return;
        };

        if self.poll_in_flight {
            debug!(%task_id, "previous progress query still in flight, skipping tick");
            return;
        }

        self.poll_in_flight = true;
        effects.push(Effect::FetchProgress { task_id });
    }

    fn apply_snapshot(&mut self, snapshot: ProgressSnapshot, effects: &mut Vec<Effect>) {
        match snapshot.status {
            TaskStatus::NotFound => {
                warn!(task_id = ?self.session.active_task_id, "task not found");
                effects.push(Effect::Alert("Generation task not found".to_string()));
                self.reset_generation(GenerationPhase::Idle, effects);
            }
            TaskStatus::Processing | TaskStatus::Unknown => {
                if let Some(progress) = snapshot.progress {
                    self.session.progress = progress.min(100);
                }
                self.session.latest = Some(snapshot);
            }
            TaskStatus::Completed => {
                let Some(output_ref) = snapshot.output_path.clone() else {
                    effects.push(Effect::Alert(
                        "Error generating image: no output returned".to_string(),
                    ));
                    self.reset_generation(GenerationPhase::Failed, effects);
                    return;
                };

                self.cancel_timer(effects);
                info!(task_id = ?self.session.active_task_id, %output_ref, "generation completed");
                self.session.progress = snapshot.progress.unwrap_or(100).min(100);
                self.session.result_ref = Some(output_ref.clone());
                self.session.phase = GenerationPhase::Completed;
                self.session.push_history(
                    CompletedEdit {
                        instruction: self
                            .session
                            .submitted
                            .as_ref()
                            .map(|request| request.instruction.clone())
                            .unwrap_or_default(),
                        output_ref,
                        metrics: snapshot.metrics,
                        finished_at: Utc::now(),
                    },
                    self.config.history_limit,
                );
                self.session.latest = Some(snapshot);
            }
            TaskStatus::Error => {
                let message = snapshot.error.as_deref().unwrap_or("unknown error");
                warn!(message, "generation failed");
                effects.push(Effect::Alert(format!("Error generating image: {}", message)));
                self.reset_generation(GenerationPhase::Failed, effects);
            }
        }
    }

    /// Back to a safe state after a failed generation; hides the results pane.
    fn reset_generation(&mut self, phase: GenerationPhase, effects: &mut Vec<Effect>) {
        self.cancel_timer(effects);
        self.poll_in_flight = false;
        self.session.active_task_id = None;
        self.session.submitted = None;
        self.session.phase = phase;
    }

    fn reset_to_new_edit(&mut self, effects: &mut Vec<Effect>) {
        self.cancel_timer(effects);
        self.poll_in_flight = false;

        self.session.form = EditForm::with_defaults(&self.config);
        self.session.active_task_id = None;
        self.session.submitted = None;
        self.session.result_ref = None;
        self.session.latest = None;
        self.session.progress = 0;
        self.session.phase = GenerationPhase::Idle;
        self.session.uploaded_file_ref = None;
        self.session.preview = None;
        self.session.pending_upload = None;

        info!("new edit");
        self.show_screen(Screen::Upload);
    }

    fn arm_timer(&mut self, effects: &mut Vec<Effect>) {
        self.timer_armed = true;
        effects.push(Effect::ArmPollTimer);
    }

    fn cancel_timer(&mut self, effects: &mut Vec<Effect>) {
        if self.timer_armed {
            self.timer_armed = false;
            effects.push(Effect::CancelPollTimer);
        }
    }
}

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use crate::action::Action;
use crate::command::CommandParser;
use crate::config::Config;
use crate::controller::{Controller, Effect};
use crate::session::Session;
use crate::ui_state::{Focus, Screen, UIState};
use crate::upload::{parse_dropped_path, PickedFile};

pub struct App {
    pub controller: Controller,
    pub ui: UIState,
    pub server_label: String,
    pub animation_frame: usize,
    pub animation_tick: u64,
    pub should_quit: bool,
    status_expires_at: u64,
}

impl App {
    pub fn new(config: Config, server_label: String) -> Self {
        Self {
            controller: Controller::new(config),
            ui: UIState::new(),
            server_label,
            animation_frame: 0,
            animation_tick: 0,
            should_quit: false,
            status_expires_at: 0,
        }
    }

    pub fn session(&self) -> &Session {
        &self.controller.session
    }

    pub fn config(&self) -> &Config {
        self.controller.config()
    }

    pub fn tick(&mut self) {
        self.animation_tick += 1;
        self.animation_frame = (self.animation_frame + 1) % 360;

        if self.ui.status_message.is_some() && self.animation_tick >= self.status_expires_at {
            self.ui.status_message = None;
        }
    }

    pub fn set_status(&mut self, message: String) {
        self.ui.status_message = Some(message);
        self.status_expires_at = self.animation_tick + self.config().status_timeout_ticks;
    }

    /// Run an action through the controller. Presentation effects are applied
    /// here; the rest are returned for the runtime.
    pub fn dispatch(&mut self, action: Action) -> Vec<Effect> {
        match &action {
            Action::DismissAlert => {
                self.ui.alert = None;
                return Vec::new();
            }
            Action::Help => {
                self.ui.show_help = !self.ui.show_help;
                return Vec::new();
            }
            Action::NewEdit => {
                self.ui.path_input.clear();
                self.ui.focus = Focus::Instruction;
            }
            _ => {}
        }

        let mut pending = Vec::new();
        for effect in self.controller.update(action) {
            match effect {
                Effect::Alert(message) => self.ui.alert = Some(message),
                Effect::Status(message) => self.set_status(message),
                Effect::Quit => self.should_quit = true,
                other => pending.push(other),
            }
        }
        pending
    }

    /// Translate a key press into actions. Text fields are edited in place.
    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if self.ui.alert.is_some() {
            return match key.code {
                KeyCode::Enter | KeyCode::Esc => vec![Action::DismissAlert],
                _ => Vec::new(),
            };
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return vec![Action::Quit];
        }

        if self.ui.show_help {
            return match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') => vec![Action::Help],
                _ => Vec::new(),
            };
        }

        match self.session().screen {
            Screen::Intro => match key.code {
                KeyCode::Esc => vec![Action::Quit],
                KeyCode::Char('?') => vec![Action::Help],
                _ => vec![Action::Start],
            },
            Screen::Upload => self.handle_upload_key(key),
            Screen::Edit => self.handle_edit_key(key),
        }
    }

    fn handle_upload_key(&mut self, key: KeyEvent) -> Vec<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => {
                if self.ui.path_input.is_empty() {
                    vec![Action::Back]
                } else {
                    self.ui.path_input.clear();
                    Vec::new()
                }
            }
            KeyCode::Char('r') if ctrl => {
                self.ui.path_input.clear();
                vec![Action::ChangeImage]
            }
            KeyCode::Char('v') if ctrl => {
                let text = clipboard_text();
                text.map(|t| self.handle_paste(&t)).unwrap_or_default()
            }
            KeyCode::Char(c) => {
                self.ui.path_input.push(c);
                Vec::new()
            }
            KeyCode::Backspace => {
                self.ui.path_input.pop();
                Vec::new()
            }
            KeyCode::Enter => {
                let input = std::mem::take(&mut self.ui.path_input);
                if input.trim().is_empty() {
                    return vec![Action::Continue];
                }
                if CommandParser::is_command(&input) {
                    return vec![command_action(&input)];
                }
                match parse_dropped_path(&input) {
                    Some(path) => vec![Action::AcquireFile(PickedFile::open(&path))],
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent) -> Vec<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let form = self.session().form.clone();
        let guidance_step = self.config().guidance_scale_step;
        let steps_step = self.config().inference_steps_step;

        match key.code {
            KeyCode::Esc => vec![Action::Back],
            KeyCode::Tab => {
                self.ui.focus = self.ui.focus.next();
                Vec::new()
            }
            KeyCode::BackTab => {
                self.ui.focus = self.ui.focus.prev();
                Vec::new()
            }
            KeyCode::Char('d') if ctrl => vec![Action::Download],
            KeyCode::Char('n') if ctrl => vec![Action::NewEdit],
            KeyCode::Char('g') if ctrl => vec![Action::StartGeneration],
            KeyCode::Char('v') if ctrl => {
                let text = clipboard_text();
                text.map(|t| self.handle_paste(&t)).unwrap_or_default()
            }
            KeyCode::Left | KeyCode::Right => {
                let sign = if key.code == KeyCode::Left { -1.0 } else { 1.0 };
                match self.ui.focus {
                    Focus::GuidanceScale => vec![Action::SetGuidanceScale(
                        form.guidance_scale + sign * guidance_step,
                    )],
                    Focus::InferenceSteps => {
                        let steps = if sign < 0.0 {
                            form.inference_steps.saturating_sub(steps_step)
                        } else {
                            form.inference_steps + steps_step
                        };
                        vec![Action::SetInferenceSteps(steps)]
                    }
                    _ => Vec::new(),
                }
            }
            KeyCode::Enter => {
                if self.ui.focus == Focus::Instruction && CommandParser::is_command(&form.instruction) {
                    vec![Action::SetInstruction(String::new()), command_action(&form.instruction)]
                } else {
                    vec![Action::StartGeneration]
                }
            }
            KeyCode::Char(c) if self.ui.focus == Focus::Instruction => {
                let mut text = form.instruction;
                text.push(c);
                vec![Action::SetInstruction(text)]
            }
            KeyCode::Backspace if self.ui.focus == Focus::Instruction => {
                let mut text = form.instruction;
                text.pop();
                vec![Action::SetInstruction(text)]
            }
            _ => Vec::new(),
        }
    }

    /// Bracketed paste. Terminals deliver a dropped file as its pasted path,
    /// so on the upload screen an existing file is acquired right away.
    pub fn handle_paste(&mut self, text: &str) -> Vec<Action> {
        if self.ui.alert.is_some() {
            return Vec::new();
        }

        let single_line: String = text
            .chars()
            .filter(|c| *c != '\r')
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();

        match self.session().screen {
            Screen::Upload => {
                if let Some(path) = parse_dropped_path(text).filter(|p| p.is_file()) {
                    debug!(path = %path.display(), "file dropped");
                    self.ui.path_input.clear();
                    return vec![Action::AcquireFile(PickedFile::open(&path))];
                }
                self.ui.path_input.push_str(single_line.trim_end());
                Vec::new()
            }
            Screen::Edit if self.ui.focus == Focus::Instruction => {
                let mut instruction = self.session().form.instruction.clone();
                instruction.push_str(&single_line);
                vec![Action::SetInstruction(instruction)]
            }
            _ => Vec::new(),
        }
    }
}

fn command_action(input: &str) -> Action {
    CommandParser::parse(input).unwrap_or_else(Action::SystemMessage)
}

fn clipboard_text() -> Option<String> {
    arboard::Clipboard::new().ok()?.get_text().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::UploadResponse;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn app() -> App {
        App::new(Config::default(), "http://127.0.0.1:8000/".to_string())
    }

    /// Feed a key through the same path the main loop uses.
    fn press(app: &mut App, event: KeyEvent) -> Vec<Effect> {
        let mut effects = Vec::new();
        for action in app.handle_key(event) {
            effects.extend(app.dispatch(action));
        }
        effects
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, key(KeyCode::Char(c)));
        }
    }

    fn uploaded_app() -> App {
        let mut app = app();
        press(&mut app, key(KeyCode::Enter));
        app.dispatch(Action::AcquireFile(PickedFile::from_path(std::path::Path::new("a.png"))));
        app.dispatch(Action::UploadFinished {
            seq: 1,
            result: Ok(UploadResponse {
                status: "success".into(),
                file_path: Some("/files/a.png".into()),
                file_id: None,
                message: None,
            }),
        });
        app
    }

    #[test]
    fn test_intro_any_key_starts() {
        let mut app = app();
        press(&mut app, key(KeyCode::Char('x')));
        assert_eq!(app.session().screen, Screen::Upload);

        press(&mut app, key(KeyCode::Esc));
        assert_eq!(app.session().screen, Screen::Intro);
        press(&mut app, key(KeyCode::Esc));
        assert!(app.should_quit);
    }

    #[test]
    fn test_non_image_path_raises_blocking_alert() {
        let mut app = app();
        press(&mut app, key(KeyCode::Enter));
        type_text(&mut app, "/tmp/notes.txt");
        let effects = press(&mut app, key(KeyCode::Enter));

        assert!(effects.is_empty());
        assert_eq!(app.ui.alert.as_deref(), Some("Please upload an image file"));

        // Only dismiss keys get through while the alert is open
        assert!(app.handle_key(key(KeyCode::Char('q'))).is_empty());
        press(&mut app, key(KeyCode::Enter));
        assert!(app.ui.alert.is_none());
    }

    #[test]
    fn test_image_path_uploads() {
        let mut app = app();
        press(&mut app, key(KeyCode::Enter));
        type_text(&mut app, "/tmp/cat.png");
        let effects = press(&mut app, key(KeyCode::Enter));

        assert_eq!(effects.len(), 1);
        assert!(matches!(&effects[0], Effect::Upload { seq: 1, file } if file.name == "cat.png"));
        assert!(app.ui.path_input.is_empty());
        assert_eq!(app.ui.status_message.as_deref(), Some("Uploading cat.png..."));
    }

    #[test]
    fn test_typed_command_on_upload_screen() {
        let mut app = app();
        press(&mut app, key(KeyCode::Enter));
        type_text(&mut app, "/back");
        press(&mut app, key(KeyCode::Enter));
        assert_eq!(app.session().screen, Screen::Intro);
    }

    #[test]
    fn test_dropped_file_is_acquired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drop me.png");
        image::RgbImage::new(4, 4).save(&path).unwrap();

        let mut app = app();
        press(&mut app, key(KeyCode::Enter));
        let pasted = format!("'{}'", path.display());
        let actions = app.handle_paste(&pasted);

        match actions.as_slice() {
            [Action::AcquireFile(file)] => {
                assert_eq!(file.name, "drop me.png");
                assert_eq!(file.dimensions, Some((4, 4)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_edit_form_keys() {
        let mut app = uploaded_app();
        press(&mut app, key(KeyCode::Enter));
        assert_eq!(app.session().screen, Screen::Edit);

        // Enter with an empty instruction does nothing
        assert!(press(&mut app, key(KeyCode::Enter)).is_empty());

        type_text(&mut app, "make it blue");
        assert_eq!(app.session().form.instruction, "make it blue");
        assert!(app.session().can_generate());

        press(&mut app, key(KeyCode::Tab));
        press(&mut app, key(KeyCode::Right));
        assert_eq!(app.session().form.guidance_label(), "12.5");

        press(&mut app, key(KeyCode::Tab));
        press(&mut app, key(KeyCode::Left));
        assert_eq!(app.session().form.steps_label(), "45");

        // Letters no longer reach the instruction once focus moved
        press(&mut app, key(KeyCode::Char('x')));
        assert_eq!(app.session().form.instruction, "make it blue");

        let effects = press(&mut app, key(KeyCode::Enter));
        assert!(matches!(&effects[..], [Effect::Generate { request: req, .. }]
            if req.guidance_scale == 12.5 && req.inference_steps == 45));
    }

    #[test]
    fn test_new_edit_shortcut_resets() {
        let mut app = uploaded_app();
        press(&mut app, key(KeyCode::Enter));
        type_text(&mut app, "make it blue");
        press(&mut app, key(KeyCode::Tab));

        press(&mut app, ctrl('n'));
        assert_eq!(app.session().screen, Screen::Upload);
        assert_eq!(app.ui.focus, Focus::Instruction);
        assert_eq!(app.session().form.instruction, "");
        assert!(!app.session().can_generate());
    }

    #[test]
    fn test_status_message_expires() {
        let mut app = app();
        app.set_status("hello".to_string());
        for _ in 0..app.config().status_timeout_ticks {
            app.tick();
        }
        assert!(app.ui.status_message.is_none());
    }
}

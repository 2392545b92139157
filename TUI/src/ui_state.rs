#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Intro,
    Upload,
    Edit,
}

impl Screen {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "intro" => Some(Screen::Intro),
            "upload" => Some(Screen::Upload),
            "edit" => Some(Screen::Edit),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Screen::Intro => "intro",
            Screen::Upload => "upload",
            Screen::Edit => "edit",
        }
    }
}

/// Which edit form control receives keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Instruction,
    GuidanceScale,
    InferenceSteps,
    Generate,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Instruction => Focus::GuidanceScale,
            Focus::GuidanceScale => Focus::InferenceSteps,
            Focus::InferenceSteps => Focus::Generate,
            Focus::Generate => Focus::Instruction,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Instruction => Focus::Generate,
            Focus::GuidanceScale => Focus::Instruction,
            Focus::InferenceSteps => Focus::GuidanceScale,
            Focus::Generate => Focus::InferenceSteps,
        }
    }
}

#[derive(Default)]
pub struct UIState {
    // Path typed or dropped on the upload screen
    pub path_input: String,
    pub focus: Focus,
    pub status_message: Option<String>,

    // Blocking alert; only dismiss keys are accepted while set
    pub alert: Option<String>,

    pub show_help: bool,
}

impl UIState {
    pub fn new() -> Self {
        Self::default()
    }
}

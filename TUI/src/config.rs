/// Application configuration and constants.

#[derive(Debug, Clone)]
pub struct Config {
    /// Main loop tick rate in milliseconds (target 60 FPS = ~16ms)
    pub tick_rate_ms: u64,

    /// How many ticks to show status messages (180 = ~3s at 60fps)
    pub status_timeout_ticks: u64,

    /// Period of the task progress poll
    pub poll_interval_ms: u64,

    /// Guidance scale restored on a new edit
    pub default_guidance_scale: f32,
    pub guidance_scale_min: f32,
    pub guidance_scale_max: f32,
    pub guidance_scale_step: f32,

    /// Inference steps restored on a new edit
    pub default_inference_steps: u32,
    pub inference_steps_min: u32,
    pub inference_steps_max: u32,
    pub inference_steps_step: u32,

    /// Name the downloaded result is saved under
    pub download_file_name: String,

    /// Completed edits kept in the sidebar history
    pub history_limit: usize,

    /// Width of the sidebar in characters
    pub sidebar_width: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_rate_ms: 16,
            status_timeout_ticks: 180,
            poll_interval_ms: 1000,
            default_guidance_scale: 12.0,
            guidance_scale_min: 1.0,
            guidance_scale_max: 20.0,
            guidance_scale_step: 0.5,
            default_inference_steps: 50,
            inference_steps_min: 10,
            inference_steps_max: 100,
            inference_steps_step: 5,
            download_file_name: "redefined_image.png".to_string(),
            history_limit: 8,
            sidebar_width: 30,
        }
    }
}

impl Config {
    pub fn clamp_guidance(&self, value: f32) -> f32 {
        value.clamp(self.guidance_scale_min, self.guidance_scale_max)
    }

    pub fn clamp_steps(&self, value: u32) -> u32 {
        value.clamp(self.inference_steps_min, self.inference_steps_max)
    }
}

/// Global commands list
pub const COMMANDS: &[(&str, &str)] = &[
    ("/help", "Show available commands"),
    ("/start", "Go to the upload screen"),
    ("/open", "Upload an image by path"),
    ("/change", "Pick a different image"),
    ("/continue", "Go to the edit screen"),
    ("/back", "Previous screen"),
    ("/generate", "Start the edit"),
    ("/download", "Save the result"),
    ("/new", "Start a new edit"),
    ("/health", "Check the backend"),
    ("/screen", "Jump to intro|upload|edit"),
    ("/quit", "Exit ReDefine"),
];

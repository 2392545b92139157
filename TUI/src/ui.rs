use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::App;
use crate::config::COMMANDS;
use crate::session::{GenerationPhase, ResultsPanel};
use crate::ui_state::{Focus, Screen};

// Copper Sapphire Morning color palette
const BG_DARK: Color = Color::Rgb(12, 12, 16);           // Deep background
const BG_PANEL: Color = Color::Rgb(18, 18, 24);          // Slightly lighter for panels

// Sapphire blues
const SAPPHIRE: Color = Color::Rgb(101, 150, 243);       // #6596F3 - Primary accent
const CYAN_LIGHT: Color = Color::Rgb(178, 220, 226);     // #B2DCE2 - Light cyan

// Copper/warm tones
const COPPER: Color = Color::Rgb(138, 72, 38);           // #8A4826 - Copper
const TAN: Color = Color::Rgb(216, 180, 169);            // #D8B4A9 - Tan/beige
const PALE_YELLOW: Color = Color::Rgb(234, 208, 148);    // #EAD094 - Pale yellow

// Accent colors
const BURGUNDY: Color = Color::Rgb(204, 92, 68);         // #CC5C44 - Warnings/errors
const OLIVE: Color = Color::Rgb(131, 179, 102);          // #83B366 - Success/green
const LAVENDER: Color = Color::Rgb(211, 164, 234);       // #D3A4EA - Purple accent

// Text colors
const TEXT_PRIMARY: Color = Color::Rgb(240, 240, 245);   // Near white
const TEXT_SECONDARY: Color = Color::Rgb(180, 180, 190); // Light gray
const TEXT_MUTED: Color = Color::Rgb(105, 116, 133);     // #697485 - Medium gray

// Border colors (subtle)
const BORDER_DIM: Color = Color::Rgb(45, 50, 60);        // Dim border
const BORDER_ACCENT: Color = Color::Rgb(70, 85, 110);    // Accent border

/// Keep the tail of `text` that fits in `width` columns
fn tail_fit(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out: Vec<char> = Vec::new();
    let mut used = 1; // ellipsis
    for ch in text.chars().rev() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.reverse();
    format!("…{}", out.into_iter().collect::<String>())
}

pub fn draw(frame: &mut Frame, app: &App) {
    // Fill entire background
    let bg = Block::default().style(Style::default().bg(BG_DARK));
    frame.render_widget(bg, frame.area());

    match app.session().screen {
        Screen::Intro => draw_intro(frame, app),
        Screen::Upload | Screen::Edit => draw_workspace(frame, app),
    }

    if app.ui.show_help {
        draw_help_popup(frame);
    }

    if let Some(message) = &app.ui.alert {
        draw_alert(frame, message);
    }
}

fn draw_intro(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let v_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Length(10),  // Logo container
            Constraint::Length(3),   // Subtitle
            Constraint::Length(3),   // Hint
            Constraint::Min(0),
        ])
        .split(area);

    let logo_width = 64;
    let h_padding = (area.width.saturating_sub(logo_width)) / 2;
    let logo_area = Rect {
        x: area.x + h_padding,
        y: v_chunks[1].y,
        width: logo_width.min(area.width),
        height: v_chunks[1].height,
    };

    draw_glass_border(frame, logo_area, "", app.animation_frame, true);

    let inner = Rect {
        x: logo_area.x + 2,
        y: logo_area.y + 1,
        width: logo_area.width.saturating_sub(4),
        height: logo_area.height.saturating_sub(2),
    };
    draw_animated_logo(frame, inner, app.animation_frame);

    // Subtitle with typing animation
    let subtitle_text = "Edit images with plain-language instructions";
    let visible_chars = ((app.animation_frame as f64 / 120.0 * subtitle_text.len() as f64) as usize)
        .min(subtitle_text.len());
    let subtitle = if app.animation_tick < 120 {
        format!("{}|", &subtitle_text[..visible_chars])
    } else {
        subtitle_text.to_string()
    };
    let subtitle_widget = Paragraph::new(subtitle)
        .alignment(Alignment::Center)
        .style(Style::default().fg(TEXT_SECONDARY));
    frame.render_widget(subtitle_widget, v_chunks[2]);

    // Start hint with copper glow
    let glow = (app.animation_frame as f64 / 45.0).sin().abs() * 0.5 + 0.5;
    let r = (138.0 + (216.0 - 138.0) * glow) as u8;
    let g = (72.0 + (180.0 - 72.0) * glow) as u8;
    let b = (38.0 + (169.0 - 38.0) * glow) as u8;
    let hint = Paragraph::new("[ Press any key to start ]")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Rgb(r, g, b)));
    frame.render_widget(hint, v_chunks[3]);

    let version_area = Rect {
        x: area.x,
        y: area.height.saturating_sub(2),
        width: area.width,
        height: 1,
    };
    let version = Paragraph::new(format!("v{}  ·  {}", env!("CARGO_PKG_VERSION"), app.server_label))
        .alignment(Alignment::Center)
        .style(Style::default().fg(TEXT_MUTED));
    frame.render_widget(version, version_area);
}

fn draw_glass_border(frame: &mut Frame, area: Rect, title: &str, anim_frame: usize, glow: bool) {
    // Animated border - cycles between sapphire and copper
    let border_color = if glow {
        let t = (anim_frame as f64 / 120.0).sin() * 0.5 + 0.5;
        let r = (84.0 + (138.0 - 84.0) * t) as u8;
        let g = (112.0 + (72.0 - 112.0) * t) as u8;
        let b = (156.0 + (38.0 - 156.0) * t) as u8;
        Color::Rgb(r, g, b)
    } else {
        BORDER_DIM
    };

    let block = Block::default()
        .title(Span::styled(title, Style::default().fg(SAPPHIRE).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color));

    frame.render_widget(block, area);
}

fn draw_animated_logo(frame: &mut Frame, area: Rect, anim_frame: usize) {
    let logo_lines = [
        "",
        "█▀█ █▀▀ █▀▄ █▀▀ █▀▀ █ █▄ █ █▀▀",
        "█▀▄ ██▄ █▄▀ ██▄ █▀  █ █ ▀█ ██▄",
        "",
        "[ Instruction-driven image editing ]",
    ];

    let mut lines: Vec<Line> = Vec::new();
    for (line_idx, logo_line) in logo_lines.iter().enumerate() {
        let mut spans: Vec<Span> = Vec::new();
        for (char_idx, ch) in logo_line.chars().enumerate() {
            // Wave between sapphire and copper
            let wave_offset = (anim_frame as f64 / 25.0) + (char_idx as f64 / 6.0) - (line_idx as f64 / 2.0);
            let t = wave_offset.sin() * 0.5 + 0.5;
            let (r, g, b) = (
                (101.0 + (138.0 - 101.0) * t) as u8,
                (150.0 + (72.0 - 150.0) * t) as u8,
                (243.0 + (38.0 - 243.0) * t) as u8,
            );
            spans.push(Span::styled(ch.to_string(), Style::default().fg(Color::Rgb(r, g, b))));
        }
        lines.push(Line::from(spans));
    }

    let logo = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(logo, area);
}

fn draw_workspace(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let padded = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(app.config().sidebar_width),  // Sidebar
            Constraint::Length(1),                            // Gap
            Constraint::Min(40),                              // Screen
        ])
        .split(padded);

    draw_sidebar(frame, app, main_chunks[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Step indicator
            Constraint::Min(8),     // Screen body
            Constraint::Length(1),  // Status line
        ])
        .split(main_chunks[2]);

    draw_steps(frame, app, right[0]);
    match app.session().screen {
        Screen::Upload => draw_upload(frame, app, right[1]),
        _ => draw_edit(frame, app, right[1]),
    }
    draw_status_line(frame, app, right[2]);
}

fn draw_steps(frame: &mut Frame, app: &App, area: Rect) {
    let session = app.session();
    let steps = [
        ("1 Upload", session.screen == Screen::Upload),
        ("2 Edit", session.screen == Screen::Edit && session.results_panel() == ResultsPanel::Hidden),
        ("3 Results", session.screen == Screen::Edit && session.results_panel() != ResultsPanel::Hidden),
    ];

    let mut spans = vec![Span::raw(" ")];
    for (i, (label, active)) in steps.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  ─  ", Style::default().fg(BORDER_ACCENT)));
        }
        let style = if *active {
            Style::default().fg(SAPPHIRE).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_MUTED)
        };
        spans.push(Span::styled(*label, style));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_DIM));
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),   // Backend
            Constraint::Length(1),   // Gap
            Constraint::Length(6),   // Session
            Constraint::Length(1),   // Gap
            Constraint::Min(4),      // History
            Constraint::Length(4),   // Keyboard hints
        ])
        .split(area);

    draw_backend_info(frame, app, chunks[0]);
    draw_session_info(frame, app, chunks[2]);
    draw_history(frame, app, chunks[4]);
    draw_keyboard_hints(frame, chunks[5]);
}

fn draw_backend_info(frame: &mut Frame, app: &App, area: Rect) {
    let health = &app.session().health;
    let (title_color, status_icon, status_text) = if health.connected {
        let device = health.device.as_deref().unwrap_or("unknown device");
        (SAPPHIRE, "*", format!("Connected ({})", device))
    } else {
        (TEXT_MUTED, "o", "Offline".to_string())
    };

    let block = Block::default()
        .title(Span::styled(" Backend ", Style::default().fg(title_color).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_ACCENT));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = inner.width.saturating_sub(3) as usize;
    let status_color = if health.connected { OLIVE } else { BURGUNDY };
    let lines = vec![
        Line::from(vec![
            Span::styled(format!(" {} ", status_icon), Style::default().fg(status_color)),
            Span::styled(status_text, Style::default().fg(status_color)),
        ]),
        Line::from(vec![
            Span::styled(" @ ", Style::default().fg(CYAN_LIGHT)),
            Span::styled(tail_fit(&app.server_label, width), Style::default().fg(TEXT_SECONDARY)),
        ]),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_session_info(frame: &mut Frame, app: &App, area: Rect) {
    let session = app.session();
    let block = Block::default()
        .title(Span::styled(" Session ", Style::default().fg(COPPER).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_DIM));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = inner.width.saturating_sub(3) as usize;
    let (phase_text, phase_color) = match session.phase {
        GenerationPhase::Idle => ("idle", TEXT_MUTED),
        GenerationPhase::Submitting => ("submitting", PALE_YELLOW),
        GenerationPhase::Polling => ("generating", PALE_YELLOW),
        GenerationPhase::Completed => ("completed", OLIVE),
        GenerationPhase::Failed => ("failed", BURGUNDY),
    };

    let lines = vec![
        Line::from(vec![
            Span::styled(" > ", Style::default().fg(SAPPHIRE)),
            Span::styled(
                tail_fit(session.uploaded_file_ref.as_deref().unwrap_or("no image"), width),
                Style::default().fg(TEXT_PRIMARY),
            ),
        ]),
        Line::from(vec![
            Span::styled(" # ", Style::default().fg(LAVENDER)),
            Span::styled(
                tail_fit(session.active_task_id.as_deref().unwrap_or("no task"), width),
                Style::default().fg(TEXT_SECONDARY),
            ),
        ]),
        Line::from(vec![
            Span::styled(" ~ ", Style::default().fg(COPPER)),
            Span::styled(phase_text, Style::default().fg(phase_color)),
            Span::styled(
                if app.controller.timer_armed() { " (polling)" } else { "" },
                Style::default().fg(TEXT_MUTED),
            ),
        ]),
        Line::from(vec![
            Span::styled(" $ ", Style::default().fg(OLIVE)),
            Span::styled(
                tail_fit(session.result_ref.as_deref().unwrap_or("no result"), width),
                Style::default().fg(TEXT_SECONDARY),
            ),
        ]),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_history(frame: &mut Frame, app: &App, area: Rect) {
    let history = &app.session().history;
    let block = Block::default()
        .title(Span::styled(" History ", Style::default().fg(TEXT_MUTED)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_DIM));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if history.is_empty() {
        let empty = Paragraph::new(Span::styled(" No edits yet", Style::default().fg(TEXT_MUTED)));
        frame.render_widget(empty, inner);
        return;
    }

    let width = inner.width.saturating_sub(9) as usize;
    let mut lines = Vec::new();
    for entry in history.iter().rev() {
        lines.push(Line::from(vec![
            Span::styled(format!(" {} ", entry.finished_at.format("%H:%M")), Style::default().fg(TEXT_MUTED)),
            Span::styled(tail_fit(&entry.instruction, width), Style::default().fg(TEXT_PRIMARY)),
        ]));
        if let Some(metrics) = entry.metrics {
            lines.push(Line::from(Span::styled(
                format!("       {} · {}", metrics.ssim_label(), metrics.psnr_label()),
                Style::default().fg(CYAN_LIGHT),
            )));
        }
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_keyboard_hints(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_DIM));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let hints = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("ESC", Style::default().fg(SAPPHIRE).add_modifier(Modifier::BOLD)),
            Span::styled(" back  ", Style::default().fg(TEXT_MUTED)),
            Span::styled("/", Style::default().fg(COPPER).add_modifier(Modifier::BOLD)),
            Span::styled(" cmds", Style::default().fg(TEXT_MUTED)),
        ]),
        Line::from(vec![
            Span::styled("TAB", Style::default().fg(LAVENDER).add_modifier(Modifier::BOLD)),
            Span::styled(" focus  ", Style::default().fg(TEXT_MUTED)),
            Span::styled("^N", Style::default().fg(LAVENDER).add_modifier(Modifier::BOLD)),
            Span::styled(" new", Style::default().fg(TEXT_MUTED)),
        ]),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(hints, inner);
}

fn draw_upload(frame: &mut Frame, app: &App, area: Rect) {
    let session = app.session();

    if let Some(preview) = &session.preview {
        let block = Block::default()
            .title(Span::styled(" Preview ", Style::default().fg(OLIVE).add_modifier(Modifier::BOLD)))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(OLIVE));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let dimensions = preview
            .dimensions
            .map(|(w, h)| format!("{} × {} px", w, h))
            .unwrap_or_else(|| "size unknown".to_string());
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("  {}", preview.name),
                Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(format!("  {}  ·  {}", preview.mime, dimensions), Style::default().fg(TEXT_SECONDARY))),
            Line::from(Span::styled(
                format!("  stored as {}", session.uploaded_file_ref.as_deref().unwrap_or("")),
                Style::default().fg(TEXT_MUTED),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("  [Enter] ", Style::default().fg(SAPPHIRE).add_modifier(Modifier::BOLD)),
                Span::styled("Continue   ", Style::default().fg(TEXT_PRIMARY)),
                Span::styled("[Ctrl+R] ", Style::default().fg(COPPER).add_modifier(Modifier::BOLD)),
                Span::styled("Change image", Style::default().fg(TEXT_PRIMARY)),
            ]),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
        return;
    }

    // Drop target
    draw_glass_border(frame, area, " Upload an image ", app.animation_frame, session.pending_upload.is_none());
    let inner = Rect {
        x: area.x + 2,
        y: area.y + 1,
        width: area.width.saturating_sub(4),
        height: area.height.saturating_sub(2),
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Length(3),  // Hint
            Constraint::Length(3),  // Path input
            Constraint::Min(0),
        ])
        .split(inner);

    let hint = if let Some((_, file)) = &session.pending_upload {
        Paragraph::new(vec![
            Line::from(Span::styled(format!("Uploading {}...", file.name), Style::default().fg(PALE_YELLOW))),
        ])
    } else {
        Paragraph::new(vec![
            Line::from(Span::styled("Drop an image onto the terminal", Style::default().fg(TEXT_PRIMARY))),
            Line::from(Span::styled("or type its path and press Enter", Style::default().fg(TEXT_MUTED))),
        ])
    };
    frame.render_widget(hint.alignment(Alignment::Center), chunks[1]);

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_ACCENT));
    let width = chunks[2].width.saturating_sub(6) as usize;
    let cursor = if app.animation_frame % 30 < 15 { "|" } else { " " };
    let input = Paragraph::new(format!(" > {}{}", tail_fit(&app.ui.path_input, width), cursor))
        .style(Style::default().fg(TEXT_PRIMARY))
        .block(input_block);
    frame.render_widget(input, chunks[2]);
}

fn draw_edit(frame: &mut Frame, app: &App, area: Rect) {
    let session = app.session();
    let panel = session.results_panel();

    let constraints = if panel == ResultsPanel::Hidden {
        vec![Constraint::Percentage(100)]
    } else {
        vec![Constraint::Percentage(55), Constraint::Length(1), Constraint::Percentage(45)]
    };
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    draw_edit_panel(frame, app, chunks[0]);
    if panel != ResultsPanel::Hidden {
        draw_results_panel(frame, app, chunks[2]);
    }
}

fn focus_style(app: &App, focus: Focus) -> Style {
    if app.ui.focus == focus {
        // Pulsing border when focused
        let glow = (app.animation_frame as f64 / 90.0).sin() * 0.3 + 0.7;
        Style::default().fg(Color::Rgb((101.0 * glow) as u8, (150.0 * glow) as u8, (243.0 * glow) as u8))
    } else {
        Style::default().fg(BORDER_DIM)
    }
}

fn draw_edit_panel(frame: &mut Frame, app: &App, area: Rect) {
    let session = app.session();
    let config = app.config();

    let block = Block::default()
        .title(Span::styled(" Edit ", Style::default().fg(SAPPHIRE).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_ACCENT));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),  // Instruction
            Constraint::Length(3),  // Guidance scale
            Constraint::Length(3),  // Inference steps
            Constraint::Length(3),  // Generate button
            Constraint::Min(0),
        ])
        .split(inner);

    // Instruction
    let cursor = if app.ui.focus == Focus::Instruction && app.animation_frame % 30 < 15 { "|" } else { " " };
    let instruction = Paragraph::new(format!("{}{}", session.form.instruction, cursor))
        .style(Style::default().fg(TEXT_PRIMARY))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(Span::styled(" Describe the edit ", Style::default().fg(TEXT_SECONDARY)))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(focus_style(app, Focus::Instruction)),
        );
    frame.render_widget(instruction, chunks[0]);

    // Sliders: the label is rendered from the value, so it always echoes it
    let guidance_ratio = (session.form.guidance_scale - config.guidance_scale_min)
        / (config.guidance_scale_max - config.guidance_scale_min);
    draw_slider(
        frame,
        chunks[1],
        " Guidance scale ",
        &session.form.guidance_label(),
        guidance_ratio as f64,
        focus_style(app, Focus::GuidanceScale),
    );

    let steps_ratio = (session.form.inference_steps - config.inference_steps_min) as f64
        / (config.inference_steps_max - config.inference_steps_min) as f64;
    draw_slider(
        frame,
        chunks[2],
        " Inference steps ",
        &session.form.steps_label(),
        steps_ratio,
        focus_style(app, Focus::InferenceSteps),
    );

    // Generate button
    let enabled = session.can_generate() && !matches!(
        session.phase,
        GenerationPhase::Submitting | GenerationPhase::Polling
    );
    let (label, color) = if enabled {
        ("[ Generate ]", OLIVE)
    } else {
        ("[ Generate ]  (needs an image and an instruction)", TEXT_MUTED)
    };
    let button = Paragraph::new(Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(focus_style(app, Focus::Generate)),
        );
    frame.render_widget(button, chunks[3]);
}

fn draw_slider(frame: &mut Frame, area: Rect, title: &str, label: &str, ratio: f64, border: Style) {
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled(title, Style::default().fg(TEXT_SECONDARY)))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(border),
        )
        .ratio(ratio.clamp(0.0, 1.0))
        .gauge_style(Style::default().fg(SAPPHIRE).bg(BG_PANEL))
        .label(Span::styled(label.to_string(), Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD)));
    frame.render_widget(gauge, area);
}

fn draw_results_panel(frame: &mut Frame, app: &App, area: Rect) {
    let session = app.session();

    let block = Block::default()
        .title(Span::styled(" Results ", Style::default().fg(COPPER).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_ACCENT));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),  // Progress / output
            Constraint::Length(1),
            Constraint::Min(4),     // Metrics
            Constraint::Length(3),  // Download
        ])
        .split(inner);

    if session.results_panel() == ResultsPanel::Loading {
        let gauge = Gauge::default()
            .ratio(session.progress as f64 / 100.0)
            .gauge_style(Style::default().fg(PALE_YELLOW).bg(BG_PANEL))
            .label(session.progress_label());
        frame.render_widget(gauge, chunks[1]);
        return;
    }

    let width = chunks[1].width.saturating_sub(10) as usize;
    let output = Line::from(vec![
        Span::styled(" Output ", Style::default().fg(TEXT_MUTED)),
        Span::styled(
            tail_fit(session.result_ref.as_deref().unwrap_or(""), width),
            Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD),
        ),
    ]);
    frame.render_widget(Paragraph::new(output), chunks[1]);

    let metrics = match session.metric_labels() {
        Some((ssim, psnr)) => vec![
            Line::from(vec![
                Span::styled(" SSIM  ", Style::default().fg(TEXT_MUTED)),
                Span::styled(ssim, Style::default().fg(CYAN_LIGHT).add_modifier(Modifier::BOLD)),
            ]),
            Line::from(vec![
                Span::styled(" PSNR  ", Style::default().fg(TEXT_MUTED)),
                Span::styled(psnr, Style::default().fg(CYAN_LIGHT).add_modifier(Modifier::BOLD)),
            ]),
        ],
        None => vec![Line::from(Span::styled(" No metrics reported", Style::default().fg(TEXT_MUTED)))],
    };
    frame.render_widget(Paragraph::new(metrics), chunks[3]);

    let (label, color) = if session.download_enabled() {
        (format!("[Ctrl+D] Download {}", app.config().download_file_name), OLIVE)
    } else {
        ("Download unavailable".to_string(), TEXT_MUTED)
    };
    let download = Paragraph::new(vec![
        Line::from(Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD))),
        Line::from(Span::styled("[Ctrl+N] New edit", Style::default().fg(TAN))),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(download, chunks[4]);
}

fn draw_status_line(frame: &mut Frame, app: &App, area: Rect) {
    let Some(message) = &app.ui.status_message else {
        return;
    };
    let status = Paragraph::new(Span::styled(format!(" {}", message), Style::default().fg(TAN)));
    frame.render_widget(status, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

fn draw_alert(frame: &mut Frame, message: &str) {
    let popup_area = centered(frame.area(), 56, 7);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(Span::styled(" Error ", Style::default().fg(BURGUNDY).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BURGUNDY))
        .style(Style::default().bg(BG_PANEL));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let text = Paragraph::new(vec![
        Line::from(Span::styled(message.to_string(), Style::default().fg(TEXT_PRIMARY))),
        Line::from(""),
        Line::from(Span::styled("[Enter] OK", Style::default().fg(TEXT_MUTED))),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    frame.render_widget(text, inner);
}

fn draw_help_popup(frame: &mut Frame) {
    let popup_area = centered(frame.area(), 50, COMMANDS.len() as u16 + 4);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(Span::styled(" Commands ", Style::default().fg(COPPER).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(COPPER))
        .style(Style::default().bg(BG_PANEL));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let mut lines: Vec<Line> = COMMANDS
        .iter()
        .map(|(cmd, desc)| {
            Line::from(vec![
                Span::styled(format!("  {:<10}", cmd), Style::default().fg(CYAN_LIGHT)),
                Span::styled(format!("- {}", desc), Style::default().fg(TEXT_MUTED)),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("  [Esc] close", Style::default().fg(TEXT_MUTED))));
    frame.render_widget(Paragraph::new(lines), inner);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_fit() {
        assert_eq!(tail_fit("/files/a.png", 20), "/files/a.png");
        assert_eq!(tail_fit("/uploads/0123456789.png", 10), "…56789.png");
    }
}

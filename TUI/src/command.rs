use crate::action::Action;
use crate::config::COMMANDS;
use crate::ui_state::Screen;
use crate::upload::{parse_dropped_path, PickedFile};

pub struct CommandParser;

impl CommandParser {
    /// True when the first word is a known command. Absolute paths such as
    /// `/home/me/a.png` also start with '/', so the prefix alone is not enough.
    pub fn is_command(input: &str) -> bool {
        let input = input.trim();
        let cmd = input.split_whitespace().next().unwrap_or("");
        COMMANDS.iter().any(|(name, _)| *name == cmd)
    }

    pub fn parse(input: &str) -> Result<Action, String> {
        let input = input.trim();
        if !input.starts_with('/') {
            return Err("Not a command".to_string());
        }

        let (cmd, args) = input.split_once(' ').unwrap_or((input, ""));
        let args = args.trim();

        match cmd {
            "/help" => Ok(Action::Help),
            "/start" => Ok(Action::Start),
            "/open" => match parse_dropped_path(args) {
                Some(path) => Ok(Action::AcquireFile(PickedFile::open(&path))),
                None => Err("Usage: /open <path>\n  Example: /open ~/Pictures/cat.png".to_string()),
            },
            "/change" => Ok(Action::ChangeImage),
            "/continue" => Ok(Action::Continue),
            "/back" => Ok(Action::Back),
            "/generate" => Ok(Action::StartGeneration),
            "/download" => Ok(Action::Download),
            "/new" => Ok(Action::NewEdit),
            "/health" => Ok(Action::CheckHealth),
            "/screen" => Screen::from_name(args)
                .map(Action::ShowScreen)
                .ok_or_else(|| format!("Unknown screen: {:?}. Use intro, upload or edit.", args)),
            "/quit" => Ok(Action::Quit),
            _ => Err(format!("Unknown command: {}. Type /help for available commands.", cmd)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(CommandParser::parse("/start"), Ok(Action::Start));
        assert_eq!(CommandParser::parse("  /generate  "), Ok(Action::StartGeneration));
        assert_eq!(CommandParser::parse("/new"), Ok(Action::NewEdit));
        assert_eq!(CommandParser::parse("/health"), Ok(Action::CheckHealth));
        assert!(CommandParser::parse("start").is_err());
    }

    #[test]
    fn test_open_needs_a_path() {
        assert!(CommandParser::parse("/open").is_err());
        match CommandParser::parse("/open '/tmp/My Photos/cat.png'") {
            Ok(Action::AcquireFile(file)) => {
                assert_eq!(file.name, "cat.png");
                assert_eq!(file.mime, "image/png");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_screen_names() {
        assert_eq!(CommandParser::parse("/screen edit"), Ok(Action::ShowScreen(Screen::Edit)));
        assert!(CommandParser::parse("/screen results").is_err());
    }

    #[test]
    fn test_paths_are_not_commands() {
        assert!(CommandParser::is_command("/download"));
        assert!(CommandParser::is_command("/open a.png"));
        assert!(!CommandParser::is_command("/home/me/a.png"));
        assert!(!CommandParser::is_command("make it blue"));
    }
}

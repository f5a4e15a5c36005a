use std::str::FromStr;

use super::state::{GameContext, Mode};
use crate::services::llm::ProviderError;

/// External command surface. Invalid commands for the current mode are
/// ignored by the reactor, never rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetMode(Mode),
    SetGameContext(GameContext),
    SendMessage(String),
    /// Press/release for push-to-talk, open/follow-up/close for the listening window.
    TriggerVoice(bool),
    ToggleDuplex,
    Interrupt,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Command(Command),
    /// Result of a `SideEffect::RequestResponse`, fed back by the driver.
    ProviderReplied {
        generation: u64,
        reply: Result<String, ProviderError>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub generation: u64,
    pub query: String,
    pub context: GameContext,
}

/// Work the driver must do outside the kernel.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    RequestResponse(ProviderRequest),
    /// A pipeline run produced its final text.
    SessionCompleted { generation: u64, response: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` expects {expected}")]
    BadArgument { command: &'static str, expected: &'static str },
}

impl FromStr for Command {
    type Err = CommandParseError;

    /// Console grammar: `mode <1-5>`, `ctx <normal|dead|shop|objective>`,
    /// `say <text>`, `voice <on|off>`, `duplex`, `interrupt`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head.to_ascii_lowercase().as_str() {
            "" => Err(CommandParseError::Empty),
            "mode" => rest
                .parse::<u8>()
                .ok()
                .and_then(Mode::from_index)
                .map(Command::SetMode)
                .ok_or(CommandParseError::BadArgument { command: "mode", expected: "a number 1-5" }),
            "ctx" => match rest.to_ascii_lowercase().as_str() {
                "normal" => Ok(Command::SetGameContext(GameContext::Normal)),
                "dead" => Ok(Command::SetGameContext(GameContext::Dead)),
                "shop" | "shopping" => Ok(Command::SetGameContext(GameContext::Shopping)),
                "objective" | "spawn" => Ok(Command::SetGameContext(GameContext::ObjectiveSpawn)),
                _ => Err(CommandParseError::BadArgument {
                    command: "ctx",
                    expected: "normal, dead, shop or objective",
                }),
            },
            "say" if !rest.is_empty() => Ok(Command::SendMessage(rest.to_string())),
            "say" => Err(CommandParseError::BadArgument { command: "say", expected: "a message" }),
            "voice" => match rest.to_ascii_lowercase().as_str() {
                "on" | "press" => Ok(Command::TriggerVoice(true)),
                "off" | "release" => Ok(Command::TriggerVoice(false)),
                _ => Err(CommandParseError::BadArgument { command: "voice", expected: "on or off" }),
            },
            "duplex" => Ok(Command::ToggleDuplex),
            "interrupt" => Ok(Command::Interrupt),
            other => Err(CommandParseError::Unknown(other.to_string())),
        }
    }
}

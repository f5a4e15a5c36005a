use serde::{Deserialize, Serialize};

use super::chat::{ChatMessage, ChatStore, Sender};
use super::fixtures;
use super::log::{LogRole, PipelineLog, PipelineLogEntry};
use super::time::Timestamp;

/// The five interaction shapes. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Suggestion bubbles; the reply slides in and speaks for a while.
    #[default]
    GuidedQuery,
    /// Chat box, assistant answers only when mentioned.
    TextChat,
    /// Push-to-talk.
    SingleTurnVoice,
    /// 30s listening window with follow-ups.
    MultiTurnVoice,
    /// Always-on companion with proactive speech and barge-in.
    FullDuplex,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::GuidedQuery,
        Mode::TextChat,
        Mode::SingleTurnVoice,
        Mode::MultiTurnVoice,
        Mode::FullDuplex,
    ];

    pub fn index(self) -> u8 {
        match self {
            Mode::GuidedQuery => 1,
            Mode::TextChat => 2,
            Mode::SingleTurnVoice => 3,
            Mode::MultiTurnVoice => 4,
            Mode::FullDuplex => 5,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Mode::ALL.into_iter().find(|m| m.index() == index)
    }

    /// Voice modes run the full staged pipeline.
    pub fn is_voice(self) -> bool {
        matches!(self, Mode::SingleTurnVoice | Mode::MultiTurnVoice | Mode::FullDuplex)
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::GuidedQuery => "形态 1: 智能推荐",
            Mode::TextChat => "形态 2: 文本交互",
            Mode::SingleTurnVoice => "形态 3: 唤醒对话(单次)",
            Mode::MultiTurnVoice => "形态 4: 实时聆听(多轮)",
            Mode::FullDuplex => "形态 5: 全双工陪伴",
        }
    }
}

/// Simulated game situation. Orthogonal to `Mode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameContext {
    #[default]
    Normal,
    Dead,
    Shopping,
    ObjectiveSpawn,
}

impl GameContext {
    pub const ALL: [GameContext; 4] = [
        GameContext::Normal,
        GameContext::Dead,
        GameContext::Shopping,
        GameContext::ObjectiveSpawn,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            GameContext::Normal => "NORMAL",
            GameContext::Dead => "DEAD",
            GameContext::Shopping => "SHOPPING",
            GameContext::ObjectiveSpawn => "OBJECTIVE_SPAWN",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GameContext::Normal => "对线期",
            GameContext::Dead => "玩家死亡",
            GameContext::Shopping => "访问商店",
            GameContext::ObjectiveSpawn => "资源刷新",
        }
    }
}

/// Assistant presentation state observed by the overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiState {
    pub is_listening: bool,
    pub is_speaking: bool,
    pub response: Option<String>,
    /// Listening-window seconds left. Non-zero only while a window is open.
    pub timer: u32,
    pub is_thinking: bool,
}

/// Strict state delta. This is the ONLY way `AiState` mutates.
#[derive(Debug, Clone, PartialEq)]
pub enum StateDelta {
    /// Push-to-talk pressed: listening, previous utterance dropped.
    CaptureStarted,
    CaptureStopped,
    WindowOpened { seconds: u32 },
    CountdownTick,
    WindowClosed,
    ThinkingStarted,
    ThinkingFinished,
    SpeechStarted(String),
    SpeechEnded,
    Reset,
}

impl AiState {
    /// Pure reduction. Speaking and thinking never hold together.
    pub fn reduce(&mut self, delta: StateDelta) {
        match delta {
            StateDelta::CaptureStarted => {
                self.is_listening = true;
                self.is_speaking = false;
                self.is_thinking = false;
                self.response = None;
            }
            StateDelta::CaptureStopped => {
                self.is_listening = false;
            }
            StateDelta::WindowOpened { seconds } => {
                self.is_listening = true;
                self.timer = seconds;
            }
            StateDelta::CountdownTick => {
                self.timer = self.timer.saturating_sub(1);
            }
            StateDelta::WindowClosed => {
                self.is_listening = false;
                self.timer = 0;
            }
            StateDelta::ThinkingStarted => {
                self.is_thinking = true;
                self.is_speaking = false;
                self.response = None;
            }
            StateDelta::ThinkingFinished => {
                self.is_thinking = false;
            }
            StateDelta::SpeechStarted(text) => {
                self.is_thinking = false;
                self.is_speaking = true;
                self.response = Some(text);
            }
            StateDelta::SpeechEnded => {
                self.is_speaking = false;
                self.response = None;
            }
            StateDelta::Reset => {
                *self = AiState::default();
            }
        }
    }
}

/// Everything the overlay can observe. Owned by the reactor; every mutation
/// bumps `version` so observers are only notified on change.
#[derive(Debug, Clone)]
pub struct SharedState {
    pub mode: Mode,
    pub game_context: GameContext,
    pub duplex_active: bool,
    ai: AiState,
    log: PipelineLog,
    chat: ChatStore,
    pub version: u64,
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            game_context: GameContext::default(),
            duplex_active: false,
            ai: AiState::default(),
            log: PipelineLog::new(),
            chat: ChatStore::with_welcome(),
            version: 0,
        }
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ai(&self) -> &AiState {
        &self.ai
    }

    pub fn log(&self) -> &PipelineLog {
        &self.log
    }

    pub fn chat(&self) -> &ChatStore {
        &self.chat
    }

    pub fn reduce(&mut self, delta: StateDelta) {
        self.version += 1;
        self.ai.reduce(delta);
    }

    pub fn push_log(&mut self, role: LogRole, content: impl Into<String>, at: Timestamp) -> u64 {
        self.version += 1;
        self.log.append(role, content, at)
    }

    pub fn clear_log(&mut self) {
        self.version += 1;
        self.log.clear();
    }

    pub fn push_chat(&mut self, sender: Sender, text: impl Into<String>, at: Timestamp) {
        self.version += 1;
        self.chat.append(sender, text, at);
    }

    pub fn set_game_context(&mut self, context: GameContext) {
        self.version += 1;
        self.game_context = context;
    }

    pub fn set_duplex_active(&mut self, active: bool) {
        self.version += 1;
        self.duplex_active = active;
    }

    /// Full reset on mode switch. Game context is orthogonal and survives.
    pub fn reset_for_mode(&mut self, mode: Mode) {
        self.version += 1;
        self.mode = mode;
        self.duplex_active = false;
        self.ai.reduce(StateDelta::Reset);
        self.log.clear();
        self.chat.reset();
    }

    pub fn snapshot(&self, at: Timestamp) -> Snapshot {
        Snapshot {
            at,
            version: self.version,
            mode: self.mode,
            game_context: self.game_context,
            duplex_active: self.duplex_active,
            ai: self.ai.clone(),
            logs: self.log.to_vec(),
            chat: self.chat.messages().to_vec(),
            suggestions: fixtures::suggested_queries(self.game_context).to_vec(),
        }
    }
}

/// Read-only projection handed to observers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub at: Timestamp,
    pub version: u64,
    pub mode: Mode,
    pub game_context: GameContext,
    pub duplex_active: bool,
    pub ai: AiState,
    pub logs: Vec<PipelineLogEntry>,
    pub chat: Vec<ChatMessage>,
    pub suggestions: Vec<&'static str>,
}

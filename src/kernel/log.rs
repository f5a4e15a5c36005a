use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use super::time::Timestamp;

pub const MAX_LOG_ENTRIES: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogRole {
    System,
    Asr,
    Vad,
    Nlp,
    Llm,
    Tts,
    UserAction,
}

impl LogRole {
    pub fn tag(&self) -> &'static str {
        match self {
            LogRole::System => "SYSTEM",
            LogRole::Asr => "ASR",
            LogRole::Vad => "VAD",
            LogRole::Nlp => "NLP",
            LogRole::Llm => "LLM",
            LogRole::Tts => "TTS",
            LogRole::UserAction => "USER_ACTION",
        }
    }
}

impl fmt::Display for LogRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineLogEntry {
    pub id: u64,
    pub role: LogRole,
    pub content: String,
    pub timestamp: Timestamp,
}

/// Bounded pipeline log. Oldest entries are evicted first.
/// Ids are monotonic across `clear` so observers can tell new entries apart.
#[derive(Debug, Clone)]
pub struct PipelineLog {
    entries: VecDeque<PipelineLogEntry>,
    capacity: usize,
    next_id: u64,
}

impl Default for PipelineLog {
    fn default() -> Self {
        Self::with_capacity(MAX_LOG_ENTRIES)
    }
}

impl PipelineLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 0,
        }
    }

    pub fn append(&mut self, role: LogRole, content: impl Into<String>, at: Timestamp) -> u64 {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.next_id += 1;
        self.entries.push_back(PipelineLogEntry {
            id: self.next_id,
            role,
            content: content.into(),
            timestamp: at,
        });
        self.next_id
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> impl Iterator<Item = &PipelineLogEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&PipelineLogEntry> {
        self.entries.back()
    }

    pub fn to_vec(&self) -> Vec<PipelineLogEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first() {
        let mut log = PipelineLog::new();
        for i in 0..45 {
            log.append(LogRole::System, format!("entry {}", i), Timestamp::new(i));
        }
        assert_eq!(log.len(), MAX_LOG_ENTRIES);
        assert_eq!(log.entries().next().map(|e| e.content.as_str()), Some("entry 5"));
        assert_eq!(log.last().map(|e| e.content.as_str()), Some("entry 44"));
    }

    #[test]
    fn ids_survive_clear() {
        let mut log = PipelineLog::new();
        let a = log.append(LogRole::Asr, "a", Timestamp::ZERO);
        log.clear();
        let b = log.append(LogRole::Asr, "b", Timestamp::ZERO);
        assert!(b > a);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn roles_serialize_as_tags() {
        let json = serde_json::to_string(&LogRole::UserAction).unwrap();
        assert_eq!(json, "\"USER_ACTION\"");
        assert_eq!(LogRole::Llm.to_string(), "LLM");
    }
}

//! Durable per-user memory and conversation transcripts.
//!
//! Two DashMap-backed stores behind one handle: remembered form fields
//! keyed by user, and ordered conversation transcripts keyed by session.
//! Persistence is optional JSON-on-disk; a failed flush is logged and the
//! in-memory state stays authoritative for the rest of the process.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use voterflow_core_types::{ChatMessage, ChatRole, RememberedFields};

const TITLE_MAX_CHARS: usize = 50;

/// User preference settings carried alongside remembered fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Preferences {
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
        }
    }
}

/// Interaction counters kept per user.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionHistory {
    pub total_conversations: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_interaction: Option<DateTime<Utc>>,
    pub completed_tasks: Vec<String>,
}

/// One remembered-data record per user identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMemory {
    pub user_id: String,
    pub remembered: RememberedFields,
    pub preferences: Preferences,
    pub interaction: InteractionHistory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserMemory {
    fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            remembered: RememberedFields::default(),
            preferences: Preferences::default(),
            interaction: InteractionHistory::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Archived,
    Completed,
}

/// One conversation transcript per session identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSession {
    pub id: Uuid,
    pub user_id: String,
    pub session_id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub status: SessionStatus,
    pub message_count: usize,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ConversationSession {
    fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            title: "New Conversation".to_string(),
            messages: Vec::new(),
            status: SessionStatus::Active,
            message_count: 0,
            last_activity: now,
            created_at: now,
        }
    }

    fn refresh_title(&mut self) {
        let Some(first_user) = self.messages.iter().find(|m| m.role == ChatRole::User) else {
            return;
        };
        let content = &first_user.content;
        let truncated: String = content.chars().take(TITLE_MAX_CHARS).collect();
        self.title = if content.chars().count() > TITLE_MAX_CHARS {
            format!("{truncated}...")
        } else {
            truncated
        };
    }
}

#[derive(Default)]
struct StoreMetrics {
    memory_reads: AtomicU64,
    memory_writes: AtomicU64,
    messages_appended: AtomicU64,
    sessions_cleared: AtomicU64,
}

/// Snapshot of store counters, for the health endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub memory_reads: u64,
    pub memory_writes: u64,
    pub messages_appended: u64,
    pub sessions_cleared: u64,
    pub users: u64,
    pub sessions: u64,
}

/// Process-wide store for user memory and conversation transcripts.
#[derive(Default)]
pub struct MemoryCenter {
    memories: DashMap<String, UserMemory>,
    conversations: DashMap<String, ConversationSession>,
    storage_dir: Option<PathBuf>,
    metrics: StoreMetrics,
}

pub type SharedMemoryCenter = Arc<MemoryCenter>;

impl MemoryCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store that loads from and flushes to `dir` as JSON files.
    pub fn with_persistence(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        let center = Self {
            memories: DashMap::new(),
            conversations: DashMap::new(),
            storage_dir: Some(dir.clone()),
            metrics: StoreMetrics::default(),
        };

        let memory_path = dir.join("memory.json");
        if memory_path.exists() {
            let bytes = fs::read(&memory_path)?;
            if !bytes.is_empty() {
                let records: Vec<UserMemory> = serde_json::from_slice(&bytes)
                    .map_err(|err| io::Error::new(ErrorKind::InvalidData, format!("{err}")))?;
                for record in records {
                    center.memories.insert(record.user_id.clone(), record);
                }
            }
        }

        let conversations_path = dir.join("conversations.json");
        if conversations_path.exists() {
            let bytes = fs::read(&conversations_path)?;
            if !bytes.is_empty() {
                let records: Vec<ConversationSession> = serde_json::from_slice(&bytes)
                    .map_err(|err| io::Error::new(ErrorKind::InvalidData, format!("{err}")))?;
                for record in records {
                    center
                        .conversations
                        .insert(record.session_id.clone(), record);
                }
            }
        }

        Ok(center)
    }

    /// Fetch a user's memory, creating an empty record on first access.
    pub fn memory(&self, user_id: &str) -> UserMemory {
        self.metrics.memory_reads.fetch_add(1, Ordering::Relaxed);
        self.memories
            .entry(user_id.to_string())
            .or_insert_with(|| UserMemory::new(user_id))
            .clone()
    }

    /// Shallow-merge `updates` into the remembered fields.
    ///
    /// New values overwrite old ones; fields absent from `updates` stay
    /// untouched. Returns the merged record.
    pub fn update_memory(&self, user_id: &str, updates: &RememberedFields) -> UserMemory {
        let merged = {
            let mut entry = self
                .memories
                .entry(user_id.to_string())
                .or_insert_with(|| UserMemory::new(user_id));
            entry.remembered.merge(updates);
            entry.updated_at = Utc::now();
            entry.clone()
        };
        self.metrics.memory_writes.fetch_add(1, Ordering::Relaxed);
        if let Err(err) = self.persist() {
            warn!(error = %err, user = %user_id, "memory persist failed after update");
        }
        merged
    }

    /// Bump the per-user interaction counters after a completed turn.
    /// `completed_task` records the portal operation that succeeded, once.
    pub fn record_interaction(&self, user_id: &str, completed_task: Option<&str>) {
        {
            let mut entry = self
                .memories
                .entry(user_id.to_string())
                .or_insert_with(|| UserMemory::new(user_id));
            entry.interaction.total_conversations += 1;
            entry.interaction.last_interaction = Some(Utc::now());
            if let Some(task) = completed_task {
                if !entry.interaction.completed_tasks.iter().any(|t| t == task) {
                    entry.interaction.completed_tasks.push(task.to_string());
                }
            }
            entry.updated_at = Utc::now();
        }
        if let Err(err) = self.persist() {
            warn!(error = %err, user = %user_id, "memory persist failed after interaction update");
        }
    }

    /// Append a message, creating the session on first write.
    pub fn append_message(
        &self,
        session_id: &str,
        user_id: &str,
        message: ChatMessage,
    ) -> ConversationSession {
        let session = {
            let mut entry = self
                .conversations
                .entry(session_id.to_string())
                .or_insert_with(|| ConversationSession::new(user_id, session_id));
            entry.messages.push(message);
            entry.message_count = entry.messages.len();
            entry.last_activity = Utc::now();
            entry.refresh_title();
            entry.clone()
        };
        self.metrics
            .messages_appended
            .fetch_add(1, Ordering::Relaxed);
        if let Err(err) = self.persist() {
            warn!(error = %err, session = %session_id, "conversation persist failed after append");
        }
        session
    }

    /// Ordered messages for a session; empty when the session is unknown.
    pub fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        self.conversations
            .get(session_id)
            .map(|entry| entry.messages.clone())
            .unwrap_or_default()
    }

    /// All of a user's sessions, most recently active first.
    pub fn conversations_for(&self, user_id: &str) -> Vec<ConversationSession> {
        let mut sessions: Vec<ConversationSession> = self
            .conversations
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by_key(|s| s.last_activity);
        sessions.reverse();
        sessions
    }

    /// Delete one session, or every session belonging to the user.
    pub fn clear(&self, user_id: &str, session_id: Option<&str>) {
        match session_id {
            Some(session_id) => {
                if self.conversations.remove(session_id).is_some() {
                    self.metrics.sessions_cleared.fetch_add(1, Ordering::Relaxed);
                }
            }
            None => {
                let doomed: Vec<String> = self
                    .conversations
                    .iter()
                    .filter(|entry| entry.value().user_id == user_id)
                    .map(|entry| entry.key().clone())
                    .collect();
                for key in doomed {
                    self.conversations.remove(&key);
                    self.metrics.sessions_cleared.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        if let Err(err) = self.persist() {
            warn!(error = %err, user = %user_id, "conversation persist failed after clear");
        }
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            memory_reads: self.metrics.memory_reads.load(Ordering::Relaxed),
            memory_writes: self.metrics.memory_writes.load(Ordering::Relaxed),
            messages_appended: self.metrics.messages_appended.load(Ordering::Relaxed),
            sessions_cleared: self.metrics.sessions_cleared.load(Ordering::Relaxed),
            users: self.memories.len() as u64,
            sessions: self.conversations.len() as u64,
        }
    }

    fn persist(&self) -> io::Result<()> {
        let Some(dir) = self.storage_dir.as_ref() else {
            return Ok(());
        };
        fs::create_dir_all(dir)?;

        let memories: Vec<UserMemory> =
            self.memories.iter().map(|entry| entry.value().clone()).collect();
        let json = serde_json::to_vec_pretty(&memories)
            .map_err(|err| io::Error::new(ErrorKind::Other, format!("{err}")))?;
        fs::write(dir.join("memory.json"), json)?;

        let conversations: Vec<ConversationSession> = self
            .conversations
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        let json = serde_json::to_vec_pretty(&conversations)
            .map_err(|err| io::Error::new(ErrorKind::Other, format!("{err}")))?;
        fs::write(dir.join("conversations.json"), json)
    }
}

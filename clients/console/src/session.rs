//! clients/console/src/session.rs
//!
//! File-backed session persistence with change subscriptions. The stored
//! token survives restarts, and interested parties subscribe for changes
//! instead of polling the file.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub user: StoredUser,
}

type Subscriber = Box<dyn Fn(Option<&StoredSession>) + Send>;

/// The session context handed to every view. Holds the persisted login state
/// and notifies subscribers whenever it changes.
pub struct SessionStore {
    path: PathBuf,
    current: Mutex<Option<StoredSession>>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl SessionStore {
    /// Default location under the platform data directory.
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "docchat")
            .map(|dirs| dirs.data_dir().join("session.json"))
            .unwrap_or_else(|| PathBuf::from("docchat-session.json"))
    }

    /// Opens the store, loading any persisted session. A missing or corrupt
    /// file is treated as logged out.
    pub fn open(path: PathBuf) -> Self {
        let current = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok());
        Self {
            path,
            current: Mutex::new(current),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn current(&self) -> Option<StoredSession> {
        self.current.lock().unwrap().clone()
    }

    /// Registers a callback fired on every session change.
    pub fn subscribe(&self, subscriber: Subscriber) {
        self.subscribers.lock().unwrap().push(subscriber);
    }

    /// Persists a new session and notifies subscribers.
    pub fn set(&self, session: StoredSession) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(&session)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, raw)?;

        *self.current.lock().unwrap() = Some(session);
        self.notify();
        Ok(())
    }

    /// Forgets the session and removes the file. Idempotent.
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        *self.current.lock().unwrap() = None;
        self.notify();
        Ok(())
    }

    fn notify(&self) {
        let current = self.current();
        for subscriber in self.subscribers.lock().unwrap().iter() {
            subscriber(current.as_ref());
        }
    }
}

//! Append-only action log
//!
//! Every non-direct broadcast is recorded here before fan-out. Actions
//! are kept in memory for the query endpoint and, when a log file is
//! configured, appended to it as CSV by a background task.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Local;
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, warn};

/// Timestamp layout, e.g. `Jan 2 2006 15.04.05 -0700 +07:00`
pub const TIME_LAYOUT: &str = "%b %-d %Y %H.%M.%S %z %Z";

/// One recorded action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    /// "message", "enter", "leave", "connect" or "disconnect"
    pub command: String,
    /// Chat text or room name
    pub content: String,
    /// Username that performed the action
    pub username: String,
    /// Remote address of that user
    pub ip: String,
    pub timestamp: String,
}

impl Action {
    /// Format as one CSV line: username, command, content, timestamp, ip
    pub fn to_csv_line(&self) -> String {
        let content = if self.content.is_empty() {
            "N/A"
        } else {
            self.content.as_str()
        };

        format!(
            "\"{}\", \"{}\", \"{}\", \"{}\", \"{}\"\n",
            csv_field(&self.username),
            csv_field(&self.command),
            csv_field(content),
            csv_field(&self.timestamp),
            csv_field(&self.ip),
        )
    }

    fn matches(&self, command: Option<&str>, search: Option<&str>, username: Option<&str>) -> bool {
        command.map_or(true, |c| self.command == c)
            && search.map_or(true, |s| self.content.contains(s))
            && username.map_or(true, |u| self.username == u)
    }
}

fn csv_field(value: &str) -> String {
    value.replace('"', "\"\"")
}

/// Shared action log
#[derive(Debug, Default)]
pub struct ActionLog {
    actions: RwLock<Vec<Action>>,
    file_tx: Option<mpsc::UnboundedSender<String>>,
}

impl ActionLog {
    /// In-memory log only
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory log that is also appended to `path`
    ///
    /// Spawns the writer task, so it must be called inside a runtime.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_lines(path.into(), rx));

        Self {
            actions: RwLock::new(Vec::new()),
            file_tx: Some(tx),
        }
    }

    /// Record an action stamped with the current local time
    ///
    /// File persistence happens in the background; failures there are
    /// logged and never reach the caller.
    pub async fn record(&self, command: &str, content: &str, username: &str, addr: SocketAddr) {
        let action = Action {
            command: command.to_string(),
            content: content.to_string(),
            username: username.to_string(),
            ip: addr.to_string(),
            timestamp: Local::now().format(TIME_LAYOUT).to_string(),
        };

        debug!("logging values {}, {}, {}", command, content, username);

        if let Some(tx) = &self.file_tx {
            if tx.send(action.to_csv_line()).is_err() {
                warn!("Action log writer is gone, dropping file entry");
            }
        }

        self.actions.write().await.push(action);
    }

    /// Actions matching every given filter, in insertion order
    pub async fn query(
        &self,
        command: Option<&str>,
        search: Option<&str>,
        username: Option<&str>,
    ) -> Vec<Action> {
        self.actions
            .read()
            .await
            .iter()
            .filter(|a| a.matches(command, search, username))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.actions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.actions.read().await.is_empty()
    }
}

/// Background writer: appends each queued CSV line to `path`
async fn write_lines(path: PathBuf, mut rx: mpsc::UnboundedReceiver<String>) {
    let mut file = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
    {
        Ok(file) => file,
        Err(e) => {
            error!("Can't open log file {}: {}", path.display(), e);
            return;
        }
    };

    while let Some(line) = rx.recv().await {
        if let Err(e) = file.write_all(line.as_bytes()).await {
            warn!("Can't write to log file {}: {}", path.display(), e);
            continue;
        }
        if let Err(e) = file.flush().await {
            warn!("Can't flush log file {}: {}", path.display(), e);
        }
    }

    debug!("Action log writer ended");
}

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::session::RequestId;

/// Where a superseded fetch result was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardStage {
    /// The worker saw its cancel flag and never sent the result.
    Worker,
    /// The result reached the session after a newer request was issued.
    Session,
}

/// Everything a session writes to `events.jsonl`. The variant name, in snake case,
/// becomes the line's `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        model: String,
        filters: Vec<String>,
    },
    SessionFinished {
        shopping_list: Vec<String>,
    },
    ModelSelected {
        model: String,
        provider: String,
        fallback_reason: Option<String>,
    },
    PhotoSubmitted {
        request_id: RequestId,
        path: String,
    },
    RecipesRequested {
        request_id: RequestId,
        model: String,
        provider: String,
        filters: Vec<String>,
        image_mime: String,
        image_bytes: usize,
    },
    RecipesReceived {
        request_id: RequestId,
        count: usize,
        latency_s: f64,
    },
    RecipesEmptyResult {
        request_id: RequestId,
        reason: String,
        latency_s: f64,
    },
    RecipesFetchFailed {
        request_id: RequestId,
        kind: &'static str,
        message: String,
        latency_s: f64,
    },
    RecipesStaleDiscarded {
        request_id: RequestId,
        stage: DiscardStage,
    },
    FetchSuperseded {
        request_id: RequestId,
        by: RequestId,
    },
    FetchCancelled {
        request_id: RequestId,
    },
    FilterToggled {
        filter: String,
        enabled: bool,
        active: Vec<String>,
    },
    RecipeSelected {
        index: usize,
        recipe: String,
    },
    ReadAloudToggled {
        speaking: bool,
    },
    ShoppingListUpdated {
        added: usize,
        items: Vec<String>,
    },
    ShoppingListCleared,
}

/// Append-only JSONL log shared by the chat loop and fetch workers.
///
/// Each line is the event's own fields plus `session_id` and `ts`. The file is opened
/// on first write and kept open; clones share the handle.
#[derive(Debug, Clone)]
pub struct EventLog {
    inner: Arc<EventLogInner>,
}

#[derive(Debug)]
struct EventLogInner {
    path: PathBuf,
    session_id: String,
    file: Mutex<Option<File>>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventLogInner {
                path: path.into(),
                session_id: session_id.into(),
                file: Mutex::new(None),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Writes one line and returns it as JSON.
    pub fn record(&self, event: &SessionEvent) -> Result<Value> {
        let Value::Object(mut line) = serde_json::to_value(event)? else {
            bail!("session event did not serialize to an object");
        };
        line.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        line.insert(
            "ts".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)),
        );
        let text = serde_json::to_string(&line)?;

        let mut slot = self
            .inner
            .file
            .lock()
            .map_err(|_| anyhow!("event log lock poisoned"))?;
        if slot.is_none() {
            *slot = Some(self.open()?);
        }
        let Some(file) = slot.as_mut() else {
            bail!("event log {} is not open", self.inner.path.display());
        };
        writeln!(file, "{text}")
            .with_context(|| format!("failed writing {}", self.inner.path.display()))?;
        Ok(Value::Object(line))
    }

    fn open(&self) -> Result<File> {
        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed creating {}", parent.display()))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)
            .with_context(|| format!("failed opening {}", self.inner.path.display()))
    }
}

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{ErrorSeverity, OrfsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineLevel {
    Info,
    Warning,
    Error,
}

impl From<ErrorSeverity> for LineLevel {
    fn from(severity: ErrorSeverity) -> Self {
        match severity {
            ErrorSeverity::Warning => Self::Warning,
            ErrorSeverity::Error => Self::Error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputLine {
    pub level: LineLevel,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Lines kept before the oldest ones are dropped.
pub const DEFAULT_MAX_LINES: usize = 1000;

#[derive(Debug, Default)]
struct ChannelState {
    lines: Vec<OutputLine>,
    /// Lines dropped from the front so far.
    dropped: usize,
    max_lines: usize,
    revealed: bool,
}

// ---------------------------------------------------------------------------
// OutputChannel
// ---------------------------------------------------------------------------

/// User-visible diagnostic log.
///
/// Every line is also mirrored into `tracing` so it reaches the log file.
/// Clones share the same buffer, which keeps the newest `max_lines` lines.
#[derive(Debug, Clone)]
pub struct OutputChannel {
    name: Arc<str>,
    state: Arc<Mutex<ChannelState>>,
}

impl OutputChannel {
    pub fn new(name: &str) -> Self {
        Self::with_max_lines(name, DEFAULT_MAX_LINES)
    }

    pub fn with_max_lines(name: &str, max_lines: usize) -> Self {
        Self {
            name: Arc::from(name),
            state: Arc::new(Mutex::new(ChannelState {
                max_lines: max_lines.max(1),
                ..ChannelState::default()
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn append_line(&self, level: LineLevel, text: impl Into<String>) {
        let text = text.into();
        match level {
            LineLevel::Info => info!(channel = %self.name, "{text}"),
            LineLevel::Warning => warn!(channel = %self.name, "{text}"),
            LineLevel::Error => error!(channel = %self.name, "{text}"),
        }
        let mut state = self.state.lock();
        state.lines.push(OutputLine {
            level,
            text,
            timestamp: Utc::now(),
        });
        let excess = state.lines.len().saturating_sub(state.max_lines);
        if excess > 0 {
            state.lines.drain(..excess);
            state.dropped += excess;
        }
    }

    pub fn info(&self, text: impl Into<String>) {
        self.append_line(LineLevel::Info, text);
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.append_line(LineLevel::Warning, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.append_line(LineLevel::Error, text);
    }

    /// Record a diagnostic, revealing the channel when the error calls for it.
    pub fn report(&self, err: &OrfsError) {
        self.append_line(err.severity().into(), err.user_message());
        if err.reveals_output() {
            self.show();
        }
    }

    /// Ask the host to bring the channel to front.
    pub fn show(&self) {
        self.state.lock().revealed = true;
    }

    /// Returns and resets the reveal request.
    pub fn take_reveal(&self) -> bool {
        std::mem::take(&mut self.state.lock().revealed)
    }

    pub fn is_revealed(&self) -> bool {
        self.state.lock().revealed
    }

    pub fn lines(&self) -> Vec<OutputLine> {
        self.state.lock().lines.clone()
    }

    /// Retained lines appended after the first `offset` ever appended.
    /// Pair with [`appended`](Self::appended) to follow the channel.
    pub fn lines_since(&self, offset: usize) -> Vec<OutputLine> {
        let state = self.state.lock();
        let skip = offset.saturating_sub(state.dropped);
        state.lines.iter().skip(skip).cloned().collect()
    }

    /// Lines currently retained.
    pub fn len(&self) -> usize {
        self.state.lock().lines.len()
    }

    /// Lines ever appended, including dropped ones.
    pub fn appended(&self) -> usize {
        let state = self.state.lock();
        state.dropped + state.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_level(&self, level: LineLevel) -> usize {
        self.state
            .lock()
            .lines
            .iter()
            .filter(|l| l.level == level)
            .count()
    }
}

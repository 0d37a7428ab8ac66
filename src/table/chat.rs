//! Chat sanitization and the typing roster.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

pub const CHAT_MAX_CHARS: usize = 140;
pub const TYPING_TTL: Duration = Duration::from_millis(2500);

/// Letters and digits (covers the Turkish alphabet), whitespace, and basic
/// punctuation. Everything else is stripped.
/// The pattern is a vetted literal that compiles successfully.
fn allowed_chars() -> &'static Regex {
    static ALLOWED: LazyLock<Regex> = LazyLock::new(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r#"[\p{L}\p{N} .,!?'"()\-:;çğıöşüÇĞİÖŞÜ]"#).unwrap()
    });
    &ALLOWED
}

/// NFKC-normalize, strip disallowed characters, and cap the length.
/// Returns `None` when nothing printable remains.
pub fn sanitize_chat(text: &str) -> Option<String> {
    let normalized: String = text.nfkc().collect();
    let cleaned: String = normalized
        .chars()
        .filter(|c| allowed_chars().is_match(&c.to_string()))
        .take(CHAT_MAX_CHARS)
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Names currently typing, keyed by connection. Entries expire after
/// [`TYPING_TTL`] of inactivity.
#[derive(Debug, Default)]
pub struct TypingRoster {
    entries: HashMap<Uuid, (String, Instant)>,
}

impl TypingRoster {
    pub fn set(&mut self, conn: Uuid, name: String, is_typing: bool) {
        if is_typing {
            self.entries.insert(conn, (name, Instant::now()));
        } else {
            self.entries.remove(&conn);
        }
    }

    pub fn remove(&mut self, conn: Uuid) {
        self.entries.remove(&conn);
    }

    /// Drop expired entries; returns true when anything changed.
    pub fn prune(&mut self) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|_, (_, at)| at.elapsed() < TYPING_TTL);
        self.entries.len() != before
    }

    /// Current names, excluding `except` when given.
    pub fn names(&self, except: Option<Uuid>) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .filter(|(conn, _)| Some(**conn) != except)
            .map(|(_, (name, _))| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Text input whose value is published only after typing pauses.

use regex::Regex;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::debounce::Debouncer;

/// Keys accepted by a page range field.
pub const PAGE_RANGE_PATTERN: &str = "/[0-9,-]/";

#[derive(Debug)]
pub struct DebouncedInput {
    value: String,
    pattern: Option<Regex>,
    debouncer: Debouncer<String>,
}

impl DebouncedInput {
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (debouncer, rx) = Debouncer::new(window);
        let input = DebouncedInput {
            value: String::new(),
            pattern: None,
            debouncer,
        };
        (input, rx)
    }

    /// Only accept typed keys matching `pattern`. The pattern may be written
    /// with surrounding slashes, e.g. `/[0-9]/`.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        let bare = pattern
            .strip_prefix('/')
            .and_then(|p| p.strip_suffix('/'))
            .unwrap_or(pattern);
        self.pattern = Some(Regex::new(bare)?);
        Ok(self)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the value without publishing it.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    fn accepts(&self, key: &str) -> bool {
        self.pattern.as_ref().map_or(true, |p| p.is_match(key))
    }

    /// Handle a key release and schedule publication of the value.
    ///
    /// Printable single-character keys are appended when they pass the
    /// pattern; a rejected key leaves the value untouched and publishes
    /// nothing. `Backspace` removes the last character. Other named keys and
    /// `None` only reschedule publication.
    pub fn key_up(&mut self, key: Option<&str>) -> bool {
        match key {
            Some("Backspace") => {
                self.value.pop();
            }
            Some(key) if key.chars().count() == 1 => {
                if !self.accepts(key) {
                    return false;
                }
                self.value.push_str(key);
            }
            _ => {}
        }
        self.debouncer.trigger(self.value.clone());
        true
    }

    /// Type `text` one key at a time. Returns how many keys were rejected.
    pub fn type_text(&mut self, text: &str) -> usize {
        let mut rejected = 0;
        let mut buf = [0u8; 4];
        for c in text.chars() {
            let key: &str = c.encode_utf8(&mut buf);
            if !self.key_up(Some(key)) {
                rejected += 1;
            }
        }
        rejected
    }

    /// Empty the value and publish the empty value.
    pub fn clear(&mut self) {
        self.value.clear();
        self.debouncer.trigger(String::new());
    }

    pub async fn close(self) {
        self.debouncer.close().await;
    }
}

//! Who may talk to the bot.

use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denied {
    pub handle: Option<String>,
}

impl fmt::Display for Denied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.handle {
            Some(h) => write!(f, "@{h} is not on the allow list"),
            None => write!(f, "sender has no username"),
        }
    }
}

impl std::error::Error for Denied {}

/// Allowed chat handles, normalized to lowercase without `@`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessList {
    handles: HashSet<String>,
}

impl AccessList {
    pub fn new<I, S>(handles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let handles = handles
            .into_iter()
            .map(|h| normalize(h.as_ref()))
            .filter(|h| !h.is_empty())
            .collect();
        Self { handles }
    }

    /// Comma-separated list, as found in the environment.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn check(&self, handle: Option<&str>) -> Result<(), Denied> {
        let normalized = handle.map(normalize).unwrap_or_default();
        if !normalized.is_empty() && self.handles.contains(&normalized) {
            return Ok(());
        }
        log::info!("denied access to {:?}", handle);
        Err(Denied { handle: handle.map(str::to_string) })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

fn normalize(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}

//! Inline button payloads.
//!
//! Payloads are `tag|value`. Customer buttons carry the packed identity
//! (`sel|Ali|iPhone 13`); when that would exceed the transport limit they
//! carry the cache index instead (`sel#4`), which is resolved against the
//! snapshot current when the button is pressed.

use crate::record::{Identity, Snapshot};

/// Telegram rejects callback data longer than this many bytes.
pub const MAX_CALLBACK_BYTES: usize = 64;

const SELECT: &str = "sel";
const EDIT_NAME: &str = "edn";
const EDIT_YEAR: &str = "edy";
const EDIT_MONTH: &str = "edm";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Identity(Identity),
    /// Cache index (header is 0).
    Row(usize),
}

impl Target {
    pub fn resolve(&self, snapshot: &Snapshot) -> Option<Identity> {
        match self {
            Target::Identity(id) => Some(id.clone()),
            Target::Row(0) => None,
            Target::Row(i) => snapshot.row(*i).and_then(Identity::of_row),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    /// Show the detail card.
    Select(Target),
    /// Start editing this customer.
    EditName(Target),
    EditYear(String),
    EditMonth(String),
}

impl Callback {
    /// Payload for a customer button, falling back to the row index when
    /// the identity does not fit or would not unpack (a `|` in the name).
    pub fn customer(edit: bool, identity: &Identity, index: usize) -> String {
        let tag = if edit { EDIT_NAME } else { SELECT };
        let full = format!("{}|{}", tag, identity.pack());
        if full.len() <= MAX_CALLBACK_BYTES && !identity.name.contains('|') {
            full
        } else {
            format!("{tag}#{index}")
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Callback::Select(t) => encode_target(SELECT, t),
            Callback::EditName(t) => encode_target(EDIT_NAME, t),
            Callback::EditYear(y) => format!("{EDIT_YEAR}|{y}"),
            Callback::EditMonth(m) => format!("{EDIT_MONTH}|{m}"),
        }
    }

    pub fn decode(data: &str) -> Option<Callback> {
        if let Some((tag, rest)) = data.split_once('|') {
            return match tag {
                SELECT => Identity::unpack(rest).map(|id| Callback::Select(Target::Identity(id))),
                EDIT_NAME => {
                    Identity::unpack(rest).map(|id| Callback::EditName(Target::Identity(id)))
                }
                EDIT_YEAR => Some(Callback::EditYear(rest.to_string())),
                EDIT_MONTH => Some(Callback::EditMonth(rest.to_string())),
                _ => None,
            };
        }
        let (tag, index) = data.split_once('#')?;
        let index: usize = index.parse().ok()?;
        match tag {
            SELECT => Some(Callback::Select(Target::Row(index))),
            EDIT_NAME => Some(Callback::EditName(Target::Row(index))),
            _ => None,
        }
    }
}

fn encode_target(tag: &str, target: &Target) -> String {
    match target {
        Target::Identity(id) => format!("{}|{}", tag, id.pack()),
        Target::Row(i) => format!("{tag}#{i}"),
    }
}

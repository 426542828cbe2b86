pub mod access;
pub mod cache;
pub mod callback;
pub mod desk;
pub mod flow;
pub mod layout;
pub mod locator;
pub mod messages;
pub mod money;
pub mod phone_model;
pub mod record;
pub mod render;
pub mod session;
pub mod store;

#[cfg(test)]
pub mod harness;

pub use desk::{Actor, Command, Desk, DeskSettings, Inbound, InboundEvent};
pub use render::{Button, Keyboard, ParseMode, Reply};
pub use store::{StoreError, TabularStore};

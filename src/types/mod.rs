//! Core types for the web client's object graph.
//!
//! Everything here is a fully materialized, independent snapshot of remote
//! state; nothing holds a live reference into the page.

mod events;
mod id;
mod media;
mod message;
mod models;

pub use events::*;
pub use id::*;
pub use media::*;
pub use message::*;
pub use models::*;

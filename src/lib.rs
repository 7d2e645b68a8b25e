//! Room synchronization server for collaborative code editing.
//!
//! Connections join rooms over a WebSocket. Each room holds a set of text files that members
//! replace wholesale (last write wins), plus a shared "current file" pointer. Cursor positions
//! are relayed as advisory presence.

mod assist;
pub mod collab;
pub mod config;
mod server;

pub use assist::Assistant;
pub use collab::Gateway;
pub use config::{AssistConfig, Config};
pub use server::Server;

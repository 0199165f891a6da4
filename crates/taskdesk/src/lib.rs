//! taskdesk: a multi-user task, project and ticket backend.
//!
//! The library half of the binary. Embedders can build and run the server
//! programmatically with [`Taskdesk::builder`].

mod runtime;

pub use runtime::{init_logging, StoreBackend, Taskdesk, TaskdeskBuilder};
pub use taskdesk_core::DeskConfig;
pub use taskdesk_runtime::migrations::Migration;

//! Board client: typed HTTP access to the server, an explicit response
//! cache, an optimistic board session with rollback, and auto-saving
//! edit drafts.

pub mod cache;
pub mod draft;
pub mod http;
pub mod session;

pub use cache::ResponseCache;
pub use draft::{AUTOSAVE_DELAY, EditDraft};
pub use http::{ClientConfig, PlaygroundClient};
pub use session::{BoardSession, Mutation, MutationFailure, Rollback};

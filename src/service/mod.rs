//! Idea Playground HTTP service.
//!
//! ```text
//! ┌──────────────┐  HTTP  ┌─────────────────────────────────────────┐
//! │ Board client │ ─────> │ server.rs  (router, layers, shutdown)   │
//! │ (client/)    │ <───── │   └─ api.rs  (handlers, ApiError)       │
//! └──────────────┘        │        │ StoreHandle::call()            │
//!                         │        v                                │
//!                         │ db.rs  (IdeaStore on SQLite)            │
//!                         └─────────────────────────────────────────┘
//! ```
//!
//! | Module   | Responsibility                                              |
//! |----------|-------------------------------------------------------------|
//! | `db`     | Ideas and config documents; order assignment; batch reorder |
//! | `api`    | Route table, request/response mapping, error statuses       |
//! | `server` | CORS, tracing, compression, body limit, graceful shutdown   |

pub mod api;
pub mod db;
pub mod server;

pub use api::{AppState, SharedState};
pub use db::{IdeaStore, StoreHandle};
pub use server::{build_router, start_server};

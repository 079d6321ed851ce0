//! # GASBENCH Ownership Snapshots
//!
//! Two independent answers to "who owns every token right now?".
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────────────┐
//!                 │  ChainQuery (any C)  │
//!                 └──────┬────────┬──────┘
//!        ownerOf batches │        │ Transfer history
//!                        ▼        ▼
//!          ┌──────────────────┐ ┌──────────────────┐
//!          │ DirectQuery      │ │ EventReplay      │
//!          │ Builder          │ │ Builder          │
//!          └────────┬─────────┘ └────────┬─────────┘
//!                   └──────────┬─────────┘
//!                              ▼
//!                    OwnershipSnapshot ──▶ serialize::render
//! ```
//!
//! ## Guarantees
//!
//! - A builder returns a complete snapshot or an error, never a partial map.
//! - For the same chain state both builders produce equal snapshots.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod direct;
pub mod error;
pub mod replay;
pub mod serialize;
pub mod snapshot;

pub use direct::{DirectQueryBuilder, DirectQueryConfig, IdOrigin, Progress};
pub use error::{SerializeError, SerializeResult, SnapshotError, SnapshotResult};
pub use replay::{replay_events, EventReplayBuilder, ReplayConfig};
pub use snapshot::{Discrepancy, OwnershipSnapshot};

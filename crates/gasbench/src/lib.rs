//! # GASBENCH Harness
//!
//! Configuration and task layer behind the `gasbench` binary.
//!
//! ## Tasks
//!
//! | Subcommand      | Task                   | Output                         |
//! |-----------------|------------------------|--------------------------------|
//! | `owners-direct` | [`tasks::owners_direct`] | `<tokenId> <owner>` artifact |
//! | `owners-replay` | [`tasks::owners_replay`] | `<tokenId> <owner>` artifact |
//! | `compare`       | [`tasks::compare`]     | discrepancy report             |
//! | `whitelist`     | [`tasks::whitelist`]   | JSON root + proofs             |
//! | `simulate`      | [`tasks::simulate`]    | equivalence report             |

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod tasks;

pub use config::HarnessConfig;
pub use error::{HarnessError, HarnessResult};

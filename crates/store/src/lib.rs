// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kandev-store: the embedded SQLite persistence layer behind the session
//! store contract — tasks, sessions, turns, messages, and workflows.

mod connection;
mod error;
mod messages;
mod schema;
mod sessions;
mod tasks;
mod turns;
mod workflows;

pub use connection::Store;
pub use error::{StoreError, StoreResult};
pub use messages::SortOrder;

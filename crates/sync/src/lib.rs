// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! holdfast-sync: a blocking REST client for the sync daemon that
//! replicates the working directory between hosts.

pub mod client;

pub use client::{SyncClient, SyncError};

//! `quiet-store`: SQLite persistence for quiet blocks.
//!
//! # Overview
//!
//! Blocks live in a single `quiet_blocks` table. [`store::BlockStore`] wraps a
//! shared `Connection` and enforces every block invariant at the write path:
//! `ends_at > starts_at`, bounded non-empty description, minimum-future start,
//! and per-owner interval exclusivity.
//!
//! The `notified` flag has exactly one write path, the conditional update in
//! [`store::BlockStore::try_mark_notified`], which is what makes concurrent
//! dispatcher runs safe without any broader locking.

pub mod db;
pub mod store;

pub use store::BlockStore;

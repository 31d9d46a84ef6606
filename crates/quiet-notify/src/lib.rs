//! `quiet-notify`: due-reminder selection and email dispatch.
//!
//! # Overview
//!
//! The [`select`] module decides *which* blocks need a reminder right now,
//! as a pure function over absolute UTC instants. The [`dispatch::Dispatcher`]
//! resolves each due block's owner to an email address, renders the reminder
//! ([`template`]) and walks an ordered list of [`provider::EmailProvider`]
//! adapters until one delivers, then records the outcome with the store's
//! conditional notified-flip. [`engine::NotifierEngine`] drives a dispatch
//! run on a fixed cadence.
//!
//! # Delivery guarantees
//!
//! At most one notification per block: the store's compare-and-set is the
//! only write path for the flag, so overlapping runs serialise per block.
//! A block whose providers all fail stays un-notified and is retried on the
//! next run, up to the configured grace window past its start.

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod provider;
pub mod providers;
pub mod select;
pub mod template;

pub use dispatch::{DispatchError, Dispatcher};
pub use engine::NotifierEngine;
pub use error::ProviderError;
pub use provider::EmailProvider;

//! cpel - CPEL binary trace file encoder
//!
//! This library serializes timestamped, labeled scheduling events into the
//! sectioned, string-interned, big-endian CPEL format read by track-oriented
//! event viewers, and provides a diagnostic decoder for inspecting the result.
//!
//! Encoding is two passes: [`layout::CpelLayout::collect`] drains the event
//! sequence and fixes every section length, then [`writer::CpelWriter`]
//! serializes the finished layout.

pub mod cli;
pub mod config;
pub mod decoder;
pub mod error;
pub mod event;
pub mod event_data;
pub mod format;
pub mod indexer;
pub mod layout;
pub mod string_pool;
pub mod writer;

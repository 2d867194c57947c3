//! # sift-core
//!
//! Core types and error taxonomy for Sift.
//!
//! This crate provides the foundational types shared across all Sift crates:
//! - Paper records produced by discovery
//! - Content blobs and extraction tiers
//! - Analysis templates and results
//! - Briefing artifacts with their markdown render and total parser
//! - Archive records and the per-entry archive state machine
//! - Run status snapshots with a bounded log tail
//! - Cross-cutting error types and the failure classification
//! - Retry with exponential backoff shared by the network clients

pub mod analysis;
pub mod archive;
pub mod artifact;
pub mod content;
pub mod errors;
pub mod history;
pub mod paper;
pub mod retry;
pub mod status;
pub mod template;

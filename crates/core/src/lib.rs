//! Core library for editz
//!
//! This crate implements the **Functional Core** of editz, following the
//! Functional Core - Imperative Shell architectural pattern. The `pdf` crate
//! and the `editz` binary are the shell: they read and write documents and
//! speak HTTP, then hand plain data to the functions here.
//!
//! ## Functional Core Principles
//!
//! - **Pure functions**: Same input always produces the same output
//! - **No side effects**: No I/O, no global state
//! - **Fail-safe**: Classification and repositioning never fail; the worst
//!   case is keeping the original position
//!
//! # Module Organization
//!
//! - [`metadata`]: Normalises raw text runs into [`span::TextSpan`] records
//! - [`context`]: Alignment ratios, list/header/justification signals
//! - [`classify`]: Prioritised layout role rules
//! - [`reposition`]: Width estimate, per-role geometry, clamps, anchor
//! - [`edit`]: Puts the above together into an [`edit::EditPlan`]
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use editz_core::edit::{plan_edit, EditRequest};
//! use editz_core::metadata::{extract_document, NoVisualProbe};
//!
//! let spans = extract_document(pages, &NoVisualProbe);
//! let plan = plan_edit(&EditRequest {
//!     target: SpanKey::parse("text_item_3")?,
//!     new_text: "NEW DELHI".to_string(),
//!     spans,
//!     page_width: 612.0,
//!     page_height: 792.0,
//! })?;
//! println!("{} -> {:?}", plan.decision.strategy, plan.anchor);
//! ```

pub mod classify;
pub mod context;
pub mod edit;
pub mod geometry;
pub mod metadata;
pub mod reposition;
pub mod span;

use thiserror::Error;

use crate::span::{InvalidSpanKey, SpanKey};

#[derive(Debug, Error)]
pub enum EditError {
    #[error("Text item '{0}' not found in metadata")]
    MissingTarget(SpanKey),

    #[error(transparent)]
    InvalidSpanKey(#[from] InvalidSpanKey),
}

//! Rendering of pull request snapshots for storage and display.
//!
//! The only format is a deterministic Markdown summary: the same snapshot
//! and options always produce byte-identical output, so a re-rendered note
//! only differs when the underlying activity changed.

mod markdown;

pub use markdown::{RenderOptions, write_summary};

//! Core data types for the Quill narrative runtime.
//!
//! This crate holds the leaf containers the story engine builds on:
//! - [`Style`], [`StyleGroup`] and the nested [`StyleStack`]
//! - [`OutputList`], the ordered output record with its insertion-point stack
//! - [`OutputId`], the stable identity of emitted output

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod id;
mod output_list;
mod style;

pub use id::OutputId;
pub use output_list::{Indexed, OutputList};
pub use style::{Style, StyleGroup, StyleScope, StyleStack};

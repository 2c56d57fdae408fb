//! Shared text utilities.

mod text;

pub use text::{clean_html, strip_tags};

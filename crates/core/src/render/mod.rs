//! Output rendering for process forests

pub mod json;
pub mod text;

pub use json::render_json_string;
pub use text::{render, render_lines, render_string, RenderOptions, TreeLine};

//! UI layer: line console, input parsing and text rendering.

pub mod console;
pub mod event_source;
pub mod input;
pub mod render;

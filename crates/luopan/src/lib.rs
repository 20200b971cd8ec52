//! Luopan: a layered feng shui compass.
//!
//! `engine` holds the ring data, `render` paints it, `orientation` turns
//! device headings into a smoothly animated dial angle and `analysis` reads a
//! direction off the fixed tables. The GTK application lives in `gui`.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod events;
pub mod gui;
pub mod orientation;
pub mod render;
pub mod sys;
pub mod theme;

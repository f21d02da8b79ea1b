//! Kenburns Project Model
//!
//! Defines the core data contracts the engine consumes:
//! - **Effects:** Timed zoom effects and text overlays
//! - **Viewport:** Zoom state, the neutral state, and source-window geometry
//! - **Timeline:** Ordered snapshot answering "what is active at time t"
//! - **Document:** The JSON timeline snapshot handed over by the editor
//! - **Project:** Export parameters
//!
//! Anchor and overlay positions are percentages (`0..=100`) of the frame
//! width/height so they survive changes of output resolution.

pub mod color;
pub mod document;
pub mod effect;
pub mod project;
pub mod timeline;
pub mod viewport;

pub use color::*;
pub use document::*;
pub use effect::*;
pub use project::*;
pub use timeline::*;
pub use viewport::*;

//! Mosaic Scene Model
//!
//! Defines the core data contracts for Mosaic compositions:
//! - **Layers:** Positioned visual elements (text, image, video, shape, frame)
//! - **Media:** Opaque live media handles and the resolver that produces them
//! - **Project:** The versioned, portable project file
//! - **Transfer:** Clipboard and drag-and-drop payloads
//!
//! Coordinates are canvas pixels with the origin at the top-left corner.
//! A layer's `x`/`y` is the top-left of its unrotated box; rotation is
//! applied around the box center.

pub mod blob;
pub mod color;
pub mod geometry;
pub mod layer;
pub mod media;
pub mod project;
pub mod transfer;

pub use blob::*;
pub use color::*;
pub use geometry::*;
pub use layer::*;
pub use media::*;
pub use project::*;
pub use transfer::*;

//! Image processing building blocks: contain-fit resizing and JPEG re-encoding.
pub mod resize;
pub mod save;

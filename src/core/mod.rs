//! Core pipeline building blocks: feature schema, tensor batching, models,
//! label decoding, filtering, reporting and image processing. These are the
//! primitives consumed by the high-level `api` module.
pub mod batch;
pub mod deadline;
pub mod decode;
pub mod filter;
pub mod model;
pub mod params;
pub mod processing;
pub mod report;
pub mod schema;

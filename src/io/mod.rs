//! I/O layer: GDAL-backed raster and vector readers, HTTP image fetch,
//! the Source Reader surface (`source`), and `writers` for JPEG output.
pub mod gdal;
pub use gdal::{GdalError, GdalMetadata, GdalRasterReader};

pub mod remote;
pub mod source;
pub use source::{RasterSource, SourceMetadata, SourceRecords, open_image, open_vector_layer};

pub mod vector;
pub use vector::VectorSource;

pub mod writers;

pub mod chunk;
pub mod markdown;

// Re-export the normalize-then-chunk entry points for external use
pub use chunk::{Chunker, DEFAULT_MAX_LENGTH, Granularity, Segment, chunk};
pub use markdown::{CleanedBody, ImageRef, clean, extract_image_refs, normalize};

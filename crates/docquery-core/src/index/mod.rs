//! Text segmentation for oversized requests

pub mod chunker;

pub use chunker::{split, Chunk, ChunkIter, Chunker};

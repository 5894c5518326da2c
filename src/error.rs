//! Error taxonomy shared by every stage of the parsing pipeline.
use std::io;

/// Anything that can go wrong while turning bytes into a [`crate::Book`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {wanted} bytes at offset {offset}")]
    Io {
        offset: usize,
        wanted: usize,
        #[source]
        source: io::Error,
    },

    #[error("PalmDB container malformed: {0}")]
    ContainerMalformed(String),

    #[error("unsupported compression scheme {0}")]
    UnsupportedCompression(u16),

    #[error("book is encrypted (scheme {0}), decryption is out of scope")]
    Encrypted(u16),

    #[error("header malformed: {0}")]
    HeaderMalformed(String),

    #[error("huffman/cdic table corrupt: {0}")]
    HuffTableCorrupt(String),

    #[error("decompression wrote past the end of the destination buffer")]
    DecompressionOverflow,

    #[error("decompressed body is {actual} bytes, header declared {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

//! A random-access, read-only view over the bytes of a book file.
use crate::error::{Error, Result};
use std::io;

/// Byte-addressable source backing the whole parse. Every other component
/// only ever asks for `(offset, count)` slices; nothing keeps a raw pointer
/// into the backing storage once a higher-level structure is built.
pub(crate) struct ByteSource<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteSource<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> ByteSource<'a> {
        ByteSource { bytes }
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Reads `count` bytes starting at `offset`. A read that would run past
    /// the end of the source fails outright; there is no short read.
    pub(crate) fn read_at(&self, offset: usize, count: usize) -> Result<&'a [u8]> {
        let end = offset.checked_add(count).ok_or_else(|| Error::Io {
            offset,
            wanted: count,
            source: io::Error::new(io::ErrorKind::UnexpectedEof, "offset + count overflowed"),
        })?;
        self.bytes.get(offset..end).ok_or_else(|| Error::Io {
            offset,
            wanted: count,
            source: io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("source is only {} bytes long", self.bytes.len()),
            ),
        })
    }

}

/// Reads an entire `Read` implementor into memory so it can be parsed
/// through the same slice-backed path as [`ByteSource`]. MOBI files are
/// small enough in practice that buffering the whole stream up front is
/// simpler, and just as correct, as threading `Seek` through every layer.
pub(crate) fn slurp<R: io::Read>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_at_in_bounds() {
        let data = b"hello world";
        let src = ByteSource::new(data);
        assert_eq!(src.read_at(6, 5).unwrap(), b"world");
    }

    #[test]
    fn read_at_out_of_bounds_errors() {
        let data = b"short";
        let src = ByteSource::new(data);
        assert!(src.read_at(3, 10).is_err());
    }

    #[test]
    fn read_at_overflow_errors() {
        let data = b"short";
        let src = ByteSource::new(data);
        assert!(src.read_at(usize::MAX, 10).is_err());
    }
}

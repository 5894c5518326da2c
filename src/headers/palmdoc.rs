//! The 16-byte PalmDOC header stored at the start of record 0.
use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

pub(crate) const PALMDOC_HEADER_LEN: usize = 16;

/// Body compression scheme declared by the PalmDOC header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    PalmDoc,
    HuffCdic,
}

impl Compression {
    fn from_u16(v: u16) -> Result<Compression> {
        match v {
            1 => Ok(Compression::None),
            2 => Ok(Compression::PalmDoc),
            17480 => Ok(Compression::HuffCdic),
            other => Err(Error::UnsupportedCompression(other)),
        }
    }
}

/// Encryption scheme declared by the PalmDOC header. Only relevant for
/// MOBI containers; PalmDOC containers have no encryption concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryption {
    None,
    Old,
    New,
}

impl Encryption {
    fn from_u16(v: u16) -> Encryption {
        match v {
            1 => Encryption::Old,
            2 => Encryption::New,
            _ => Encryption::None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct PalmDocHeader {
    pub compression: Compression,
    pub text_length: u32,
    pub record_count: u16,
    pub encryption: Encryption,
}

impl PalmDocHeader {
    pub(crate) fn parse(record0: &[u8]) -> Result<PalmDocHeader> {
        if record0.len() < PALMDOC_HEADER_LEN {
            return Err(Error::ContainerMalformed(
                "record 0 is too short for a PalmDOC header".into(),
            ));
        }
        let compression = Compression::from_u16(BigEndian::read_u16(&record0[0..2]))?;
        let text_length = BigEndian::read_u32(&record0[4..8]);
        let record_count = BigEndian::read_u16(&record0[8..10]);
        let encryption = Encryption::from_u16(BigEndian::read_u16(&record0[12..14]));

        Ok(PalmDocHeader {
            compression,
            text_length,
            record_count,
            encryption,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn header_bytes(compression: u16, text_length: u32, record_count: u16, encryption: u16) -> Vec<u8> {
        let mut h = vec![0u8; PALMDOC_HEADER_LEN];
        BigEndian::write_u16(&mut h[0..2], compression);
        BigEndian::write_u32(&mut h[4..8], text_length);
        BigEndian::write_u16(&mut h[8..10], record_count);
        BigEndian::write_u16(&mut h[12..14], encryption);
        h
    }

    #[test]
    fn parses_palmdoc_compression() {
        let bytes = header_bytes(2, 14, 1, 0);
        let h = PalmDocHeader::parse(&bytes).unwrap();
        assert_eq!(h.compression, Compression::PalmDoc);
        assert_eq!(h.text_length, 14);
        assert_eq!(h.encryption, Encryption::None);
    }

    #[test]
    fn rejects_unknown_compression() {
        let bytes = header_bytes(99, 0, 0, 0);
        assert!(PalmDocHeader::parse(&bytes).is_err());
    }

    #[test]
    fn decodes_encryption() {
        let bytes = header_bytes(1, 0, 0, 1);
        let h = PalmDocHeader::parse(&bytes).unwrap();
        assert_eq!(h.encryption, Encryption::Old);
    }
}

//! The public assembler: drives every other component to produce a fully
//! populated [`Book`] from a byte-addressable MOBI/PalmDOC file (§4.6).
use std::io;
use std::path::Path;

use indexmap::IndexMap;
use log::{trace, warn};

use crate::bytesource::{slurp, ByteSource};
use crate::compression::{huffcdic::HuffCdic, palmdoc};
use crate::error::{Error, Result};
use crate::headers::exth::ExthTable;
use crate::headers::mobi::{Language, MobiHeader, MobiType};
use crate::headers::palmdoc::{Compression, Encryption, PalmDocHeader, PALMDOC_HEADER_LEN};
use crate::image::{load_images, select_cover, select_thumbnail, Image};
use crate::pdb::{Container, ContainerKind};
use crate::trailer::{self, TrailerFlags};

/// Runtime configuration for [`Book::open`] and friends. The only knob the
/// design calls out is how strictly to treat a body whose reconstructed
/// length disagrees with the header's declared size.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    strict: bool,
}

impl OpenOptions {
    pub fn new() -> OpenOptions {
        OpenOptions::default()
    }

    /// When `true`, a body-size mismatch aborts the parse with
    /// [`Error::SizeMismatch`] instead of returning the short body with a
    /// logged warning.
    pub fn strict(mut self, strict: bool) -> OpenOptions {
        self.strict = strict;
        self
    }

    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<Book> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| Error::Io {
            offset: 0,
            wanted: 0,
            source: e,
        })?;
        assemble(&bytes, &self)
    }

    pub fn from_bytes(self, bytes: &[u8]) -> Result<Book> {
        assemble(bytes, &self)
    }

    pub fn from_reader<R: io::Read>(self, reader: R) -> Result<Book> {
        let bytes = slurp(reader).map_err(|e| Error::Io {
            offset: 0,
            wanted: 0,
            source: e,
        })?;
        assemble(&bytes, &self)
    }
}

/// A fully parsed MOBI/PalmDOC book. Every field is owned; nothing here
/// references the input buffer the book was parsed from.
#[derive(Debug)]
pub struct Book {
    pub kind: ContainerKind,
    pub name: Vec<u8>,
    pub created: u32,
    pub modified: u32,

    pub title: Vec<u8>,
    pub author: Vec<u8>,
    pub publisher: Option<Vec<u8>>,
    pub description: Option<Vec<u8>>,
    pub isbn: Option<Vec<u8>>,
    pub subject: Option<Vec<u8>>,
    pub publish_date: Option<Vec<u8>>,
    pub contributor: Option<Vec<u8>>,
    pub rights: Option<Vec<u8>>,
    pub language_tag: Option<Vec<u8>>,

    pub locale: u32,
    pub language: Option<Language>,
    pub region: Option<u8>,
    pub text_encoding: u32,
    pub mobi_type: Option<MobiType>,

    pub body: Vec<u8>,
    pub images: Vec<Option<Image>>,
    pub cover: Option<usize>,
    pub thumbnail: Option<usize>,

    pub exth_records: IndexMap<u32, Vec<Vec<u8>>>,
}

impl Book {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Book> {
        OpenOptions::new().open(path)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Book> {
        OpenOptions::new().from_bytes(bytes)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Book> {
        OpenOptions::new().from_reader(reader)
    }

    /// Resolves a 1-based MOBI HTML `recindex` into an image, if any.
    pub fn image(&self, recindex: u32) -> Option<&Image> {
        crate::image::image_at(&self.images, recindex)
    }
}

fn encryption_code(e: Encryption) -> u16 {
    match e {
        Encryption::None => 0,
        Encryption::Old => 1,
        Encryption::New => 2,
    }
}

fn assemble(bytes: &[u8], opts: &OpenOptions) -> Result<Book> {
    let src = ByteSource::new(bytes);
    let container = Container::parse(&src)?;
    let record0 = container.record(&src, 0)?;

    let pdoc = PalmDocHeader::parse(record0)?;
    if container.kind == ContainerKind::Mobi && pdoc.encryption != Encryption::None {
        return Err(Error::Encrypted(encryption_code(pdoc.encryption)));
    }

    let mobi_header = if record0.len() > PALMDOC_HEADER_LEN {
        Some(MobiHeader::parse(record0, PALMDOC_HEADER_LEN)?)
    } else {
        None
    };

    let mut title = mobi_header
        .as_ref()
        .and_then(|mh| {
            let start = mh.full_name_offset as usize;
            let len = mh.full_name_len as usize;
            record0.get(start..start.checked_add(len)?)
        })
        .map(|s| s.to_vec())
        .unwrap_or_default();
    if title.is_empty() {
        title = container.name.clone();
    }

    let mut exth = ExthTable::default();
    if let Some(mh) = &mobi_header {
        if mh.exth_present {
            let exth_offset = PALMDOC_HEADER_LEN + mh.hdr_len as usize;
            if let Some(exth_data) = record0.get(exth_offset..) {
                exth = ExthTable::parse(exth_data)?;
            }
        }
    }
    if let Some(t) = exth.title_override {
        title = t.to_vec();
    }

    let huff_cdic = if pdoc.compression == Compression::HuffCdic {
        let mh = mobi_header.as_ref().ok_or_else(|| {
            Error::HeaderMalformed("HUFF/CDIC compression requires a MOBI header".into())
        })?;
        let first = mh.huffman_first_record as usize;
        let count = mh.huffman_record_count as usize;
        if count == 0 {
            return Err(Error::HeaderMalformed("huffman record count is zero".into()));
        }
        if count - 1 > 32 {
            return Err(Error::HuffTableCorrupt(format!(
                "{} CDIC records exceeds the 32 dictionary limit",
                count - 1
            )));
        }
        let huff_record = container.record(&src, first)?;
        let mut cdic_records = Vec::with_capacity(count - 1);
        for i in 1..count {
            cdic_records.push(container.record(&src, first + i)?);
        }
        Some(HuffCdic::new(huff_record, &cdic_records)?)
    } else {
        None
    };

    let (first_image_record, images_count) = match &mobi_header {
        Some(mh) => {
            let first = mh.first_image_record as usize;
            if first > 0 && first < container.num_records() {
                let last = mh
                    .last_content_record
                    .map(|v| v as usize)
                    .unwrap_or(first);
                (first, last.saturating_sub(first).saturating_add(1))
            } else {
                (0, 0)
            }
        }
        None => (0, 0),
    };
    let images = load_images(&src, &container, first_image_record, images_count)?;
    let cover = select_cover(&images, exth.cover_index);
    let thumbnail = select_thumbnail(&images, exth.thumbnail_index);

    let trailer_flags = mobi_header
        .as_ref()
        .and_then(|mh| mh.trailer_flags)
        .map(TrailerFlags::from_word)
        .unwrap_or_default();

    let text_length = pdoc.text_length as usize;
    let mut body = Vec::with_capacity(text_length);
    for i in 1..=pdoc.record_count as usize {
        if i >= container.num_records() {
            warn!("body record {} is missing from the record table", i);
            break;
        }
        let raw = container.record(&src, i)?;
        let visible = trailer::strip(raw, trailer_flags)?;
        let cap = text_length.saturating_sub(body.len());
        trace!(
            "decompressing body record {} ({} raw bytes, {} visible, {} cap remaining)",
            i,
            raw.len(),
            visible.len(),
            cap
        );

        match pdoc.compression {
            Compression::None => body.extend_from_slice(visible),
            Compression::PalmDoc => body.extend(palmdoc::decompress(visible, cap)?),
            Compression::HuffCdic => {
                let decoder = huff_cdic.as_ref().ok_or_else(|| {
                    Error::HeaderMalformed("HUFF/CDIC compression set up with no decoder".into())
                })?;
                body.extend(decoder.decompress(visible, cap)?);
            }
        }
    }

    if body.len() != text_length {
        if opts.strict {
            return Err(Error::SizeMismatch {
                expected: text_length,
                actual: body.len(),
            });
        }
        warn!(
            "body length {} does not match declared size {}",
            body.len(),
            text_length
        );
    }

    let exth_records = exth
        .records
        .into_iter()
        .map(|(k, v)| (k, v.into_iter().map(|s| s.to_vec()).collect()))
        .collect();

    Ok(Book {
        kind: container.kind,
        name: container.name,
        created: container.created,
        modified: container.modified,

        title,
        author: exth.author,
        publisher: exth.publisher.map(|s| s.to_vec()),
        description: exth.description.map(|s| s.to_vec()),
        isbn: exth.isbn.map(|s| s.to_vec()),
        subject: exth.subject.map(|s| s.to_vec()),
        publish_date: exth.publish_date.map(|s| s.to_vec()),
        contributor: exth.contributor.map(|s| s.to_vec()),
        rights: exth.rights.map(|s| s.to_vec()),
        language_tag: exth.language_tag.map(|s| s.to_vec()),

        locale: mobi_header.as_ref().map(|mh| mh.locale).unwrap_or(0),
        language: mobi_header.as_ref().map(|mh| mh.language()),
        region: mobi_header.as_ref().map(|mh| mh.region()),
        text_encoding: mobi_header.as_ref().map(|mh| mh.text_encoding).unwrap_or(0),
        mobi_type: mobi_header.as_ref().map(|mh| mh.mobi_type),

        body,
        images,
        cover,
        thumbnail,

        exth_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, ByteOrder};
    use pretty_assertions::assert_eq;

    const PDB_HEADER_LEN: usize = 78;

    fn pdb_header(tag: &[u8; 8], name: &[u8], num_records: u16) -> Vec<u8> {
        let mut h = vec![0u8; PDB_HEADER_LEN];
        h[0..name.len()].copy_from_slice(name);
        h[60..68].copy_from_slice(tag);
        BigEndian::write_u16(&mut h[76..78], num_records);
        h
    }

    fn record_table(offsets: &[u32]) -> Vec<u8> {
        let mut t = Vec::new();
        for off in offsets {
            t.extend_from_slice(&off.to_be_bytes());
            t.extend_from_slice(&[0, 0, 0, 0]);
        }
        t
    }

    #[test]
    fn raw_palmdoc_container_roundtrips_body_and_name() {
        let body_text = b"Hello, world!\n";
        let mut record0 = vec![0u8; PALMDOC_HEADER_LEN];
        BigEndian::write_u16(&mut record0[0..2], 1); // compression = none
        BigEndian::write_u32(&mut record0[4..8], body_text.len() as u32);
        BigEndian::write_u16(&mut record0[8..10], 1);

        let header = pdb_header(b"TEXtREAd", b"my-book", 2);
        let table_len = 2 * 8;
        let rec0_offset = (PDB_HEADER_LEN + table_len) as u32;
        let rec1_offset = rec0_offset + record0.len() as u32;
        let table = record_table(&[rec0_offset, rec1_offset]);

        let mut data = header;
        data.extend_from_slice(&table);
        data.extend_from_slice(&record0);
        data.extend_from_slice(body_text);

        let book = Book::from_bytes(&data).unwrap();
        assert_eq!(book.body, body_text);
        assert_eq!(book.title, b"my-book");
        assert!(book.images.is_empty());
    }

    #[test]
    fn encrypted_mobi_is_rejected() {
        let mut record0 = vec![0u8; PALMDOC_HEADER_LEN];
        BigEndian::write_u16(&mut record0[0..2], 1);
        BigEndian::write_u16(&mut record0[12..14], 1); // old encryption

        let header = pdb_header(b"BOOKMOBI", b"enc", 1);
        let rec0_offset = (PDB_HEADER_LEN + 8) as u32;
        let table = record_table(&[rec0_offset]);

        let mut data = header;
        data.extend_from_slice(&table);
        data.extend_from_slice(&record0);

        assert!(matches!(Book::from_bytes(&data), Err(Error::Encrypted(1))));
    }

    #[test]
    fn strict_mode_rejects_size_mismatch() {
        let body_text = b"short";
        let mut record0 = vec![0u8; PALMDOC_HEADER_LEN];
        BigEndian::write_u16(&mut record0[0..2], 1);
        BigEndian::write_u32(&mut record0[4..8], 100); // declares far more than is present
        BigEndian::write_u16(&mut record0[8..10], 1);

        let header = pdb_header(b"TEXtREAd", b"short-book", 2);
        let table_len = 2 * 8;
        let rec0_offset = (PDB_HEADER_LEN + table_len) as u32;
        let rec1_offset = rec0_offset + record0.len() as u32;
        let table = record_table(&[rec0_offset, rec1_offset]);

        let mut data = header;
        data.extend_from_slice(&table);
        data.extend_from_slice(&record0);
        data.extend_from_slice(body_text);

        let lenient = Book::from_bytes(&data).unwrap();
        assert_eq!(lenient.body, body_text);

        let strict = OpenOptions::new().strict(true).from_bytes(&data);
        assert!(matches!(strict, Err(Error::SizeMismatch { .. })));
    }
}

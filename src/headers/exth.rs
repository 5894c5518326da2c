//! The EXTH extended metadata table: a typed, variable-length record list
//! that follows the MOBI header when its EXTH-present bit is set.
use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};
use indexmap::IndexMap;
use log::debug;

const EXTH_HEADER_LEN: usize = 12;

const TYPE_AUTHOR: u32 = 100;
const TYPE_PUBLISHER: u32 = 101;
const TYPE_DESCRIPTION: u32 = 103;
const TYPE_ISBN: u32 = 104;
const TYPE_SUBJECT: u32 = 105;
const TYPE_PUBLISH_DATE: u32 = 106;
const TYPE_CONTRIBUTOR: u32 = 108;
const TYPE_RIGHTS: u32 = 109;
const TYPE_COVER_OFFSET: u32 = 201;
const TYPE_THUMB_OFFSET: u32 = 202;
const TYPE_TITLE: u32 = 503;
const TYPE_LANGUAGE: u32 = 524;

/// Parsed EXTH table. Known fields are dispatched into their own slots;
/// everything else is retained, in file order, for callers with bespoke
/// needs.
#[derive(Debug, Default)]
pub(crate) struct ExthTable<'a> {
    pub author: Vec<u8>,
    pub publisher: Option<&'a [u8]>,
    pub description: Option<&'a [u8]>,
    pub isbn: Option<&'a [u8]>,
    pub subject: Option<&'a [u8]>,
    pub publish_date: Option<&'a [u8]>,
    pub contributor: Option<&'a [u8]>,
    pub rights: Option<&'a [u8]>,
    pub language_tag: Option<&'a [u8]>,
    pub title_override: Option<&'a [u8]>,
    pub cover_index: Option<u32>,
    pub thumbnail_index: Option<u32>,
    pub records: IndexMap<u32, Vec<&'a [u8]>>,
}

impl<'a> ExthTable<'a> {
    /// Parses an EXTH table starting at the `"EXTH"` tag.
    pub(crate) fn parse(data: &'a [u8]) -> Result<ExthTable<'a>> {
        if data.get(0..4) != Some(b"EXTH") {
            return Err(Error::HeaderMalformed("EXTH record missing tag".into()));
        }
        let record_count = data
            .get(8..12)
            .map(BigEndian::read_u32)
            .ok_or_else(|| Error::HeaderMalformed("EXTH header truncated".into()))?;

        let mut table = ExthTable::default();
        let mut pos = EXTH_HEADER_LEN;
        for _ in 0..record_count {
            let rec_type = data
                .get(pos..pos + 4)
                .map(BigEndian::read_u32)
                .ok_or_else(|| Error::HeaderMalformed("EXTH record truncated".into()))?;
            let rec_len = data
                .get(pos + 4..pos + 8)
                .map(BigEndian::read_u32)
                .ok_or_else(|| Error::HeaderMalformed("EXTH record truncated".into()))?;
            if rec_len < 8 {
                return Err(Error::HeaderMalformed(format!(
                    "EXTH record {} declares length {} < 8",
                    rec_type, rec_len
                )));
            }
            let payload = data
                .get(pos + 8..pos + rec_len as usize)
                .ok_or_else(|| Error::HeaderMalformed("EXTH record payload runs past end".into()))?;

            table.dispatch(rec_type, payload);
            pos += rec_len as usize;
        }

        Ok(table)
    }

    fn dispatch(&mut self, rec_type: u32, payload: &'a [u8]) {
        match rec_type {
            TYPE_AUTHOR => self.author.extend_from_slice(payload),
            TYPE_PUBLISHER => self.publisher = Some(payload),
            TYPE_DESCRIPTION => self.description = Some(payload),
            TYPE_ISBN => self.isbn = Some(payload),
            TYPE_SUBJECT => self.subject = Some(payload),
            TYPE_PUBLISH_DATE => self.publish_date = Some(payload),
            TYPE_CONTRIBUTOR => self.contributor = Some(payload),
            TYPE_RIGHTS => self.rights = Some(payload),
            TYPE_LANGUAGE => self.language_tag = Some(payload),
            TYPE_TITLE => self.title_override = Some(payload),
            TYPE_COVER_OFFSET => self.cover_index = read_index(payload),
            TYPE_THUMB_OFFSET => self.thumbnail_index = read_index(payload),
            other => {
                debug!("retaining unrecognised EXTH record type {}", other);
                self.records.entry(other).or_default().push(payload);
            }
        }
    }
}

fn read_index(payload: &[u8]) -> Option<u32> {
    if payload.len() < 4 {
        return None;
    }
    Some(BigEndian::read_u32(&payload[0..4]))
}

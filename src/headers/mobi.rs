//! The `"MOBI"` header that follows the PalmDOC header inside record 0.
use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

const EXTH_PRESENT_FLAG: u32 = 0x40;
const TRAILER_FLAGS_MIN_HDR_LEN: u32 = 228;
// Offsets below are relative to the MOBI header itself (`header`, which
// starts 16 bytes into record 0, right after the PalmDOC header) -- not to
// record 0. The format's public documentation gives these fields as record0
// offsets 0xC2/0xF2; subtract the 16-byte PalmDOC header to land on them.
const LAST_CONTENT_RECORD_OFFSET: usize = 0xB2;
const TRAILER_FLAGS_OFFSET: usize = 0xE2;

/// The document-type code carried in the MOBI header, classified into the
/// values the format's wiki documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobiType {
    MobipocketBook,
    PalmDocBook,
    Audio,
    News,
    NewsFeed,
    NewsMagazine,
    Pics,
    Word,
    Xls,
    Ppt,
    Text,
    Html,
    Unknown(u32),
}

impl From<u32> for MobiType {
    fn from(v: u32) -> MobiType {
        match v {
            2 => MobiType::MobipocketBook,
            3 => MobiType::PalmDocBook,
            4 => MobiType::Audio,
            257 => MobiType::News,
            258 => MobiType::NewsFeed,
            259 => MobiType::NewsMagazine,
            513 => MobiType::Pics,
            514 => MobiType::Word,
            515 => MobiType::Xls,
            516 => MobiType::Ppt,
            517 => MobiType::Text,
            518 => MobiType::Html,
            other => MobiType::Unknown(other),
        }
    }
}

/// The language subcode of the MOBI locale word (low byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Neutral,
    Afrikaans,
    Albanian,
    Arabic,
    Armenian,
    Assamese,
    Azeri,
    Basque,
    Belarusian,
    Bengali,
    Bulgarian,
    Catalan,
    Chinese,
    Czech,
    Danish,
    Dutch,
    English,
    Estonian,
    Faeroese,
    Farsi,
    Finnish,
    French,
    Georgian,
    German,
    Greek,
    Gujarati,
    Hebrew,
    Hindi,
    Hungarian,
    Icelandic,
    Indonesian,
    Italian,
    Japanese,
    Kannada,
    Kazak,
    Konkani,
    Korean,
    Latvian,
    Lithuanian,
    Macedonian,
    Malay,
    Malayalam,
    Maltese,
    Marathi,
    Nepali,
    Norwegian,
    Oriya,
    Polish,
    Portuguese,
    Punjabi,
    Rhaetoromanic,
    Romanian,
    Russian,
    Sami,
    Sanskrit,
    Serbian,
    Slovak,
    Slovenian,
    Sorbian,
    Spanish,
    Sutu,
    Swahili,
    Swedish,
    Tamil,
    Tatar,
    Telugu,
    Thai,
    Tsonga,
    Tswana,
    Turkish,
    Ukrainian,
    Urdu,
    Uzbek,
    Vietnamese,
    Xhosa,
    Zulu,
    Unknown(u8),
}

impl From<u8> for Language {
    fn from(code: u8) -> Language {
        match code {
            0 => Language::Neutral,
            54 => Language::Afrikaans,
            28 => Language::Albanian,
            1 => Language::Arabic,
            43 => Language::Armenian,
            77 => Language::Assamese,
            44 => Language::Azeri,
            45 => Language::Basque,
            35 => Language::Belarusian,
            69 => Language::Bengali,
            2 => Language::Bulgarian,
            3 => Language::Catalan,
            4 => Language::Chinese,
            5 => Language::Czech,
            6 => Language::Danish,
            19 => Language::Dutch,
            9 => Language::English,
            37 => Language::Estonian,
            56 => Language::Faeroese,
            41 => Language::Farsi,
            11 => Language::Finnish,
            12 => Language::French,
            55 => Language::Georgian,
            7 => Language::German,
            8 => Language::Greek,
            71 => Language::Gujarati,
            13 => Language::Hebrew,
            57 => Language::Hindi,
            14 => Language::Hungarian,
            15 => Language::Icelandic,
            33 => Language::Indonesian,
            16 => Language::Italian,
            17 => Language::Japanese,
            75 => Language::Kannada,
            63 => Language::Kazak,
            87 => Language::Konkani,
            18 => Language::Korean,
            38 => Language::Latvian,
            39 => Language::Lithuanian,
            47 => Language::Macedonian,
            62 => Language::Malay,
            76 => Language::Malayalam,
            58 => Language::Maltese,
            78 => Language::Marathi,
            97 => Language::Nepali,
            20 => Language::Norwegian,
            72 => Language::Oriya,
            21 => Language::Polish,
            22 => Language::Portuguese,
            70 => Language::Punjabi,
            23 => Language::Rhaetoromanic,
            24 => Language::Romanian,
            25 => Language::Russian,
            59 => Language::Sami,
            79 => Language::Sanskrit,
            26 => Language::Serbian,
            27 => Language::Slovak,
            36 => Language::Slovenian,
            46 => Language::Sorbian,
            10 => Language::Spanish,
            48 => Language::Sutu,
            65 => Language::Swahili,
            29 => Language::Swedish,
            73 => Language::Tamil,
            68 => Language::Tatar,
            74 => Language::Telugu,
            30 => Language::Thai,
            49 => Language::Tsonga,
            50 => Language::Tswana,
            31 => Language::Turkish,
            34 => Language::Ukrainian,
            32 => Language::Urdu,
            67 => Language::Uzbek,
            42 => Language::Vietnamese,
            52 => Language::Xhosa,
            53 => Language::Zulu,
            other => Language::Unknown(other),
        }
    }
}

#[derive(Debug)]
pub(crate) struct MobiHeader {
    pub hdr_len: u32,
    pub mobi_type: MobiType,
    pub text_encoding: u32,
    pub locale: u32,
    pub full_name_offset: u32,
    pub full_name_len: u32,
    pub first_image_record: u32,
    pub huffman_first_record: u32,
    pub huffman_record_count: u32,
    pub exth_present: bool,
    pub last_content_record: Option<u16>,
    pub trailer_flags: Option<u16>,
}

impl MobiHeader {
    /// Parses the MOBI header out of record 0, starting at `offset` (the
    /// byte right after the PalmDOC header).
    pub(crate) fn parse(record0: &[u8], offset: usize) -> Result<MobiHeader> {
        let tag = record0
            .get(offset..offset + 4)
            .ok_or_else(|| Error::HeaderMalformed("record 0 too short for MOBI header".into()))?;
        if tag != b"MOBI" {
            return Err(Error::HeaderMalformed(format!(
                "expected MOBI tag, found {:?}",
                String::from_utf8_lossy(tag)
            )));
        }

        let field = |pos: usize| -> Result<u32> {
            record0
                .get(offset + pos..offset + pos + 4)
                .map(BigEndian::read_u32)
                .ok_or_else(|| {
                    Error::HeaderMalformed(format!("MOBI header truncated before offset {}", pos))
                })
        };

        let hdr_len = field(4)?;
        let mobi_type = MobiType::from(field(8)?);
        let text_encoding = field(12)?;
        let full_name_offset = field(68)?;
        let full_name_len = field(72)?;
        let locale = field(76)?;
        let first_image_record = field(92)?;
        let huffman_first_record = field(96)?;
        let huffman_record_count = field(100)?;
        let exth_flags = field(112)?;
        let exth_present = exth_flags & EXTH_PRESENT_FLAG != 0;

        let header_end = offset
            .checked_add(hdr_len as usize)
            .unwrap_or(record0.len())
            .min(record0.len());
        let header = &record0[offset..header_end];
        let last_content_record = header
            .get(LAST_CONTENT_RECORD_OFFSET..LAST_CONTENT_RECORD_OFFSET + 2)
            .map(BigEndian::read_u16);
        let trailer_flags = if hdr_len >= TRAILER_FLAGS_MIN_HDR_LEN {
            header
                .get(TRAILER_FLAGS_OFFSET..TRAILER_FLAGS_OFFSET + 2)
                .map(BigEndian::read_u16)
        } else {
            None
        };

        Ok(MobiHeader {
            hdr_len,
            mobi_type,
            text_encoding,
            locale,
            full_name_offset,
            full_name_len,
            first_image_record,
            huffman_first_record,
            huffman_record_count,
            exth_present,
            last_content_record,
            trailer_flags,
        })
    }

    pub(crate) fn language(&self) -> Language {
        Language::from((self.locale & 0xFF) as u8)
    }

    pub(crate) fn region(&self) -> u8 {
        ((self.locale >> 8) & 0xFF) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal_mobi_header(hdr_len: u32) -> Vec<u8> {
        let mut h = vec![0u8; 280];
        h[0..4].copy_from_slice(b"MOBI");
        BigEndian::write_u32(&mut h[4..8], hdr_len);
        BigEndian::write_u32(&mut h[8..12], 2);
        BigEndian::write_u32(&mut h[12..16], 65001);
        BigEndian::write_u32(&mut h[68..72], 1360);
        BigEndian::write_u32(&mut h[72..76], 42);
        BigEndian::write_u32(&mut h[76..80], 9);
        BigEndian::write_u32(&mut h[92..96], 287);
        BigEndian::write_u32(&mut h[112..116], 0x40);
        BigEndian::write_u16(&mut h[0xB2..0xB4], 286);
        BigEndian::write_u16(&mut h[0xE2..0xE4], 6);
        h
    }

    #[test]
    fn parses_known_fields() {
        let bytes = minimal_mobi_header(232);
        let header = MobiHeader::parse(&bytes, 0).unwrap();
        assert_eq!(header.mobi_type, MobiType::MobipocketBook);
        assert_eq!(header.text_encoding, 65001);
        assert_eq!(header.full_name_offset, 1360);
        assert_eq!(header.full_name_len, 42);
        assert!(header.exth_present);
        assert_eq!(header.language(), Language::English);
        assert_eq!(header.last_content_record, Some(286));
        assert_eq!(header.trailer_flags, Some(6));
    }

    #[test]
    fn trailer_flags_absent_below_threshold() {
        let bytes = minimal_mobi_header(200);
        let header = MobiHeader::parse(&bytes, 0).unwrap();
        assert_eq!(header.trailer_flags, None);
    }

    #[test]
    fn trailer_flags_present_at_228_byte_threshold() {
        let bytes = minimal_mobi_header(228);
        let header = MobiHeader::parse(&bytes, 0).unwrap();
        assert_eq!(header.trailer_flags, Some(6));
    }

    #[test]
    fn rejects_wrong_tag() {
        let mut bytes = minimal_mobi_header(232);
        bytes[0] = b'X';
        assert!(MobiHeader::parse(&bytes, 0).is_err());
    }
}

//! HUFF/CDIC prefix-coded dictionary decompression.
//!
//! A HUFF record carries a 256-entry cache table and a 64-entry base table
//! describing a canonical prefix code; one or more CDIC records each carry
//! a dictionary of literal symbols addressed by the decoded code. A symbol
//! may itself be HUFF-compressed, in which case it is unpacked recursively.
use crate::bitreader::BitReader;
use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

const CACHE_LEN: usize = 256;
const BASE_LEN: usize = 64;
const CACHE_TABLE_OFFSET: usize = 24;
const BASE_TABLE_OFFSET: usize = CACHE_TABLE_OFFSET + CACHE_LEN * 4;
const CDIC_HEADER_LEN: usize = 16;
const MAX_DICTS: usize = 32;
const MAX_RECURSION: u32 = 32;

/// Parsed HUFF cache/base tables plus every CDIC dictionary, ready to
/// decompress one or more body records.
pub(crate) struct HuffCdic<'a> {
    cache: [u32; CACHE_LEN],
    base: [u32; BASE_LEN],
    code_length: u32,
    dicts: Vec<&'a [u8]>,
}

fn read_u16_at(buf: &[u8], pos: usize) -> Result<u16> {
    buf.get(pos..pos + 2)
        .map(BigEndian::read_u16)
        .ok_or_else(|| Error::HuffTableCorrupt(format!("offset {} out of range", pos)))
}

fn read_u32_at(buf: &[u8], pos: usize) -> Result<u32> {
    buf.get(pos..pos + 4)
        .map(BigEndian::read_u32)
        .ok_or_else(|| Error::HuffTableCorrupt(format!("offset {} out of range", pos)))
}

impl<'a> HuffCdic<'a> {
    /// Builds the decoder from the HUFF record and the CDIC records that
    /// follow it, in file order.
    pub(crate) fn new(huff_record: &'a [u8], cdic_records: &[&'a [u8]]) -> Result<HuffCdic<'a>> {
        if huff_record.get(0..4) != Some(b"HUFF".as_slice()) {
            return Err(Error::HeaderMalformed("HUFF record missing tag".into()));
        }
        if read_u32_at(huff_record, 4)? != 0x18 {
            return Err(Error::HeaderMalformed(
                "HUFF record header length is not 24".into(),
            ));
        }
        if huff_record.len() < BASE_TABLE_OFFSET + BASE_LEN * 4 {
            return Err(Error::HeaderMalformed(
                "HUFF record too short for cache/base tables".into(),
            ));
        }

        let mut cache = [0u32; CACHE_LEN];
        for (i, slot) in cache.iter_mut().enumerate() {
            *slot = read_u32_at(huff_record, CACHE_TABLE_OFFSET + i * 4)?;
        }
        let mut base = [0u32; BASE_LEN];
        for (i, slot) in base.iter_mut().enumerate() {
            *slot = read_u32_at(huff_record, BASE_TABLE_OFFSET + i * 4)?;
        }

        if cdic_records.is_empty() {
            return Err(Error::HeaderMalformed(
                "no CDIC records supplied alongside HUFF record".into(),
            ));
        }
        if cdic_records.len() > MAX_DICTS {
            return Err(Error::HuffTableCorrupt(format!(
                "{} CDIC records exceeds the 32 dictionary limit",
                cdic_records.len()
            )));
        }

        let mut code_length = None;
        let mut dicts = Vec::with_capacity(cdic_records.len());
        for record in cdic_records {
            if record.get(0..4) != Some(b"CDIC".as_slice()) {
                return Err(Error::HeaderMalformed("CDIC record missing tag".into()));
            }
            let this_code_length = read_u32_at(record, 12)?;
            match code_length {
                None => code_length = Some(this_code_length),
                Some(expected) if expected != this_code_length => {
                    return Err(Error::HeaderMalformed(
                        "CDIC records disagree on code length".into(),
                    ));
                }
                _ => {}
            }
            let dict = record
                .get(CDIC_HEADER_LEN..)
                .ok_or_else(|| Error::HeaderMalformed("CDIC record shorter than its header".into()))?;
            dicts.push(dict);
        }

        Ok(HuffCdic {
            cache,
            base,
            code_length: code_length.unwrap(),
            dicts,
        })
    }

    /// Decompresses one body record, bounding total output at `cap` bytes.
    pub(crate) fn decompress(&self, data: &[u8], cap: usize) -> Result<Vec<u8>> {
        let mut dst = Vec::new();
        self.decode_into(data, &mut dst, cap, 0)?;
        Ok(dst)
    }

    fn decode_into(&self, data: &[u8], dst: &mut Vec<u8>, cap: usize, depth: u32) -> Result<()> {
        if depth > MAX_RECURSION {
            return Err(Error::HuffTableCorrupt(
                "recursive symbol nesting too deep".into(),
            ));
        }

        let mut r = BitReader::new(data);
        let mut bits_consumed = 0u32;
        loop {
            r.eat(bits_consumed);
            let bits_left = r.bits_left();
            if bits_left == 0 {
                break;
            }
            let bits = r.peek(32);
            if bits_left < 8 && bits == 0 {
                break;
            }

            let v = self.cache[(bits >> 24) as usize];
            let mut code_len = v & 0x1F;
            if code_len == 0 {
                return Err(Error::HuffTableCorrupt("zero code length in cache table".into()));
            }

            let code = if v & 0x80 != 0 {
                (v >> 8).wrapping_sub(bits >> (32 - code_len))
            } else {
                let mut scan_len = code_len;
                loop {
                    let min_code = self.base[2 * (scan_len as usize - 1)];
                    if min_code <= (bits >> (32 - scan_len)) {
                        break;
                    }
                    scan_len += 1;
                    if scan_len > 32 {
                        return Err(Error::HuffTableCorrupt(
                            "code length overflowed 32 bits".into(),
                        ));
                    }
                }
                code_len = scan_len;
                self.base[2 * (scan_len as usize - 1) + 1].wrapping_sub(bits >> (32 - scan_len))
            };

            self.decode_symbol(code, dst, cap, depth)?;
            if dst.len() > cap {
                return Err(Error::DecompressionOverflow);
            }
            bits_consumed = code_len;
        }

        Ok(())
    }

    fn decode_symbol(&self, code: u32, dst: &mut Vec<u8>, cap: usize, depth: u32) -> Result<()> {
        let dicts_count = self.dicts.len() as u32;
        let dict_idx = code >> self.code_length;
        if dict_idx >= dicts_count {
            return Err(Error::HuffTableCorrupt(format!(
                "dictionary index {} out of range ({} dictionaries)",
                dict_idx, dicts_count
            )));
        }
        let idx = code & ((1u32 << self.code_length) - 1);
        let dict = self.dicts[dict_idx as usize];

        let offset = read_u16_at(dict, idx as usize * 2)? as usize;
        let sym_len_raw = read_u16_at(dict, offset)?;
        let body_start = offset + 2;

        if sym_len_raw & 0x8000 == 0 {
            let len = sym_len_raw as usize;
            let body = dict
                .get(body_start..body_start + len)
                .ok_or_else(|| Error::HuffTableCorrupt("symbol body offset out of range".into()))?;
            self.decode_into(body, dst, cap, depth + 1)?;
        } else {
            let len = (sym_len_raw & 0x7FFF) as usize;
            if len > 127 {
                return Err(Error::HuffTableCorrupt("recursive symbol too long".into()));
            }
            let body = dict
                .get(body_start..body_start + len)
                .ok_or_else(|| Error::HuffTableCorrupt("symbol body offset out of range".into()))?;
            if dst.len() + len > cap {
                return Err(Error::DecompressionOverflow);
            }
            dst.extend_from_slice(body);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Builds a minimal HUFF record whose cache table maps every possible
    /// top byte of the bit stream to a single terminal code of length 8
    /// pointing at dictionary 0, index 0.
    fn huff_record() -> Vec<u8> {
        let mut r = vec![0u8; BASE_TABLE_OFFSET + BASE_LEN * 4];
        r[0..4].copy_from_slice(b"HUFF");
        BigEndian::write_u32(&mut r[4..8], 0x18);
        for c in 0..CACHE_LEN {
            // code_len = 8, terminal bit set, top value = 0 so code == bits>>24
            let v: u32 = 8 | 0x80;
            BigEndian::write_u32(&mut r[CACHE_TABLE_OFFSET + c * 4..CACHE_TABLE_OFFSET + c * 4 + 4], v);
        }
        r
    }

    fn cdic_record(code_len: u32, phrases: &[&[u8]]) -> Vec<u8> {
        let offsets_table_len = phrases.len() * 2;
        let mut offsets = Vec::new();
        let mut body = Vec::new();
        for phrase in phrases {
            offsets.push((offsets_table_len + body.len()) as u16);
            let mut entry = Vec::new();
            entry.extend_from_slice(&((phrase.len() as u16) | 0x8000).to_be_bytes());
            entry.extend_from_slice(phrase);
            body.extend_from_slice(&entry);
        }

        let mut r = vec![0u8; CDIC_HEADER_LEN];
        r[0..4].copy_from_slice(b"CDIC");
        BigEndian::write_u32(&mut r[4..8], 0x10);
        BigEndian::write_u32(&mut r[8..12], phrases.len() as u32);
        BigEndian::write_u32(&mut r[12..16], code_len);
        for off in &offsets {
            r.extend_from_slice(&off.to_be_bytes());
        }
        r.extend_from_slice(&body);
        r
    }

    #[test]
    fn terminal_fast_path_decodes_single_literal() {
        let huff = huff_record();
        let cdic = cdic_record(8, &[b"X"]);
        let decoder = HuffCdic::new(&huff, &[&cdic]).unwrap();
        // code = (v >> 8) - (bits >> 24); v>>8 == 0, so code == -(bits>>24) mod 2^32.
        // With bits>>24 == 0 (an all-zero input byte) code == 0, selecting dict 0 idx 0.
        let out = decoder.decompress(&[0x00], 16).unwrap();
        assert_eq!(out, b"X");
    }

    #[test]
    fn rejects_mismatched_code_lengths() {
        let huff = huff_record();
        let cdic_a = cdic_record(8, &[b"a"]);
        let cdic_b = cdic_record(6, &[b"b"]);
        assert!(HuffCdic::new(&huff, &[&cdic_a, &cdic_b]).is_err());
    }

    #[test]
    fn rejects_bad_tag() {
        let mut huff = huff_record();
        huff[0] = b'X';
        let cdic = cdic_record(8, &[b"a"]);
        assert!(HuffCdic::new(&huff, &[&cdic]).is_err());
    }

    #[test]
    fn rejects_too_many_dictionaries() {
        let huff = huff_record();
        let cdic = cdic_record(8, &[b"a"]);
        let refs: Vec<&[u8]> = (0..33).map(|_| cdic.as_slice()).collect();
        assert!(HuffCdic::new(&huff, &refs).is_err());
    }
}

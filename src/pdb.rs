//! PalmDB container parsing: the fixed 78-byte database header and the
//! trailing array of record headers.
use crate::bytesource::ByteSource;
use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

pub(crate) const PDB_HEADER_LEN: usize = 78;
const RECORD_HEADER_LEN: usize = 8;

const BOOKMOBI: &[u8; 8] = b"BOOKMOBI";
const TEXTREAD: &[u8; 8] = b"TEXtREAd";

/// Which of the two container families this file declares itself as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Mobi,
    PalmDoc,
}

/// One `(offset, length)` pair pointing into the byte source. The sentinel
/// record at index `num_records` carries the file length so that
/// `length = offset[i + 1] - offset[i]` holds uniformly, including for the
/// last real record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct RecordInfo {
    pub offset: usize,
}

/// The parsed PalmDB header plus its record offset table.
#[derive(Debug)]
pub(crate) struct Container {
    pub kind: ContainerKind,
    pub name: Vec<u8>,
    pub created: u32,
    pub modified: u32,
    pub records: Vec<RecordInfo>,
}

impl Container {
    pub(crate) fn parse(src: &ByteSource) -> Result<Container> {
        let header = src.read_at(0, PDB_HEADER_LEN)?;

        let name = header[0..32]
            .iter()
            .copied()
            .take_while(|&b| b != 0)
            .collect();
        let created = BigEndian::read_u32(&header[36..40]);
        let modified = BigEndian::read_u32(&header[40..44]);
        let type_creator = &header[60..68];
        let num_records = BigEndian::read_u16(&header[76..78]);

        if num_records == 0 {
            return Err(Error::ContainerMalformed(
                "numRecords is zero".to_string(),
            ));
        }

        let kind = if type_creator == BOOKMOBI.as_slice() {
            ContainerKind::Mobi
        } else if type_creator == TEXTREAD.as_slice() {
            ContainerKind::PalmDoc
        } else {
            return Err(Error::ContainerMalformed(format!(
                "unrecognised type/creator tag {:?}",
                String::from_utf8_lossy(type_creator)
            )));
        };

        let table_len = num_records as usize * RECORD_HEADER_LEN;
        let table = src.read_at(PDB_HEADER_LEN, table_len)?;

        let mut records = Vec::with_capacity(num_records as usize + 1);
        for chunk in table.chunks_exact(RECORD_HEADER_LEN) {
            let offset = BigEndian::read_u32(&chunk[0..4]) as usize;
            records.push(RecordInfo { offset });
        }

        let file_len = src.len();
        records.push(RecordInfo { offset: file_len });

        for window in records.windows(2) {
            if window[1].offset < window[0].offset {
                return Err(Error::ContainerMalformed(
                    "record offsets are not monotonically non-decreasing".to_string(),
                ));
            }
        }
        if records[0].offset < PDB_HEADER_LEN + table_len {
            return Err(Error::ContainerMalformed(
                "record 0 overlaps the PalmDB header/record table".to_string(),
            ));
        }

        Ok(Container {
            kind,
            name,
            created,
            modified,
            records,
        })
    }

    pub(crate) fn num_records(&self) -> usize {
        self.records.len() - 1
    }

    /// Length of record `i`, computed from the sentinel trailing entry.
    pub(crate) fn record_len(&self, i: usize) -> Result<usize> {
        if i + 1 >= self.records.len() {
            return Err(Error::ContainerMalformed(format!(
                "record index {} out of range (have {})",
                i,
                self.num_records()
            )));
        }
        Ok(self.records[i + 1].offset - self.records[i].offset)
    }

    pub(crate) fn record<'a>(&self, src: &ByteSource<'a>, i: usize) -> Result<&'a [u8]> {
        let len = self.record_len(i)?;
        src.read_at(self.records[i].offset, len)
    }

}

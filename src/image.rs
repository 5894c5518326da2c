//! Embedded image record loading and cover/thumbnail selection (§4.7).
use crate::pdb::Container;
use crate::bytesource::ByteSource;
use crate::error::Result;

const EOF_MARKER: [u8; 4] = [0xE9, 0x8E, 0x0D, 0x0A];
const NON_IMAGE_TAGS: [&[u8; 4]; 6] = [b"FLIS", b"FCIS", b"FDST", b"DATP", b"SRCS", b"VIDE"];

/// The detected image container format, identified from magic bytes alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bin,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => ".jpg",
            ImageFormat::Png => ".png",
            ImageFormat::Gif => ".gif",
            ImageFormat::Bin => ".bin",
        }
    }

    fn detect(bytes: &[u8]) -> ImageFormat {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF, 0xE0]) {
            ImageFormat::Jpeg
        } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            ImageFormat::Png
        } else if bytes.starts_with(&[0x47, 0x49, 0x46, 0x38]) {
            ImageFormat::Gif
        } else {
            ImageFormat::Bin
        }
    }
}

/// One embedded image, owned independently of the source file buffer.
#[derive(Debug, Clone)]
pub struct Image {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

/// Loads every image record in `[first_record, first_record + count)`,
/// stopping early at the EOF marker and leaving non-image slots empty.
pub(crate) fn load_images<'a>(
    src: &ByteSource<'a>,
    container: &Container,
    first_record: usize,
    count: usize,
) -> Result<Vec<Option<Image>>> {
    let mut images = Vec::with_capacity(count);

    for i in 0..count {
        let record_index = first_record + i;
        if record_index >= container.num_records() {
            break;
        }
        let record = container.record(src, record_index)?;

        if record.starts_with(&EOF_MARKER) {
            break;
        }
        if NON_IMAGE_TAGS.iter().any(|tag| record.starts_with(tag.as_slice())) {
            images.push(None);
            continue;
        }

        let format = ImageFormat::detect(record);
        images.push(Some(Image {
            bytes: record.to_vec(),
            format,
        }));
    }

    Ok(images)
}

/// Resolves a cover/thumbnail EXTH index against the loaded image array,
/// falling back (for covers only) to the larger of the first two images.
pub(crate) fn select_cover(images: &[Option<Image>], exth_index: Option<u32>) -> Option<usize> {
    if let Some(i) = exth_index {
        let i = i as usize;
        if images.get(i).map(Option::is_some).unwrap_or(false) {
            return Some(i);
        }
    }

    match (images.first().and_then(Option::as_ref), images.get(1).and_then(Option::as_ref)) {
        (Some(a), Some(b)) => Some(if b.bytes.len() > a.bytes.len() { 1 } else { 0 }),
        (Some(_), None) => Some(0),
        _ => None,
    }
}

pub(crate) fn select_thumbnail(images: &[Option<Image>], exth_index: Option<u32>) -> Option<usize> {
    let i = exth_index? as usize;
    images.get(i).and_then(Option::as_ref).map(|_| i)
}

/// Converts a 1-based MOBI HTML `recindex` into the image at that slot.
pub fn image_at(images: &[Option<Image>], recindex: u32) -> Option<&Image> {
    let idx = recindex.checked_sub(1)? as usize;
    images.get(idx).and_then(Option::as_ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn detects_known_formats() {
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD8, 0xFF, 0xE0, 0]), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::detect(&[0x89, 0x50, 0x4E, 0x47]), ImageFormat::Png);
        assert_eq!(ImageFormat::detect(b"GIF89a"), ImageFormat::Gif);
        assert_eq!(ImageFormat::detect(b"whatever"), ImageFormat::Bin);
    }

    #[test]
    fn cover_falls_back_to_larger_of_first_two() {
        let images = vec![
            Some(Image { bytes: vec![0; 4], format: ImageFormat::Bin }),
            Some(Image { bytes: vec![0; 40], format: ImageFormat::Bin }),
        ];
        assert_eq!(select_cover(&images, None), Some(1));
    }

    #[test]
    fn cover_prefers_exth_index_when_valid() {
        let images = vec![
            Some(Image { bytes: vec![0; 4], format: ImageFormat::Bin }),
            Some(Image { bytes: vec![0; 40], format: ImageFormat::Bin }),
        ];
        assert_eq!(select_cover(&images, Some(0)), Some(0));
    }

    #[test]
    fn cover_ignores_exth_index_pointing_at_empty_slot() {
        let images = vec![None, Some(Image { bytes: vec![0; 4], format: ImageFormat::Bin })];
        assert_eq!(select_cover(&images, Some(0)), Some(1));
    }

    #[test]
    fn recindex_is_one_based() {
        let images = vec![Some(Image { bytes: vec![1], format: ImageFormat::Bin })];
        assert!(image_at(&images, 0).is_none());
        assert_eq!(image_at(&images, 1).unwrap().bytes, vec![1]);
    }

    #[test]
    fn thumbnail_absent_when_index_out_of_range() {
        let images = vec![Some(Image { bytes: vec![1], format: ImageFormat::Bin })];
        assert_eq!(select_thumbnail(&images, Some(5)), None);
    }
}

use serde::{Deserialize, Serialize};

/// Number of leading bytes the detector looks at.
pub const HEADER_LEN: usize = 12;

/// Binary formats recognised from a file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectedFormat {
    Jpeg,
    Png,
    Gif,
    Tiff,
    Heic,
    Mp4,
    Mov,
    Webp,
}

impl DetectedFormat {
    /// Extension a mismatched file is renamed to.
    pub fn extension(self) -> &'static str {
        match self {
            DetectedFormat::Jpeg => "jpg",
            DetectedFormat::Png => "png",
            DetectedFormat::Gif => "gif",
            DetectedFormat::Tiff => "tiff",
            DetectedFormat::Heic => "heic",
            DetectedFormat::Mp4 => "mp4",
            DetectedFormat::Mov => "mov",
            DetectedFormat::Webp => "webp",
        }
    }

    /// Lowercase extensions that legitimately carry this format.
    ///
    /// TIFF-based camera raw formats share the `II`/`MM` byte-order mark.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            DetectedFormat::Jpeg => &["jpg", "jpeg", "jpe", "jfif"],
            DetectedFormat::Png => &["png"],
            DetectedFormat::Gif => &["gif"],
            DetectedFormat::Tiff => &["tiff", "tif", "dng", "nef", "cr2", "arw", "orf", "rw2", "pef"],
            DetectedFormat::Heic => &["heic", "heif", "hif"],
            DetectedFormat::Mp4 => &["mp4", "m4v", "m4a", "3gp", "3g2"],
            DetectedFormat::Mov => &["mov", "qt"],
            DetectedFormat::Webp => &["webp"],
        }
    }

    /// Case-insensitive check of a declared extension against this format.
    pub fn accepts(self, extension: &str) -> bool {
        let ext = extension.to_ascii_lowercase();
        self.aliases().contains(&ext.as_str())
    }
}

/// Classify a header. Rules are checked in a fixed order and the first hit wins;
/// a header shorter than [`HEADER_LEN`] never matches.
pub fn detect(header: &[u8]) -> Option<DetectedFormat> {
    if header.len() < HEADER_LEN {
        return None;
    }
    let h = &header[..HEADER_LEN];

    match (h[0], h[1]) {
        (0xFF, 0xD8) => return Some(DetectedFormat::Jpeg),
        (0x89, 0x50) => return Some(DetectedFormat::Png),
        (0x47, 0x49) => return Some(DetectedFormat::Gif),
        (0x49, 0x49) | (0x4D, 0x4D) => return Some(DetectedFormat::Tiff),
        _ => {}
    }

    if &h[4..8] == b"ftyp" {
        let format = match &h[8..12] {
            b"heic" | b"mif1" => DetectedFormat::Heic,
            b"mp41" | b"mp42" => DetectedFormat::Mp4,
            b"qt  " => DetectedFormat::Mov,
            // unknown brands are treated as generic MP4 containers
            _ => DetectedFormat::Mp4,
        };
        return Some(format);
    }

    if &h[8..12] == b"WEBP" {
        return Some(DetectedFormat::Webp);
    }

    None
}

/// Returns the detected format when it disagrees with `declared_extension`.
pub fn mismatch(header: &[u8], declared_extension: &str) -> Option<DetectedFormat> {
    detect(header).filter(|format| !format.accepts(declared_extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(prefix: &[u8]) -> Vec<u8> {
        let mut h = prefix.to_vec();
        h.resize(HEADER_LEN, 0);
        h
    }

    fn ftyp(brand: &[u8; 4]) -> Vec<u8> {
        let mut h = vec![0x00, 0x00, 0x00, 0x18];
        h.extend_from_slice(b"ftyp");
        h.extend_from_slice(brand);
        h
    }

    #[test]
    fn test_leading_magic() {
        assert_eq!(detect(&header(&[0xFF, 0xD8, 0xFF, 0xE0])), Some(DetectedFormat::Jpeg));
        assert_eq!(detect(&header(&[0x89, 0x50, 0x4E, 0x47])), Some(DetectedFormat::Png));
        assert_eq!(detect(&header(b"GIF89a")), Some(DetectedFormat::Gif));
        assert_eq!(detect(&header(b"II*\0")), Some(DetectedFormat::Tiff));
        assert_eq!(detect(&header(b"MM\0*")), Some(DetectedFormat::Tiff));
    }

    #[test]
    fn test_ftyp_brands() {
        assert_eq!(detect(&ftyp(b"heic")), Some(DetectedFormat::Heic));
        assert_eq!(detect(&ftyp(b"mif1")), Some(DetectedFormat::Heic));
        assert_eq!(detect(&ftyp(b"mp41")), Some(DetectedFormat::Mp4));
        assert_eq!(detect(&ftyp(b"mp42")), Some(DetectedFormat::Mp4));
        assert_eq!(detect(&ftyp(b"qt  ")), Some(DetectedFormat::Mov));
        assert_eq!(detect(&ftyp(b"isom")), Some(DetectedFormat::Mp4));
    }

    #[test]
    fn test_webp() {
        let mut h = b"RIFF".to_vec();
        h.extend_from_slice(&[0x24, 0x00, 0x00, 0x00]);
        h.extend_from_slice(b"WEBP");
        assert_eq!(detect(&h), Some(DetectedFormat::Webp));
    }

    #[test]
    fn test_priority_first_match_wins() {
        // JPEG magic plus an ftyp marker: the earlier rule decides
        let mut h = vec![0xFF, 0xD8, 0x00, 0x00];
        h.extend_from_slice(b"ftypqt  ");
        assert_eq!(detect(&h), Some(DetectedFormat::Jpeg));
    }

    #[test]
    fn test_short_or_unknown_header() {
        assert_eq!(detect(&[0xFF, 0xD8, 0xFF]), None);
        assert_eq!(detect(&[]), None);
        assert_eq!(detect(&header(b"%PDF-1.4")), None);
    }

    #[test]
    fn test_mismatch_respects_aliases() {
        let jpeg = header(&[0xFF, 0xD8]);
        assert_eq!(mismatch(&jpeg, "png"), Some(DetectedFormat::Jpeg));
        assert_eq!(mismatch(&jpeg, "JPEG"), None);
        assert_eq!(mismatch(&jpeg, "jpg"), None);
        assert_eq!(mismatch(&header(b"II*\0"), "DNG"), None);
        assert_eq!(mismatch(&ftyp(b"qt  "), "mp4"), Some(DetectedFormat::Mov));
        assert_eq!(mismatch(&header(b"plain text"), "jpg"), None);
    }
}

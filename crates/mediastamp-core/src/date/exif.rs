use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use tracing::debug;

use super::provider::CaptureDateProvider;

/// Capture date from EXIF, for any container kamadak-exif understands
/// (JPEG, TIFF, HEIF, PNG, WebP).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifDateProvider;

impl CaptureDateProvider for ExifDateProvider {
    fn capture_date(&self, path: &Path) -> Option<NaiveDateTime> {
        let file = File::open(path).ok()?;
        let reader = match Reader::new().read_from_container(&mut BufReader::new(file)) {
            Ok(r) => r,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no exif data");
                return None;
            }
        };

        // EXIF datetimes carry no timezone: they are local time as-is
        let tags = [
            (Tag::DateTimeOriginal, Tag::SubSecTimeOriginal),
            (Tag::DateTimeDigitized, Tag::SubSecTimeDigitized),
            (Tag::DateTime, Tag::SubSecTime),
        ];

        for (tag, subsec_tag) in tags {
            let Some(field) = reader.get_field(tag, In::PRIMARY) else {
                continue;
            };
            let Some(dt) = parse_exif_datetime(&field.display_value().to_string()) else {
                continue;
            };
            let millis = reader
                .get_field(subsec_tag, In::PRIMARY)
                .and_then(|f| match &f.value {
                    Value::Ascii(parts) => parts.first().and_then(|p| parse_subsec_millis(p)),
                    _ => None,
                })
                .unwrap_or(0);
            return Some(dt + Duration::milliseconds(millis));
        }

        None
    }
}

fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let cleaned = s
        .trim()
        .replace('-', ":")
        .replace('/', ":")
        .replace('\\', ":")
        .replace('.', ":");

    if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, "%Y:%m:%d %H:%M:%S") {
        return Some(dt);
    }

    if let Ok(d) = chrono::NaiveDate::parse_from_str(cleaned.split(' ').next()?, "%Y:%m:%d") {
        return d.and_hms_opt(0, 0, 0);
    }

    None
}

/// SubSecTime is the fractional part as decimal digits ("5" = 500 ms, "123" = 123 ms).
fn parse_subsec_millis(raw: &[u8]) -> Option<i64> {
    let digits: Vec<u8> = raw
        .iter()
        .copied()
        .take_while(u8::is_ascii_digit)
        .take(3)
        .collect();
    if digits.is_empty() {
        return None;
    }
    let mut millis = 0i64;
    for i in 0..3 {
        millis = millis * 10 + digits.get(i).map_or(0, |d| i64::from(d - b'0'));
    }
    Some(millis)
}

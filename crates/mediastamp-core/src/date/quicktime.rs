use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use chrono::NaiveDateTime;
use tracing::debug;

use super::provider::ContainerDateProvider;

/// Seconds between the QuickTime epoch (1904-01-01 UTC) and the Unix epoch.
const QUICKTIME_EPOCH_OFFSET: i64 = 2_082_844_800;

/// Upper bound on boxes visited per level, against corrupt size fields.
const MAX_BOXES: usize = 4096;

/// Creation time from the `moov/mvhd` box of an ISO-BMFF / QuickTime file.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickTimeDateProvider;

impl ContainerDateProvider for QuickTimeDateProvider {
    fn container_date(&self, path: &Path) -> Option<NaiveDateTime> {
        let file = File::open(path).ok()?;
        let len = file.metadata().ok()?.len();
        match mvhd_creation_time(&mut BufReader::new(file), len) {
            Ok(Some(secs)) => to_local(secs),
            Ok(None) => {
                debug!(path = %path.display(), "no mvhd creation time");
                None
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "unreadable container");
                None
            }
        }
    }
}

struct BoxHeader {
    kind: [u8; 4],
    start: u64,
    header_len: u64,
    end: u64,
}

/// Read a box header at the current position. `limit` is the end of the enclosing box.
fn read_box_header<R: Read + Seek>(r: &mut R, start: u64, limit: u64) -> io::Result<Option<BoxHeader>> {
    if start + 8 > limit {
        return Ok(None);
    }
    r.seek(SeekFrom::Start(start))?;
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    let size32 = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let kind = [buf[4], buf[5], buf[6], buf[7]];

    let (size, header_len) = match size32 {
        0 => (limit - start, 8),
        1 => {
            let mut large = [0u8; 8];
            r.read_exact(&mut large)?;
            (u64::from_be_bytes(large), 16)
        }
        n => (u64::from(n), 8),
    };
    if size < header_len {
        return Ok(None);
    }

    Ok(Some(BoxHeader {
        kind,
        start,
        header_len,
        end: start.saturating_add(size).min(limit),
    }))
}

fn find_child<R: Read + Seek>(r: &mut R, from: u64, limit: u64, kind: &[u8; 4]) -> io::Result<Option<BoxHeader>> {
    let mut pos = from;
    for _ in 0..MAX_BOXES {
        let Some(header) = read_box_header(r, pos, limit)? else {
            return Ok(None);
        };
        if &header.kind == kind {
            return Ok(Some(header));
        }
        if header.end <= pos {
            return Ok(None);
        }
        pos = header.end;
    }
    Ok(None)
}

/// Raw creation time in seconds since 1904, `None` when absent or zero.
pub(crate) fn mvhd_creation_time<R: Read + Seek>(r: &mut R, len: u64) -> io::Result<Option<u64>> {
    let Some(moov) = find_child(r, 0, len, b"moov")? else {
        return Ok(None);
    };
    let Some(mvhd) = find_child(r, moov.start + moov.header_len, moov.end, b"mvhd")? else {
        return Ok(None);
    };

    r.seek(SeekFrom::Start(mvhd.start + mvhd.header_len))?;
    let mut version_flags = [0u8; 4];
    r.read_exact(&mut version_flags)?;

    let created = if version_flags[0] == 1 {
        let mut b = [0u8; 8];
        r.read_exact(&mut b)?;
        u64::from_be_bytes(b)
    } else {
        let mut b = [0u8; 4];
        r.read_exact(&mut b)?;
        u64::from(u32::from_be_bytes(b))
    };

    Ok((created != 0).then_some(created))
}

fn to_local(secs_since_1904: u64) -> Option<NaiveDateTime> {
    let unix = i64::try_from(secs_since_1904).ok()? - QUICKTIME_EPOCH_OFFSET;
    let utc = chrono::DateTime::from_timestamp(unix, 0)?;
    Some(utc.with_timezone(&chrono::Local).naive_local())
}

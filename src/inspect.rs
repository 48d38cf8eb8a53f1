//! Record-level listing of a single chunk file.
//!
//! Unlike the cursor, which refuses to read anything past a chunk's known
//! write offset, this walks the raw file and reports where the record
//! stream stops making sense: a trailing partial record left by a crash, or
//! a header that cannot be decoded.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use ts_buffer::{SampleFlags, SampleHeader, SAMPLE_HEADER_LENGTH};

#[derive(Debug, Clone, Serialize)]
pub struct RecordInfo {
    pub index: usize,
    pub offset: u64,
    pub size: u32,
    pub flags: Vec<&'static str>,
    pub timestamp_us: i64,
}

/// Where and why the record stream ended early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tail {
    /// Fewer bytes remain than the next record needs.
    Partial { offset: u64, available: u64, needed: u64 },
    /// The header at `offset` is not a valid record.
    Corrupt { offset: u64, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkReport {
    pub path: PathBuf,
    pub byte_len: u64,
    /// Bytes covered by complete records.
    pub valid_len: u64,
    pub record_count: usize,
    pub key_frames: usize,
    pub first_timestamp_us: Option<i64>,
    pub last_timestamp_us: Option<i64>,
    /// At most `limit` records when a limit was given.
    pub records: Vec<RecordInfo>,
    pub tail: Option<Tail>,
}

pub fn flag_names(flags: SampleFlags) -> Vec<&'static str> {
    let mut names = Vec::new();
    if flags.is_key_frame() {
        names.push("key_frame");
    }
    if flags.is_decode_only() {
        names.push("decode_only");
    }
    if flags.is_encrypted() {
        names.push("encrypted");
    }
    names
}

/// Walk every record in `path`. Payloads larger than `max_sample_size` are
/// reported as a corrupt tail.
pub fn inspect_file(
    path: &Path,
    max_sample_size: u32,
    limit: Option<usize>,
) -> Result<ChunkReport> {
    let file =
        File::open(path).with_context(|| format!("Failed to open chunk file: {:?}", path))?;
    let byte_len = file
        .metadata()
        .with_context(|| format!("Failed to stat chunk file: {:?}", path))?
        .len();
    let mut reader = BufReader::new(file);

    let mut report = ChunkReport {
        path: path.to_path_buf(),
        byte_len,
        valid_len: 0,
        record_count: 0,
        key_frames: 0,
        first_timestamp_us: None,
        last_timestamp_us: None,
        records: Vec::new(),
        tail: None,
    };

    let mut offset = 0u64;
    while offset < byte_len {
        let available = byte_len - offset;
        if available < SAMPLE_HEADER_LENGTH {
            report.tail = Some(Tail::Partial {
                offset,
                available,
                needed: SAMPLE_HEADER_LENGTH,
            });
            break;
        }

        let mut buf = [0u8; SAMPLE_HEADER_LENGTH as usize];
        reader
            .read_exact(&mut buf)
            .with_context(|| format!("Failed to read header at offset {offset}"))?;

        let header = match SampleHeader::decode(&buf, offset) {
            Ok(header) => header,
            Err(e) => {
                report.tail = Some(Tail::Corrupt {
                    offset,
                    reason: e.to_string(),
                });
                break;
            }
        };
        if header.size > max_sample_size {
            report.tail = Some(Tail::Corrupt {
                offset,
                reason: format!("sample size {} exceeds limit {max_sample_size}", header.size),
            });
            break;
        }
        if header.record_len() > available {
            report.tail = Some(Tail::Partial {
                offset,
                available,
                needed: header.record_len(),
            });
            break;
        }

        reader
            .seek_relative(i64::from(header.size))
            .with_context(|| format!("Failed to skip payload at offset {offset}"))?;

        if report.records.len() < limit.unwrap_or(usize::MAX) {
            report.records.push(RecordInfo {
                index: report.record_count,
                offset,
                size: header.size,
                flags: flag_names(header.flags),
                timestamp_us: header.timestamp_us,
            });
        }
        report.record_count += 1;
        if header.flags.is_key_frame() {
            report.key_frames += 1;
        }
        report.first_timestamp_us.get_or_insert(header.timestamp_us);
        report.last_timestamp_us = Some(header.timestamp_us);

        offset += header.record_len();
        report.valid_len = offset;
    }

    tracing::debug!(
        path = %path.display(),
        records = report.record_count,
        valid_len = report.valid_len,
        byte_len,
        "inspected chunk file"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use ts_buffer::Sample;

    fn record(flags: SampleFlags, ts: i64, payload: &[u8]) -> Vec<u8> {
        let sample = Sample::new(flags, ts, payload);
        let mut out = SampleHeader::for_sample(&sample).unwrap().encode().to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn write_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn lists_complete_records() {
        let mut bytes = record(SampleFlags::KEY_FRAME, 0, b"abcdefghij");
        bytes.extend(record(SampleFlags::NONE, 1_000, &[0u8; 25]));
        bytes.extend(record(SampleFlags::ENCRYPTED, 2_000, &[]));
        let file = write_file(&bytes);

        let report = inspect_file(file.path(), 1024, None).unwrap();
        assert_eq!(report.record_count, 3);
        assert_eq!(report.byte_len, 83);
        assert_eq!(report.valid_len, 83);
        assert_eq!(report.key_frames, 1);
        assert_eq!(report.first_timestamp_us, Some(0));
        assert_eq!(report.last_timestamp_us, Some(2_000));
        assert_eq!(report.records[1].offset, 26);
        assert_eq!(report.records[2].offset, 67);
        assert_eq!(report.records[2].flags, vec!["encrypted"]);
        assert!(report.tail.is_none());
    }

    #[test]
    fn trailing_partial_payload_is_reported() {
        let mut bytes = record(SampleFlags::KEY_FRAME, 0, b"abcdefghij");
        let mut torn = record(SampleFlags::NONE, 1_000, &[7u8; 40]);
        torn.truncate(30);
        bytes.extend(torn);
        let file = write_file(&bytes);

        let report = inspect_file(file.path(), 1024, None).unwrap();
        assert_eq!(report.record_count, 1);
        assert_eq!(report.valid_len, 26);
        assert_eq!(
            report.tail,
            Some(Tail::Partial {
                offset: 26,
                available: 30,
                needed: 56
            })
        );
    }

    #[test]
    fn trailing_partial_header_is_reported() {
        let mut bytes = record(SampleFlags::NONE, 0, b"x");
        bytes.extend_from_slice(&[0, 0, 0]);
        let file = write_file(&bytes);

        let report = inspect_file(file.path(), 1024, None).unwrap();
        assert_eq!(report.record_count, 1);
        assert!(matches!(report.tail, Some(Tail::Partial { offset: 17, available: 3, .. })));
    }

    #[test]
    fn negative_size_is_corrupt() {
        let mut bytes = record(SampleFlags::NONE, 0, b"ok");
        bytes.extend_from_slice(&(-5i32).to_be_bytes());
        bytes.extend_from_slice(&[0u8; 12]);
        let file = write_file(&bytes);

        let report = inspect_file(file.path(), 1024, None).unwrap();
        assert_eq!(report.record_count, 1);
        assert!(matches!(report.tail, Some(Tail::Corrupt { offset: 18, .. })));
    }

    #[test]
    fn limit_caps_listing_not_summary() {
        let mut bytes = Vec::new();
        for i in 0..10 {
            bytes.extend(record(SampleFlags::NONE, i * 100, &[i as u8; 3]));
        }
        let file = write_file(&bytes);

        let report = inspect_file(file.path(), 1024, Some(4)).unwrap();
        assert_eq!(report.records.len(), 4);
        assert_eq!(report.record_count, 10);
        assert_eq!(report.last_timestamp_us, Some(900));
    }

    #[test]
    fn empty_file_has_no_records() {
        let file = write_file(&[]);
        let report = inspect_file(file.path(), 1024, None).unwrap();
        assert_eq!(report.record_count, 0);
        assert!(report.first_timestamp_us.is_none());
        assert!(report.tail.is_none());
    }
}

//! Archive extraction.
//!
//! Turns an uploaded zip archive into an ordered list of [`ArchiveEntry`]
//! values ready to be uploaded. Entry paths are normalized into object keys:
//! directory markers are dropped, unsafe paths are rejected, and an optional
//! common root folder is stripped.

use crate::DEFAULT_CONTENT_TYPE;
use crate::error::ExtractError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Cursor, Read};

/// One file extracted from an archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// POSIX-style relative path, used verbatim as the object key.
    pub relative_path: String,
    /// File content.
    pub content: Bytes,
    /// MIME type inferred from the file extension.
    pub content_type: String,
}

impl ArchiveEntry {
    /// Create an entry, inferring its content type from the path.
    pub fn new(relative_path: impl Into<String>, content: Bytes) -> Self {
        let relative_path = relative_path.into();
        let content_type = content_type_for(&relative_path).to_string();
        Self {
            relative_path,
            content,
            content_type,
        }
    }

    /// Object key for this entry.
    pub fn key(&self) -> &str {
        &self.relative_path
    }
}

/// Infer a content type from a file name, defaulting to a generic binary type.
pub fn content_type_for(path: &str) -> &'static str {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// How the leading path segment of archive entries is handled.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RootStrip {
    /// Strip the first segment only when every file lives under the same
    /// top-level folder. Archives without a common root are kept as-is.
    #[default]
    Auto,
    /// Always drop the first segment. Files at the archive root are skipped.
    Always,
    /// Keep paths verbatim.
    Never,
}

/// Limits enforced while extracting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractLimits {
    /// Maximum size of the compressed archive.
    pub max_archive_bytes: u64,
    /// Maximum total size of all decompressed files.
    pub max_extracted_bytes: u64,
    /// Maximum number of entries (files and directories) in the archive.
    pub max_entries: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_archive_bytes: crate::DEFAULT_MAX_ARCHIVE_BYTES,
            max_extracted_bytes: crate::DEFAULT_MAX_EXTRACTED_BYTES,
            max_entries: crate::DEFAULT_MAX_ENTRIES,
        }
    }
}

/// A file read from the archive before root stripping.
struct RawEntry {
    segments: Vec<String>,
    content: Bytes,
}

/// Extract a zip archive into upload entries.
///
/// Entries are returned in archive order. When two entries normalize to the
/// same key, the later content wins and the entry keeps the position of the
/// first occurrence.
///
/// # Errors
///
/// - [`ExtractError::TooLarge`] before any parsing if the archive exceeds the limit
/// - [`ExtractError::InvalidArchive`] on corrupt or unsupported input
/// - [`ExtractError::UnsafePath`] for absolute paths or `..` segments
/// - [`ExtractError::LimitExceeded`] when entry count or decompressed size is too large
/// - [`ExtractError::Empty`] when nothing uploadable remains
pub fn extract(
    archive: &[u8],
    limits: &ExtractLimits,
    root_strip: RootStrip,
) -> Result<Vec<ArchiveEntry>, ExtractError> {
    let size = archive.len() as u64;
    if size > limits.max_archive_bytes {
        return Err(ExtractError::TooLarge {
            size,
            max: limits.max_archive_bytes,
        });
    }

    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| ExtractError::InvalidArchive(e.to_string()))?;

    if zip.len() > limits.max_entries {
        return Err(ExtractError::LimitExceeded(format!(
            "{} entries (max: {})",
            zip.len(),
            limits.max_entries
        )));
    }

    let mut raw = Vec::new();
    let mut extracted: u64 = 0;

    for index in 0..zip.len() {
        let mut file = zip
            .by_index(index)
            .map_err(|e| ExtractError::InvalidArchive(e.to_string()))?;
        let name = file.name().to_string();

        // Directory markers carry no content
        if file.is_dir() || name.ends_with('/') {
            continue;
        }

        let segments = normalize_segments(&name)?;
        if segments.is_empty() {
            continue;
        }

        let remaining = limits.max_extracted_bytes.saturating_sub(extracted);
        let mut buf = Vec::with_capacity(initial_capacity(
            file.size(),
            file.compressed_size(),
            remaining,
        ));
        (&mut file)
            .take(remaining.saturating_add(1))
            .read_to_end(&mut buf)
            .map_err(|e| ExtractError::InvalidArchive(format!("{name}: {e}")))?;

        let read = buf.len() as u64;
        if read > remaining {
            return Err(ExtractError::LimitExceeded(format!(
                "decompressed content exceeds {} bytes",
                limits.max_extracted_bytes
            )));
        }
        extracted += read;
        buf.shrink_to_fit();

        raw.push(RawEntry {
            segments,
            content: Bytes::from(buf),
        });
    }

    strip_root(&mut raw, root_strip);

    let entries = collapse_duplicates(raw);
    if entries.is_empty() {
        return Err(ExtractError::Empty);
    }

    tracing::debug!(
        entries = entries.len(),
        extracted_bytes = extracted,
        "Archive extracted"
    );

    Ok(entries)
}

/// Upper bound on the buffer reserved up front for one entry.
const MAX_INITIAL_CAPACITY: u64 = 64 * 1024;

/// Expansion assumed when sizing a buffer from the compressed size.
const ASSUMED_RATIO: u64 = 8;

/// Buffer size to reserve before reading an entry.
///
/// The declared size comes from the archive headers and is not trusted;
/// the buffer grows as bytes actually arrive.
fn initial_capacity(declared: u64, compressed: u64, remaining: u64) -> usize {
    let bound = declared
        .min(remaining)
        .min(compressed.saturating_mul(ASSUMED_RATIO))
        .min(MAX_INITIAL_CAPACITY);
    usize::try_from(bound).unwrap_or(0)
}

/// Split an archive path into safe key segments.
///
/// Empty and `.` segments are dropped. Absolute paths, `..` segments,
/// backslashes and NUL bytes are rejected.
pub fn normalize_segments(name: &str) -> Result<Vec<String>, ExtractError> {
    if name.starts_with('/') || name.contains('\\') || name.contains('\0') {
        return Err(ExtractError::UnsafePath(name.to_string()));
    }

    let mut segments = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(ExtractError::UnsafePath(name.to_string())),
            other => segments.push(other.to_string()),
        }
    }
    Ok(segments)
}

fn strip_root(entries: &mut Vec<RawEntry>, mode: RootStrip) {
    match mode {
        RootStrip::Never => {}
        RootStrip::Auto => {
            if let Some(root) = common_root(entries) {
                tracing::debug!(root = %root, "Stripping common archive root");
                for entry in entries.iter_mut() {
                    entry.segments.remove(0);
                }
            }
        }
        RootStrip::Always => {
            entries.retain_mut(|entry| {
                entry.segments.remove(0);
                if entry.segments.is_empty() {
                    tracing::warn!("Skipping file at archive root while stripping first segment");
                    return false;
                }
                true
            });
        }
    }
}

/// The shared top-level folder, if every file lives below the same one.
fn common_root(entries: &[RawEntry]) -> Option<String> {
    let root = entries.first()?.segments.first()?;
    entries
        .iter()
        .all(|entry| entry.segments.len() >= 2 && entry.segments[0] == *root)
        .then(|| root.clone())
}

fn collapse_duplicates(raw: Vec<RawEntry>) -> Vec<ArchiveEntry> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(raw.len());
    let mut entries: Vec<ArchiveEntry> = Vec::with_capacity(raw.len());

    for entry in raw {
        let key = entry.segments.join("/");
        match positions.get(&key) {
            Some(&position) => {
                tracing::warn!(key = %key, "Duplicate archive path, keeping the later entry");
                entries[position].content = entry.content;
            }
            None => {
                positions.insert(key.clone(), entries.len());
                entries.push(ArchiveEntry::new(key, entry.content));
            }
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, data) in files {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    fn keys(entries: &[ArchiveEntry]) -> Vec<&str> {
        entries.iter().map(ArchiveEntry::key).collect()
    }

    #[test]
    fn test_strips_common_root_folder() {
        let archive = build_zip(&[
            ("root/", b""),
            ("root/index.html", b"<html></html>"),
            ("root/assets/", b""),
            ("root/assets/app.js", b"console.log(1)"),
        ]);

        let entries = extract(&archive, &ExtractLimits::default(), RootStrip::Auto).unwrap();
        assert_eq!(keys(&entries), vec!["index.html", "assets/app.js"]);
        assert_eq!(entries[0].content, Bytes::from_static(b"<html></html>"));
        assert_eq!(entries[0].content_type, "text/html");
    }

    #[test]
    fn test_keeps_paths_without_common_root() {
        let archive = build_zip(&[("index.html", b"a"), ("css/site.css", b"b")]);

        let entries = extract(&archive, &ExtractLimits::default(), RootStrip::Auto).unwrap();
        assert_eq!(keys(&entries), vec!["index.html", "css/site.css"]);
    }

    #[test]
    fn test_always_strip_drops_root_level_files() {
        let archive = build_zip(&[("README", b"x"), ("site/index.html", b"y")]);

        let entries = extract(&archive, &ExtractLimits::default(), RootStrip::Always).unwrap();
        assert_eq!(keys(&entries), vec!["index.html"]);
    }

    #[test]
    fn test_never_strip_keeps_root() {
        let archive = build_zip(&[("site/index.html", b"y")]);

        let entries = extract(&archive, &ExtractLimits::default(), RootStrip::Never).unwrap();
        assert_eq!(keys(&entries), vec!["site/index.html"]);
    }

    #[test]
    fn test_rejects_parent_directory_segments() {
        let archive = build_zip(&[("root/../../etc/passwd", b"x"), ("root/ok.txt", b"y")]);

        let err = extract(&archive, &ExtractLimits::default(), RootStrip::Auto).unwrap_err();
        assert!(matches!(err, ExtractError::UnsafePath(_)), "got {err:?}");
    }

    #[test]
    fn test_normalize_segments_sanitizes_and_rejects() {
        assert_eq!(
            normalize_segments("a//./b/c.txt").unwrap(),
            vec!["a", "b", "c.txt"]
        );
        assert!(normalize_segments("/etc/passwd").is_err());
        assert!(normalize_segments("a/../b").is_err());
        assert!(normalize_segments("a\\b").is_err());
    }

    #[test]
    fn test_rejects_oversized_archive_before_parsing() {
        let limits = ExtractLimits {
            max_archive_bytes: 4,
            ..ExtractLimits::default()
        };

        // Not a zip at all: the size check must fire first
        let err = extract(b"definitely not a zip", &limits, RootStrip::Auto).unwrap_err();
        assert_eq!(err, ExtractError::TooLarge { size: 20, max: 4 });
    }

    #[test]
    fn test_rejects_corrupt_archive() {
        let err = extract(b"PK\x03\x04garbage", &ExtractLimits::default(), RootStrip::Auto)
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidArchive(_)));
    }

    #[test]
    fn test_directory_only_archive_is_empty() {
        let archive = build_zip(&[("root/", b""), ("root/sub/", b"")]);

        let err = extract(&archive, &ExtractLimits::default(), RootStrip::Auto).unwrap_err();
        assert_eq!(err, ExtractError::Empty);
    }

    #[test]
    fn test_enforces_decompressed_size_limit() {
        let big = vec![0u8; 4096];
        let archive = build_zip(&[("root/a.bin", &big), ("root/b.bin", &big)]);
        let limits = ExtractLimits {
            max_extracted_bytes: 6000,
            ..ExtractLimits::default()
        };

        let err = extract(&archive, &limits, RootStrip::Auto).unwrap_err();
        assert!(matches!(err, ExtractError::LimitExceeded(_)));
    }

    #[test]
    fn test_enforces_entry_count_limit() {
        let archive = build_zip(&[("a", b"1"), ("b", b"2"), ("c", b"3")]);
        let limits = ExtractLimits {
            max_entries: 2,
            ..ExtractLimits::default()
        };

        let err = extract(&archive, &limits, RootStrip::Auto).unwrap_err();
        assert!(matches!(err, ExtractError::LimitExceeded(_)));
    }

    #[test]
    fn test_duplicate_keys_keep_first_position_and_last_content() {
        let archive = build_zip(&[
            ("root/a.txt", b"first"),
            ("root/b.txt", b"other"),
            ("root/./a.txt", b"second"),
        ]);

        let entries = extract(&archive, &ExtractLimits::default(), RootStrip::Auto).unwrap();
        assert_eq!(keys(&entries), vec!["a.txt", "b.txt"]);
        assert_eq!(entries[0].content, Bytes::from_static(b"second"));
    }

    #[test]
    fn test_content_types_from_extension() {
        assert_eq!(content_type_for("index.html"), "text/html");
        assert_eq!(content_type_for("style/site.css"), "text/css");
        assert_eq!(content_type_for("img/logo.png"), "image/png");
        assert_eq!(content_type_for("LICENSE"), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for("data.zzunknownzz"), DEFAULT_CONTENT_TYPE);
    }

    /// Rewrite the uncompressed size of every local and central header.
    fn patch_declared_sizes(archive: &mut [u8], declared: u32) {
        let mut i = 0;
        while i + 4 <= archive.len() {
            let offset = match &archive[i..i + 4] {
                [0x50, 0x4b, 0x03, 0x04] => Some(22),
                [0x50, 0x4b, 0x01, 0x02] => Some(24),
                _ => None,
            };
            if let Some(offset) = offset {
                archive[i + offset..i + offset + 4].copy_from_slice(&declared.to_le_bytes());
            }
            i += 1;
        }
    }

    #[test]
    fn test_initial_capacity_ignores_declared_size() {
        assert_eq!(initial_capacity(0x7fff_ffff, 2, u64::MAX), 16);
        assert_eq!(initial_capacity(0x7fff_ffff, 1 << 30, u64::MAX), 64 * 1024);
        assert_eq!(initial_capacity(10, 1 << 20, u64::MAX), 10);
        assert_eq!(initial_capacity(1 << 20, 1 << 20, 100), 100);
    }

    #[test]
    fn test_inflated_size_headers_do_not_change_content() {
        let names: Vec<String> = (0..20).map(|i| format!("f{i:02}.txt")).collect();
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let stored = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for name in &names {
            writer.start_file(name.as_str(), stored).unwrap();
            writer.write_all(b"ok").unwrap();
        }
        let mut archive = writer.finish().unwrap().into_inner();
        patch_declared_sizes(&mut archive, 0x7fff_ffff);

        // The reader may reject the mismatch; it must never size buffers from it.
        match extract(&archive, &ExtractLimits::default(), RootStrip::Never) {
            Ok(entries) => {
                assert_eq!(entries.len(), 20);
                assert!(entries.iter().all(|e| e.content == Bytes::from_static(b"ok")));
                assert!(entries.iter().all(|e| e.content.len() == 2));
            }
            Err(err) => assert!(matches!(err, ExtractError::InvalidArchive(_)), "{err}"),
        }
    }
}

//! File I/O with encoding detection and atomic writes
//!
//! Reads are size-limited and decode UTF-8 (with or without BOM) and
//! BOM-marked UTF-16. Writes go through a temp file in the target directory
//! followed by a rename, so an interrupted export never leaves half a PDF.

use crate::error::{FileError, FileResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Maximum file size allowed (10 MB)
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Detected encoding of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileEncoding {
    /// UTF-8 without BOM
    #[default]
    Utf8,
    /// UTF-8 with BOM
    Utf8Bom,
    /// UTF-16 Little Endian with BOM
    Utf16Le,
    /// UTF-16 Big Endian with BOM
    Utf16Be,
    /// Not valid UTF-8, decoded lossily
    Unknown,
}

impl FileEncoding {
    /// Get display name for the encoding
    pub fn display_name(&self) -> &'static str {
        match self {
            FileEncoding::Utf8 => "UTF-8",
            FileEncoding::Utf8Bom => "UTF-8 with BOM",
            FileEncoding::Utf16Le => "UTF-16 LE",
            FileEncoding::Utf16Be => "UTF-16 BE",
            FileEncoding::Unknown => "Unknown",
        }
    }
}

/// Text decoded from a file
#[derive(Debug, Clone)]
pub struct DecodedText {
    /// The file content as a string
    pub content: String,
    /// Detected encoding
    pub encoding: FileEncoding,
    /// Original file size in bytes
    pub size_bytes: u64,
    /// Whether replacement characters were substituted
    pub lossy: bool,
}

fn detect_encoding(bytes: &[u8]) -> FileEncoding {
    match bytes {
        [0xEF, 0xBB, 0xBF, ..] => FileEncoding::Utf8Bom,
        [0xFF, 0xFE, ..] => FileEncoding::Utf16Le,
        [0xFE, 0xFF, ..] => FileEncoding::Utf16Be,
        _ if std::str::from_utf8(bytes).is_ok() => FileEncoding::Utf8,
        _ => FileEncoding::Unknown,
    }
}

fn decode_utf16(bytes: &[u8], from_bytes: fn([u8; 2]) -> u16) -> (String, bool) {
    let mut lossy = bytes.len() % 2 != 0;
    let units = bytes.chunks_exact(2).map(|pair| from_bytes([pair[0], pair[1]]));
    let text = char::decode_utf16(units)
        .map(|unit| {
            unit.unwrap_or_else(|_| {
                lossy = true;
                char::REPLACEMENT_CHARACTER
            })
        })
        .collect();
    (text, lossy)
}

fn decode_utf8(bytes: &[u8]) -> (String, bool) {
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), false),
        Err(_) => (String::from_utf8_lossy(bytes).into_owned(), true),
    }
}

/// Decode raw file bytes into text
pub fn decode_bytes(bytes: &[u8]) -> DecodedText {
    let encoding = detect_encoding(bytes);
    let (content, lossy) = match encoding {
        FileEncoding::Utf8 | FileEncoding::Unknown => decode_utf8(bytes),
        FileEncoding::Utf8Bom => decode_utf8(&bytes[3..]),
        FileEncoding::Utf16Le => decode_utf16(&bytes[2..], u16::from_le_bytes),
        FileEncoding::Utf16Be => decode_utf16(&bytes[2..], u16::from_be_bytes),
    };

    DecodedText {
        content,
        encoding,
        size_bytes: bytes.len() as u64,
        lossy,
    }
}

/// Read a text file with encoding detection
pub async fn read_file(path: impl AsRef<Path>) -> FileResult<DecodedText> {
    let path = path.as_ref();

    let metadata = tokio::fs::metadata(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FileError::NotFound(path.to_path_buf()),
        _ => FileError::ReadError {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    if metadata.len() > MAX_FILE_SIZE {
        return Err(FileError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: MAX_FILE_SIZE,
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| FileError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let decoded = decode_bytes(&bytes);
    if decoded.lossy {
        log::warn!(
            "{} is not clean {}; invalid sequences were replaced",
            path.display(),
            decoded.encoding.display_name()
        );
    }
    Ok(decoded)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let stamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    parent.join(format!(".{}.{}.tmp", filename, stamp))
}

/// Write bytes to a file using a temp file and rename
pub async fn write_file_atomic(path: impl AsRef<Path>, content: &[u8]) -> FileResult<()> {
    let path = path.as_ref();
    let temp_path = temp_path_for(path);

    let write_result = async {
        let mut file = tokio::fs::File::create(&temp_path).await?;
        tokio::io::AsyncWriteExt::write_all(&mut file, content).await?;
        tokio::io::AsyncWriteExt::flush(&mut file).await?;
        file.sync_all().await?;
        tokio::fs::rename(&temp_path, path).await
    }
    .await;

    if let Err(e) = write_result {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(FileError::WriteError {
            path: path.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

/// Blocking variant of [`write_file_atomic`]
pub fn write_file_atomic_sync(path: impl AsRef<Path>, content: &[u8]) -> FileResult<()> {
    let path = path.as_ref();
    let temp_path = temp_path_for(path);

    let write_result = (|| {
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.flush()?;
        file.sync_all()?;
        std::fs::rename(&temp_path, path)
    })();

    if let Err(e) = write_result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(FileError::WriteError {
            path: path.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

/// Ensure a directory exists
pub async fn ensure_dir(path: impl AsRef<Path>) -> FileResult<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| FileError::DirectoryError {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_encoding_utf8() {
        assert_eq!(detect_encoding("Hello, world!".as_bytes()), FileEncoding::Utf8);
    }

    #[test]
    fn test_decode_utf8_bom_strips_marker() {
        let decoded = decode_bytes(&[0xEF, 0xBB, 0xBF, b'H', b'i']);
        assert_eq!(decoded.encoding, FileEncoding::Utf8Bom);
        assert_eq!(decoded.content, "Hi");
        assert!(!decoded.lossy);
    }

    #[test]
    fn test_decode_utf16_le() {
        let decoded = decode_bytes(&[0xFF, 0xFE, b'#', 0, b' ', 0, b'A', 0]);
        assert_eq!(decoded.encoding, FileEncoding::Utf16Le);
        assert_eq!(decoded.content, "# A");
    }

    #[test]
    fn test_decode_utf16_be() {
        let decoded = decode_bytes(&[0xFE, 0xFF, 0, b'H', 0, b'i']);
        assert_eq!(decoded.encoding, FileEncoding::Utf16Be);
        assert_eq!(decoded.content, "Hi");
    }

    #[test]
    fn test_decode_invalid_utf8_is_lossy() {
        let decoded = decode_bytes(&[b'a', 0xC3, 0x28]);
        assert_eq!(decoded.encoding, FileEncoding::Unknown);
        assert!(decoded.lossy);
        assert!(decoded.content.starts_with('a'));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_file(dir.path().join("missing.md")).await;
        assert!(matches!(result, Err(FileError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_atomic_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        write_file_atomic(&path, b"# Title").await.unwrap();
        let decoded = read_file(&path).await.unwrap();
        assert_eq!(decoded.content, "# Title");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_atomic_write_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no").join("such").join("file.pdf");
        assert!(matches!(
            write_file_atomic_sync(&path, b"x"),
            Err(FileError::WriteError { .. })
        ));
    }
}

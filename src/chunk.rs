//! The chunk reader: a contiguous byte window `[offset, offset + max_bytes)`, bounded by EOF.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Mutex;

/// The file abstraction the engine reads chunks from.
///
/// `read_range` takes `&self`, not `&mut self`, because the engine only ever holds a shared
/// reference to the source (it owns the offset itself; the source must not need its own cursor
/// to be externally synchronized).
pub trait UploadSource: Send + Sync {
    /// Total length of the file in bytes, captured once at session start.
    fn length(&self) -> io::Result<u64>;

    /// Read up to `len` bytes starting at `offset`. Returns fewer than `len` bytes only at EOF.
    fn read_range(&self, offset: u64, len: u64) -> io::Result<Vec<u8>>;

    /// The path used to derive a fingerprint and a default metadata filename.
    fn path(&self) -> &str;
}

/// Read the chunk `[offset, min(offset + max_bytes, file_size))` from `source`.
///
/// Returns an empty vector iff `offset == file_size`. Does not advance any cursor; the engine
/// owns `offset`.
pub fn read_chunk(source: &dyn UploadSource, offset: u64, max_bytes: u64) -> io::Result<Vec<u8>> {
    let file_size = source.length()?;
    let end = (offset + max_bytes).min(file_size);
    let len = end.saturating_sub(offset);
    source.read_range(offset, len)
}

/// An [`UploadSource`] backed by a plain [`std::fs::File`].
///
/// Reads are serialized behind a mutex so that `seek` + `read` can be used to implement ranged
/// reads without requiring exclusive (`&mut self`) access.
pub struct FileSource {
    path: String,
    file: Mutex<File>,
    len: u64,
}

impl FileSource {
    pub fn open(path: impl Into<String>) -> io::Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        Ok(Self { path, file: Mutex::new(file), len })
    }
}

impl UploadSource for FileSource {
    fn length(&self) -> io::Result<u64> {
        Ok(self.len)
    }

    fn read_range(&self, offset: u64, len: u64) -> io::Result<Vec<u8>> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len as usize];
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct BytesSource(Vec<u8>);

    impl UploadSource for BytesSource {
        fn length(&self) -> io::Result<u64> {
            Ok(self.0.len() as u64)
        }

        fn read_range(&self, offset: u64, len: u64) -> io::Result<Vec<u8>> {
            let start = (offset as usize).min(self.0.len());
            let end = (start + len as usize).min(self.0.len());
            Ok(self.0[start..end].to_vec())
        }

        fn path(&self) -> &str {
            "in-memory"
        }
    }

    #[test]
    fn chunks_cover_exactly_the_file() {
        let src = BytesSource(b"HELLOWORLD".to_vec());
        assert_eq!(read_chunk(&src, 0, 4).unwrap(), b"HELL");
        assert_eq!(read_chunk(&src, 4, 4).unwrap(), b"OWOR");
        assert_eq!(read_chunk(&src, 8, 4).unwrap(), b"LD");
        assert_eq!(read_chunk(&src, 10, 4).unwrap(), b"");
    }

    #[test]
    fn file_source_reads_ranges() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();
        tmp.flush().unwrap();
        let source = FileSource::open(tmp.path().to_str().unwrap()).unwrap();
        assert_eq!(source.length().unwrap(), 10);
        assert_eq!(read_chunk(&source, 3, 4).unwrap(), b"3456");
        assert_eq!(read_chunk(&source, 8, 4).unwrap(), b"89");
        assert_eq!(read_chunk(&source, 10, 4).unwrap(), b"");
    }

    #[test]
    fn file_source_reads_are_order_independent() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"abcdefgh").unwrap();
        tmp.flush().unwrap();
        let source = FileSource::open(tmp.path().to_str().unwrap()).unwrap();
        // Read the tail before the head; read_range must not depend on a forward-only cursor.
        assert_eq!(read_chunk(&source, 4, 4).unwrap(), b"efgh");
        assert_eq!(read_chunk(&source, 0, 4).unwrap(), b"abcd");
    }
}

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::SealingWrite;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Buffered file writer that is flushed and synced to disk on `seal()`.
pub struct FileWriter {
    file: Option<BufWriter<File>>,
}

impl FileWriter {
    pub fn new(file: File) -> FileWriter {
        FileWriter::with_capacity(DEFAULT_BUFFER_SIZE, file)
    }

    pub fn with_capacity(capacity: usize, file: File) -> FileWriter {
        FileWriter {
            file: Some(BufWriter::with_capacity(capacity, file)),
        }
    }

    /// Creates a new file at `path`, failing if it already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<FileWriter> {
        Ok(FileWriter::new(File::create_new(path)?))
    }

    pub fn create_with_capacity<P: AsRef<Path>>(
        path: P,
        capacity: usize,
    ) -> std::io::Result<FileWriter> {
        Ok(FileWriter::with_capacity(capacity, File::create_new(path)?))
    }

    pub fn is_sealed(&self) -> bool {
        self.file.is_none()
    }
}

impl SealingWrite for FileWriter {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.file
            .as_mut()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?
            .write_all(buf)
    }

    fn seal(&mut self) -> std::io::Result<()> {
        let file = self
            .file
            .take()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        let file = file.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::SealingWrite;

    use super::FileWriter;

    #[test]
    fn test_file_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postings.bin");
        let mut writer = FileWriter::create(&path).unwrap();
        writer.write_all(b"abcd").unwrap();
        writer.write_all(b"123").unwrap();
        writer.seal().unwrap();
        assert!(writer.is_sealed());
        assert!(writer.write_all(b"x").is_err());
        assert!(writer.seal().is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"abcd123");
    }

    #[test]
    fn test_file_writer_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexicon.bin");
        std::fs::write(&path, b"old").unwrap();
        assert!(FileWriter::create(&path).is_err());
    }
}

//! `std::io` view of an open CD file

use std::io::{self, Read, Seek, SeekFrom};

use log::warn;

use super::drive::CdDrive;
use super::files::{CdFileSystem, FileHandle};
use super::CdError;
use crate::hash::name_hash;

/// Owns one handle of a [`CdFileSystem`] and closes it on drop.
pub struct CdStream<'a, D: CdDrive> {
    fs: &'a mut CdFileSystem<D>,
    handle: FileHandle,
}

impl<D: CdDrive> std::fmt::Debug for CdStream<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdStream").field("handle", &self.handle).finish()
    }
}

fn to_io(err: CdError) -> io::Error {
    match err {
        CdError::Io(err) => err,
        CdError::NotFound(_) => io::Error::new(io::ErrorKind::NotFound, err),
        other => io::Error::other(other),
    }
}

impl<'a, D: CdDrive> CdStream<'a, D> {
    pub fn open(fs: &'a mut CdFileSystem<D>, path: &str) -> Result<Self, CdError> {
        let (handle, _) = fs.open(path)?;
        Ok(Self { fs, handle })
    }

    /// Read-mode `fopen`: a second handle onto a file that is already open
    /// under exactly this name.
    pub fn fopen(fs: &'a mut CdFileSystem<D>, filename: &str, mode: &str) -> Option<Self> {
        if !mode.contains('r') {
            warn!("Unsupported mode in fopen: {}", mode);
            return None;
        }
        let handle = fs.duplicate(name_hash(filename)).ok()?;
        Some(Self { fs, handle })
    }

    pub fn handle(&self) -> FileHandle {
        self.handle
    }

    pub fn len(&self) -> u32 {
        self.fs.size(self.handle).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `fgetc`: `None` at end of file.
    pub fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0];
        match self.fs.read(self.handle, &mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }
}

impl<D: CdDrive> Read for CdStream<'_, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fs.read(self.handle, buf).map_err(to_io)
    }
}

impl<D: CdDrive> Seek for CdStream<'_, D> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => {
                let current = self.fs.tell(self.handle).map_err(to_io)?;
                (current as u64).checked_add_signed(delta)
            }
            SeekFrom::End(delta) => (self.len() as u64).checked_add_signed(delta),
        };
        let target = target
            .and_then(|t| u32::try_from(t).ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "seek out of range"))?;
        self.fs.seek(self.handle, target).map_err(to_io)?;
        Ok(target as u64)
    }
}

impl<D: CdDrive> Drop for CdStream<'_, D> {
    fn drop(&mut self) {
        let _ = self.fs.close(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdrom::DiscImage;
    use crate::config::CdConfig;

    fn fs() -> CdFileSystem<DiscImage> {
        let data: Vec<u8> = (0..3000u32).map(|i| i as u8).collect();
        CdFileSystem::new(DiscImage::new().with_file("PAK0.PAK", &data), &CdConfig::default())
    }

    #[test]
    fn test_read_and_seek() {
        let mut fs = fs();
        let mut stream = CdStream::open(&mut fs, "./id1/pak0.pak").unwrap();
        assert_eq!(stream.len(), 3000);

        assert_eq!(stream.seek(SeekFrom::End(-4)).unwrap(), 2996);
        let mut tail = Vec::new();
        stream.read_to_end(&mut tail).unwrap();
        assert_eq!(tail, [(2996 % 256) as u8, 181, 182, 183]);

        stream.seek(SeekFrom::Start(2040)).unwrap();
        stream.seek(SeekFrom::Current(10)).unwrap();
        assert_eq!(stream.read_byte(), Some((2050 % 256) as u8));
        assert!(stream.seek(SeekFrom::Current(-5000)).is_err());

        stream.seek(SeekFrom::Start(3000)).unwrap();
        assert_eq!(stream.read_byte(), None);
    }

    #[test]
    fn test_drop_closes_handle() {
        let mut fs = fs();
        {
            let _stream = CdStream::open(&mut fs, "pak0.pak").unwrap();
        }
        assert_eq!(fs.open_count(), 0);
    }

    #[test]
    fn test_fopen_duplicates_open_file() {
        let mut fs = fs();
        let (first, _) = fs.open("./id1/pak0.pak").unwrap();
        fs.seek(first, 100).unwrap();
        {
            let mut stream = CdStream::fopen(&mut fs, "./id1/pak0.pak", "rb").unwrap();
            assert_ne!(stream.handle(), first);
            assert_eq!(stream.read_byte(), Some(0));
        }
        assert!(CdStream::fopen(&mut fs, "./id1/pak0.pak", "wb").is_none());
        assert!(CdStream::fopen(&mut fs, "other.pak", "r").is_none());
        assert_eq!(fs.tell(first).unwrap(), 100);
        assert_eq!(fs.open_count(), 1);
    }
}

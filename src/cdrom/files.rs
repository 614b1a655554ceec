use log::{debug, trace, warn};

use super::drive::{CdDrive, DirEntry, SECTOR_SIZE};
use super::CdError;
use crate::config::CdConfig;
use crate::console::ScriptSource;
use crate::fatal;
use crate::hash::name_hash;

/// Index into the handle pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(usize);

impl FileHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

struct CdFile {
    allocated: bool,
    filename_hash: u32,
    cursor_sector: u32,
    cursor_byte: usize,
    entry: DirEntry,
    cache: Box<[u8; SECTOR_SIZE]>,
    cache_valid: bool,
}

impl CdFile {
    fn new() -> Self {
        Self {
            allocated: false,
            filename_hash: 0,
            cursor_sector: 0,
            cursor_byte: 0,
            entry: DirEntry::default(),
            cache: Box::new([0; SECTOR_SIZE]),
            cache_valid: false,
        }
    }

    fn position(&self) -> usize {
        self.cursor_sector as usize * SECTOR_SIZE + self.cursor_byte
    }

    fn advance_sector_if_full(&mut self) {
        if self.cursor_byte >= SECTOR_SIZE {
            self.cursor_sector += 1;
            self.cursor_byte -= SECTOR_SIZE;
            self.cache_valid = false;
        }
    }
}

/// Turn a game path into a disc lookup name: one leading `.` is dropped,
/// only the part after the last `/` is kept, uppercased.
///
/// `./id1/gfx.wad` becomes `GFX.WAD`.
pub fn normalize_path(path: &str) -> String {
    let path = path.strip_prefix('.').unwrap_or(path);
    let base = path.rsplit('/').next().unwrap_or(path);
    base.to_ascii_uppercase()
}

pub struct CdFileSystem<D> {
    drive: D,
    files: Vec<CdFile>,
}

impl<D: CdDrive> CdFileSystem<D> {
    pub fn new(drive: D, config: &CdConfig) -> Self {
        Self {
            drive,
            files: (0..config.max_files).map(|_| CdFile::new()).collect(),
        }
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    pub fn drive_mut(&mut self) -> &mut D {
        &mut self.drive
    }

    pub fn max_files(&self) -> usize {
        self.files.len()
    }

    pub fn open_count(&self) -> usize {
        self.files.iter().filter(|f| f.allocated).count()
    }

    /// Claim a free handle with its cursor at the start.
    pub fn alloc(&mut self) -> Option<FileHandle> {
        let index = self.files.iter().position(|f| !f.allocated)?;
        let file = &mut self.files[index];
        file.allocated = true;
        file.cursor_sector = 0;
        file.cursor_byte = 0;
        file.cache_valid = false;
        Some(FileHandle(index))
    }

    fn file(&self, handle: FileHandle, op: &str) -> Result<&CdFile, CdError> {
        match self.files.get(handle.0) {
            Some(file) if file.allocated => Ok(file),
            _ => {
                warn!("Invalid file handle passed to {}", op);
                Err(CdError::InvalidHandle)
            }
        }
    }

    fn file_mut(&mut self, handle: FileHandle, op: &str) -> Result<&mut CdFile, CdError> {
        match self.files.get_mut(handle.0) {
            Some(file) if file.allocated => Ok(file),
            _ => {
                warn!("Invalid file handle passed to {}", op);
                Err(CdError::InvalidHandle)
            }
        }
    }

    /// Open a file for reading, returning its handle and size.
    ///
    /// Running out of handles here is fatal.
    pub fn open(&mut self, path: &str) -> Result<(FileHandle, u32), CdError> {
        let name = normalize_path(path);
        let Some(handle) = self.alloc() else {
            fatal!("All out of CD file handles ({} open)", self.files.len());
        };
        debug!("open {:?} -> {} (handle {})", path, name, handle.0);

        let Some(entry) = self.drive.search_file(&name) else {
            warn!("Failed to open file {}", path);
            self.files[handle.0].allocated = false;
            return Err(CdError::NotFound(path.to_string()));
        };

        let size = entry.size;
        let file = &mut self.files[handle.0];
        file.entry = entry;
        file.filename_hash = name_hash(path);
        Ok((handle, size))
    }

    /// Second handle onto a file that is already open under `filename_hash`.
    pub fn duplicate(&mut self, filename_hash: u32) -> Result<FileHandle, CdError> {
        let Some(source) = self
            .files
            .iter()
            .position(|f| f.allocated && f.filename_hash == filename_hash)
        else {
            warn!("duplicate: file {:#010x} not open", filename_hash);
            return Err(CdError::NotFound(format!("{:#010x}", filename_hash)));
        };
        let Some(handle) = self.alloc() else {
            warn!("duplicate: no available file handles");
            return Err(CdError::NoFreeHandles);
        };

        let entry = self.files[source].entry.clone();
        let file = &mut self.files[handle.0];
        file.filename_hash = filename_hash;
        file.entry = entry;
        Ok(handle)
    }

    pub fn seek(&mut self, handle: FileHandle, offset: u32) -> Result<(), CdError> {
        let file = self.file_mut(handle, "seek")?;
        file.cursor_sector = offset / SECTOR_SIZE as u32;
        file.cursor_byte = offset as usize % SECTOR_SIZE;
        file.cache_valid = false;
        trace!(
            "seek {} -> sector {} byte {} (size {})",
            offset,
            file.cursor_sector,
            file.cursor_byte,
            file.entry.size
        );
        Ok(())
    }

    /// Read up to `buf.len()` bytes, stopping at end of file.
    ///
    /// A drive error mid-read is fatal.
    pub fn read(&mut self, handle: FileHandle, buf: &mut [u8]) -> Result<usize, CdError> {
        let file = match self.files.get_mut(handle.0) {
            Some(file) if file.allocated => file,
            _ => {
                warn!("Invalid file handle passed to read");
                return Err(CdError::InvalidHandle);
            }
        };
        let remaining = (file.entry.size as usize).saturating_sub(file.position());
        let count = buf.len().min(remaining);

        if file.cache_valid && file.cursor_byte + count < SECTOR_SIZE {
            trace!("read buffered {}", count);
            buf[..count].copy_from_slice(&file.cache[file.cursor_byte..file.cursor_byte + count]);
            file.cursor_byte += count;
            return Ok(count);
        }

        trace!("read drive {}", count);
        let mut copied = 0;
        while copied < count {
            if !file.cache_valid {
                let lba = file.entry.sector + file.cursor_sector;
                if let Err(err) = self.drive.read_sector(lba, &mut file.cache) {
                    fatal!("Failed to read from CD drive: {}", err);
                }
                file.cache_valid = true;
            }
            let len = (SECTOR_SIZE - file.cursor_byte).min(count - copied);
            buf[copied..copied + len]
                .copy_from_slice(&file.cache[file.cursor_byte..file.cursor_byte + len]);
            copied += len;
            file.cursor_byte += len;
            file.advance_sector_if_full();
        }
        Ok(copied)
    }

    pub fn close(&mut self, handle: FileHandle) -> Result<(), CdError> {
        let file = self.file_mut(handle, "close")?;
        file.allocated = false;
        debug!("close handle {}", handle.0);
        Ok(())
    }

    pub fn size(&self, handle: FileHandle) -> Result<u32, CdError> {
        Ok(self.file(handle, "size")?.entry.size)
    }

    pub fn tell(&self, handle: FileHandle) -> Result<u32, CdError> {
        Ok(self.file(handle, "tell")?.position() as u32)
    }

    /// Whole file contents; the handle is closed again afterwards.
    pub fn read_all(&mut self, path: &str) -> Result<Vec<u8>, CdError> {
        let (handle, size) = self.open(path)?;
        let mut data = vec![0; size as usize];
        let result = self.read(handle, &mut data);
        self.close(handle)?;
        let read = result?;
        data.truncate(read);
        Ok(data)
    }
}

impl<D: CdDrive> ScriptSource for CdFileSystem<D> {
    fn load_script(&mut self, path: &str) -> Option<String> {
        let data = self.read_all(path).ok()?;
        Some(String::from_utf8_lossy(&data).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdrom::DiscImage;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + i / 2048) as u8).collect()
    }

    fn fs_with(data: &[u8]) -> CdFileSystem<DiscImage> {
        let disc = DiscImage::new()
            .with_file("PAK0.PAK", data)
            .with_file("AUTOEXEC.CFG", b"echo booted\n");
        CdFileSystem::new(disc, &CdConfig::default())
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./id1/pak0.pak"), "PAK0.PAK");
        assert_eq!(normalize_path("autoexec.cfg"), "AUTOEXEC.CFG");
        assert_eq!(normalize_path(".hidden"), "HIDDEN");
        assert_eq!(normalize_path("dir/"), "");
    }

    #[test]
    fn test_open_and_read_whole_file() {
        let data = pattern(5000);
        let mut fs = fs_with(&data);
        let (handle, size) = fs.open("./id1/pak0.pak").unwrap();
        assert_eq!(size, 5000);
        let mut buf = vec![0; 6000];
        assert_eq!(fs.read(handle, &mut buf).unwrap(), 5000);
        assert_eq!(&buf[..5000], &data[..]);
        assert_eq!(fs.tell(handle).unwrap(), 5000);
        assert_eq!(fs.read(handle, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_seek_read_matches_slice() {
        let data = pattern(3 * SECTOR_SIZE + 100);
        let mut fs = fs_with(&data);
        let (handle, _) = fs.open("pak0.pak").unwrap();
        for &(offset, len) in &[
            (0, 16),
            (2040, 16),
            (2048, 2048),
            (100, 5000),
            (6000, 300),
            (SECTOR_SIZE * 3, 100),
        ] {
            fs.seek(handle, offset as u32).unwrap();
            let mut buf = vec![0; len];
            let read = fs.read(handle, &mut buf).unwrap();
            let end = (offset + len).min(data.len());
            assert_eq!(read, end - offset);
            assert_eq!(&buf[..read], &data[offset..end], "offset {} len {}", offset, len);
        }
    }

    #[test]
    fn test_sequential_reads_carry_into_next_sector() {
        let data = pattern(2 * SECTOR_SIZE);
        let mut fs = fs_with(&data);
        let (handle, _) = fs.open("pak0.pak").unwrap();
        let mut out = Vec::new();
        let mut chunk = [0; 100];
        loop {
            let read = fs.read(handle, &mut chunk).unwrap();
            if read == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..read]);
        }
        assert_eq!(out, data);
        // Each sector is fetched once
        assert_eq!(fs.drive().sector_reads(), 2);
    }

    #[test]
    fn test_open_missing_frees_handle() {
        let mut fs = fs_with(b"");
        assert!(matches!(fs.open("nothere.dat"), Err(CdError::NotFound(_))));
        assert_eq!(fs.open_count(), 0);
    }

    #[test]
    #[should_panic(expected = "All out of CD file handles")]
    fn test_open_exhausted_pool_is_fatal() {
        let mut fs = fs_with(b"x");
        for _ in 0..5 {
            fs.open("pak0.pak").unwrap();
        }
    }

    #[test]
    fn test_duplicate_has_independent_cursor() {
        let data = pattern(4096);
        let mut fs = fs_with(&data);
        let (first, _) = fs.open("./id1/pak0.pak").unwrap();
        fs.seek(first, 1000).unwrap();

        let second = fs.duplicate(name_hash("./id1/pak0.pak")).unwrap();
        assert_ne!(first, second);
        assert_eq!(fs.tell(second).unwrap(), 0);
        assert_eq!(fs.size(second).unwrap(), 4096);

        let mut buf = [0; 8];
        fs.read(second, &mut buf).unwrap();
        assert_eq!(&buf, &data[..8]);
        fs.read(first, &mut buf).unwrap();
        assert_eq!(&buf, &data[1000..1008]);

        // Hash of the path as given, not the normalized name
        assert!(matches!(
            fs.duplicate(name_hash("PAK0.PAK")),
            Err(CdError::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_without_free_handle() {
        let mut fs = fs_with(b"data");
        for _ in 0..4 {
            fs.open("pak0.pak").unwrap();
        }
        assert!(matches!(
            fs.duplicate(name_hash("pak0.pak")),
            Err(CdError::NoFreeHandles)
        ));
    }

    #[test]
    fn test_closed_handle_is_invalid() {
        let mut fs = fs_with(b"data");
        let (handle, _) = fs.open("pak0.pak").unwrap();
        fs.close(handle).unwrap();
        let mut buf = [0; 4];
        assert!(matches!(fs.read(handle, &mut buf), Err(CdError::InvalidHandle)));
        assert!(matches!(fs.seek(handle, 0), Err(CdError::InvalidHandle)));
        assert!(matches!(fs.close(handle), Err(CdError::InvalidHandle)));
    }

    #[test]
    fn test_load_script() {
        let mut fs = fs_with(b"");
        assert_eq!(fs.load_script("autoexec.cfg").as_deref(), Some("echo booted\n"));
        assert_eq!(fs.load_script("missing.cfg"), None);
        assert_eq!(fs.open_count(), 0);
    }
}

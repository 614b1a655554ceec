//! CD drive contract and an in-memory disc

use std::collections::HashMap;

use super::CdError;

pub const SECTOR_SIZE: usize = 2048;

/// Directory record: all the file API needs is where a file starts and how
/// long it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub sector: u32,
    pub size: u32,
}

pub trait CdDrive {
    /// Look up an uppercase basename such as `AUTOEXEC.CFG`.
    fn search_file(&mut self, name: &str) -> Option<DirEntry>;

    /// Blocking read of one 2048-byte sector.
    fn read_sector(&mut self, lba: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), CdError>;
}

impl<D: CdDrive + ?Sized> CdDrive for Box<D> {
    fn search_file(&mut self, name: &str) -> Option<DirEntry> {
        (**self).search_file(name)
    }

    fn read_sector(&mut self, lba: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), CdError> {
        (**self).read_sector(lba, buf)
    }
}

impl<D: CdDrive + ?Sized> CdDrive for &mut D {
    fn search_file(&mut self, name: &str) -> Option<DirEntry> {
        (**self).search_file(name)
    }

    fn read_sector(&mut self, lba: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), CdError> {
        (**self).read_sector(lba, buf)
    }
}

/// Files laid out sector-aligned in memory, for tests and the demo viewer.
#[derive(Debug, Clone)]
pub struct DiscImage {
    data: Vec<u8>,
    files: HashMap<String, DirEntry>,
    sector_reads: u32,
}

impl Default for DiscImage {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscImage {
    /// Leaves the system area (sectors 0..16) empty, like a real disc.
    const FIRST_FILE_SECTOR: usize = 16;

    pub fn new() -> Self {
        Self {
            data: vec![0; Self::FIRST_FILE_SECTOR * SECTOR_SIZE],
            files: HashMap::new(),
            sector_reads: 0,
        }
    }

    /// Append a file at the next free sector. `name` is stored uppercase.
    pub fn add_file(&mut self, name: &str, contents: &[u8]) -> &mut Self {
        let sector = (self.data.len() / SECTOR_SIZE) as u32;
        let name = name.to_ascii_uppercase();
        self.data.extend_from_slice(contents);
        let padded = self.data.len().div_ceil(SECTOR_SIZE) * SECTOR_SIZE;
        self.data.resize(padded, 0);
        self.files.insert(
            name.clone(),
            DirEntry {
                name,
                sector,
                size: contents.len() as u32,
            },
        );
        self
    }

    pub fn with_file(mut self, name: &str, contents: &[u8]) -> Self {
        self.add_file(name, contents);
        self
    }

    pub fn sector_count(&self) -> u32 {
        (self.data.len() / SECTOR_SIZE) as u32
    }

    /// Number of `read_sector` calls served so far.
    pub fn sector_reads(&self) -> u32 {
        self.sector_reads
    }

    pub fn files(&self) -> impl Iterator<Item = &DirEntry> {
        self.files.values()
    }
}

impl CdDrive for DiscImage {
    fn search_file(&mut self, name: &str) -> Option<DirEntry> {
        self.files.get(name).cloned()
    }

    fn read_sector(&mut self, lba: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), CdError> {
        let start = lba as usize * SECTOR_SIZE;
        let sector = self
            .data
            .get(start..start + SECTOR_SIZE)
            .ok_or(CdError::Read { lba })?;
        buf.copy_from_slice(sector);
        self.sector_reads += 1;
        Ok(())
    }
}

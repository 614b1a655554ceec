//! ISO9660 disc images
//!
//! Only what the file API needs: the primary volume descriptor, directory
//! records and raw sector reads. Every file is indexed by its uppercase
//! basename; the console's lookup flattens directories the same way.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::{debug, info};

use super::drive::{CdDrive, DirEntry, SECTOR_SIZE};
use super::CdError;

const PVD_SECTOR: u32 = 16;
const ROOT_RECORD_OFFSET: usize = 156;
const FLAG_DIRECTORY: u8 = 0x02;
const MAX_DEPTH: usize = 8;

fn le_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

struct Record {
    extent: u32,
    size: u32,
    is_dir: bool,
    name: Vec<u8>,
}

/// Parse the directory record at the start of `bytes`.
fn parse_record(bytes: &[u8]) -> Option<Record> {
    let len = *bytes.first()? as usize;
    if len < 34 || len > bytes.len() {
        return None;
    }
    let name_len = bytes[32] as usize;
    let name = bytes.get(33..33 + name_len)?.to_vec();
    Some(Record {
        extent: le_u32(bytes, 2),
        size: le_u32(bytes, 10),
        is_dir: bytes[25] & FLAG_DIRECTORY != 0,
        name,
    })
}

/// `PAK0.PAK;1` -> `PAK0.PAK`, `README.;1` -> `README`
fn file_name(raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(raw);
    let name = name.split(';').next().unwrap_or_default();
    name.trim_end_matches('.').to_ascii_uppercase()
}

pub struct IsoImage<R> {
    reader: R,
    index: HashMap<String, DirEntry>,
    volume_id: String,
}

impl IsoImage<BufReader<File>> {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, CdError> {
        let file = File::open(path.as_ref())?;
        let image = Self::open(BufReader::new(file))?;
        info!(
            "mounted {} ({:?}, {} files)",
            path.as_ref().display(),
            image.volume_id,
            image.index.len()
        );
        Ok(image)
    }
}

impl<R: Read + Seek> IsoImage<R> {
    pub fn open(reader: R) -> Result<Self, CdError> {
        let mut image = Self {
            reader,
            index: HashMap::new(),
            volume_id: String::new(),
        };

        let mut pvd = [0; SECTOR_SIZE];
        image.read_raw(PVD_SECTOR, &mut pvd)?;
        if pvd[0] != 1 || &pvd[1..6] != b"CD001" {
            return Err(CdError::Format("missing primary volume descriptor".into()));
        }
        image.volume_id = String::from_utf8_lossy(&pvd[40..72])
            .trim_end_matches(['\0', ' '])
            .to_string();

        let root = parse_record(&pvd[ROOT_RECORD_OFFSET..ROOT_RECORD_OFFSET + 34])
            .ok_or_else(|| CdError::Format("bad root directory record".into()))?;
        let mut visited = HashSet::new();
        image.walk(root.extent, root.size, 0, &mut visited)?;
        Ok(image)
    }

    pub fn volume_id(&self) -> &str {
        &self.volume_id
    }

    pub fn files(&self) -> impl Iterator<Item = &DirEntry> {
        self.index.values()
    }

    fn read_raw(&mut self, lba: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), CdError> {
        self.reader
            .seek(SeekFrom::Start(lba as u64 * SECTOR_SIZE as u64))?;
        self.reader.read_exact(buf)?;
        Ok(())
    }

    fn walk(
        &mut self,
        extent: u32,
        size: u32,
        depth: usize,
        visited: &mut HashSet<u32>,
    ) -> Result<(), CdError> {
        if depth > MAX_DEPTH || !visited.insert(extent) {
            return Ok(());
        }

        let sectors = (size as usize).div_ceil(SECTOR_SIZE);
        let mut sector = [0; SECTOR_SIZE];
        for i in 0..sectors {
            self.read_raw(extent + i as u32, &mut sector)?;
            let mut offset = 0;
            // Records never straddle sectors; a zero length byte pads to the next one
            while let Some(record) = parse_record(&sector[offset..]) {
                offset += sector[offset] as usize;
                // "\0" and "\1" are the . and .. entries
                if record.name == [0] || record.name == [1] {
                    continue;
                }
                let name = file_name(&record.name);
                if record.is_dir {
                    self.walk(record.extent, record.size, depth + 1, visited)?;
                } else if self.index.contains_key(&name) {
                    debug!("iso: {} already indexed, skipping duplicate", name);
                } else {
                    self.index.insert(
                        name.clone(),
                        DirEntry {
                            name,
                            sector: record.extent,
                            size: record.size,
                        },
                    );
                }
            }
        }
        Ok(())
    }
}

impl<R: Read + Seek> CdDrive for IsoImage<R> {
    fn search_file(&mut self, name: &str) -> Option<DirEntry> {
        self.index.get(name).cloned()
    }

    fn read_sector(&mut self, lba: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), CdError> {
        self.read_raw(lba, buf).map_err(|_| CdError::Read { lba })
    }
}

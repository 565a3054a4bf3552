use std::{
    fmt,
    fs::File,
    io::{self, Read, Seek, SeekFrom, Write},
    mem::size_of,
    sync::{Arc, Mutex, PoisonError},
};

use log::{info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskError {
    IncorrectBlockSize,
    OverCapacity,
    InvalidHeader,
    Io(io::ErrorKind),
}

impl fmt::Display for DiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskError::IncorrectBlockSize => write!(f, "buffer length differs from the block size"),
            DiskError::OverCapacity => write!(f, "block number beyond disk capacity"),
            DiskError::InvalidHeader => write!(f, "disk image header does not match"),
            DiskError::Io(kind) => write!(f, "disk image I/O failed: {}", kind),
        }
    }
}

impl std::error::Error for DiskError {}

impl From<io::Error> for DiskError {
    fn from(err: io::Error) -> Self {
        DiskError::Io(err.kind())
    }
}

const HEADER_SIZE: usize = size_of::<u32>() * 2;

/// A swap device made of `blocks` fixed-size blocks, kept in a disk image file.
#[derive(Debug, Clone)]
pub struct Disk<const BLOCKSIZE: usize> {
    file_name: String,
    blocks: usize,
    file: Arc<Mutex<File>>,
}

pub fn make_name(name: &str) -> String {
    let name = name.replace("-", "_");
    let mut disk_name = String::from("DISK_IMAGE_");
    disk_name.push_str(&name);
    disk_name
}

fn write_header(file: &mut File, block_size: u32, blocks: u32) -> Result<(), io::Error> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&block_size.to_be_bytes())?;
    file.write_all(&blocks.to_be_bytes())?;
    Ok(())
}

fn read_header(file: &mut File) -> Result<(u32, u32), io::Error> {
    let mut block_size = [0; size_of::<u32>()];
    let mut blocks = [0; size_of::<u32>()];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut block_size)?;
    file.read_exact(&mut blocks)?;
    Ok((u32::from_be_bytes(block_size), u32::from_be_bytes(blocks)))
}

impl<const BLOCKSIZE: usize> Disk<BLOCKSIZE> {
    /// Creates (or truncates) a zeroed disk image holding `blocks` blocks.
    pub fn create(name: &str, blocks: usize) -> Result<Self, DiskError> {
        assert!(BLOCKSIZE > 0, "Block size must be positive");
        assert!(blocks > 0, "Disk must hold at least one block");
        assert!(u32::try_from(BLOCKSIZE).is_ok(), "Block size does not fit the header");
        assert!(u32::try_from(blocks).is_ok(), "Block count does not fit the header");
        let mut file = File::options()
            .truncate(true)
            .write(true)
            .read(true)
            .create(true)
            .open(make_name(name))?;
        file.set_len((HEADER_SIZE + blocks * BLOCKSIZE) as u64)?;
        write_header(&mut file, BLOCKSIZE as u32, blocks as u32)?;
        info!("Created disk image {} with {} blocks", name, blocks);
        Ok(Self {
            file_name: String::from(name),
            blocks,
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Opens an existing image, checking its header against `BLOCKSIZE`.
    pub fn connect(name: &str) -> Result<Self, DiskError> {
        let mut file = File::options()
            .write(true)
            .read(true)
            .open(make_name(name))?;
        let (block_size, blocks) = read_header(&mut file)?;
        if block_size as usize != BLOCKSIZE || blocks == 0 {
            return Err(DiskError::InvalidHeader);
        }
        Ok(Self {
            file_name: String::from(name),
            blocks: blocks as usize,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn name(&self) -> &str {
        &self.file_name
    }

    pub fn blocks(&self) -> usize {
        self.blocks
    }

    fn block_offset(&self, block_number: usize) -> Result<u64, DiskError> {
        if block_number >= self.blocks {
            return Err(DiskError::OverCapacity);
        }
        Ok((HEADER_SIZE + block_number * BLOCKSIZE) as u64)
    }

    /// Fills `buf` with the contents of `block_number`.
    pub fn read_block(&self, block_number: usize, buf: &mut [u8]) -> Result<(), DiskError> {
        if buf.len() != BLOCKSIZE {
            return Err(DiskError::IncorrectBlockSize);
        }
        let offset = self.block_offset(block_number)?;
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        trace!("Start reading block[{}]", block_number);
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        trace!("Done reading block[{}]", block_number);
        Ok(())
    }

    pub fn write_block(&self, block_number: usize, block: &[u8]) -> Result<(), DiskError> {
        if block.len() != BLOCKSIZE {
            return Err(DiskError::IncorrectBlockSize);
        }
        let offset = self.block_offset(block_number)?;
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        trace!("Start writing block[{}]", block_number);
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(block)?;
        trace!("Done writing block[{}]", block_number);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs::remove_file;

    #[test]
    fn test_create() {
        let disk = Disk::<512>::create("test_create", 2).unwrap();
        assert_eq!(disk.blocks(), 2);
        assert_eq!(disk.name(), "test_create");
        remove_file(make_name("test_create")).unwrap();
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[should_panic(expected = "Block count does not fit the header")]
    fn test_create_with_too_many_blocks() {
        let _ = Disk::<512>::create("test_too_many_blocks", u32::MAX as usize + 1);
    }

    #[test]
    fn test_connect() {
        let _ = Disk::<512>::create("test_connect", 4).unwrap();
        let disk = Disk::<512>::connect("test_connect").unwrap();
        assert_eq!(disk.blocks(), 4);
        remove_file(make_name("test_connect")).unwrap();
    }

    #[test]
    fn test_fresh_blocks_are_zeroed() {
        let disk = Disk::<512>::create("test_fresh_blocks_are_zeroed", 3).unwrap();
        let mut block = [0xff; 512];
        disk.read_block(2, &mut block).unwrap();
        assert!(block.iter().all(|b| *b == 0));
        remove_file(make_name("test_fresh_blocks_are_zeroed")).unwrap();
    }

    #[test]
    fn test_read_write() {
        let disk = Disk::<512>::create("test_read_write", 2).unwrap();
        let mut block = Box::new([0; 512]);
        block[0] = 1;
        block[511] = 7;
        disk.write_block(1, &*block).unwrap();
        let mut read = [0; 512];
        disk.read_block(1, &mut read).unwrap();
        assert_eq!(read[0], 1);
        assert_eq!(read[511], 7);
        disk.read_block(0, &mut read).unwrap();
        assert_eq!(read[0], 0);
        remove_file(make_name("test_read_write")).unwrap();
    }

    #[test]
    fn test_contents_survive_reconnect() {
        let disk = Disk::<512>::create("test_contents_survive_reconnect", 2).unwrap();
        disk.write_block(0, &[0x5a; 512]).unwrap();
        drop(disk);
        let disk = Disk::<512>::connect("test_contents_survive_reconnect").unwrap();
        let mut read = [0; 512];
        disk.read_block(0, &mut read).unwrap();
        assert_eq!(read, [0x5a; 512]);
        remove_file(make_name("test_contents_survive_reconnect")).unwrap();
    }

    #[test]
    fn test_read_write_over_capacity() {
        let disk = Disk::<512>::create("test_read_write_over_capacity", 2).unwrap();
        let block = [1; 512];
        assert_eq!(disk.write_block(2, &block), Err(DiskError::OverCapacity));
        let mut buf = [0; 512];
        assert_eq!(disk.read_block(2, &mut buf), Err(DiskError::OverCapacity));
        remove_file(make_name("test_read_write_over_capacity")).unwrap();
    }

    #[test]
    fn test_read_write_incorrect_block_size() {
        let disk = Disk::<512>::create("test_read_write_incorrect_block_size", 2).unwrap();
        assert_eq!(
            disk.write_block(0, &[1; 256]),
            Err(DiskError::IncorrectBlockSize)
        );
        assert_eq!(
            disk.write_block(0, &[1; 1024]),
            Err(DiskError::IncorrectBlockSize)
        );
        let mut small = [0; 128];
        assert_eq!(
            disk.read_block(0, &mut small),
            Err(DiskError::IncorrectBlockSize)
        );
        remove_file(make_name("test_read_write_incorrect_block_size")).unwrap();
    }

    #[test]
    fn test_invalid_header() {
        let _ = Disk::<512>::create("test_invalid_header", 2).unwrap();
        let mut file = File::options()
            .write(true)
            .read(true)
            .open(make_name("test_invalid_header"))
            .unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.write_all(&[0; 8]).unwrap();
        drop(file);
        assert_eq!(
            Disk::<512>::connect("test_invalid_header").unwrap_err(),
            DiskError::InvalidHeader
        );
        remove_file(make_name("test_invalid_header")).unwrap();
    }

    #[test]
    fn test_connect_with_other_block_size() {
        let _ = Disk::<512>::create("test_connect_with_other_block_size", 2).unwrap();
        assert_eq!(
            Disk::<1024>::connect("test_connect_with_other_block_size").unwrap_err(),
            DiskError::InvalidHeader
        );
        remove_file(make_name("test_connect_with_other_block_size")).unwrap();
    }
}

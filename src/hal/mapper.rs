//! Peripheral register mapping through `/dev/mem`
//!
//! Each peripheral block is mapped once, read/write and `MAP_SHARED`, so
//! register writes reach the hardware instead of a private copy. Mappings
//! are never released: a [`Region`] lives as long as the process.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use crate::error::{HalError, HalResult};

/// Physical memory pseudo-device
pub const DEV_MEM: &str = "/dev/mem";

/// Size of one peripheral register window
pub const BLOCK_SIZE: usize = 4 * 1024;

/// A mapped window of 32-bit device registers
///
/// Word indices are bounds-checked; an out-of-range index is a driver bug
/// and panics.
#[derive(Debug)]
pub struct Region {
    ptr: NonNull<u32>,
    words: usize,
    base: usize,
}

// The region is the sole owner of its window; moving it to another thread
// moves the only handle.
unsafe impl Send for Region {}

impl Region {
    /// Map a zeroed anonymous window with the same access rules as a
    /// device window. Registers behave as plain memory, so write-1-to-clear
    /// and hardware-set status bits must be simulated by the caller.
    pub fn anonymous(size: usize) -> HalResult<Self> {
        // SAFETY: a fresh anonymous mapping aliases nothing.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        Self::from_mmap(ptr, 0, size)
    }

    fn from_mmap(ptr: *mut libc::c_void, base: usize, size: usize) -> HalResult<Self> {
        if ptr == libc::MAP_FAILED {
            return Err(HalError::Map {
                base,
                source: io::Error::last_os_error(),
            });
        }
        let ptr = NonNull::new(ptr.cast::<u32>()).ok_or(HalError::Map {
            base,
            source: io::Error::from(io::ErrorKind::AddrNotAvailable),
        })?;
        Ok(Self {
            ptr,
            words: size / 4,
            base,
        })
    }

    /// Physical base address this window was mapped from (0 if anonymous)
    pub fn base(&self) -> usize {
        self.base
    }

    /// Number of 32-bit registers in the window
    pub fn words(&self) -> usize {
        self.words
    }

    /// Volatile read of register `word`
    pub fn read(&self, word: usize) -> u32 {
        // SAFETY: word_ptr bounds-checks against the mapped length.
        unsafe { self.word_ptr(word).as_ptr().read_volatile() }
    }

    /// Volatile write of register `word`
    pub fn write(&mut self, word: usize, value: u32) {
        // SAFETY: word_ptr bounds-checks against the mapped length.
        unsafe { self.word_ptr(word).as_ptr().write_volatile(value) }
    }

    /// Read-modify-write of register `word`
    pub fn modify(&mut self, word: usize, f: impl FnOnce(u32) -> u32) {
        let value = f(self.read(word));
        self.write(word, value);
    }

    /// Address of register `word`, valid for the rest of the process
    pub(crate) fn word_ptr(&self, word: usize) -> NonNull<u32> {
        assert!(
            word < self.words,
            "register {} outside {}-word window",
            word,
            self.words
        );
        // SAFETY: in bounds of the mapping checked above.
        unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(word)) }
    }
}

/// Hands out register windows from the memory device
///
/// Tracks every window it has mapped so no two regions alias the same
/// registers.
#[derive(Debug)]
pub struct PeripheralMapper {
    device: File,
    path: PathBuf,
    mapped: Vec<(usize, usize)>,
}

impl PeripheralMapper {
    /// Open `/dev/mem` (requires root)
    pub fn open() -> HalResult<Self> {
        Self::with_device(DEV_MEM)
    }

    /// Open an arbitrary memory device or file to map from
    pub fn with_device(path: impl AsRef<Path>) -> HalResult<Self> {
        let path = path.as_ref().to_path_buf();
        let device = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(&path)
            .map_err(|source| HalError::DeviceOpen {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            device,
            path,
            mapped: Vec::new(),
        })
    }

    /// Map `size` bytes of registers starting at physical address `base`
    pub fn map(&mut self, base: usize, size: usize) -> HalResult<Region> {
        let end = base.saturating_add(size);
        if self
            .mapped
            .iter()
            .any(|&(start, len)| base < start + len && start < end)
        {
            return Err(HalError::Overlap { base, size });
        }

        let offset = libc::off_t::try_from(base).map_err(|_| HalError::Map {
            base,
            source: io::Error::from(io::ErrorKind::InvalidInput),
        })?;

        // SAFETY: mapping a device window; the result is checked below.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                self.device.as_raw_fd(),
                offset,
            )
        };
        let region = Region::from_mmap(ptr, base, size)?;

        log::debug!(
            "mapped {}+{:#010x} ({} bytes) at {:p}",
            self.path.display(),
            base,
            size,
            region.ptr
        );
        self.mapped.push((base, size));
        Ok(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn backing_file(pages: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; pages * BLOCK_SIZE]).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_missing_device() {
        let err = PeripheralMapper::with_device("/nonexistent/mem").unwrap_err();
        assert!(matches!(err, HalError::DeviceOpen { .. }));
    }

    #[test]
    fn test_writes_reach_backing_store() {
        let file = backing_file(1);
        let mut mapper = PeripheralMapper::with_device(file.path()).unwrap();
        let mut region = mapper.map(0, BLOCK_SIZE).unwrap();

        region.write(3, 0xDEAD_BEEF);

        let bytes = std::fs::read(file.path()).unwrap();
        assert_eq!(&bytes[12..16], &0xDEAD_BEEFu32.to_ne_bytes());
        assert_eq!(region.words(), BLOCK_SIZE / 4);
    }

    #[test]
    fn test_overlap_rejected() {
        let file = backing_file(2);
        let mut mapper = PeripheralMapper::with_device(file.path()).unwrap();
        mapper.map(0, BLOCK_SIZE).unwrap();

        let err = mapper.map(0, BLOCK_SIZE).unwrap_err();
        assert!(matches!(err, HalError::Overlap { base: 0, .. }));

        let second = mapper.map(BLOCK_SIZE, BLOCK_SIZE).unwrap();
        assert_eq!(second.base(), BLOCK_SIZE);
    }

    #[test]
    fn test_anonymous_starts_zeroed() {
        let mut region = Region::anonymous(BLOCK_SIZE).unwrap();
        assert_eq!(region.read(0), 0);
        region.modify(0, |v| v | 0x80);
        assert_eq!(region.read(0), 0x80);
    }

    #[test]
    #[should_panic]
    fn test_out_of_window_index() {
        let region = Region::anonymous(BLOCK_SIZE).unwrap();
        region.read(BLOCK_SIZE / 4);
    }
}

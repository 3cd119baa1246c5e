//! memory defines the flat 64k address space a 6502 sees along with
//! the image loading used to seed it before execution.
use std::fs::read;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

#[cfg(test)]
mod tests;

/// `MAX_SIZE` is the size of the full 6502 address space.
pub const MAX_SIZE: usize = 65536;

/// `NMI_VECTOR` is the location in memory the 6502 uses for NMI interrupts.
/// It is a pointer to the location to start execution.
pub const NMI_VECTOR: u16 = 0xFFFA;

/// `RESET_VECTOR` is the location in memory the 6502 uses on startup to begin execution.
/// It is a pointer to the location to start execution.
pub const RESET_VECTOR: u16 = 0xFFFC;

/// `IRQ_VECTOR` is the location in memory the 6502 uses when executing an IRQ (BRK).
/// It is a pointer to the location to start execution.
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// `MemoryError` is returned when an image can't be placed into memory.
/// Either way nothing has been written when one of these comes back.
#[derive(Error, Debug)]
pub enum MemoryError {
    /// The image file couldn't be read.
    #[error("can't load image {path}: {source}")]
    LoadFailure {
        /// path is the file we attempted to read.
        path: PathBuf,
        /// source is the underlying I/O problem.
        #[source]
        source: std::io::Error,
    },

    /// The image doesn't fit in the address space starting at offset.
    #[error("image of {len} bytes at offset {offset:#06X} runs past the end of memory")]
    OutOfRange {
        /// offset is the requested load address.
        offset: u16,
        /// len is the image length in bytes.
        len: usize,
    },
}

/// Representation of 6502 memory. Doesn't include bank support.
pub trait Memory {
    /// read returns the byte at addr.
    fn read(&self, addr: u16) -> u8;

    /// write stores val at addr.
    fn write(&mut self, addr: u16, val: u8);

    /// `power_on` resets memory to its startup contents.
    fn power_on(&mut self);

    /// `read_word` reads a little endian word from addr and addr+1.
    /// No page boundary handling is done here. The only special case is
    /// 0xFFFF where the high byte comes from 0x0000 since the address
    /// space can't be read past.
    fn read_word(&self, addr: u16) -> u16 {
        u16::from(self.read(addr)) | (u16::from(self.read(addr.wrapping_add(1))) << 8)
    }

    /// `load_image` copies bytes verbatim into memory starting at offset.
    ///
    /// # Errors
    /// If the image won't fit an `OutOfRange` error is returned and memory
    /// is left untouched.
    fn load_image(&mut self, bytes: &[u8], offset: u16) -> Result<(), MemoryError> {
        if usize::from(offset) + bytes.len() > MAX_SIZE {
            return Err(MemoryError::OutOfRange {
                offset,
                len: bytes.len(),
            });
        }
        for (addr, b) in (offset..=u16::MAX).zip(bytes) {
            self.write(addr, *b);
        }
        debug!("loaded {} bytes at {offset:#06X}", bytes.len());
        Ok(())
    }

    /// `load_file` reads the file at path and places it into memory with
    /// `load_image`. Returns the number of bytes loaded.
    ///
    /// # Errors
    /// I/O problems return `LoadFailure` and a file too large for the
    /// offset returns `OutOfRange`. In both cases memory isn't modified.
    fn load_file(&mut self, path: &Path, offset: u16) -> Result<usize, MemoryError> {
        let bytes = read(path).map_err(|source| MemoryError::LoadFailure {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_image(&bytes, offset)?;
        Ok(bytes.len())
    }
}

/// A plain array can act as memory. `power_on` zeros it.
impl Memory for [u8; MAX_SIZE] {
    fn read(&self, addr: u16) -> u8 {
        self[usize::from(addr)]
    }
    fn write(&mut self, addr: u16, val: u8) {
        self[usize::from(addr)] = val;
    }
    fn power_on(&mut self) {
        self.fill(0);
    }
}

/// `FlatRAM` gives a flat 64k RAM block to use.
/// It will be initialized to all zeros and `power_on`
/// can use a different value if `fill_value` is set.
/// Additionally the irq/reset and nmi vectors can be set as well.
#[derive(Debug, Clone)]
pub struct FlatRAM {
    fill_value: u8,
    vectors: Vectors,
    debug: bool,
    memory: Box<[u8; MAX_SIZE]>,
}

/// `Vectors` holds the values written into the top of memory on `power_on`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Vectors {
    /// NMI handler address.
    pub nmi: u16,
    /// Reset entry point.
    pub reset: u16,
    /// IRQ/BRK handler address.
    pub irq: u16,
}

impl Memory for FlatRAM {
    fn read(&self, addr: u16) -> u8 {
        self.memory[usize::from(addr)]
    }
    fn write(&mut self, addr: u16, val: u8) {
        if self.debug {
            debug!("write {addr:#06X} <- {val:#04X}");
        }
        self.memory[usize::from(addr)] = val;
    }
    fn power_on(&mut self) {
        self.memory.fill(self.fill_value);
        for (vec, val) in [
            (NMI_VECTOR, self.vectors.nmi),
            (RESET_VECTOR, self.vectors.reset),
            (IRQ_VECTOR, self.vectors.irq),
        ] {
            let [lo, hi] = val.to_le_bytes();
            self.memory[usize::from(vec)] = lo;
            self.memory[usize::from(vec) + 1] = hi;
        }
    }
}

impl Default for FlatRAM {
    fn default() -> Self {
        Self::new()
    }
}

impl FlatRAM {
    /// Create a zero filled `FlatRAM` with zero vectors.
    #[must_use]
    pub fn new() -> Self {
        FlatRAM {
            fill_value: 0,
            vectors: Vectors::default(),
            debug: false,
            memory: Box::new([0; MAX_SIZE]),
        }
    }

    /// Log every write at debug level.
    #[must_use]
    pub fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Set the value `power_on` fills memory with.
    #[must_use]
    pub fn fill_value(mut self, val: u8) -> Self {
        self.fill_value = val;
        self
    }

    /// Set the vectors `power_on` writes.
    #[must_use]
    pub fn vectors(mut self, v: Vectors) -> Self {
        self.vectors = v;
        self
    }
}

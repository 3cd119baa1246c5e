use crate::{FlatRAM, Memory, MemoryError, Vectors, IRQ_VECTOR, MAX_SIZE, NMI_VECTOR, RESET_VECTOR};
use color_eyre::eyre::Result;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn array_memory() {
    let mut r: [u8; MAX_SIZE] = [0xAA; MAX_SIZE];

    r.power_on();
    assert!(r.read(0x1234) == 0x00, "Bad value");
    r.write(0x1234, 0xAE);
    assert!(r.read(0x1234) == 0xAE, "Bad value");
}

#[test]
fn flat_ram_power_on() {
    let mut r = FlatRAM::new()
        .fill_value(0xEA)
        .vectors(Vectors {
            nmi: 0x1234,
            reset: 0x5678,
            irq: 0x9ABC,
        });
    r.power_on();

    assert!(r.read(0x0000) == 0xEA, "fill value not applied");
    assert!(r.read(0xFFF9) == 0xEA, "fill value not applied");
    assert!(r.read_word(NMI_VECTOR) == 0x1234, "bad NMI vector");
    assert!(r.read_word(RESET_VECTOR) == 0x5678, "bad reset vector");
    assert!(r.read_word(IRQ_VECTOR) == 0x9ABC, "bad IRQ vector");
}

#[test]
fn read_word_little_endian() {
    let mut r = FlatRAM::default();
    r.write(0x10FF, 0x34);
    r.write(0x1100, 0x12);
    let got = r.read_word(0x10FF);
    assert!(got == 0x1234, "page boundary word read got {got:#06X}");

    r.write(0xFFFF, 0xCD);
    r.write(0x0000, 0xAB);
    let got = r.read_word(0xFFFF);
    assert!(got == 0xABCD, "top of memory word read got {got:#06X}");
}

#[test]
fn load_image() -> Result<()> {
    let mut r = FlatRAM::default();
    r.load_image(&[0xA9, 0x01, 0x00], 0x0400)?;
    assert!(r.read(0x0400) == 0xA9, "image not placed at offset");
    assert!(r.read(0x0401) == 0x01, "image not placed at offset");

    // Exactly filling the end is fine.
    r.load_image(&[0x11, 0x22], 0xFFFE)?;
    assert!(r.read_word(0xFFFE) == 0x2211, "image at end not placed");
    Ok(())
}

#[test]
fn load_image_out_of_range() {
    let mut r = FlatRAM::new().fill_value(0x55);
    r.power_on();

    let res = r.load_image(&[0x01, 0x02, 0x03], 0xFFFE);
    match res {
        Err(MemoryError::OutOfRange { offset, len }) => {
            assert!(offset == 0xFFFE && len == 3, "bad error contents");
        }
        _ => panic!("expected OutOfRange and got {res:?}"),
    }
    // Nothing should have been written.
    assert!(r.read(0xFFFE) == 0x55, "partial image written");
    assert!(r.read(0xFFFF) == 0x55, "partial image written");
}

#[test]
fn load_file() -> Result<()> {
    let mut f = NamedTempFile::new()?;
    f.write_all(&[0xD8, 0xA2, 0xFF, 0x9A])?;
    f.flush()?;

    let mut r = FlatRAM::default();
    let n = r.load_file(f.path(), 0xC000)?;
    assert!(n == 4, "loaded {n} bytes");
    assert!(r.read(0xC000) == 0xD8, "bad first byte");
    assert!(r.read(0xC003) == 0x9A, "bad last byte");
    Ok(())
}

#[test]
fn load_file_missing() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut r = FlatRAM::default();
    let res = r.load_file(&dir.path().join("nope.bin"), 0);
    assert!(
        matches!(res, Err(MemoryError::LoadFailure { .. })),
        "expected LoadFailure and got {res:?}"
    );
    Ok(())
}

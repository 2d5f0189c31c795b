//! Locating the `.text` section of a statically linked RV64 ELF image.
//!
//! Relocations, program headers, and dynamic linking are not handled:
//! the image's bytes are used verbatim at their file offsets (see
//! [`crate::hart::Hart::load_elf`]), so all this module needs to find
//! is where `.text` starts and where execution should begin within it.

use elf::endian::AnyEndian;
use elf::ElfBytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElfError {
    #[error("failed to parse ELF headers: {0}")]
    Parse(String),
    #[error("ELF image has no .text section")]
    MissingText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSection {
    pub file_offset: u64,
    pub size: u64,
    pub entry_file_offset: u64,
}

/// Translate a virtual entrypoint address into a file offset, given
/// the `.text` section's load address and file offset.
pub fn entry_file_offset(e_entry: u64, sh_addr: u64, sh_offset: u64) -> u64 {
    e_entry.wrapping_sub(sh_addr).wrapping_add(sh_offset)
}

pub fn locate_text(bytes: &[u8]) -> Result<TextSection, ElfError> {
    let file =
        ElfBytes::<AnyEndian>::minimal_parse(bytes).map_err(|e| ElfError::Parse(e.to_string()))?;
    let text_shdr = file
        .section_header_by_name(".text")
        .map_err(|e| ElfError::Parse(e.to_string()))?
        .ok_or(ElfError::MissingText)?;
    Ok(TextSection {
        file_offset: text_shdr.sh_offset,
        size: text_shdr.sh_size,
        entry_file_offset: entry_file_offset(file.ehdr.e_entry, text_shdr.sh_addr, text_shdr.sh_offset),
    })
}

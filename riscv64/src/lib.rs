//! An RV64IM interpreter: decode a statically linked ELF binary and
//! step it instruction by instruction, handling the small slice of
//! Linux syscalls a freestanding guest needs to do I/O and exit.

pub mod decode;
pub mod elf;
pub mod fields;
pub mod hart;
pub mod memory;
pub mod registers;
pub mod syscall;

pub use decode::{DecodeError, Instr};
pub use elf::ElfError;
pub use hart::{Hart, RiscvError, StepOutcome, MEMORY_SIZE};
pub use memory::{Memory, MemoryError, Wordsize};
pub use registers::Registers;
pub use syscall::{SyscallError, SyscallOutcome};

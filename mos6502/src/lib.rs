//! An NMOS 6502 interpreter: a 64 KiB flat address space, the
//! architectural register file, and the fetch/decode/execute loop.
//!
//! Decimal mode and BRK-as-interrupt are not modeled; see
//! [`cpu::Cpu::step`] for the halt contract.

pub mod cpu;
pub mod decode;
pub mod memory;
pub mod registers;

pub use cpu::{Cpu, CpuError, StepOutcome};
pub use decode::{DecodeError, Instr, Mnemonic, Operand};
pub use memory::Memory;
pub use registers::{flag, Registers};

//! A CHIP-8 interpreter: a 4 KiB address space, the nibble-decoded
//! instruction set, a 64x32 XOR-draw display, and the 16-key input
//! surface, all independent of any particular rendering frontend.

pub mod cpu;
pub mod decode;
pub mod display;
pub mod keypad;
pub mod memory;
pub mod registers;
pub mod rng;

pub use cpu::{Cpu, CpuError};
pub use decode::{DecodeError, Instr};
pub use display::Display;
pub use keypad::Keypad;
pub use memory::Memory;
pub use registers::Registers;
pub use rng::ByteRng;

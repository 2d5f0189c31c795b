//! Decoding a 16-bit big-endian CHIP-8 instruction word into its
//! nibble fields and a typed [`Instr`].

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unrecognized instruction 0x{0:04x}")]
    InvalidInstruction(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Ld,
    Or,
    And,
    Xor,
    Add,
    Sub,
    Shr,
    Subn,
    Shl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    /// `0nnn`: legacy machine-code call, a no-op advance-past in a
    /// from-scratch interpreter.
    Sys,
    Cls,
    Ret,
    Jp(u16),
    Call(u16),
    SeByte { x: u8, kk: u8 },
    SneByte { x: u8, kk: u8 },
    SeReg { x: u8, y: u8 },
    SneReg { x: u8, y: u8 },
    LdByte { x: u8, kk: u8 },
    AddByte { x: u8, kk: u8 },
    Alu { op: AluOp, x: u8, y: u8 },
    LdI(u16),
    JpV0(u16),
    Rnd { x: u8, kk: u8 },
    Drw { x: u8, y: u8, n: u8 },
    Skp(u8),
    Sknp(u8),
    LdVxDt(u8),
    LdVxKey(u8),
    LdDtVx(u8),
    LdStVx(u8),
    AddIVx(u8),
    LdFVx(u8),
    LdBVx(u8),
    LdIVx(u8),
    LdVxI(u8),
}

/// Split the raw word into the fields every instruction family reads
/// from: `nnn`/`n`/`x`/`y`/`kk`. Not every field is meaningful for
/// every instruction, but extracting them uniformly up front avoids
/// repeating the same shift-and-mask per case.
struct Fields {
    nnn: u16,
    n: u8,
    x: u8,
    y: u8,
    kk: u8,
}

fn fields(ins: u16) -> Fields {
    Fields {
        nnn: ins & 0x0FFF,
        n: (ins & 0x000F) as u8,
        x: ((ins >> 8) & 0x0F) as u8,
        y: ((ins >> 4) & 0x0F) as u8,
        kk: (ins & 0x00FF) as u8,
    }
}

pub fn decode(ins: u16) -> Result<Instr, DecodeError> {
    let f = fields(ins);

    let instr = match ins >> 12 {
        0x0 => match f.nnn {
            0x0E0 => Instr::Cls,
            0x0EE => Instr::Ret,
            _ => Instr::Sys,
        },
        0x1 => Instr::Jp(f.nnn),
        0x2 => Instr::Call(f.nnn),
        0x3 => Instr::SeByte { x: f.x, kk: f.kk },
        0x4 => Instr::SneByte { x: f.x, kk: f.kk },
        0x5 if f.n == 0 => Instr::SeReg { x: f.x, y: f.y },
        0x6 => Instr::LdByte { x: f.x, kk: f.kk },
        0x7 => Instr::AddByte { x: f.x, kk: f.kk },
        0x8 => {
            let op = match f.n {
                0x0 => AluOp::Ld,
                0x1 => AluOp::Or,
                0x2 => AluOp::And,
                0x3 => AluOp::Xor,
                0x4 => AluOp::Add,
                0x5 => AluOp::Sub,
                0x6 => AluOp::Shr,
                0x7 => AluOp::Subn,
                0xE => AluOp::Shl,
                _ => return Err(DecodeError::InvalidInstruction(ins)),
            };
            Instr::Alu { op, x: f.x, y: f.y }
        }
        0x9 if f.n == 0 => Instr::SneReg { x: f.x, y: f.y },
        0xA => Instr::LdI(f.nnn),
        0xB => Instr::JpV0(f.nnn),
        0xC => Instr::Rnd { x: f.x, kk: f.kk },
        0xD => Instr::Drw { x: f.x, y: f.y, n: f.n },
        0xE => match f.kk {
            0x9E => Instr::Skp(f.x),
            0xA1 => Instr::Sknp(f.x),
            _ => return Err(DecodeError::InvalidInstruction(ins)),
        },
        0xF => match f.kk {
            0x07 => Instr::LdVxDt(f.x),
            0x0A => Instr::LdVxKey(f.x),
            0x15 => Instr::LdDtVx(f.x),
            0x18 => Instr::LdStVx(f.x),
            0x1E => Instr::AddIVx(f.x),
            0x29 => Instr::LdFVx(f.x),
            0x33 => Instr::LdBVx(f.x),
            0x55 => Instr::LdIVx(f.x),
            0x65 => Instr::LdVxI(f.x),
            _ => return Err(DecodeError::InvalidInstruction(ins)),
        },
        _ => return Err(DecodeError::InvalidInstruction(ins)),
    };
    Ok(instr)
}

//! Fetch/decode/execute for the CHIP-8 virtual machine.

use thiserror::Error;

use crate::decode::{self, AluOp, DecodeError, Instr};
use crate::display::Display;
use crate::keypad::Keypad;
use crate::memory::Memory;
use crate::registers::Registers;
use crate::rng::{self, ByteRng};

#[derive(Debug, Error)]
pub enum CpuError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// The CHIP-8 virtual machine: registers, memory, display, keypad, and
/// the random byte source `Cxkk` reads from.
///
/// There is no explicit halt instruction; the outer driver decides
/// when to stop calling [`Cpu::step`].
pub struct Cpu {
    pub registers: Registers,
    pub memory: Memory,
    pub display: Display,
    pub keypad: Keypad,
    rng: Box<dyn ByteRng>,
}

impl Cpu {
    pub fn new() -> Self {
        Self::with_rng(rng::thread_rng())
    }

    pub fn with_rng(rng: Box<dyn ByteRng>) -> Self {
        Self {
            registers: Registers::new(),
            memory: Memory::new(),
            display: Display::new(),
            keypad: Keypad::new(),
            rng,
        }
    }

    pub fn load_program(&mut self, program: &[u8]) {
        self.memory.load_program(program);
    }

    /// Tick the delay and sound timers down by one. The driver is
    /// responsible for calling this at a nominal 60 Hz, independent of
    /// how often [`Cpu::step`] runs.
    pub fn tick_timers(&mut self) {
        self.registers.tick_timers();
    }

    pub fn step(&mut self) -> Result<(), CpuError> {
        let ins = self.memory.read_instruction(self.registers.pc);
        self.registers.pc = self.registers.pc.wrapping_add(2);
        let instr = decode::decode(ins)?;
        self.execute(instr);
        Ok(())
    }

    fn skip_next(&mut self) {
        self.registers.pc = self.registers.pc.wrapping_add(2);
    }

    fn execute(&mut self, instr: Instr) {
        match instr {
            Instr::Sys => {}
            Instr::Cls => self.display.clear(),
            Instr::Ret => self.registers.pc = self.registers.pop(),
            Instr::Jp(addr) => self.registers.pc = addr,
            Instr::Call(addr) => {
                let return_to = self.registers.pc;
                self.registers.push(return_to);
                self.registers.pc = addr;
            }
            Instr::SeByte { x, kk } => {
                if self.registers.v[x as usize] == kk {
                    self.skip_next();
                }
            }
            Instr::SneByte { x, kk } => {
                if self.registers.v[x as usize] != kk {
                    self.skip_next();
                }
            }
            Instr::SeReg { x, y } => {
                if self.registers.v[x as usize] == self.registers.v[y as usize] {
                    self.skip_next();
                }
            }
            Instr::SneReg { x, y } => {
                if self.registers.v[x as usize] != self.registers.v[y as usize] {
                    self.skip_next();
                }
            }
            Instr::LdByte { x, kk } => self.registers.v[x as usize] = kk,
            Instr::AddByte { x, kk } => {
                self.registers.v[x as usize] = self.registers.v[x as usize].wrapping_add(kk);
            }
            Instr::Alu { op, x, y } => self.alu(op, x, y),
            Instr::LdI(nnn) => self.registers.i = nnn,
            Instr::JpV0(nnn) => self.registers.pc = nnn.wrapping_add(self.registers.v[0] as u16),
            Instr::Rnd { x, kk } => {
                self.registers.v[x as usize] = self.rng.next_byte() & kk;
            }
            Instr::Drw { x, y, n } => {
                let vx = self.registers.v[x as usize];
                let vy = self.registers.v[y as usize];
                let sprite = self.memory.slice(self.registers.i, n as u16).to_vec();
                let collision = self.display.draw_sprite(vx, vy, &sprite);
                self.registers.v[0xF] = collision as u8;
            }
            Instr::Skp(x) => {
                if self.keypad.is_pressed(self.registers.v[x as usize]) {
                    self.skip_next();
                }
            }
            Instr::Sknp(x) => {
                if !self.keypad.is_pressed(self.registers.v[x as usize]) {
                    self.skip_next();
                }
            }
            Instr::LdVxDt(x) => self.registers.v[x as usize] = self.registers.delay_timer,
            Instr::LdVxKey(x) => match self.keypad.any_pressed() {
                Some(key) => self.registers.v[x as usize] = key,
                None => self.registers.pc = self.registers.pc.wrapping_sub(2),
            },
            Instr::LdDtVx(x) => self.registers.delay_timer = self.registers.v[x as usize],
            Instr::LdStVx(x) => self.registers.sound_timer = self.registers.v[x as usize],
            Instr::AddIVx(x) => {
                self.registers.i = self.registers.i.wrapping_add(self.registers.v[x as usize] as u16);
            }
            Instr::LdFVx(x) => {
                self.registers.i = self.registers.v[x as usize] as u16 * Memory::FONT_GLYPH_SIZE;
            }
            Instr::LdBVx(x) => {
                let value = self.registers.v[x as usize];
                self.memory.write(self.registers.i, value / 100);
                self.memory.write(self.registers.i.wrapping_add(1), (value / 10) % 10);
                self.memory.write(self.registers.i.wrapping_add(2), value % 10);
            }
            Instr::LdIVx(x) => {
                for offset in 0..=x {
                    let value = self.registers.v[offset as usize];
                    self.memory.write(self.registers.i.wrapping_add(offset as u16), value);
                }
            }
            Instr::LdVxI(x) => {
                for offset in 0..=x {
                    self.registers.v[offset as usize] =
                        self.memory.read(self.registers.i.wrapping_add(offset as u16));
                }
            }
        }
    }

    fn alu(&mut self, op: AluOp, x: u8, y: u8) {
        let vx = self.registers.v[x as usize];
        let vy = self.registers.v[y as usize];
        match op {
            AluOp::Ld => self.registers.v[x as usize] = vy,
            AluOp::Or => self.registers.v[x as usize] = vx | vy,
            AluOp::And => self.registers.v[x as usize] = vx & vy,
            AluOp::Xor => self.registers.v[x as usize] = vx ^ vy,
            AluOp::Add => {
                let (result, carry) = vx.overflowing_add(vy);
                self.registers.v[x as usize] = result;
                self.registers.v[0xF] = carry as u8;
            }
            AluOp::Sub => {
                let borrow = vx < vy;
                self.registers.v[x as usize] = vx.wrapping_sub(vy);
                self.registers.v[0xF] = !borrow as u8;
            }
            AluOp::Shr => {
                self.registers.v[x as usize] = vx >> 1;
                self.registers.v[0xF] = vx & 0x1;
            }
            AluOp::Subn => {
                let borrow = vy < vx;
                self.registers.v[x as usize] = vy.wrapping_sub(vx);
                self.registers.v[0xF] = !borrow as u8;
            }
            AluOp::Shl => {
                self.registers.v[x as usize] = vx << 1;
                self.registers.v[0xF] = (vx & 0x80 != 0) as u8;
            }
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::FixedRng;

    fn cpu_with_program(program: &[u8]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(program);
        cpu
    }

    #[test]
    fn add_with_carry_sets_vf_and_wraps() {
        let mut cpu = cpu_with_program(&[0x80, 0x14]);
        cpu.registers.v[0] = 0xFF;
        cpu.registers.v[1] = 0x01;
        cpu.step().unwrap();
        assert_eq!(cpu.registers.v[0], 0x00);
        assert_eq!(cpu.registers.v[0xF], 1);
    }

    #[test]
    fn draw_twice_erases_sprite_and_collides() {
        let mut cpu = cpu_with_program(&[0xD0, 0x05, 0xD0, 0x05]);
        cpu.registers.i = 0x300;
        for row in 0..5 {
            cpu.memory.write(0x300 + row, 0xFF);
        }
        cpu.step().unwrap();
        assert_eq!(cpu.registers.v[0xF], 0);
        assert!(cpu.display.pixels().iter().take(40).any(|&p| p == 1));
        cpu.step().unwrap();
        assert_eq!(cpu.registers.v[0xF], 1);
        assert!(cpu.display.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn sub_sets_vf_to_not_borrow() {
        let mut cpu = cpu_with_program(&[0x80, 0x15]);
        cpu.registers.v[0] = 10;
        cpu.registers.v[1] = 3;
        cpu.step().unwrap();
        assert_eq!(cpu.registers.v[0], 7);
        assert_eq!(cpu.registers.v[0xF], 1);
    }

    #[test]
    fn subn_underflow_clears_vf() {
        let mut cpu = cpu_with_program(&[0x80, 0x17]);
        cpu.registers.v[0] = 10;
        cpu.registers.v[1] = 3;
        cpu.step().unwrap();
        assert_eq!(cpu.registers.v[0], (3u8).wrapping_sub(10));
        assert_eq!(cpu.registers.v[0xF], 0);
    }

    #[test]
    fn bcd_splits_digits() {
        let mut cpu = cpu_with_program(&[0xF0, 0x33]);
        cpu.registers.v[0] = 234;
        cpu.registers.i = 0x300;
        cpu.step().unwrap();
        assert_eq!(cpu.memory.read(0x300), 2);
        assert_eq!(cpu.memory.read(0x301), 3);
        assert_eq!(cpu.memory.read(0x302), 4);
    }

    #[test]
    fn rnd_masks_fixed_byte_sequence() {
        let mut cpu = Cpu::with_rng(Box::new(FixedRng(vec![0xFF], 0)));
        cpu.load_program(&[0xC0, 0x0F]);
        cpu.step().unwrap();
        assert_eq!(cpu.registers.v[0], 0x0F);
    }

    #[test]
    fn store_and_load_registers_do_not_touch_i() {
        let mut cpu = cpu_with_program(&[0xF2, 0x55, 0xF2, 0x65]);
        cpu.registers.i = 0x300;
        cpu.registers.v[0] = 1;
        cpu.registers.v[1] = 2;
        cpu.registers.v[2] = 3;
        cpu.step().unwrap();
        assert_eq!(cpu.registers.i, 0x300);
        cpu.registers.v = [0; 16];
        cpu.step().unwrap();
        assert_eq!(&cpu.registers.v[0..3], &[1, 2, 3]);
        assert_eq!(cpu.registers.i, 0x300);
    }

    #[test]
    fn blocking_key_wait_replays_instruction_until_key_pressed() {
        let mut cpu = cpu_with_program(&[0xF0, 0x0A]);
        cpu.step().unwrap();
        assert_eq!(cpu.registers.pc, Registers::INITIAL_PC);
        cpu.keypad.set_pressed(0x7, true);
        cpu.step().unwrap();
        assert_eq!(cpu.registers.v[0], 0x7);
        assert_eq!(cpu.registers.pc, Registers::INITIAL_PC + 2);
    }

    #[test]
    fn call_then_ret_round_trips_pc() {
        let mut cpu = cpu_with_program(&[0x22, 0x04, 0x00, 0x00, 0x00, 0xEE]);
        cpu.step().unwrap(); // CALL 0x204
        assert_eq!(cpu.registers.pc, 0x204);
        cpu.step().unwrap(); // RET
        assert_eq!(cpu.registers.pc, 0x202);
    }

    #[test]
    fn ld_f_vx_points_i_at_digit_glyph() {
        let mut cpu = cpu_with_program(&[0xF0, 0x29]);
        cpu.registers.v[0] = 0xA;
        cpu.step().unwrap();
        assert_eq!(cpu.registers.i, 0xA * Memory::FONT_GLYPH_SIZE);
    }
}

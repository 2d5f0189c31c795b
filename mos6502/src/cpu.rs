//! Fetch/decode/execute for the NMOS 6502.

use thiserror::Error;

use crate::decode::{self, DecodeError, Instr, Mnemonic, Operand};
use crate::memory::Memory;
use crate::registers::{flag, Registers};

#[derive(Debug, Error)]
pub enum CpuError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Halted,
}

const STACK_PAGE: u16 = 0x0100;

/// The MOS 6502: registers, memory, and the fetch/decode/execute loop.
#[derive(Debug)]
pub struct Cpu {
    pub registers: Registers,
    pub memory: Memory,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            registers: Registers::new(),
            memory: Memory::new(),
        }
    }

    /// Load `program` at 0x0600 and point PC at it, per the reference
    /// loader convention.
    pub fn load_program(&mut self, program: &[u8]) {
        self.memory.load(0x0600, program);
        self.registers.pc = 0x0600;
    }

    pub fn step(&mut self) -> Result<StepOutcome, CpuError> {
        let (instr, next_pc) = decode::decode(
            &self.memory,
            self.registers.pc,
            self.registers.x,
            self.registers.y,
        )?;
        self.registers.pc = next_pc;
        Ok(self.execute(instr))
    }

    fn operand_value(&self, operand: Operand) -> u8 {
        match operand {
            Operand::Accumulator => self.registers.a,
            Operand::Immediate(value) => value,
            Operand::Address(addr) => self.memory.read(addr),
            Operand::Implied => unreachable!("implied operand has no value"),
        }
    }

    fn write_operand(&mut self, operand: Operand, value: u8) {
        match operand {
            Operand::Accumulator => self.registers.a = value,
            Operand::Address(addr) => self.memory.write(addr, value),
            _ => unreachable!("operand is not writable"),
        }
    }

    fn push_u8(&mut self, value: u8) {
        self.memory.write(STACK_PAGE + self.registers.sp as u16, value);
        self.registers.sp = self.registers.sp.wrapping_sub(1);
    }

    fn pull_u8(&mut self) -> u8 {
        self.registers.sp = self.registers.sp.wrapping_add(1);
        self.memory.read(STACK_PAGE + self.registers.sp as u16)
    }

    fn push_u16(&mut self, value: u16) {
        self.push_u8((value >> 8) as u8);
        self.push_u8(value as u8);
    }

    fn pull_u16(&mut self) -> u16 {
        let lo = self.pull_u8() as u16;
        let hi = self.pull_u8() as u16;
        (hi << 8) | lo
    }

    fn execute(&mut self, instr: Instr) -> StepOutcome {
        use Mnemonic::*;

        match instr.mnemonic {
            Adc => self.adc(self.operand_value(instr.operand)),
            Sbc => self.sbc(self.operand_value(instr.operand)),
            And => {
                self.registers.a &= self.operand_value(instr.operand);
                self.registers.set_zn(self.registers.a);
            }
            Ora => {
                self.registers.a |= self.operand_value(instr.operand);
                self.registers.set_zn(self.registers.a);
            }
            Eor => {
                self.registers.a ^= self.operand_value(instr.operand);
                self.registers.set_zn(self.registers.a);
            }
            Cmp => self.compare(self.registers.a, self.operand_value(instr.operand)),
            Cpx => self.compare(self.registers.x, self.operand_value(instr.operand)),
            Cpy => self.compare(self.registers.y, self.operand_value(instr.operand)),
            Bit => {
                let m = self.operand_value(instr.operand);
                self.registers.set_flag(flag::ZERO, self.registers.a & m == 0);
                self.registers.set_flag(flag::NEGATIVE, m & 0x80 != 0);
                self.registers.set_flag(flag::OVERFLOW, m & 0x40 != 0);
            }
            Asl => self.shift(instr.operand, |v| (v << 1, v & 0x80 != 0)),
            Lsr => self.shift(instr.operand, |v| (v >> 1, v & 0x01 != 0)),
            Rol => {
                let carry_in = self.registers.flag(flag::CARRY) as u8;
                self.shift(instr.operand, move |v| ((v << 1) | carry_in, v & 0x80 != 0))
            }
            Ror => {
                let carry_in = self.registers.flag(flag::CARRY) as u8;
                self.shift(instr.operand, move |v| ((v >> 1) | (carry_in << 7), v & 0x01 != 0))
            }
            Inc => {
                let value = self.operand_value(instr.operand).wrapping_add(1);
                self.registers.set_zn(value);
                self.write_operand(instr.operand, value);
            }
            Dec => {
                let value = self.operand_value(instr.operand).wrapping_sub(1);
                self.registers.set_zn(value);
                self.write_operand(instr.operand, value);
            }
            Inx => {
                self.registers.x = self.registers.x.wrapping_add(1);
                self.registers.set_zn(self.registers.x);
            }
            Iny => {
                self.registers.y = self.registers.y.wrapping_add(1);
                self.registers.set_zn(self.registers.y);
            }
            Dex => {
                self.registers.x = self.registers.x.wrapping_sub(1);
                self.registers.set_zn(self.registers.x);
            }
            Dey => {
                self.registers.y = self.registers.y.wrapping_sub(1);
                self.registers.set_zn(self.registers.y);
            }
            Lda => {
                self.registers.a = self.operand_value(instr.operand);
                self.registers.set_zn(self.registers.a);
            }
            Ldx => {
                self.registers.x = self.operand_value(instr.operand);
                self.registers.set_zn(self.registers.x);
            }
            Ldy => {
                self.registers.y = self.operand_value(instr.operand);
                self.registers.set_zn(self.registers.y);
            }
            Sta => self.write_operand(instr.operand, self.registers.a),
            Stx => self.write_operand(instr.operand, self.registers.x),
            Sty => self.write_operand(instr.operand, self.registers.y),
            Tax => {
                self.registers.x = self.registers.a;
                self.registers.set_zn(self.registers.x);
            }
            Tay => {
                self.registers.y = self.registers.a;
                self.registers.set_zn(self.registers.y);
            }
            Txa => {
                self.registers.a = self.registers.x;
                self.registers.set_zn(self.registers.a);
            }
            Tya => {
                self.registers.a = self.registers.y;
                self.registers.set_zn(self.registers.a);
            }
            Tsx => {
                self.registers.x = self.registers.sp;
                self.registers.set_zn(self.registers.x);
            }
            Txs => self.registers.sp = self.registers.x,
            Pha => self.push_u8(self.registers.a),
            Pla => {
                self.registers.a = self.pull_u8();
                self.registers.set_zn(self.registers.a);
            }
            Php => self.push_u8(self.registers.p | flag::BREAK | flag::UNUSED),
            Plp => self.registers.p = self.pull_u8(),
            Jmp => {
                if let Operand::Address(addr) = instr.operand {
                    self.registers.pc = addr;
                }
            }
            Jsr => {
                if let Operand::Address(addr) = instr.operand {
                    let return_to = self.registers.pc.wrapping_sub(1);
                    self.push_u16(return_to);
                    self.registers.pc = addr;
                }
            }
            Rts => {
                let addr = self.pull_u16();
                self.registers.pc = addr.wrapping_add(1);
            }
            Rti => {
                self.registers.p = self.pull_u8();
                self.registers.pc = self.pull_u16();
            }
            Brk => return StepOutcome::Halted,
            Nop => {}
            Bpl => self.branch(!self.registers.flag(flag::NEGATIVE), instr.operand),
            Bmi => self.branch(self.registers.flag(flag::NEGATIVE), instr.operand),
            Bvc => self.branch(!self.registers.flag(flag::OVERFLOW), instr.operand),
            Bvs => self.branch(self.registers.flag(flag::OVERFLOW), instr.operand),
            Bcc => self.branch(!self.registers.flag(flag::CARRY), instr.operand),
            Bcs => self.branch(self.registers.flag(flag::CARRY), instr.operand),
            Bne => self.branch(!self.registers.flag(flag::ZERO), instr.operand),
            Beq => self.branch(self.registers.flag(flag::ZERO), instr.operand),
            Clc => self.registers.set_flag(flag::CARRY, false),
            Sec => self.registers.set_flag(flag::CARRY, true),
            Cli => self.registers.set_flag(flag::INTERRUPT_DISABLE, false),
            Sei => self.registers.set_flag(flag::INTERRUPT_DISABLE, true),
            Clv => self.registers.set_flag(flag::OVERFLOW, false),
            Cld => self.registers.set_flag(flag::DECIMAL, false),
            Sed => self.registers.set_flag(flag::DECIMAL, true),
        }

        StepOutcome::Continue
    }

    fn adc(&mut self, m: u8) {
        let a = self.registers.a;
        let carry_in = self.registers.flag(flag::CARRY) as u16;
        let sum = a as u16 + m as u16 + carry_in;
        let result = sum as u8;
        self.registers.set_flag(flag::CARRY, sum > 0xff);
        self.registers
            .set_flag(flag::OVERFLOW, (!(a ^ m) & (a ^ result) & 0x80) != 0);
        self.registers.set_zn(result);
        self.registers.a = result;
    }

    fn sbc(&mut self, m: u8) {
        let a = self.registers.a;
        let carry_in = self.registers.flag(flag::CARRY) as u16;
        let inverted = !m;
        let sum = a as u16 + inverted as u16 + carry_in;
        let result = sum as u8;
        self.registers.set_flag(flag::CARRY, sum > 0xff);
        self.registers
            .set_flag(flag::OVERFLOW, ((a ^ m) & (a ^ result) & 0x80) != 0);
        self.registers.set_zn(result);
        self.registers.a = result;
    }

    fn compare(&mut self, register: u8, m: u8) {
        let result = register.wrapping_sub(m);
        self.registers.set_flag(flag::CARRY, register >= m);
        self.registers.set_zn(result);
    }

    fn shift(&mut self, operand: Operand, op: impl FnOnce(u8) -> (u8, bool)) {
        let value = self.operand_value(operand);
        let (result, carry_out) = op(value);
        self.registers.set_flag(flag::CARRY, carry_out);
        self.registers.set_zn(result);
        self.write_operand(operand, result);
    }

    fn branch(&mut self, taken: bool, operand: Operand) {
        if taken {
            if let Operand::Address(target) = operand {
                self.registers.pc = target;
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

    #[test]
    fn adc_sets_carry_on_unsigned_overflow() {
        let mut cpu = Cpu::new();
        cpu.registers.a = 0xff;
        cpu.adc(0x01);
        assert_eq!(cpu.registers.a, 0);
        assert!(cpu.registers.flag(flag::CARRY));
        assert!(cpu.registers.flag(flag::ZERO));
    }

    #[test]
    fn adc_sbc_inverse_law_restores_accumulator() {
        let mut cpu = Cpu::new();
        cpu.registers.a = 0x50;
        cpu.registers.set_flag(flag::CARRY, true);
        let original = cpu.registers.a;
        cpu.sbc(0x10);
        cpu.adc(0x10);
        assert_eq!(cpu.registers.a, original);
        assert!(cpu.registers.flag(flag::CARRY));
    }

    #[test]
    fn hello_counter_scenario() {
        // LDY #$00 ; LDX #$03 ; LDA #$41 ; loop: STA $0400,Y ; INY ; INX ;
        // CPX #$06 ; BNE loop ; BRK
        //
        // The loop counter (X, 3..6) and the store index (Y, 0..2) are
        // distinct so that three consecutive display cells end up 'A'.
        let program = [
            0xa0, 0x00, // LDY #$00
            0xa2, 0x03, // LDX #$03
            0xa9, 0x41, // LDA #$41
            0x99, 0x00, 0x04, // loop: STA $0400,Y
            0xc8, // INY
            0xe8, // INX
            0xe0, 0x06, // CPX #$06
            0xd0, (-9i8) as u8, // BNE loop
            0x00, // BRK
        ];
        let mut cpu = Cpu::new();
        cpu.load_program(&program);
        loop {
            match cpu.step().unwrap() {
                StepOutcome::Continue => {}
                StepOutcome::Halted => break,
            }
        }
        assert_eq!(cpu.memory.read(0x0400), b'A');
        assert_eq!(cpu.memory.read(0x0401), b'A');
        assert_eq!(cpu.memory.read(0x0402), b'A');
        assert_eq!(cpu.registers.x, 6);
    }

    #[test]
    fn jsr_then_rts_round_trips_pc() {
        let mut cpu = Cpu::new();
        // JSR $0610; NOP; BRK  at 0x0600
        cpu.memory.load(0x0600, &[0x20, 0x10, 0x06, 0x00]);
        // RTS at 0x0610
        cpu.memory.write(0x0610, 0x60);
        cpu.registers.pc = 0x0600;
        cpu.step().unwrap(); // JSR
        assert_eq!(cpu.registers.pc, 0x0610);
        cpu.step().unwrap(); // RTS
        assert_eq!(cpu.registers.pc, 0x0603);
    }

    #[test]
    fn php_forces_break_and_unused_bits() {
        let mut cpu = Cpu::new();
        cpu.registers.p = 0;
        cpu.push_u8(cpu.registers.p | flag::BREAK | flag::UNUSED);
        let pushed = cpu.pull_u8();
        assert_eq!(pushed, flag::BREAK | flag::UNUSED);
    }

    #[test]
    fn bit_copies_overflow_from_bit_six() {
        let mut cpu = Cpu::new();
        cpu.registers.a = 0xff;
        cpu.memory.write(0x10, 0b0100_0000);
        cpu.execute(Instr { mnemonic: Mnemonic::Bit, operand: Operand::Address(0x10) });
        assert!(cpu.registers.flag(flag::OVERFLOW));
        assert!(!cpu.registers.flag(flag::NEGATIVE));
        assert!(!cpu.registers.flag(flag::ZERO));
    }
}

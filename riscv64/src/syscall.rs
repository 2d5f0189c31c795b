//! A minimal Linux syscall ABI, dispatched from ECALL.
//!
//! Only the handful of syscalls a freestanding RV64 program needs to
//! do I/O and exit cleanly are implemented. Everything else is fatal,
//! per the Non-goals (no virtual filesystem, no signals, no process
//! model).

use std::io::{self, Read, Write};

use thiserror::Error;

use crate::hart::Hart;
use crate::memory::{MemoryError, Wordsize};

const SYS_READ: u64 = 63;
const SYS_WRITE: u64 = 64;
const SYS_EXIT: u64 = 93;
const SYS_GETTIMEOFDAY: u64 = 169;

/// The reference `gettimeofday` stub: a fixed point in time, so that
/// tests observing its output are deterministic. A conformant
/// implementation may return real wall-clock time instead.
const STUB_TV_SEC: u64 = 1_234_567_890;

#[derive(Debug, Error)]
pub enum SyscallError {
    #[error("unrecognized syscall number {0}")]
    UnknownSyscall(u64),
    #[error("unsupported file descriptor {0}")]
    UnsupportedFd(u64),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub enum SyscallOutcome {
    Continue,
    Exit(i64),
}

/// Dispatch the ECALL whose number is in a7 (x17), using a0..a6 (x10..x16)
/// as arguments, following the registers arguments/return convention.
pub fn dispatch(hart: &mut Hart) -> Result<SyscallOutcome, SyscallError> {
    let number = hart.registers.x(17);
    match number {
        SYS_READ => sys_read(hart),
        SYS_WRITE => sys_write(hart),
        SYS_EXIT => Ok(SyscallOutcome::Exit(hart.registers.x(10) as i64)),
        SYS_GETTIMEOFDAY => sys_gettimeofday(hart),
        other => Err(SyscallError::UnknownSyscall(other)),
    }
}

fn sys_read(hart: &mut Hart) -> Result<SyscallOutcome, SyscallError> {
    let fd = hart.registers.x(10);
    if fd != 0 {
        return Err(SyscallError::UnsupportedFd(fd));
    }
    let addr = hart.registers.x(11);
    let count = hart.registers.x(12) as usize;

    let mut buf = vec![0u8; count];
    let mut read = 0;
    let stdin = io::stdin();
    let mut lock = stdin.lock();
    while read < count {
        let mut byte = [0u8; 1];
        match lock.read(&mut byte)? {
            0 => break,
            _ => {
                buf[read] = byte[0];
                read += 1;
                if byte[0] == b'\n' {
                    break;
                }
            }
        }
    }
    hart.memory.write_bytes(addr, &buf[..read])?;
    hart.registers.set_x(10, read as u64);
    Ok(SyscallOutcome::Continue)
}

fn sys_write(hart: &mut Hart) -> Result<SyscallOutcome, SyscallError> {
    let fd = hart.registers.x(10);
    if fd != 1 {
        return Err(SyscallError::UnsupportedFd(fd));
    }
    let addr = hart.registers.x(11);
    let count = hart.registers.x(12);
    let bytes = hart.memory.read_bytes(addr, count)?;
    io::stdout().write_all(bytes)?;
    io::stdout().flush()?;
    hart.registers.set_x(10, count);
    Ok(SyscallOutcome::Continue)
}

fn sys_gettimeofday(hart: &mut Hart) -> Result<SyscallOutcome, SyscallError> {
    let tv_addr = hart.registers.x(10);
    let tz_addr = hart.registers.x(11);
    hart.memory.write(tv_addr, STUB_TV_SEC, Wordsize::Doubleword)?;
    hart.memory.write(tv_addr + 8, 0, Wordsize::Doubleword)?;
    hart.memory.write(tz_addr, 0, Wordsize::Doubleword)?;
    hart.registers.set_x(10, 0);
    Ok(SyscallOutcome::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hart::Hart;

    #[test]
    fn gettimeofday_writes_stub_timeval_and_returns_zero() {
        let mut hart = Hart::new();
        hart.registers.set_x(17, SYS_GETTIMEOFDAY);
        hart.registers.set_x(10, 0x1000);
        hart.registers.set_x(11, 0);
        dispatch(&mut hart).unwrap();
        assert_eq!(
            hart.memory.read(0x1000, Wordsize::Doubleword).unwrap(),
            STUB_TV_SEC
        );
        assert_eq!(
            hart.memory.read(0x1008, Wordsize::Doubleword).unwrap(),
            0
        );
        assert_eq!(hart.registers.x(10), 0);
    }

    #[test]
    fn write_to_unsupported_fd_is_fatal() {
        let mut hart = Hart::new();
        hart.registers.set_x(17, SYS_WRITE);
        hart.registers.set_x(10, 2);
        assert!(dispatch(&mut hart).is_err());
    }

    #[test]
    fn unknown_syscall_number_is_fatal() {
        let mut hart = Hart::new();
        hart.registers.set_x(17, 9999);
        assert!(matches!(
            dispatch(&mut hart),
            Err(SyscallError::UnknownSyscall(9999))
        ));
    }
}

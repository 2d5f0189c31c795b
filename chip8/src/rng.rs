//! `Cxkk`'s random-byte source.
//!
//! The spec leaves the PRNG algorithm unspecified but requires that
//! tests be able to supply a seed or a mock, so [`Cpu`](crate::cpu::Cpu)
//! takes its byte source as a trait object rather than reaching for
//! thread-local randomness directly.

use rand::RngCore;

pub trait ByteRng {
    fn next_byte(&mut self) -> u8;
}

impl<R: RngCore> ByteRng for R {
    fn next_byte(&mut self) -> u8 {
        self.next_u32() as u8
    }
}

/// Boxed default source, backed by the thread-local CSPRNG.
pub fn thread_rng() -> Box<dyn ByteRng> {
    Box::new(rand::rng())
}

#[cfg(test)]
pub(crate) struct FixedRng(pub Vec<u8>, pub usize);

#[cfg(test)]
impl ByteRng for FixedRng {
    fn next_byte(&mut self) -> u8 {
        let value = self.0[self.1 % self.0.len()];
        self.1 += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_rng_cycles_through_sequence() {
        let mut rng = FixedRng(vec![1, 2, 3], 0);
        assert_eq!(rng.next_byte(), 1);
        assert_eq!(rng.next_byte(), 2);
        assert_eq!(rng.next_byte(), 3);
        assert_eq!(rng.next_byte(), 1);
    }
}

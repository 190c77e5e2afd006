//! Register level access to the sensor.
//!
//! The driver only needs three primitives from the bus: write a byte to a
//! register, read a word from a register and read a contiguous block of
//! registers. [`I2cBus`] provides them on top of any `embedded-hal` blocking
//! I2C implementation, other transports (e.g. a kernel SMBus interface that
//! can return short block reads) can implement [`Bus`] directly.

use embedded_hal::blocking::i2c::WriteRead;

use crate::{I2cMarker, I2C_ADDRESS};

/// Primitive register operations against a single device address.
pub trait Bus {
    type Error;

    /// Writes `value` to `register`.
    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), Self::Error>;

    /// Reads the 16 bit word starting at `register`.
    ///
    /// The word is returned in the transport's native (SMBus, low byte
    /// first) order, the caller is responsible for any swap.
    fn read_word(&mut self, register: u8) -> Result<u16, Self::Error>;

    /// Reads up to `buffer.len()` consecutive registers starting at
    /// `register` and returns how many bytes were actually transferred.
    fn read_block(&mut self, register: u8, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

/// A [`Bus`] over an `embedded-hal` I2C peripheral.
pub struct I2cBus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2cMarker> I2cBus<I2C> {
    /// Wraps `i2c`, addressing the BMP180 at its fixed address.
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: I2C_ADDRESS,
        }
    }

    /// Releases the i2c handle.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2cMarker> Bus for I2cBus<I2C> {
    type Error = <I2C as WriteRead>::Error;

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        self.i2c.write(self.address, &[register, value])
    }

    fn read_word(&mut self, register: u8) -> Result<u16, Self::Error> {
        let mut buffer = [0u8; 2];
        self.i2c.write_read(self.address, &[register], &mut buffer)?;
        // SMBus words go out low byte first.
        Ok(u16::from_le_bytes(buffer))
    }

    fn read_block(&mut self, register: u8, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        self.i2c.write_read(self.address, &[register], buffer)?;
        Ok(buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::{
        i2c::{Mock as I2cMock, Transaction as I2cTransaction},
        MockError,
    };
    use std::io::ErrorKind;

    #[test]
    fn write_byte_sends_register_then_value() {
        let i2c = I2cMock::new(&[I2cTransaction::write(I2C_ADDRESS, vec![0xF4, 0x2E])]);
        let mut bus = I2cBus::new(i2c);
        bus.write_byte(0xF4, 0x2E).unwrap();
        // Finalise expectations
        bus.release().done();
    }

    #[test]
    fn read_word_is_little_endian() {
        let i2c = I2cMock::new(&[I2cTransaction::write_read(
            I2C_ADDRESS,
            vec![0xF6],
            vec![0x6C, 0xFA],
        )]);
        let mut bus = I2cBus::new(i2c);
        assert_eq!(bus.read_word(0xF6).unwrap(), 0xFA6C);
        bus.release().done();
    }

    #[test]
    fn read_block_fills_whole_buffer() {
        let i2c = I2cMock::new(&[I2cTransaction::write_read(
            I2C_ADDRESS,
            vec![0xAA],
            vec![1, 2, 3, 4],
        )]);
        let mut bus = I2cBus::new(i2c);
        let mut buffer = [0u8; 4];
        assert_eq!(bus.read_block(0xAA, &mut buffer).unwrap(), 4);
        assert_eq!(buffer, [1, 2, 3, 4]);
        bus.release().done();
    }

    #[test]
    fn errors_pass_through() {
        let i2c = I2cMock::new(&[I2cTransaction::write_read(I2C_ADDRESS, vec![0xF6], vec![0, 0])
            .with_error(MockError::Io(ErrorKind::Other))]);
        let mut bus = I2cBus::new(i2c);
        bus.read_word(0xF6).unwrap_err();
        bus.release().done();
    }
}

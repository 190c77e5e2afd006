//! One-shot read sessions over a shared sensor.
//!
//! A [`Device`] owns an initialised driver and hands out [`Session`]s. The
//! first successful read of a session produces the text payload, every read
//! after that returns 0 (end of stream) without touching the bus. A failed
//! read leaves the session unread, the next read starts a fresh acquisition.
//!
//! ```rust
//! # use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
//! # let i2c = I2cMock::new(&[
//! #     I2cTransaction::write_read(0x77, vec![0xAA], vec![
//! #         0x01, 0x98, 0xFF, 0xB8, 0xC7, 0xD1, 0x7F, 0xE5, 0x7F, 0xF5, 0x5A, 0x71,
//! #         0x18, 0x2E, 0x00, 0x04, 0x80, 0x00, 0xDD, 0xF9, 0x0B, 0x34]),
//! #     I2cTransaction::write(0x77, vec![0xF4, 0x2E]),
//! #     I2cTransaction::write_read(0x77, vec![0xF6], vec![0x6C, 0xFA]),
//! #     I2cTransaction::write(0x77, vec![0xF4, 0x34]),
//! #     I2cTransaction::write_read(0x77, vec![0xF6], vec![0x5D, 0x23]),
//! # ]);
//! use bmp180::{device::Device, mock_utils::SleepNop};
//!
//! let sensor = bmp180::new(i2c, SleepNop).init().map_err(|(e, _)| e).unwrap();
//! let device = Device::new(sensor);
//!
//! let mut session = device.open();
//! let mut buffer = [0u8; 64];
//! let len = session.read(&mut buffer).unwrap();
//! assert_eq!(&buffer[..len], b"Temperature: 15.0 C, Pressure: 699 hPa\n");
//! assert_eq!(session.read(&mut buffer).unwrap(), 0);
//! session.close();
//! # let (bus, _) = device.into_inner().release();
//! # bus.release().done();
//! ```

use std::fmt;
use std::io;
use std::sync::{Mutex, PoisonError};

use embedded_hal::blocking::delay::DelayUs;
use log::debug;

use crate::acquisition::{RawSample, Sequencer};
use crate::bus::Bus;
use crate::calibration::CalibrationParameters;
use crate::{compensation, format, Initialised, SensorError};

/// Where a session is in its one-shot life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing delivered yet, the next read acquires.
    Unread,
    /// The payload went out, reads return end of stream.
    Delivered,
}

/// A sensor shared between sessions.
///
/// Acquisitions from different sessions never interleave, the lock covers the
/// temperature and the pressure conversion together. Calibration is
/// read-only and lives outside the lock.
pub struct Device<B: Bus, D: DelayUs<u32>> {
    sequencer: Mutex<Sequencer<B, D>>,
    calibration: CalibrationParameters,
}

impl<B: Bus, D: DelayUs<u32>> Device<B, D> {
    pub fn new(sensor: Initialised<B, D>) -> Self {
        let (sequencer, calibration) = sensor.into_parts();
        Self {
            sequencer: Mutex::new(sequencer),
            calibration,
        }
    }

    /// Hands the driver back, e.g. to release the bus on detach.
    pub fn into_inner(self) -> Initialised<B, D> {
        let sequencer = self
            .sequencer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        Initialised::from_parts(sequencer, self.calibration)
    }

    pub fn calibration(&self) -> &CalibrationParameters {
        &self.calibration
    }

    /// Creates a fresh, unread session.
    pub fn open(&self) -> Session<'_, B, D> {
        debug!("session opened");
        Session {
            device: self,
            state: SessionState::Unread,
        }
    }

    fn acquire(&self) -> Result<RawSample, SensorError<B::Error>> {
        // Every acquisition starts with a fresh command, a reader that
        // panicked mid-way leaves nothing to undo.
        let mut sequencer = self
            .sequencer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        sequencer.read_raw_sample()
    }
}

/// An open read handle on a [`Device`].
pub struct Session<'a, B: Bus, D: DelayUs<u32>> {
    device: &'a Device<B, D>,
    state: SessionState,
}

impl<B: Bus, D: DelayUs<u32>> Session<'_, B, D> {
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Reads the payload into `buf`.
    ///
    /// Returns the payload length on the first successful read and 0 on
    /// every read after that.
    ///
    /// # Errors
    /// Bus, compensation and `buf` size errors are returned as is, the
    /// session stays unread so the whole read can be retried.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, SensorError<B::Error>> {
        if self.state == SessionState::Delivered {
            return Ok(0);
        }

        let sample = self.device.acquire()?;
        let reading = compensation::compute(
            sample.raw_temperature,
            sample.raw_pressure,
            &self.device.calibration,
        )?;
        let payload = format::render(&reading);
        let len = payload.len();
        if buf.len() < len {
            return Err(SensorError::BufferTooSmall {
                needed: len,
                available: buf.len(),
            });
        }
        buf[..len].copy_from_slice(payload.as_bytes());

        self.state = SessionState::Delivered;
        debug!("payload delivered ({} bytes)", len);
        Ok(len)
    }

    /// Closes the session. Dropping it has the same effect.
    pub fn close(self) {}
}

impl<B: Bus, D: DelayUs<u32>> Drop for Session<'_, B, D> {
    fn drop(&mut self) {
        debug!("session closed ({:?})", self.state);
    }
}

impl<B, D> io::Read for Session<'_, B, D>
where
    B: Bus,
    B::Error: fmt::Debug + Send + Sync + 'static,
    D: DelayUs<u32>,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Session::read(self, buf).map_err(|e| match e {
            SensorError::BufferTooSmall { .. } => io::Error::new(io::ErrorKind::InvalidInput, e),
            e => io::Error::new(io::ErrorKind::Other, e),
        })
    }
}

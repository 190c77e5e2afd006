//! Measurement sequencing: command, settle, read back.

use embedded_hal::blocking::delay::DelayUs;
use log::debug;

use crate::bus::Bus;
use crate::{Command, Register, SensorError, CONVERSION_TIME_US};

/// A pair of uncompensated ADC counts taken back to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub raw_temperature: u16,
    pub raw_pressure: u16,
}

/// Owns the bus and the delay, i.e. everything that touches the sensor's
/// shared conversion state.
///
/// The result register is shared by both measurements, callers sharing one
/// sensor must serialise whole [`Sequencer::read_raw_sample`] calls.
pub struct Sequencer<B, D> {
    bus: B,
    sleep: D,
}

impl<B: Bus, D: DelayUs<u32>> Sequencer<B, D> {
    pub(crate) fn new(bus: B, sleep: D) -> Self {
        Self { bus, sleep }
    }

    /// Releases the bus and the delay.
    pub fn release(self) -> (B, D) {
        (self.bus, self.sleep)
    }

    // Issues a conversion and reads the 16bit result once it has settled.
    fn convert(&mut self, command: Command) -> Result<u16, SensorError<B::Error>> {
        self.bus
            .write_byte(Register::Control.into(), command.into())
            .map_err(SensorError::I2cError)?;
        self.sleep.delay_us(CONVERSION_TIME_US);
        let word = self
            .bus
            .read_word(Register::Result.into())
            .map_err(SensorError::I2cError)?;
        // The sensor sends MSB first, the bus hands us LSB first.
        Ok(word.swap_bytes())
    }

    /// Starts a temperature conversion and reads the raw count (UT).
    pub fn read_raw_temperature(&mut self) -> Result<u16, SensorError<B::Error>> {
        self.convert(Command::MeasureTemperature)
    }

    /// Starts a pressure conversion at oversampling 0 and reads the raw
    /// count (UP).
    pub fn read_raw_pressure(&mut self) -> Result<u16, SensorError<B::Error>> {
        self.convert(Command::MeasurePressure)
    }

    /// Reads temperature then pressure.
    pub fn read_raw_sample(&mut self) -> Result<RawSample, SensorError<B::Error>> {
        let raw_temperature = self.read_raw_temperature()?;
        let raw_pressure = self.read_raw_pressure()?;
        debug!("raw sample: UT={} UP={}", raw_temperature, raw_pressure);
        Ok(RawSample {
            raw_temperature,
            raw_pressure,
        })
    }
}

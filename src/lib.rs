//! # Getting started
//!
//! A platform agnostic driver for the [BMP180](https://cdn-shop.adafruit.com/datasheets/BST-BMP180-DS000-09.pdf)
//! digital pressure sensor from Bosch Sensortec.
//!
//! This driver reads the factory calibration once, samples the on-chip ADC
//! and runs the datasheet's fixed point compensation to produce temperature
//! in 0.1 deg C and pressure in Pa. With the `std` feature (default) a
//! [`device::Device`] shares one sensor between any number of one-shot read
//! sessions that yield the text payload
//! `Temperature: 15.0 C, Pressure: 699 hPa\n`.
//!
//! ## Example
//! ```rust
//! # // NOTE: Use real i2c instance for your app.
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
//! use bmp180::mock_utils::SleepNop;
//! // NOTE: You should implement the DelayUs trait for this driver to work
//! // correctly.
//! let pressure_sensor = bmp180::new(i2c, SleepNop);
//! let mut pressure_sensor = pressure_sensor.init().map_err(|(e, _)| e).unwrap();
//! let reading = pressure_sensor.read_temperature_and_pressure().unwrap();
//! assert_eq!(reading.temperature_decidegrees, 150);
//! assert_eq!(reading.pressure_pascals, 69964);
//! # let (bus, _) = pressure_sensor.release();
//! # bus.release().done();
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(all(test, not(feature = "std")))]
#[macro_use]
extern crate std;

pub mod acquisition;
pub mod bus;
pub mod calibration;
pub mod compensation;
#[cfg(feature = "std")]
pub mod device;
pub mod format;

use core::fmt;

use embedded_hal::blocking::{
    delay::DelayUs,
    i2c::{Write, WriteRead},
};
use log::error;

use crate::acquisition::{RawSample, Sequencer};
use crate::bus::{Bus, I2cBus};
use crate::calibration::CalibrationParameters;
use crate::compensation::{CompensatedReading, ComputationError};

/// Mock utils is a set of tools to aid in testing and documenting you should not
/// use any of the mocks defined in this module in your release binaries.
pub mod mock_utils {
    /// A sleep implementation that does nothing and immediately exits. This is
    /// useful for testing and fuzzing.
    pub struct SleepNop;

    impl embedded_hal::blocking::delay::DelayUs<u32> for SleepNop {
        fn delay_us(&mut self, _us: u32) {
            // Nop
        }
    }
}

/// The fixed I2C address of the BMP180.
pub const I2C_ADDRESS: u8 = 0x77;

/// Time to wait after starting a conversion. The datasheet asks for at least
/// 4.5ms at oversampling 0.
pub const CONVERSION_TIME_US: u32 = 5_000;

/// A catch all error for this driver
#[derive(Debug, PartialEq)]
pub enum SensorError<E> {
    /// The bus transfer failed.
    I2cError(E),
    /// The calibration block read returned the wrong number of bytes.
    CalibrationLength { expected: usize, got: usize },
    /// The compensation hit a zero divisor.
    Computation(ComputationError),
    /// The caller's buffer cannot hold the payload.
    BufferTooSmall { needed: usize, available: usize },
}

impl<E> From<ComputationError> for SensorError<E> {
    fn from(error: ComputationError) -> Self {
        SensorError::Computation(error)
    }
}

impl<E: fmt::Debug> fmt::Display for SensorError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::I2cError(e) => write!(f, "i2c transfer failed: {:?}", e),
            SensorError::CalibrationLength { expected, got } => write!(
                f,
                "calibration read returned {} bytes, expected {}",
                got, expected
            ),
            SensorError::Computation(e) => write!(f, "compensation failed: {:?}", e),
            SensorError::BufferTooSmall { needed, available } => write!(
                f,
                "payload needs {} bytes, buffer holds {}",
                needed, available
            ),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for SensorError<E> {}

/// Register map, only the registers this driver touches.
#[derive(Debug, Clone, Copy)]
enum Register {
    /// First of the 22 calibration EEPROM bytes (AC1 MSB).
    Calibration = 0xAA,
    Control = 0xF4,
    /// Conversion result, MSB at 0xF6 and LSB at 0xF7.
    Result = 0xF6,
}

impl From<Register> for u8 {
    fn from(val: Register) -> u8 {
        val as u8
    }
}

/// A measurement command written to the control register.
enum Command {
    MeasureTemperature,
    /// Pressure at oversampling setting 0.
    MeasurePressure,
}

/// Convert the command into the byte that goes into the control register.
impl From<Command> for u8 {
    fn from(val: Command) -> u8 {
        use Command::*;
        match val {
            MeasureTemperature => 0x2E,
            MeasurePressure => 0x34,
        }
    }
}

pub trait I2cMarker: WriteRead + Write
where
    Self: Write<Error = <Self as WriteRead>::Error>,
{
}
impl<T: WriteRead + Write> I2cMarker for T where Self: Write<Error = <Self as WriteRead>::Error> {}

/// Create an uninitialised driver object
///
/// # Example
///
/// ```
/// // NOTE: Use real i2c instance for your app.
/// use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
/// use bmp180::mock_utils::SleepNop;
/// // NOTE: You should implement the DelayUs trait for this driver to work
/// // correctly.
/// let i2c = I2cMock::new(&[]);
/// let pressure_sensor = bmp180::new(i2c, SleepNop);
/// # let (bus, _) = pressure_sensor.release();
/// # bus.release().done();
/// ```
pub fn new<I2C: I2cMarker, D: DelayUs<u32>>(i2c: I2C, sleep: D) -> Uninitialised<I2cBus<I2C>, D> {
    Uninitialised::with_bus(I2cBus::new(i2c), sleep)
}

/// An uninitialised bmp180 object, calibration has not been read yet.
pub struct Uninitialised<B: Bus, D: DelayUs<u32>> {
    bus: B,
    sleep: D,
}

impl<B: Bus, D: DelayUs<u32>> Uninitialised<B, D> {
    /// Create an uninitialised driver on top of any [`Bus`].
    pub fn with_bus(bus: B, sleep: D) -> Self {
        Self { bus, sleep }
    }

    /// Releases the bus and delay handles consuming the driver object.
    pub fn release(self) -> (B, D) {
        (self.bus, self.sleep)
    }

    /// Initialises the pressure sensor by loading its factory calibration.
    ///
    /// # Errors
    /// Initialisation can fail if;
    /// - There was a problem communicating over i2c.
    /// - The calibration block read returned anything other than 22 bytes.
    ///
    /// NOTE: on failure the uninitialised driver is handed back along with the
    /// error so the caller can release the bus and delay handles.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    /// # let i2c = I2cMock::new(&[
    /// #     I2cTransaction::write_read(0x77, vec![0xAA], vec![0u8; 22]),
    /// # ]);
    /// use bmp180::mock_utils::SleepNop;
    /// let pressure_sensor = bmp180::new(i2c, SleepNop);
    /// let pressure_sensor = match pressure_sensor.init() {
    ///     Ok(sensor) => sensor,
    ///     Err((e, uninitialised)) => {
    ///         let (_bus, _sleep) = uninitialised.release();
    ///         panic!("{:?}", e);
    ///     }
    /// };
    /// # let (bus, _) = pressure_sensor.release();
    /// # bus.release().done();
    /// ```
    #[allow(clippy::type_complexity)]
    pub fn init(mut self) -> Result<Initialised<B, D>, (SensorError<B::Error>, Self)> {
        match CalibrationParameters::load(&mut self.bus) {
            Ok(calibration) => Ok(Initialised {
                sequencer: Sequencer::new(self.bus, self.sleep),
                calibration,
            }),
            Err(e) => {
                error!("failed to read calibration data, aborting attach");
                Err((e, self))
            }
        }
    }
}

/// An initialised bmp180 object.
pub struct Initialised<B: Bus, D: DelayUs<u32>> {
    sequencer: Sequencer<B, D>,
    calibration: CalibrationParameters,
}

impl<B: Bus, D: DelayUs<u32>> Initialised<B, D> {
    /// Release the bus and delay handles consuming the driver.
    pub fn release(self) -> (B, D) {
        self.sequencer.release()
    }

    /// The calibration read at initialisation.
    pub fn calibration(&self) -> &CalibrationParameters {
        &self.calibration
    }

    /// Splits the driver into the part that owns the hardware and the
    /// read-only calibration.
    pub fn into_parts(self) -> (Sequencer<B, D>, CalibrationParameters) {
        (self.sequencer, self.calibration)
    }

    /// Reassembles a driver from [`Initialised::into_parts`].
    #[cfg(feature = "std")]
    pub(crate) fn from_parts(sequencer: Sequencer<B, D>, calibration: CalibrationParameters) -> Self {
        Self {
            sequencer,
            calibration,
        }
    }

    /// Reads the raw temperature and pressure counts, temperature first.
    pub fn read_raw_sample(&mut self) -> Result<RawSample, SensorError<B::Error>> {
        self.sequencer.read_raw_sample()
    }

    /// Reads the temperature and pressure from the sensor.
    ///
    /// # Errors
    /// This may return an error if there is a problem with i2c communication
    /// or if the compensation hits a zero divisor.
    pub fn read_temperature_and_pressure(
        &mut self,
    ) -> Result<CompensatedReading, SensorError<B::Error>> {
        let sample = self.read_raw_sample()?;
        Ok(compensation::compute(
            sample.raw_temperature,
            sample.raw_pressure,
            &self.calibration,
        )?)
    }

    /// Reads the temperature from the sensor in 0.1 deg C.
    ///
    /// # Errors
    /// This may return an error if there is a problem with i2c communication
    /// or if the compensation hits a zero divisor.
    pub fn read_temperature(&mut self) -> Result<i32, SensorError<B::Error>> {
        let raw_temperature = self.sequencer.read_raw_temperature()?;
        Ok(compensation::temperature(raw_temperature, &self.calibration)?)
    }
}

//! Factory calibration constants stored in the sensor's EEPROM.

use log::info;

use crate::bus::Bus;
use crate::{Register, SensorError};

/// Size of the calibration EEPROM, 11 big endian words.
pub const CALIBRATION_LEN: usize = 22;

/// The factory calibration data as fetched from the EEPROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationParameters {
    pub ac1: i16,
    pub ac2: i16,
    pub ac3: i16,
    pub ac4: u16,
    pub ac5: u16,
    pub ac6: u16,
    pub b1: i16,
    pub b2: i16,
    pub mb: i16,
    pub mc: i16,
    pub md: i16,
}

impl CalibrationParameters {
    /// Reads the whole EEPROM in one block and decodes it.
    ///
    /// # Errors
    /// Fails if the bus reports an error or if the transport delivered
    /// anything other than exactly [`CALIBRATION_LEN`] bytes.
    pub fn load<B: Bus>(bus: &mut B) -> Result<Self, SensorError<B::Error>> {
        let mut eeprom = [0u8; CALIBRATION_LEN];
        let got = bus
            .read_block(Register::Calibration.into(), &mut eeprom)
            .map_err(SensorError::I2cError)?;
        if got != CALIBRATION_LEN {
            return Err(SensorError::CalibrationLength {
                expected: CALIBRATION_LEN,
                got,
            });
        }
        let calibration = Self::from_bytes(&eeprom);
        info!(
            "calibration loaded: AC1={} AC2={} AC3={} AC4={} AC5={} AC6={} B1={} B2={} MB={} MC={} MD={}",
            calibration.ac1,
            calibration.ac2,
            calibration.ac3,
            calibration.ac4,
            calibration.ac5,
            calibration.ac6,
            calibration.b1,
            calibration.b2,
            calibration.mb,
            calibration.mc,
            calibration.md,
        );
        Ok(calibration)
    }

    /// Decodes the EEPROM image, fields in register order.
    pub fn from_bytes(eeprom: &[u8; CALIBRATION_LEN]) -> Self {
        let word = |index: usize| [eeprom[2 * index], eeprom[2 * index + 1]];
        Self {
            ac1: i16::from_be_bytes(word(0)),
            ac2: i16::from_be_bytes(word(1)),
            ac3: i16::from_be_bytes(word(2)),
            ac4: u16::from_be_bytes(word(3)),
            ac5: u16::from_be_bytes(word(4)),
            ac6: u16::from_be_bytes(word(5)),
            b1: i16::from_be_bytes(word(6)),
            b2: i16::from_be_bytes(word(7)),
            mb: i16::from_be_bytes(word(8)),
            mc: i16::from_be_bytes(word(9)),
            md: i16::from_be_bytes(word(10)),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Calibration words from the datasheet's worked example.
    pub(crate) const DATASHEET: CalibrationParameters = CalibrationParameters {
        ac1: 408,
        ac2: -72,
        ac3: -14383,
        ac4: 32741,
        ac5: 32757,
        ac6: 23153,
        b1: 6190,
        b2: 4,
        mb: -32768,
        mc: -8711,
        md: 2868,
    };

    /// The same constants as they sit in the EEPROM.
    pub(crate) const DATASHEET_EEPROM: [u8; CALIBRATION_LEN] = [
        0x01, 0x98, // AC1 408
        0xFF, 0xB8, // AC2 -72
        0xC7, 0xD1, // AC3 -14383
        0x7F, 0xE5, // AC4 32741
        0x7F, 0xF5, // AC5 32757
        0x5A, 0x71, // AC6 23153
        0x18, 0x2E, // B1 6190
        0x00, 0x04, // B2 4
        0x80, 0x00, // MB -32768
        0xDD, 0xF9, // MC -8711
        0x0B, 0x34, // MD 2868
    ];

    /// A bus whose block reads transfer a fixed number of bytes.
    struct FakeBus<'a> {
        data: &'a [u8],
        block_reads: usize,
    }

    impl<'a> FakeBus<'a> {
        fn new(data: &'a [u8]) -> Self {
            FakeBus {
                data,
                block_reads: 0,
            }
        }
    }

    impl Bus for FakeBus<'_> {
        type Error = ();

        fn write_byte(&mut self, _register: u8, _value: u8) -> Result<(), ()> {
            panic!("calibration must not write to the sensor")
        }

        fn read_word(&mut self, _register: u8) -> Result<u16, ()> {
            panic!("calibration is read as a single block")
        }

        fn read_block(&mut self, register: u8, buffer: &mut [u8]) -> Result<usize, ()> {
            assert_eq!(register, 0xAA);
            self.block_reads += 1;
            let n = self.data.len().min(buffer.len());
            buffer[..n].copy_from_slice(&self.data[..n]);
            // Report what the device claims to have sent.
            Ok(self.data.len())
        }
    }

    #[test]
    fn decodes_datasheet_example() {
        assert_eq!(CalibrationParameters::from_bytes(&DATASHEET_EEPROM), DATASHEET);
    }

    #[test]
    fn load_reads_one_block() {
        let mut bus = FakeBus::new(&DATASHEET_EEPROM);
        let calibration = CalibrationParameters::load(&mut bus).unwrap();
        assert_eq!(calibration, DATASHEET);
        assert_eq!(bus.block_reads, 1);
    }

    #[test]
    fn short_block_is_rejected() {
        let mut bus = FakeBus::new(&DATASHEET_EEPROM[..21]);
        assert_eq!(
            CalibrationParameters::load(&mut bus),
            Err(SensorError::CalibrationLength {
                expected: 22,
                got: 21
            })
        );
    }

    #[test]
    fn long_block_is_rejected() {
        let mut data = [0u8; 23];
        data[..22].copy_from_slice(&DATASHEET_EEPROM);
        let mut bus = FakeBus::new(&data);
        assert_eq!(
            CalibrationParameters::load(&mut bus),
            Err(SensorError::CalibrationLength {
                expected: 22,
                got: 23
            })
        );
    }

    #[test]
    fn signedness_per_field() {
        let calibration = CalibrationParameters::from_bytes(&[0xFF; CALIBRATION_LEN]);
        assert_eq!(calibration.ac1, -1);
        assert_eq!(calibration.ac4, u16::MAX);
        assert_eq!(calibration.ac5, u16::MAX);
        assert_eq!(calibration.ac6, u16::MAX);
        assert_eq!(calibration.mb, -1);
        assert_eq!(calibration.mc, -1);
        assert_eq!(calibration.md, -1);
    }
}

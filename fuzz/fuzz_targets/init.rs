#![no_main]
use bmp180::calibration::CalibrationParameters;
use embedded_hal_fuzz::{i2c::I2cFuzz, shared_data::FuzzData};
use libfuzzer_sys::fuzz_target;

type Error = ();

// The input is served as the 22 byte EEPROM block read at 0xAA.
fuzz_target!(|data: &[u8]| {
    let i2c: I2cFuzz<'_, Error> = I2cFuzz::new(FuzzData::new(data));
    match bmp180::new(i2c, bmp180::mock_utils::SleepNop).init() {
        Ok(sensor) => {
            // Every 16 bit pattern is a valid constant, nothing to reject.
            let _: &CalibrationParameters = sensor.calibration();
            let _ = sensor.release();
        }
        Err((_, uninitialised)) => {
            let _ = uninitialised.release();
        }
    }
});

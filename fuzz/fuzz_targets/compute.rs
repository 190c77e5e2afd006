#![no_main]
use bmp180::calibration::{CalibrationParameters, CALIBRATION_LEN};
use bmp180::{compensation, format};
use libfuzzer_sys::fuzz_target;

// 22 bytes of EEPROM followed by UT and UP, big endian.
fuzz_target!(|data: &[u8]| {
    if data.len() < CALIBRATION_LEN + 4 {
        return;
    }
    let mut eeprom = [0u8; CALIBRATION_LEN];
    eeprom.copy_from_slice(&data[..CALIBRATION_LEN]);
    let cal = CalibrationParameters::from_bytes(&eeprom);
    let ut = u16::from_be_bytes([data[CALIBRATION_LEN], data[CALIBRATION_LEN + 1]]);
    let up = u16::from_be_bytes([data[CALIBRATION_LEN + 2], data[CALIBRATION_LEN + 3]]);
    if let Ok(reading) = compensation::compute(ut, up, &cal) {
        let payload = format::render(&reading);
        assert!(payload.ends_with(" hPa\n"));
    }
});

//! Fixed point compensation of raw counts, as given in the datasheet
//! (section 3.5, oversampling setting 0).
//!
//! The datasheet's "long" intermediates are 32 bits wide, they are `i32`
//! here and `u32` where the datasheet casts to unsigned. Shifts of signed
//! values are arithmetic. Sums and products wrap, so nonsensical calibration
//! data produces garbage instead of a panic, real sensor data never gets
//! close to the limits. A build that evaluates the same steps in 64 bits
//! (C `long` on LP64 targets) agrees for every plausible part but can
//! diverge once an intermediate leaves the 32 bit range.

use log::warn;

use crate::calibration::CalibrationParameters;

/// A calibrated reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompensatedReading {
    /// Temperature in 0.1 deg C.
    pub temperature_decidegrees: i32,
    /// Pressure in Pa.
    pub pressure_pascals: i32,
}

/// The divisor that turned out to be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divisor {
    /// `x1 + md` in the temperature stage.
    TemperatureX1PlusMd,
    /// `b4` in the pressure stage.
    PressureB4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationError {
    DivideByZero(Divisor),
}

// Temperature stage, returns (temperature, b5).
fn temperature_stage(ut: u16, cal: &CalibrationParameters) -> Result<(i32, i32), ComputationError> {
    let x1 = (i32::from(ut) - i32::from(cal.ac6)).wrapping_mul(i32::from(cal.ac5)) >> 15;
    let denominator = x1.wrapping_add(i32::from(cal.md));
    if denominator == 0 {
        warn!("division by zero in temperature compensation (x1 + md = 0)");
        return Err(ComputationError::DivideByZero(Divisor::TemperatureX1PlusMd));
    }
    // |mc << 11| < 2^27, so the quotient cannot overflow.
    let x2 = (i32::from(cal.mc) << 11) / denominator;
    let b5 = x1.wrapping_add(x2);
    Ok((b5.wrapping_add(8) >> 4, b5))
}

/// Converts a raw temperature count into 0.1 deg C.
pub fn temperature(ut: u16, cal: &CalibrationParameters) -> Result<i32, ComputationError> {
    temperature_stage(ut, cal).map(|(temperature, _)| temperature)
}

/// Converts raw temperature (`ut`) and pressure (`up`) counts into a
/// calibrated reading.
///
/// # Errors
/// Returns [`ComputationError::DivideByZero`] if either divisor of the
/// algorithm is zero for this combination of counts and calibration. The
/// check happens before the division.
pub fn compute(
    ut: u16,
    up: u16,
    cal: &CalibrationParameters,
) -> Result<CompensatedReading, ComputationError> {
    let (temperature_decidegrees, b5) = temperature_stage(ut, cal)?;

    let ac1 = i32::from(cal.ac1);
    let ac2 = i32::from(cal.ac2);
    let ac3 = i32::from(cal.ac3);
    let ac4 = u32::from(cal.ac4);
    let b1 = i32::from(cal.b1);
    let b2 = i32::from(cal.b2);

    let b6 = b5.wrapping_sub(4000);
    let b6_squared = b6.wrapping_mul(b6) >> 12;
    let x1 = b2.wrapping_mul(b6_squared) >> 11;
    let x2 = ac2.wrapping_mul(b6) >> 11;
    let x3 = x1.wrapping_add(x2);
    let b3 = ac1.wrapping_mul(4).wrapping_add(x3).wrapping_add(2) >> 2;
    let x1 = ac3.wrapping_mul(b6) >> 13;
    let x2 = b1.wrapping_mul(b6_squared) >> 16;
    let x3 = x1.wrapping_add(x2).wrapping_add(2) >> 2;
    let b4 = ac4.wrapping_mul(x3.wrapping_add(32768) as u32) >> 15;
    if b4 == 0 {
        warn!("division by zero in pressure compensation (b4 = 0)");
        return Err(ComputationError::DivideByZero(Divisor::PressureB4));
    }
    let b7 = u32::from(up).wrapping_sub(b3 as u32).wrapping_mul(50000);
    let p = if b7 < 0x8000_0000 {
        (b7 * 2) / b4
    } else {
        (b7 / b4).wrapping_mul(2)
    };
    let p = p as i32;

    let x1 = (p >> 8).wrapping_mul(p >> 8);
    let x1 = x1.wrapping_mul(3038) >> 16;
    let x2 = (-7357i32).wrapping_mul(p) >> 16;
    let pressure_pascals = p.wrapping_add(x1.wrapping_add(x2).wrapping_add(3791) >> 4);

    Ok(CompensatedReading {
        temperature_decidegrees,
        pressure_pascals,
    })
}

#[cfg(test)]
mod c_implementation {
    extern "C" {
        // Algorithm as printed in the datasheet.
        // This is test only to validate the rust implementation.
        pub fn bmp180_reference(
            ut: u16,
            up: u16,
            cal: *const u16,
            temperature: *mut i32,
            pressure: *mut i32,
        ) -> i32;
    }
}

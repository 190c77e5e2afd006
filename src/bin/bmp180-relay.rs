//! Forwards BMP180 readings to TCP clients.
//!
//! Every connected client gets its own thread that opens a session, reads
//! one payload, closes the session and sends the payload verbatim, once per
//! interval. A failed read or send ends that client's connection only.
//!
//! ```bash
//! RUST_LOG=debug bmp180-relay --bus /dev/i2c-1 --listen 0.0.0.0:9000
//! ```

use std::{
    fmt,
    io::Write,
    net::{SocketAddr, TcpListener},
    path::PathBuf,
    sync::Arc,
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use bmp180::{
    bus::{Bus, I2cBus},
    device::Device,
    format::PAYLOAD_CAPACITY,
};
use clap::Parser;
use embedded_hal::blocking::delay::DelayUs;
use linux_embedded_hal::{Delay, I2cdev};
use log::{error, info, warn};

type SharedDevice = Arc<Device<I2cBus<I2cdev>, Delay>>;

// ----------------------------------------------------------------------------
// Command-line Interface

#[derive(Debug, Parser)]
#[command(about = "Serve BMP180 temperature and pressure readings over TCP")]
struct Cli {
    /// I2C bus the sensor is attached to.
    #[arg(long, default_value = "/dev/i2c-1")]
    bus: PathBuf,
    /// Address to accept clients on.
    #[arg(long, default_value = "0.0.0.0:9000")]
    listen: SocketAddr,
    /// Delay between two readings sent to the same client.
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_module("bmp180", log::LevelFilter::Info)
        .filter_module("bmp180_relay", log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    let i2c = I2cdev::new(&cli.bus)
        .with_context(|| format!("failed to open I2C bus {}", cli.bus.display()))?;
    let sensor = match bmp180::new(i2c, Delay).init() {
        Ok(sensor) => sensor,
        Err((e, uninitialised)) => {
            // Closes the bus before bailing out.
            drop(uninitialised.release());
            return Err(e).context("failed to attach BMP180");
        }
    };
    let device: SharedDevice = Arc::new(Device::new(sensor));
    info!("BMP180 attached on {}", cli.bus.display());

    let listener =
        TcpListener::bind(cli.listen).with_context(|| format!("failed to bind {}", cli.listen))?;
    info!("listening on {}", cli.listen);

    let interval = Duration::from_millis(cli.interval_ms);
    for stream in listener.incoming() {
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("accept failed: {}", e);
                continue;
            }
        };
        let device = Arc::clone(&device);
        thread::spawn(move || {
            let peer = stream
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "unknown peer".into());
            info!("{}: connected", peer);
            serve(&*device, &mut stream, &peer, interval);
            info!("{}: disconnected", peer);
        });
    }

    Ok(())
}

// ----------------------------------------------------------------------------
// Client loop

/// Sends one payload per `interval` until a read or a send fails.
fn serve<B, D, W>(device: &Device<B, D>, stream: &mut W, peer: &str, interval: Duration)
where
    B: Bus,
    B::Error: fmt::Debug,
    D: DelayUs<u32>,
    W: Write,
{
    let mut buf = [0u8; PAYLOAD_CAPACITY];
    loop {
        let mut session = device.open();
        let read = session.read(&mut buf);
        session.close();

        let len = match read {
            Ok(0) => {
                warn!("{}: sensor returned no data", peer);
                break;
            }
            Ok(len) => len,
            Err(e) => {
                error!("{}: failed to read from BMP180: {}", peer, e);
                break;
            }
        };

        if let Err(e) = stream.write_all(&buf[..len]) {
            info!("{}: send failed or client disconnected: {}", peer, e);
            break;
        }
        // The payload already ends in a newline.
        info!("{}: sent {}", peer, String::from_utf8_lossy(&buf[..len]).trim_end());
        thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmp180::mock_utils::SleepNop;
    use embedded_hal_mock::{
        i2c::{Mock as I2cMock, Transaction as I2cTransaction},
        MockError,
    };
    use std::io::{self, ErrorKind};

    const PAYLOAD: &[u8] = b"Temperature: 15.0 C, Pressure: 699 hPa\n";

    // Datasheet calibration followed by `readings` good acquisitions.
    fn transactions(readings: usize) -> Vec<I2cTransaction> {
        let mut transactions = vec![I2cTransaction::write_read(
            0x77,
            vec![0xAA],
            vec![
                0x01, 0x98, 0xFF, 0xB8, 0xC7, 0xD1, 0x7F, 0xE5, 0x7F, 0xF5, 0x5A, 0x71, 0x18,
                0x2E, 0x00, 0x04, 0x80, 0x00, 0xDD, 0xF9, 0x0B, 0x34,
            ],
        )];
        for _ in 0..readings {
            transactions.extend([
                I2cTransaction::write(0x77, vec![0xF4, 0x2E]),
                I2cTransaction::write_read(0x77, vec![0xF6], vec![0x6C, 0xFA]),
                I2cTransaction::write(0x77, vec![0xF4, 0x34]),
                I2cTransaction::write_read(0x77, vec![0xF6], vec![0x5D, 0x23]),
            ]);
        }
        transactions
    }

    fn device(transactions: &[I2cTransaction]) -> Device<I2cBus<I2cMock>, SleepNop> {
        let i2c = I2cMock::new(transactions);
        Device::new(bmp180::new(i2c, SleepNop).init().map_err(|(e, _)| e).unwrap())
    }

    fn done(device: Device<I2cBus<I2cMock>, SleepNop>) {
        let (bus, _) = device.into_inner().release();
        bus.release().done();
    }

    struct Disconnected;

    impl Write for Disconnected {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::BrokenPipe, "client went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sends_payloads_until_the_sensor_fails() {
        let mut transactions = transactions(2);
        transactions.push(
            I2cTransaction::write(0x77, vec![0xF4, 0x2E])
                .with_error(MockError::Io(ErrorKind::Other)),
        );
        let device = device(&transactions);
        let mut sent = Vec::new();
        serve(&device, &mut sent, "test", Duration::ZERO);
        assert_eq!(sent, [PAYLOAD, PAYLOAD].concat());
        done(device);
    }

    #[test]
    fn stops_after_a_failed_send() {
        // A second acquisition would hit an unscripted transfer.
        let device = device(&transactions(1));
        serve(&device, &mut Disconnected, "test", Duration::ZERO);
        done(device);
    }
}

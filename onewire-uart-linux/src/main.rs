use std::io::{Read, Write};
use std::time::Duration;

use clap::Parser;
use onewire_bus::{OneWire, OneWireSearch, OneWireSearchKind, StdBusMutex};
use onewire_uart::{
    ONEWIRE_DATA_BAUDRATE, ONEWIRE_RESET_BAUDRATE, OneWireUart, UartTransport,
};
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};

/// Enumerate 1-Wire devices behind a UART transceiver stage.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the serial device (e.g., /dev/ttyUSB0)
    #[arg(short, long)]
    path: String,
    /// Baud rate of the reset/presence transaction
    #[arg(long, default_value_t = ONEWIRE_RESET_BAUDRATE)]
    reset_baudrate: u32,
    /// Baud rate of a single bit time slot
    #[arg(long, default_value_t = ONEWIRE_DATA_BAUDRATE)]
    data_baudrate: u32,
    /// Read the ROM of the only device on the bus instead of searching
    #[arg(long)]
    read_rom: bool,
}

/// 4-operation transport over a Linux serial port.
struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl UartTransport for SerialTransport {
    type Error = serialport::Error;

    fn init(&mut self) -> Result<(), Self::Error> {
        self.port.set_data_bits(DataBits::Eight)?;
        self.port.set_parity(Parity::None)?;
        self.port.set_stop_bits(StopBits::One)?;
        self.port.clear(ClearBuffer::All)?;
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), Self::Error> {
        self.port.clear(ClearBuffer::All)?;
        Ok(())
    }

    fn set_baudrate(&mut self, baudrate: u32) -> Result<(), Self::Error> {
        self.port.set_baud_rate(baudrate)
    }

    fn transmit_receive(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Self::Error> {
        // Stale echo bytes from a timed-out transaction must not leak into this one.
        self.port.clear(ClearBuffer::Input)?;
        self.port.write_all(tx)?;
        self.port.flush()?;
        // The port timeout bounds the transaction.
        self.port.read_exact(rx)?;
        Ok(())
    }
}

fn main() {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();
    // Open the serial port backing the bus
    let port = serialport::new(&args.path, args.data_baudrate)
        .timeout(Duration::from_millis(100))
        .open()
        .expect("Failed to open serial port");
    let mut ow = OneWireUart::new(SerialTransport { port })
        .with_baudrates(args.reset_baudrate, args.data_baudrate)
        .with_mutex(StdBusMutex::default());
    ow.init().expect("Failed to initialize the transport");

    if args.read_rom {
        match ow.read_rom() {
            Ok(rom) => log::info!("ROM: {rom:016x} (family 0x{:02x})", rom & 0xff),
            Err(e) => log::error!("ROM read failed: {e:?}"),
        }
    } else {
        // Enumerate devices on the 1-Wire bus
        let mut search = OneWireSearch::new(&mut ow, OneWireSearchKind::Normal);
        let mut found = 0usize;
        loop {
            match search.next() {
                Ok(Some(rom)) => {
                    found += 1;
                    log::info!("ROM: {rom:016x} (family 0x{:02x})", rom & 0xff);
                }
                Ok(None) => break,
                Err(e) => {
                    log::error!("Search failed: {e:?}");
                    break;
                }
            }
        }
        log::info!("Found {found} devices");
    }

    ow.deinit().expect("Failed to deinitialize the transport");
}

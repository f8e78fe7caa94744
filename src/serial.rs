//! Serial port setup for the USB dongles: 8 data bits, no parity, one stop
//! bit, no flow control.

use serial2_tokio::{CharSize, FlowControl, Parity, SerialPort, Settings, StopBits};
use std::io;

pub fn open_port(device: &str, baud: u32) -> io::Result<SerialPort> {
    let port = SerialPort::open(device, |mut settings: Settings| {
        settings.set_raw();
        settings.set_baud_rate(baud)?;
        settings.set_char_size(CharSize::Bits8);
        settings.set_parity(Parity::None);
        settings.set_stop_bits(StopBits::One);
        settings.set_flow_control(FlowControl::None);
        Ok(settings)
    })?;
    tracing::info!(device, baud, "opened serial port");
    Ok(port)
}

/// Device paths of the serial ports present on this machine.
pub fn available_ports() -> Vec<String> {
    match SerialPort::available_ports() {
        Ok(paths) => paths.iter().map(|p| p.display().to_string()).collect(),
        Err(_) => vec![],
    }
}

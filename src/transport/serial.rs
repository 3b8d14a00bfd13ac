//! Serial port setup for the panel's USB CDC-ACM endpoint.

use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream,
    StopBits,
};

use crate::error::Result;

/// Port parameters; framing is always 8N1.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path, typically a stable /dev/serial/by-id link.
    pub port: String,
    pub baud: u32,
    /// Hardware RTS/CTS flow control; the panel works without it.
    pub rtscts: bool,
    /// Assert DTR after opening. Some firmware revisions gate their
    /// poll loop on DTR.
    pub dsrdtr: bool,
}

/// Open and configure the port, discarding anything buffered from a
/// previous session.
pub fn open_serial(config: &SerialConfig) -> Result<SerialStream> {
    let flow = if config.rtscts {
        FlowControl::Hardware
    } else {
        FlowControl::None
    };
    let mut stream = tokio_serial::new(&config.port, config.baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(flow)
        .open_native_async()?;
    if config.dsrdtr {
        stream.write_data_terminal_ready(true)?;
    }
    stream.clear(ClearBuffer::All)?;
    tracing::info!(port = %config.port, baud = config.baud, "serial port open");
    Ok(stream)
}

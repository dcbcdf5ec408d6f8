//! Serial port configuration and connection management
//!
//! Handles opening the FPGA's USB-UART bridge and listing candidate ports.

use super::ByteChannel;
use crate::error::TransportError;
use anyhow::{Context, Result};
use colored::Colorize;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, ErrorKind, Read, Write};
use std::time::Duration;

/// Line rate expected by the FPGA UART
pub const BAUD_RATE: u32 = 115200;

/// Fixed 8N1 framing, no flow control
pub const DATA_BITS: DataBits = DataBits::Eight;
pub const PARITY: Parity = Parity::None;
pub const STOP_BITS: StopBits = StopBits::One;
pub const FLOW_CONTROL: FlowControl = FlowControl::None;

/// Poll interval used while blocking indefinitely for a reply
const IDLE_POLL: Duration = Duration::from_millis(500);

/// Default device path for the FPGA's USB-UART bridge
#[cfg(not(windows))]
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB1";
#[cfg(windows)]
pub const DEFAULT_DEVICE: &str = "COM3";

/// Configuration for the serial link
#[derive(Debug, Clone, PartialEq)]
pub struct LinkConfig {
    /// Serial device path (e.g., /dev/ttyUSB1)
    pub device: String,
    /// Reply timeout; `None` blocks until the device answers
    pub timeout: Option<Duration>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            timeout: None,
        }
    }
}

impl LinkConfig {
    pub fn new(device: &str) -> Self {
        Self {
            device: device.to_string(),
            ..Default::default()
        }
    }

    /// Bound the wait for each reply byte
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An open serial connection to the FPGA.
///
/// The device is released when the link is dropped.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    config: LinkConfig,
}

impl SerialLink {
    /// Open the device with 115200 8N1 framing
    pub fn open(config: LinkConfig) -> Result<Self, TransportError> {
        let port = serialport::new(&config.device, BAUD_RATE)
            .data_bits(DATA_BITS)
            .parity(PARITY)
            .stop_bits(STOP_BITS)
            .flow_control(FLOW_CONTROL)
            .timeout(config.timeout.unwrap_or(IDLE_POLL))
            .open()
            .map_err(|e| TransportError::Open {
                device: config.device.clone(),
                reason: e.to_string(),
            })?;

        log::debug!("opened {} at {} baud 8N1", config.device, BAUD_RATE);
        Ok(Self { port, config })
    }
}

impl ByteChannel for SerialLink {
    fn write_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        loop {
            match self.port.write(&[byte]) {
                Ok(1) => break,
                Ok(_) => return Err(TransportError::Closed),
                Err(e) => retry_or_fail(e, self.config.timeout, TransportError::Write)?,
            }
        }
        self.port.flush().map_err(TransportError::Write)?;
        log::trace!("tx {:02x}", byte);
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        let mut byte = [0u8; 1];

        loop {
            match self.port.read(&mut byte) {
                Ok(1) => {
                    log::trace!("rx {:02x}", byte[0]);
                    return Ok(byte[0]);
                }
                Ok(_) => return Err(TransportError::Closed),
                Err(e) => retry_or_fail(e, self.config.timeout, TransportError::Read)?,
            }
        }
    }
}

/// Decide whether a failed port call is retried (`Ok`) or surfaced.
///
/// Port timeouts are only an error when the caller configured one; without
/// it the internal poll interval expires silently and the call is repeated.
fn retry_or_fail(
    err: io::Error,
    timeout: Option<Duration>,
    wrap: fn(io::Error) -> TransportError,
) -> Result<(), TransportError> {
    match err.kind() {
        ErrorKind::Interrupted => Ok(()),
        ErrorKind::TimedOut => match timeout {
            Some(after) => Err(TransportError::Timeout { after }),
            None => Ok(()),
        },
        _ => Err(wrap(err)),
    }
}

/// Information about a detected serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub path: String,
    pub port_type: PortType,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

impl PortInfo {
    /// Command line that streams through this port, for likely FPGA bridges
    pub fn usb_hint(&self) -> Option<String> {
        if !self.is_uart_bridge() {
            return None;
        }
        if self.path == DEFAULT_DEVICE {
            Some("fpga-link stream".to_string())
        } else {
            Some(format!("fpga-link stream --usb {}", self.path))
        }
    }

    /// USB-UART bridges commonly found on FPGA development boards
    pub fn is_uart_bridge(&self) -> bool {
        match (self.vid, self.pid) {
            // FTDI (Digilent, Terasic and most Xilinx eval boards)
            (Some(0x0403), _) => true,
            // Silicon Labs CP210x
            (Some(0x10c4), Some(0xea60 | 0xea70)) => true,
            // WCH CH340/CH341
            (Some(0x1a86), Some(0x7523 | 0x5523)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PortType {
    UsbSerial,
    PciSerial,
    Bluetooth,
    Unknown,
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortType::UsbSerial => write!(f, "USB Serial"),
            PortType::PciSerial => write!(f, "PCI Serial"),
            PortType::Bluetooth => write!(f, "Bluetooth"),
            PortType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// List all available serial ports
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;

    Ok(ports
        .into_iter()
        .map(|p| {
            let (port_type, manufacturer, product, vid, pid) = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => (
                    PortType::UsbSerial,
                    info.manufacturer,
                    info.product,
                    Some(info.vid),
                    Some(info.pid),
                ),
                serialport::SerialPortType::PciPort => (PortType::PciSerial, None, None, None, None),
                serialport::SerialPortType::BluetoothPort => {
                    (PortType::Bluetooth, None, None, None, None)
                }
                serialport::SerialPortType::Unknown => (PortType::Unknown, None, None, None, None),
            };

            PortInfo {
                path: p.port_name,
                port_type,
                manufacturer,
                product,
                vid,
                pid,
            }
        })
        .collect())
}

/// Likely FPGA bridges first, then everything else, each group by path
pub fn rank_ports(mut ports: Vec<PortInfo>) -> Vec<PortInfo> {
    ports.sort_by(|a, b| {
        b.is_uart_bridge()
            .cmp(&a.is_uart_bridge())
            .then_with(|| a.path.cmp(&b.path))
    });
    ports
}

/// Print serial ports with a ready-to-run command for each FPGA bridge
pub fn print_ports() -> Result<()> {
    let ports = rank_ports(list_ports()?);

    if ports.is_empty() {
        println!("{}", "No serial ports found".yellow());
        println!("\n{}", "Troubleshooting tips:".cyan().bold());
        println!("  1. Check the FPGA board's USB-UART cable is connected");
        println!("  2. Add your user to the 'dialout' group: sudo usermod -aG dialout $USER");
        println!("  3. Check dmesg for connection events: dmesg | tail -20");
        return Ok(());
    }

    println!("{}", "Available Serial Ports:".green().bold());
    println!("{}", "=".repeat(60));

    for port in &ports {
        let marker = if port.is_uart_bridge() {
            " [UART bridge]".green().to_string()
        } else {
            String::new()
        };
        println!("\n{}: {}{}", "Port".cyan(), port.path.white().bold(), marker);
        println!("  Type: {}", port.port_type);

        if let Some(ref prod) = port.product {
            let mfg = port.manufacturer.as_deref().unwrap_or("unknown vendor");
            println!("  Device: {} ({})", prod, mfg);
        }
        if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
            println!("  VID:PID: {:04x}:{:04x}", vid, pid);
        }
        if let Some(hint) = port.usb_hint() {
            println!("  {} {}", "Try:".yellow(), hint.white());
        }
    }

    println!("\n{}", "=".repeat(60));
    if !ports.iter().any(PortInfo::is_uart_bridge) {
        println!(
            "{}",
            "No known USB-UART bridge found; pass the FPGA's port with --usb <PORT>".yellow()
        );
    }

    Ok(())
}

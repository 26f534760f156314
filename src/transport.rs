use crate::types::TransportConfig;
use std::io;
use std::net::UdpSocket;
use std::time::Duration;

/// Byte-level access to one controller connection.
///
/// Implementations hold the OS handle; everything above this trait is
/// protocol logic. A device worker owns its transport exclusively, so
/// sends on one connection never overlap.
pub trait Transport: Send {
    fn open(&mut self) -> io::Result<()>;
    fn send(&mut self, packet: &[u8]) -> io::Result<()>;
    fn close(&mut self);
    fn is_open(&self) -> bool;
}

pub fn create_transport(config: &TransportConfig, write_timeout: Duration) -> Box<dyn Transport> {
    match config {
        TransportConfig::Udp { host, port } => Box::new(UdpTransport {
            destination: format!("{}:{}", host, port),
            socket: None,
            write_timeout,
        }),
        TransportConfig::Serial { path, baud_rate } => Box::new(SerialTransport {
            path: path.clone(),
            baud_rate: *baud_rate,
            port: None,
            write_timeout,
        }),
    }
}

pub struct UdpTransport {
    destination: String,
    socket: Option<UdpSocket>,
    write_timeout: Duration,
}

impl Transport for UdpTransport {
    fn open(&mut self) -> io::Result<()> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_write_timeout(Some(self.write_timeout))?;
        self.socket = Some(socket);
        Ok(())
    }

    fn send(&mut self, packet: &[u8]) -> io::Result<()> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "socket not open"))?;
        socket.send_to(packet, &self.destination)?;
        Ok(())
    }

    fn close(&mut self) {
        self.socket = None;
    }

    fn is_open(&self) -> bool {
        self.socket.is_some()
    }
}

pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    port: Option<Box<dyn serialport::SerialPort>>,
    write_timeout: Duration,
}

impl Transport for SerialTransport {
    fn open(&mut self) -> io::Result<()> {
        let port = serialport::new(&self.path, self.baud_rate)
            .timeout(self.write_timeout)
            .open()
            .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
        self.port = Some(port);
        Ok(())
    }

    fn send(&mut self, packet: &[u8]) -> io::Result<()> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "port not open"))?;
        port.write_all(packet)?;
        Ok(())
    }

    fn close(&mut self) {
        self.port = None;
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

use std::time::Duration;

use tokio::{io::{AsyncRead, AsyncWrite}, net::TcpStream};
use tokio_serial::{DataBits, Parity, SerialPortBuilder, SerialPortBuilderExt, SerialStream, StopBits};
use tokio_util::codec::Framed;
use url::Url;
use anyhow::{Result, Context, bail};

use crate::protocol::codec::ControllerCodec;

// WYT main board UART: 9600 8E1
pub const WYT_BAUD_RATE: u32 = 9600;
pub const WYT_DATA_BITS: DataBits = DataBits::Eight;
pub const WYT_PARITY: Parity = Parity::Even;
pub const WYT_STOP_BITS: StopBits = StopBits::One;

/// How long to wait for a report after sending a query.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);


pub enum Port {
    Serial(SerialStream),
    TcpRaw(TcpStream)
}


/// Any byte stream the protocol can run over.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Transport for T
where
    T: AsyncRead + AsyncWrite + Send + Unpin,
{}

/// A transport framed for the controller side of the line.
pub type ControllerPort = Framed<Box<dyn Transport>, ControllerCodec>;


/// Serial settings for the line to the unit's main board.
pub fn wyt_serial(path: &str) -> SerialPortBuilder {
    tokio_serial::new(path, WYT_BAUD_RATE)
        .data_bits(WYT_DATA_BITS)
        .parity(WYT_PARITY)
        .stop_bits(WYT_STOP_BITS)
}


impl Port {
    /// Opens `serial:///device/path` (9600 baud, 8E1) or `tcp+raw://host:port`.
    pub async fn open(url: &Url) -> Result<Self> {
        match url.scheme() {
            "serial" => {
                let path = url.path();

                let port = wyt_serial(path)
                    .open_native_async()
                    .with_context(|| format!("failed to open serial port {path}"))
                    ?;

                Ok(Self::Serial(port))
            },
            "tcp+raw" => {
                let host = url.host_str()
                    .with_context(|| format!("tcp+raw requires a host to be specified in the url: {url}"))?;

                let port = url.port()
                    .with_context(|| format!("tcp+raw requires a port number to be specified in the url: {url}"))?;

                let stream = TcpStream::connect((host, port)).await
                    .with_context(|| format!("failed to open tcp+raw connection to: {url}"))?;

                stream.set_nodelay(true)?;

                Ok(Self::TcpRaw(stream))
            },
            other => {
                bail!("url scheme {other} not supported");
            }
        }
    }

    pub fn into_transport(self) -> Box<dyn Transport> {
        match self {
            Port::Serial(port) => Box::new(port),
            Port::TcpRaw(stream) => Box::new(stream),
        }
    }

    pub fn framed(self) -> ControllerPort {
        Framed::new(self.into_transport(), ControllerCodec)
    }
}

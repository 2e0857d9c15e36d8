// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A sink shipping records as JSON over the network.
//!
//! Each record is serialized as one JSON object followed by `\n`:
//!
//! ```json
//! {"level":"CRITICAL","created":"2024-08-10T17:12:52Z","source":"main.rs:7","message":"boom"}
//! ```

use std::fmt;
use std::io::Write;
use std::net::Shutdown;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::net::UdpSocket;
use std::str::FromStr;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Error;
use crate::record::LogRecord;
use crate::sink::Sink;

/// The transport of a [`SocketSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// A connected TCP stream.
    Stream,
    /// UDP datagrams, one per record.
    Datagram,
}

impl FromStr for Protocol {
    type Err = Error;

    /// Parse `tcp` / `stream` or `udp` / `datagram`, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Protocol, Self::Err> {
        if s.eq_ignore_ascii_case("tcp") || s.eq_ignore_ascii_case("stream") {
            Ok(Protocol::Stream)
        } else if s.eq_ignore_ascii_case("udp") || s.eq_ignore_ascii_case("datagram") {
            Ok(Protocol::Datagram)
        } else {
            Err(Error::new(format!("unknown socket protocol: {s:?}")))
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Stream => f.write_str("tcp"),
            Protocol::Datagram => f.write_str("udp"),
        }
    }
}

/// A builder to configure and create a [`SocketSink`].
#[derive(Debug, Clone)]
pub struct SocketBuilder {
    protocol: Protocol,
    endpoint: String,
}

impl SocketBuilder {
    /// Create a new socket sink builder sending to `endpoint`, e.g. `"127.0.0.1:12124"`.
    pub fn new(protocol: Protocol, endpoint: impl Into<String>) -> Self {
        Self {
            protocol,
            endpoint: endpoint.into(),
        }
    }

    /// Connect to the endpoint.
    ///
    /// # Errors
    ///
    /// Return an error if the endpoint cannot be resolved or connected.
    pub fn build(self) -> Result<SocketSink, Error> {
        let Self { protocol, endpoint } = self;
        let transport = Transport::connect(protocol, &endpoint).map_err(|err| {
            Error::new("failed to connect log socket")
                .with_context("protocol", protocol)
                .with_context("endpoint", &endpoint)
                .with_source(err)
        })?;
        Ok(SocketSink {
            protocol,
            endpoint,
            transport: Mutex::new(Some(transport)),
        })
    }
}

#[derive(Debug)]
enum Transport {
    Stream(TcpStream),
    Datagram(UdpSocket),
}

impl Transport {
    fn connect(protocol: Protocol, endpoint: &str) -> std::io::Result<Transport> {
        match protocol {
            Protocol::Stream => TcpStream::connect(endpoint).map(Transport::Stream),
            Protocol::Datagram => {
                let remote = endpoint.to_socket_addrs()?.next().ok_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::AddrNotAvailable,
                        "endpoint resolved to no address",
                    )
                })?;
                let local: SocketAddr = match remote {
                    SocketAddr::V4(_) => ([0, 0, 0, 0], 0).into(),
                    SocketAddr::V6(_) => ([0u16; 8], 0).into(),
                };
                let socket = UdpSocket::bind(local)?;
                if remote.is_ipv4() {
                    // broadcast endpoints such as 192.168.1.255 refuse to connect otherwise
                    socket.set_broadcast(true)?;
                }
                socket.connect(remote)?;
                Ok(Transport::Datagram(socket))
            }
        }
    }

    fn send(&mut self, payload: &[u8]) -> std::io::Result<usize> {
        match self {
            Transport::Stream(stream) => stream.write_all(payload).map(|()| payload.len()),
            Transport::Datagram(socket) => socket.send(payload),
        }
    }
}

/// A sink writing newline-delimited JSON records to a TCP or UDP endpoint.
///
/// The sink is healthy while its socket is held; closing releases it.
#[derive(Debug)]
pub struct SocketSink {
    protocol: Protocol,
    endpoint: String,
    transport: Mutex<Option<Transport>>,
}

impl SocketSink {
    /// The transport protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The endpoint this sink was connected to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport(&self) -> MutexGuard<'_, Option<Transport>> {
        self.transport.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn encode(record: &LogRecord) -> Result<Vec<u8>, Error> {
    let mut payload = serde_json::to_vec(record)
        .map_err(|err| Error::new("failed to serialize log record").with_source(err))?;
    payload.push(b'\n');
    Ok(payload)
}

impl Sink for SocketSink {
    fn write(&self, record: &LogRecord) -> Result<usize, Error> {
        let payload = encode(record)?;
        let mut transport = self.transport();
        let transport = transport.as_mut().ok_or_else(|| {
            Error::new("log socket is not connected").with_context("endpoint", &self.endpoint)
        })?;
        transport.send(&payload).map_err(Error::from_io_error)
    }

    fn healthy(&self) -> bool {
        self.transport().is_some()
    }

    fn close(&self) {
        if let Some(Transport::Stream(stream)) = self.transport().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn flush(&self) -> Result<(), Error> {
        match self.transport().as_mut() {
            Some(Transport::Stream(stream)) => stream.flush().map_err(Error::from_io_error),
            _ => Ok(()),
        }
    }
}

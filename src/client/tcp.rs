// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TCP client connections

use std::{io, net::SocketAddr};

use async_trait::async_trait;
use tokio::net::TcpStream;

use super::*;

/// Opens both connections of a [`Master`] to the same socket address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpConnector {
    socket_addr: SocketAddr,
}

impl TcpConnector {
    #[must_use]
    pub const fn new(socket_addr: SocketAddr) -> Self {
        Self { socket_addr }
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        self.socket_addr
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, role: Role) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(self.socket_addr).await?;
        log::debug!("{role:?} connection established to {}", self.socket_addr);
        Ok(stream)
    }
}

/// Establish a direct connection to a Modbus TCP coupler.
pub async fn connect(socket_addr: SocketAddr) -> Result<(Master<TcpConnector>, Events)> {
    connect_slave(socket_addr, Slave::tcp_device()).await
}

/// Connect to a physical, broadcast, or custom Modbus device,
/// probably through a Modbus TCP gateway that is forwarding
/// messages to/from the corresponding slave device.
pub async fn connect_slave(
    socket_addr: SocketAddr,
    slave: Slave,
) -> Result<(Master<TcpConnector>, Events)> {
    connect_slave_with_config(socket_addr, slave, Config::default()).await
}

/// Connect to a Modbus device with custom timeouts.
pub async fn connect_slave_with_config(
    socket_addr: SocketAddr,
    slave: Slave,
    config: Config,
) -> Result<(Master<TcpConnector>, Events)> {
    let (mut master, events) = Master::new(TcpConnector::new(socket_addr), config);
    master.set_slave(slave);
    master.connect().await?;
    Ok((master, events))
}

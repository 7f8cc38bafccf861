// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::net::SocketAddr;

use super::{Context, Result};

use crate::{client::tcp::TcpConnector, fault::Events, slave::Slave, Config, SlaveContext as _};

/// Establish a direct connection to a Modbus TCP coupler.
pub fn connect(socket_addr: SocketAddr) -> Result<(Context<TcpConnector>, Events)> {
    connect_slave(socket_addr, Slave::tcp_device())
}

/// Connect to any kind of Modbus slave device, probably through a Modbus TCP/RTU
/// gateway that is forwarding messages to/from the corresponding unit identified
/// by the slave parameter.
pub fn connect_slave(
    socket_addr: SocketAddr,
    slave: Slave,
) -> Result<(Context<TcpConnector>, Events)> {
    connect_slave_with_config(socket_addr, slave, Config::default())
}

/// Connect to a Modbus device with custom timeouts.
pub fn connect_slave_with_config(
    socket_addr: SocketAddr,
    slave: Slave,
    config: Config,
) -> Result<(Context<TcpConnector>, Events)> {
    let (mut sync_ctx, events) = Context::new(TcpConnector::new(socket_addr), config)?;
    sync_ctx.set_slave(slave);
    sync_ctx.connect()?;
    Ok((sync_ctx, events))
}

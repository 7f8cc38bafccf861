// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronous Modbus context access

#[cfg(feature = "tcp")]
pub mod tcp;

use std::io;

use tokio::runtime::Runtime;

use super::{
    Client as AsyncClient, Config, Connector, Master, Reader as AsyncReader, SlaveContext,
    Writer as AsyncWriter,
};

use crate::{fault::Events, frame::*, slave::*, Error, Result};

/// A transport independent synchronous client trait.
pub trait Client: SlaveContext {
    fn call(&mut self, req: Request<'_>) -> Result<Response>;
}

/// A transport independent synchronous reader trait.
pub trait Reader: Client {
    fn read_coils(&mut self, _: Address, _: Quantity) -> Result<Vec<Coil>>;
    fn read_discrete_inputs(&mut self, _: Address, _: Quantity) -> Result<Vec<Coil>>;
    fn read_input_registers(&mut self, _: Address, _: Quantity) -> Result<Vec<Word>>;
    fn read_holding_registers(&mut self, _: Address, _: Quantity) -> Result<Vec<Word>>;
    fn read_write_multiple_registers(
        &mut self,
        _: Address,
        _: Quantity,
        _: Address,
        _: &[Word],
    ) -> Result<Vec<Word>>;
}

/// A transport independent synchronous writer trait.
pub trait Writer: Client {
    fn write_single_coil(&mut self, _: Address, _: Coil) -> Result<()>;
    fn write_multiple_coils(&mut self, _: Address, _: &[Coil]) -> Result<()>;
    fn write_single_register(&mut self, _: Address, _: Word) -> Result<()>;
    fn write_multiple_registers(&mut self, _: Address, _: &[Word]) -> Result<()>;
}

/// A synchronous Modbus client context.
///
/// Owns a runtime that keeps delivering the outcomes of dispatched
/// requests while no method is being called.
///
/// Must neither be used nor dropped within an asynchronous execution
/// context.
#[derive(Debug)]
pub struct Context<C: Connector> {
    runtime: Runtime,
    async_ctx: Master<C>,
}

impl<C: Connector> Context<C> {
    /// Create a disconnected context and the stream of its events.
    pub fn new(connector: C, config: Config) -> Result<(Self, Events)> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;
        let (async_ctx, events) = Master::new(connector, config);
        Ok((Self { runtime, async_ctx }, events))
    }

    /// See [`Master::connect()`].
    pub fn connect(&mut self) -> Result<()> {
        self.runtime.block_on(self.async_ctx.connect())
    }

    /// See [`Master::disconnect()`].
    pub fn disconnect(&mut self) -> io::Result<()> {
        self.runtime.block_on(self.async_ctx.disconnect())
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.async_ctx.is_connected()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.async_ctx.pending_count()
    }

    /// See [`Master::exchange()`].
    pub fn exchange(&self, req: RequestAdu<'_>) -> Result<Response> {
        self.runtime.block_on(self.async_ctx.exchange(req))
    }

    /// See [`Master::submit()`].
    pub fn submit(&self, req: RequestAdu<'_>) -> Result<()> {
        self.runtime.block_on(self.async_ctx.submit(req))
    }

    /// See [`Master::send()`].
    pub fn send(&self, request: Request<'_>) -> Result<TransactionId> {
        self.runtime.block_on(self.async_ctx.send(request))
    }
}

impl<C: Connector> Client for Context<C> {
    fn call(&mut self, req: Request<'_>) -> Result<Response> {
        self.runtime.block_on(self.async_ctx.call(req))
    }
}

impl<C: Connector> SlaveContext for Context<C> {
    fn set_slave(&mut self, slave: Slave) {
        self.async_ctx.set_slave(slave);
    }
}

impl<C: Connector> Reader for Context<C> {
    fn read_coils(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        self.runtime.block_on(self.async_ctx.read_coils(addr, cnt))
    }

    fn read_discrete_inputs(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        self.runtime
            .block_on(self.async_ctx.read_discrete_inputs(addr, cnt))
    }

    fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        self.runtime
            .block_on(self.async_ctx.read_input_registers(addr, cnt))
    }

    fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        self.runtime
            .block_on(self.async_ctx.read_holding_registers(addr, cnt))
    }

    fn read_write_multiple_registers(
        &mut self,
        read_addr: Address,
        read_cnt: Quantity,
        write_addr: Address,
        write_data: &[Word],
    ) -> Result<Vec<Word>> {
        self.runtime.block_on(
            self.async_ctx
                .read_write_multiple_registers(read_addr, read_cnt, write_addr, write_data),
        )
    }
}

impl<C: Connector> Writer for Context<C> {
    fn write_single_register(&mut self, addr: Address, data: Word) -> Result<()> {
        self.runtime
            .block_on(self.async_ctx.write_single_register(addr, data))
    }

    fn write_multiple_registers(&mut self, addr: Address, data: &[Word]) -> Result<()> {
        self.runtime
            .block_on(self.async_ctx.write_multiple_registers(addr, data))
    }

    fn write_single_coil(&mut self, addr: Address, coil: Coil) -> Result<()> {
        self.runtime
            .block_on(self.async_ctx.write_single_coil(addr, coil))
    }

    fn write_multiple_coils(&mut self, addr: Address, coils: &[Coil]) -> Result<()> {
        self.runtime
            .block_on(self.async_ctx.write_multiple_coils(addr, coils))
    }
}

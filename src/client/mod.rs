// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus master

use std::{fmt, io};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::{
    codec::{self, bytes_to_words, unpack_coils, word_to_bytes},
    fault::{self, EventSender, Events, Fault, FaultCode, FaultSink},
    frame::*,
    registry::TransactionIds,
    service::{dispatch::Dispatcher, tcp::Client as Exchange},
    slave::*,
    Error, Result,
};

mod config;

pub use self::config::{Config, DEFAULT_CONNECT_TIMEOUT, DEFAULT_EXCHANGE_TIMEOUT};

#[cfg(feature = "tcp")]
pub mod tcp;

#[cfg(feature = "sync")]
pub mod sync;

/// Transport independent asynchronous client trait
#[async_trait]
pub trait Client: SlaveContext + Send + fmt::Debug {
    /// Invokes a _Modbus_ function and waits for its response.
    async fn call(&mut self, request: Request<'_>) -> Result<Response>;

    /// Disconnects the client.
    ///
    /// Shuts down the underlying streams in a graceful manner.
    async fn disconnect(&mut self) -> io::Result<()>;
}

/// Asynchronous _Modbus_ reader
#[async_trait]
pub trait Reader: Client {
    /// Read multiple coils (0x01)
    async fn read_coils(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>>;

    /// Read multiple discrete inputs (0x02)
    async fn read_discrete_inputs(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>>;

    /// Read multiple holding registers (0x03)
    async fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;

    /// Read multiple input registers (0x04)
    async fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;

    /// Read and write multiple holding registers (0x17)
    ///
    /// The write operation is performed before the read unlike
    /// the name of the operation might suggest!
    async fn read_write_multiple_registers(
        &mut self,
        read_addr: Address,
        read_count: Quantity,
        write_addr: Address,
        write_data: &[Word],
    ) -> Result<Vec<Word>>;
}

/// Asynchronous Modbus writer
#[async_trait]
pub trait Writer: Client {
    /// Write a single coil (0x05)
    async fn write_single_coil(&mut self, addr: Address, coil: Coil) -> Result<()>;

    /// Write a single holding register (0x06)
    async fn write_single_register(&mut self, addr: Address, word: Word) -> Result<()>;

    /// Write multiple coils (0x0F)
    async fn write_multiple_coils(&mut self, addr: Address, coils: &'_ [Coil]) -> Result<()>;

    /// Write multiple holding registers (0x10)
    async fn write_multiple_registers(&mut self, addr: Address, words: &[Word]) -> Result<()>;
}

/// Selects which of the two connections of a [`Master`] is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Carries request/response exchanges, one at a time.
    Sync,

    /// Carries dispatched requests whose outcomes arrive as events.
    Async,
}

/// Provides the connected byte streams of a [`Master`].
#[async_trait]
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Establish a new connection for `role`.
    async fn connect(&self, role: Role) -> io::Result<Self::Stream>;
}

/// Master context holding both connections of a device.
///
/// Requests are either exchanged, i.e. the caller waits for the
/// response, or submitted, i.e. the outcome is published on the
/// [`Events`] stream returned by [`Master::new()`]. Every fault is
/// published on that stream, including those of exchanges.
///
/// A lost connection tears down both connections. Call
/// [`Master::connect()`] to re-establish them.
pub struct Master<C: Connector> {
    connector: C,
    config: Config,
    slave: Slave,
    events: EventSender,
    faults: FaultSink,
    transaction_ids: TransactionIds,
    exchange: tokio::sync::Mutex<Exchange<C::Stream>>,
    dispatch: Option<Dispatcher<C::Stream>>,
}

impl<C: Connector> fmt::Debug for Master<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Master")
            .field("config", &self.config)
            .field("slave", &self.slave)
            .field("connected", &self.is_connected())
            .field("dispatch", &self.dispatch)
            .finish_non_exhaustive()
    }
}

fn torn_down(events: EventSender) -> FaultSink {
    let link = CancellationToken::new();
    link.cancel();
    FaultSink::new(events, link)
}

impl<C: Connector> Master<C> {
    /// Create a disconnected master and the stream of its events.
    ///
    /// Requests are addressed to [`Slave::tcp_device()`] until
    /// another slave is selected.
    pub fn new(connector: C, config: Config) -> (Self, Events) {
        let (events, rx) = fault::channel();
        let faults = torn_down(events.clone());
        let master = Self {
            connector,
            config,
            slave: Slave::tcp_device(),
            events,
            exchange: tokio::sync::Mutex::new(Exchange::disconnected(
                faults.clone(),
                config.exchange_timeout,
            )),
            faults,
            transaction_ids: TransactionIds::default(),
            dispatch: None,
        };
        (master, rx)
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Establish both connections, replacing any previous ones.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn connect(&mut self) -> Result<()> {
        if let Err(err) = self.disconnect().await {
            log::debug!("Failed to shut down previous connections: {err}");
        }
        let exchange_stream = self.open(Role::Sync).await?;
        let dispatch_stream = self.open(Role::Async).await?;

        let faults = FaultSink::new(self.events.clone(), CancellationToken::new());
        let timeout = self.config.exchange_timeout;
        let exchange = Exchange::new(exchange_stream, faults.clone(), timeout);
        self.exchange = tokio::sync::Mutex::new(exchange);
        self.dispatch = Some(Dispatcher::new(dispatch_stream, faults.clone(), timeout));
        self.faults = faults;
        log::debug!("Connected");
        Ok(())
    }

    async fn open(&self, role: Role) -> Result<C::Stream> {
        log::debug!("Connecting {role:?} connection");
        match tokio::time::timeout(self.config.connect_timeout, self.connector.connect(role)).await
        {
            Ok(connected) => connected.map_err(Error::Connect),
            Err(_) => Err(Error::Connect(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{role:?} connection not established in time"),
            ))),
        }
    }

    /// Shut down both connections gracefully.
    ///
    /// Dispatched requests still in flight are reported as connection lost.
    pub async fn disconnect(&mut self) -> io::Result<()> {
        self.faults.link().cancel();
        let exchange = self.exchange.get_mut().disconnect().await;
        let dispatch = match self.dispatch.take() {
            Some(dispatcher) => dispatcher.disconnect().await,
            None => Ok(()),
        };
        exchange.and(dispatch)
    }

    /// Both connections are established and have not been lost.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        // An exchange in progress holds the lock. Its connection is lost
        // only together with the link.
        let exchange = self
            .exchange
            .try_lock()
            .map_or(!self.faults.is_torn_down(), |exchange| exchange.is_connected());
        exchange
            && self
                .dispatch
                .as_ref()
                .is_some_and(Dispatcher::is_connected)
    }

    /// Number of dispatched requests awaiting their response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.dispatch.as_ref().map_or(0, Dispatcher::pending_count)
    }

    /// Send `req` over the request/response connection and wait for
    /// its response.
    ///
    /// Fails with a connection-lost fault without any I/O if the
    /// connection has not been established or has been lost.
    ///
    /// Concurrent exchanges are serialized. Requests can be submitted
    /// while an exchange is in progress.
    pub async fn exchange(&self, req: RequestAdu<'_>) -> Result<Response> {
        self.exchange.lock().await.call(req).await
    }

    /// Hand `req` to the dispatch connection without waiting for the
    /// response.
    ///
    /// The outcome is published on the event stream.
    pub async fn submit(&self, req: RequestAdu<'_>) -> Result<()> {
        if let Some(dispatcher) = &self.dispatch {
            return dispatcher.submit(req).await;
        }
        log::debug!("Submit {:?}", req);
        codec::request_pdu_size(&req.pdu).map_err(Error::InvalidRequest)?;
        let fault = Fault::new(req.hdr, req.pdu.function_code(), FaultCode::NotConnected);
        Err(self.faults.raise(fault).into())
    }

    /// Submit `request` to the selected slave with the next free
    /// transaction id.
    ///
    /// Returns the transaction id for correlating the outcome.
    pub async fn send(&self, request: Request<'_>) -> Result<TransactionId> {
        let transaction_id = match &self.dispatch {
            Some(dispatcher) => dispatcher.allocate(&self.transaction_ids),
            None => self.transaction_ids.next(),
        };
        self.submit(RequestAdu::new(transaction_id, self.slave.into(), request))
            .await?;
        Ok(transaction_id)
    }
}

#[async_trait]
impl<C: Connector> Client for Master<C> {
    async fn call(&mut self, request: Request<'_>) -> Result<Response> {
        let req = RequestAdu::new(self.transaction_ids.next(), self.slave.into(), request);
        self.exchange(req).await
    }

    async fn disconnect(&mut self) -> io::Result<()> {
        Master::disconnect(self).await
    }
}

impl<C: Connector> SlaveContext for Master<C> {
    fn set_slave(&mut self, slave: Slave) {
        self.slave = slave;
    }
}

fn verify_byte_count(rsp: &Response, expected: usize) -> Result<()> {
    if rsp.data.len() != expected {
        return Err(Error::UnexpectedResponse(format!(
            "{} data bytes received instead of {expected}",
            rsp.data.len()
        )));
    }
    Ok(())
}

fn verify_echo(rsp: &Response, addr: Address, value: Word) -> Result<()> {
    let expected = [word_to_bytes(addr), word_to_bytes(value)].concat();
    if rsp.data[..] != expected[..] {
        return Err(Error::UnexpectedResponse(format!(
            "echo {:02X?} differs from request {expected:02X?}",
            &rsp.data[..]
        )));
    }
    Ok(())
}

async fn read_bits<T>(client: &mut T, request: Request<'_>, cnt: Quantity) -> Result<Vec<Coil>>
where
    T: Client + ?Sized,
{
    let rsp = client.call(request).await?;
    // The device always returns entire bytes, i.e. a multiple of 8 coils.
    verify_byte_count(&rsp, usize::from(cnt).div_ceil(8))?;
    Ok(unpack_coils(&rsp.data, cnt))
}

async fn read_words<T>(client: &mut T, request: Request<'_>, cnt: Quantity) -> Result<Vec<Word>>
where
    T: Client + ?Sized,
{
    let rsp = client.call(request).await?;
    verify_byte_count(&rsp, usize::from(cnt) * 2)?;
    Ok(bytes_to_words(&rsp.data))
}

#[async_trait]
impl<T> Reader for T
where
    T: Client,
{
    async fn read_coils(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        read_bits(self, Request::ReadCoils(addr, cnt), cnt).await
    }

    async fn read_discrete_inputs(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        read_bits(self, Request::ReadDiscreteInputs(addr, cnt), cnt).await
    }

    async fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        read_words(self, Request::ReadHoldingRegisters(addr, cnt), cnt).await
    }

    async fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        read_words(self, Request::ReadInputRegisters(addr, cnt), cnt).await
    }

    async fn read_write_multiple_registers(
        &mut self,
        read_addr: Address,
        read_count: Quantity,
        write_addr: Address,
        write_data: &[Word],
    ) -> Result<Vec<Word>> {
        let request =
            Request::read_write_multiple_registers(read_addr, read_count, write_addr, write_data);
        read_words(self, request, read_count).await
    }
}

#[async_trait]
impl<T> Writer for T
where
    T: Client,
{
    async fn write_single_coil(&mut self, addr: Address, coil: Coil) -> Result<()> {
        let rsp = self.call(Request::WriteSingleCoil(addr, coil)).await?;
        verify_echo(&rsp, addr, codec::bool_to_coil(coil))
    }

    async fn write_single_register(&mut self, addr: Address, word: Word) -> Result<()> {
        let rsp = self.call(Request::WriteSingleRegister(addr, word)).await?;
        verify_echo(&rsp, addr, word)
    }

    async fn write_multiple_coils(&mut self, addr: Address, coils: &'_ [Coil]) -> Result<()> {
        let request = Request::write_multiple_coils(addr, coils);
        let rsp = self.call(request).await?;
        verify_echo(&rsp, addr, codec::saturating_quantity(coils.len()))
    }

    async fn write_multiple_registers(&mut self, addr: Address, words: &[Word]) -> Result<()> {
        let request = Request::write_multiple_registers(addr, words);
        let rsp = self.call(request).await?;
        verify_echo(&rsp, addr, codec::saturating_quantity(words.len()))
    }
}

// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A [Modbus](https://en.wikipedia.org/wiki/Modbus) TCP master
//! based on [tokio](https://tokio.rs).
//!
//! A [`Master`] keeps two connections to a device:
//!
//! - Requests on the first one are *exchanged*, i.e. the caller waits
//!   until the response has arrived or the timeout has elapsed.
//! - Requests on the second one are *submitted*, i.e. the caller only
//!   waits until the request has been sent. Any number of submitted
//!   requests may be in flight, their outcomes are correlated by
//!   transaction id and published on the [`Events`] stream.
//!
//! Every [`Fault`] is published on the same stream, regardless of
//! the connection it occurred on. A lost connection tears down both
//! connections.
//!
//! ## Installation
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! modbus-master = "*"
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use modbus_master::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let socket_addr = "192.168.0.222:502".parse()?;
//! let (mut master, mut events) = tcp::connect(socket_addr).await?;
//!
//! // Wait for the response
//! let words = master.read_holding_registers(0x1000, 7).await?;
//! println!("Holding registers: {words:?}");
//!
//! // Receive the response as an event
//! let transaction_id = master.send(Request::ReadCoils(0x0100, 8)).await?;
//! println!("Submitted transaction {transaction_id}");
//! if let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//!
//! master.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod prelude;

pub mod client;
pub mod codec;

mod error;
mod fault;
mod frame;
mod registry;
mod service;
mod slave;

pub use self::client::{Config, Connector, Master, Role};
pub use self::error::Error;
pub use self::fault::{Event, Events, Fault, FaultCode};
pub use self::frame::{
    Address, Coil, ExceptionCode, FunctionCode, Header, Quantity, Request, RequestAdu, Response,
    ResponseAdu, ResponsePdu, TransactionId, UnitId, Word,
};
pub use self::slave::{Slave, SlaveContext, SlaveId};

/// Specialized [`std::result::Result`] type for master operations.
pub type Result<T> = std::result::Result<T, Error>;

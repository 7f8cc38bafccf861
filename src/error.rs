// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types.

use std::io;

use thiserror::Error;

use crate::{
    fault::{Fault, FaultCode},
    frame::{ExceptionCode, TransactionId},
};

/// Error type of all master operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The exchange ended with a fault.
    ///
    /// The same fault has also been published on the event stream.
    #[error(transparent)]
    Fault(#[from] Fault),

    /// The request cannot be encoded, e.g. a quantity of zero.
    ///
    /// Nothing has been sent.
    #[error("invalid request: {0}")]
    InvalidRequest(#[source] io::Error),

    /// A request with the same transaction id is still in flight.
    ///
    /// Nothing has been sent.
    #[error("transaction {0} is already in flight")]
    TransactionInUse(TransactionId),

    /// The response does not match the request, e.g. the echo of a
    /// write differs from what has been written.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Establishing a connection failed.
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),

    /// The runtime of a blocking client could not be started.
    #[error("runtime unavailable: {0}")]
    Runtime(#[source] io::Error),
}

impl Error {
    /// The fault that ended the exchange, if any.
    #[must_use]
    pub const fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Fault(fault) => Some(fault),
            _ => None,
        }
    }

    /// The fault code that ended the exchange, if any.
    #[must_use]
    pub fn fault_code(&self) -> Option<FaultCode> {
        self.fault().map(|fault| fault.code)
    }

    /// The exception reported by the device, if any.
    #[must_use]
    pub fn exception(&self) -> Option<ExceptionCode> {
        self.fault().and_then(Fault::exception)
    }
}

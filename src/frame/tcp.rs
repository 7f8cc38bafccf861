// SPDX-FileCopyrightText: Copyright (c) 2017-2023 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use bytes::Bytes;

use super::*;
use crate::fault::{Fault, FaultCode};

/// Correlates a request with its response.
pub type TransactionId = u16;

/// Addresses the target device behind a gateway.
pub type UnitId = u8;

/// The part of the MBAP header that identifies an exchange.
///
/// The protocol id is always zero and the length is derived
/// from the PDU, so neither is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    pub transaction_id: TransactionId,
    pub unit_id: UnitId,
}

impl Header {
    #[must_use]
    pub const fn new(transaction_id: TransactionId, unit_id: UnitId) -> Self {
        Self {
            transaction_id,
            unit_id,
        }
    }
}

/// A single operation: header plus request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAdu<'a> {
    pub hdr: Header,
    pub pdu: Request<'a>,
}

impl<'a> RequestAdu<'a> {
    #[must_use]
    pub const fn new(transaction_id: TransactionId, unit_id: UnitId, pdu: Request<'a>) -> Self {
        Self {
            hdr: Header::new(transaction_id, unit_id),
            pdu,
        }
    }

    /// Converts the request into an owned instance with `'static'` lifetime.
    #[must_use]
    pub fn into_owned(self) -> RequestAdu<'static> {
        RequestAdu {
            hdr: self.hdr,
            pdu: self.pdu.into_owned(),
        }
    }
}

impl<'a> From<RequestAdu<'a>> for Request<'a> {
    fn from(from: RequestAdu<'a>) -> Self {
        from.pdu
    }
}

/// The data of a successful exchange.
///
/// For read operations `data` holds exactly the bytes announced by the
/// response byte count. For write operations it holds the echoed address
/// followed by the echoed value or quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub hdr: Header,
    pub function: FunctionCode,
    pub data: Bytes,
}

/// A decoded response PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePdu {
    Data(FunctionCode, Bytes),
    Exception(FunctionCode, ExceptionCode),
}

impl ResponsePdu {
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        match self {
            Self::Data(function, _) | Self::Exception(function, _) => *function,
        }
    }
}

/// A decoded response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseAdu {
    pub hdr: Header,
    pub pdu: ResponsePdu,
}

impl ResponseAdu {
    /// Split into the successful response or the device fault.
    pub fn into_result(self) -> std::result::Result<Response, Fault> {
        let Self { hdr, pdu } = self;
        match pdu {
            ResponsePdu::Data(function, data) => Ok(Response {
                hdr,
                function,
                data,
            }),
            ResponsePdu::Exception(function, exception) => {
                Err(Fault::new(hdr, function, FaultCode::Exception(exception)))
            }
        }
    }
}

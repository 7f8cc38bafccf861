// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal conditions of an exchange and their delivery.
//!
//! Every outcome that ends an exchange unsuccessfully, whether reported
//! by the device or detected locally, is normalized into a [`Fault`] and
//! published on the single [`Events`] stream of a master.

use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use futures_core::Stream;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::frame::{ExceptionCode, FunctionCode, Header, Response};

/// Classification of a [`Fault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCode {
    /// The device rejected the request.
    Exception(ExceptionCode),

    /// The request could not be handed to the transport.
    SendFailure,

    /// A response arrived that does not belong to any outstanding request.
    UnexpectedResponse,

    /// The connection for the exchange has not been established.
    NotConnected,

    /// The stream failed. Both connections are torn down.
    ConnectionLost,

    /// No response arrived in time.
    Timeout,
}

impl FaultCode {
    /// The numeric code delivered to consumers.
    ///
    /// Device exceptions keep their protocol value. Local conditions use
    /// values outside of the protocol's own numbering.
    #[must_use]
    pub fn value(self) -> u8 {
        match self {
            Self::Exception(exception) => exception.into(),
            Self::SendFailure => 100,
            Self::UnexpectedResponse => 252,
            Self::NotConnected => 253,
            Self::ConnectionLost => 254,
            Self::Timeout => 255,
        }
    }

    /// Faults reported by the device itself. The connection stays usable.
    #[must_use]
    pub const fn is_exception(self) -> bool {
        matches!(self, Self::Exception(_))
    }

    /// Faults that require both connections to be re-established.
    #[must_use]
    pub const fn is_connection_lost(self) -> bool {
        matches!(self, Self::ConnectionLost)
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exception(exception) => fmt::Display::fmt(exception, f),
            Self::SendFailure => f.write_str("send failure"),
            Self::UnexpectedResponse => f.write_str("unexpected response"),
            Self::NotConnected => f.write_str("not connected"),
            Self::ConnectionLost => f.write_str("connection lost"),
            Self::Timeout => f.write_str("timeout"),
        }
    }
}

impl From<ExceptionCode> for FaultCode {
    fn from(from: ExceptionCode) -> Self {
        Self::Exception(from)
    }
}

/// An exchange that ended unsuccessfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{code} (transaction: {}, unit: {}, function: {function})", .hdr.transaction_id, .hdr.unit_id)]
pub struct Fault {
    pub hdr: Header,
    pub function: FunctionCode,
    pub code: FaultCode,
}

impl Fault {
    #[must_use]
    pub const fn new(hdr: Header, function: FunctionCode, code: FaultCode) -> Self {
        Self {
            hdr,
            function,
            code,
        }
    }

    /// The device exception, if the fault was reported by the device.
    #[must_use]
    pub const fn exception(&self) -> Option<ExceptionCode> {
        match self.code {
            FaultCode::Exception(exception) => Some(exception),
            _ => None,
        }
    }
}

/// Notification delivered on the [`Events`] stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A dispatched request completed successfully.
    Response(Response),

    /// An exchange ended unsuccessfully.
    Fault(Fault),

    /// The dispatch connection was torn down while nothing was in flight.
    Disconnected,
}

/// Stream of responses and faults of a master.
///
/// The stream ends once the master has been dropped.
#[derive(Debug)]
pub struct Events {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl Events {
    /// Receive the next event.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Receive the next event if one is available immediately.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Receive the next event, blocking the current thread.
    ///
    /// Must not be called from within an asynchronous execution context.
    pub fn blocking_recv(&mut self) -> Option<Event> {
        self.rx.blocking_recv()
    }
}

impl Stream for Events {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

pub(crate) fn channel() -> (EventSender, Events) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, Events { rx })
}

#[derive(Debug, Clone)]
pub(crate) struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSender {
    fn send(&self, event: Event) {
        // Nobody listening is not an error.
        let _ = self.tx.send(event);
    }
}

/// Routes outcomes of both connections of one link to the event stream.
///
/// Raising a connection-lost fault cancels the link, which tears down
/// both connections.
#[derive(Debug, Clone)]
pub(crate) struct FaultSink {
    events: EventSender,
    link: CancellationToken,
}

impl FaultSink {
    pub(crate) fn new(events: EventSender, link: CancellationToken) -> Self {
        Self { events, link }
    }

    pub(crate) fn link(&self) -> &CancellationToken {
        &self.link
    }

    pub(crate) fn is_torn_down(&self) -> bool {
        self.link.is_cancelled()
    }

    /// Publish `fault` and hand it back for returning it to the caller.
    pub(crate) fn raise(&self, fault: Fault) -> Fault {
        if fault.code.is_exception() {
            log::debug!("Device fault: {fault}");
        } else {
            log::warn!("Fault: {fault}");
        }
        self.events.send(Event::Fault(fault));
        if fault.code.is_connection_lost() {
            self.link.cancel();
        }
        fault
    }

    pub(crate) fn respond(&self, response: Response) {
        self.events.send(Event::Response(response));
    }

    pub(crate) fn disconnected(&self) {
        self.events.send(Event::Disconnected);
    }
}

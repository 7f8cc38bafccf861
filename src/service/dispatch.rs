// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Non-blocking submission over the dispatch connection.
//!
//! Requests are written by the submitter. Responses are read by a
//! dedicated task that correlates them with the outstanding requests
//! by transaction id and publishes the outcome as an event.

use std::{
    fmt, io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use futures_util::{SinkExt as _, StreamExt as _};
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf},
    sync::Notify,
    time::Instant,
};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::{
    codec::{self, tcp::ClientCodec},
    fault::{Fault, FaultCode, FaultSink},
    frame::{RequestAdu, ResponseAdu, TransactionId},
    registry::{PendingRequest, TransactionIds, TransactionRegistry},
    service::verify_response,
    Error, Result,
};

type RequestSink<T> = FramedWrite<WriteHalf<T>, ClientCodec>;
type ResponseStream<T> = FramedRead<ReadHalf<T>, ClientCodec>;

fn lock(registry: &Mutex<TransactionRegistry>) -> MutexGuard<'_, TransactionRegistry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct Dispatcher<T> {
    sink: Arc<tokio::sync::Mutex<RequestSink<T>>>,
    registry: Arc<Mutex<TransactionRegistry>>,
    wakeup: Arc<Notify>,
    faults: FaultSink,
    timeout: Duration,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            registry: Arc::clone(&self.registry),
            wakeup: Arc::clone(&self.wakeup),
            faults: self.faults.clone(),
            timeout: self.timeout,
        }
    }
}

impl<T> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pending", &lock(&self.registry).len())
            .field("torn_down", &self.faults.is_torn_down())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<T> Dispatcher<T>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Take over `transport` and spawn the task that reads its responses.
    ///
    /// Must be called within a Tokio runtime.
    pub(crate) fn new(transport: T, faults: FaultSink, timeout: Duration) -> Self {
        let (reader, writer) = tokio::io::split(transport);
        let registry = Arc::<Mutex<TransactionRegistry>>::default();
        let wakeup = Arc::new(Notify::new());
        tokio::spawn(read_responses(
            FramedRead::new(reader, ClientCodec),
            Arc::clone(&registry),
            Arc::clone(&wakeup),
            faults.clone(),
        ));
        Self {
            sink: Arc::new(tokio::sync::Mutex::new(FramedWrite::new(writer, ClientCodec))),
            registry,
            wakeup,
            faults,
            timeout,
        }
    }
}

impl<T> Dispatcher<T>
where
    T: AsyncWrite,
{
    pub(crate) fn is_connected(&self) -> bool {
        !self.faults.is_torn_down()
    }

    pub(crate) fn pending_count(&self) -> usize {
        lock(&self.registry).len()
    }

    /// Pick a transaction id that is not in flight.
    pub(crate) fn allocate(&self, ids: &TransactionIds) -> TransactionId {
        lock(&self.registry).allocate(ids)
    }

    /// Hand `req` to the transport without waiting for the response.
    ///
    /// The outcome is published on the event stream once the response
    /// has arrived or the deadline of the request has passed.
    pub(crate) async fn submit(&self, req: RequestAdu<'_>) -> Result<()> {
        log::debug!("Submit {:?}", req);
        let hdr = req.hdr;
        let function = req.pdu.function_code();
        codec::request_pdu_size(&req.pdu).map_err(Error::InvalidRequest)?;

        if self.faults.is_torn_down() {
            return Err(self
                .faults
                .raise(Fault::new(hdr, function, FaultCode::NotConnected))
                .into());
        }

        let pending = PendingRequest {
            unit_id: hdr.unit_id,
            function,
            deadline: Instant::now() + self.timeout,
        };
        lock(&self.registry).insert(hdr.transaction_id, pending)?;
        // The reader might have drained the registry in the meantime.
        if self.faults.is_torn_down() {
            return Err(self.settle(Fault::new(hdr, function, FaultCode::NotConnected)));
        }
        self.wakeup.notify_one();

        let sent = self.sink.lock().await.send(req).await;
        if let Err(err) = sent {
            log::warn!("Failed to send request {hdr:?}: {err}");
            return Err(self.settle(Fault::new(hdr, function, FaultCode::SendFailure)));
        }
        Ok(())
    }

    /// Withdraw the request of `fault` and publish the fault, unless
    /// the reader has already reported an outcome for it.
    fn settle(&self, fault: Fault) -> Error {
        let pending = lock(&self.registry).remove(fault.hdr.transaction_id);
        match pending {
            Some(_) => self.faults.raise(fault).into(),
            None => fault.into(),
        }
    }

    /// Tear down the link and shut down the write half gracefully.
    ///
    /// Requests still in flight are reported as connection lost.
    pub(crate) async fn disconnect(&self) -> io::Result<()> {
        self.faults.link().cancel();
        self.sink.lock().await.close().await
    }
}

async fn read_responses<T>(
    mut responses: ResponseStream<T>,
    registry: Arc<Mutex<TransactionRegistry>>,
    wakeup: Arc<Notify>,
    faults: FaultSink,
) where
    T: AsyncRead,
{
    let link = faults.link().clone();
    loop {
        let next_deadline = lock(&registry).next_deadline();
        let expiry = async move {
            match next_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            () = link.cancelled() => {
                log::debug!("Dispatch connection torn down");
                break;
            }
            () = wakeup.notified() => {}
            () = expiry => {
                let expired = lock(&registry).expire(Instant::now());
                for (transaction_id, pending) in expired {
                    faults.raise(Fault::new(
                        pending.header(transaction_id),
                        pending.function,
                        FaultCode::Timeout,
                    ));
                }
            }
            frame = responses.next() => match frame {
                Some(Ok(rsp_adu)) => dispatch_response(&registry, &faults, rsp_adu),
                Some(Err(err)) => {
                    log::warn!("Failed to receive response: {err}");
                    break;
                }
                None => {
                    log::debug!("Dispatch connection closed by peer");
                    break;
                }
            },
        }
    }

    // Submitters re-check the link after registering, so every request
    // is either drained here or rejected by its submitter.
    link.cancel();
    let drained = lock(&registry).drain();
    if drained.is_empty() {
        faults.disconnected();
        return;
    }
    for (transaction_id, pending) in drained {
        faults.raise(Fault::new(
            pending.header(transaction_id),
            pending.function,
            FaultCode::ConnectionLost,
        ));
    }
}

fn dispatch_response(
    registry: &Mutex<TransactionRegistry>,
    faults: &FaultSink,
    rsp_adu: ResponseAdu,
) {
    let transaction_id = rsp_adu.hdr.transaction_id;
    let pending = lock(registry).remove(transaction_id);
    let Some(pending) = pending else {
        log::warn!("No request pending for response {:?}", rsp_adu.hdr);
        faults.raise(Fault::new(
            rsp_adu.hdr,
            rsp_adu.pdu.function_code(),
            FaultCode::UnexpectedResponse,
        ));
        return;
    };

    let req_hdr = pending.header(transaction_id);
    if let Err(err) = verify_response(&req_hdr, pending.function, &rsp_adu) {
        log::warn!("{err}");
        faults.raise(Fault::new(
            req_hdr,
            pending.function,
            FaultCode::UnexpectedResponse,
        ));
        return;
    }

    match rsp_adu.into_result() {
        Ok(response) => faults.respond(response),
        Err(fault) => {
            faults.raise(fault);
        }
    }
}

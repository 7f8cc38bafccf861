// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{io, time::Duration};

use futures_util::{SinkExt as _, StreamExt as _};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt as _};
use tokio_util::codec::Framed;

use crate::{
    codec,
    fault::{Fault, FaultCode, FaultSink},
    frame::{RequestAdu, Response, ResponseAdu},
    service::verify_response,
    Error, Result,
};

/// Request/response exchange over the dedicated synchronous connection.
///
/// Only a single exchange can be outstanding at any time.
#[derive(Debug)]
pub(crate) struct Client<T> {
    framed: Option<Framed<T, codec::tcp::ClientCodec>>,
    faults: FaultSink,
    timeout: Duration,
}

impl<T> Client<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(transport: T, faults: FaultSink, timeout: Duration) -> Self {
        let framed = Framed::new(transport, codec::tcp::ClientCodec);
        Self {
            framed: Some(framed),
            faults,
            timeout,
        }
    }

    /// A client without a connection, every call fails with connection lost.
    pub(crate) fn disconnected(faults: FaultSink, timeout: Duration) -> Self {
        Self {
            framed: None,
            faults,
            timeout,
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.framed.is_some() && !self.faults.is_torn_down()
    }

    /// Shut down the stream gracefully.
    pub(crate) async fn disconnect(&mut self) -> io::Result<()> {
        match self.framed.take() {
            Some(framed) => framed.into_inner().shutdown().await,
            None => Ok(()),
        }
    }

    /// Send `req` and wait for its response.
    ///
    /// Fails with a connection-lost fault without any I/O if the
    /// connection is gone. A link torn down by the other connection
    /// closes the stream on the next call.
    pub(crate) async fn call(&mut self, req: RequestAdu<'_>) -> Result<Response> {
        log::debug!("Call {:?}", req);
        let req_hdr = req.hdr;
        let req_function = req.pdu.function_code();
        codec::request_pdu_size(&req.pdu).map_err(Error::InvalidRequest)?;

        if self.faults.is_torn_down() {
            self.framed = None;
        }
        let faults = &self.faults;
        let fault = |code| Fault::new(req_hdr, req_function, code);

        let Some(framed) = self.framed.as_mut() else {
            return Err(faults.raise(fault(FaultCode::ConnectionLost)).into());
        };

        let exchange = async {
            framed.send(req).await?;
            loop {
                let rsp_adu: ResponseAdu = framed.next().await.ok_or_else(|| {
                    io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed by peer")
                })??;
                if rsp_adu.hdr.transaction_id == req_hdr.transaction_id {
                    return Ok::<_, io::Error>(rsp_adu);
                }
                // A late response of an exchange that timed out. Its
                // beginning may have been read by that exchange.
                log::warn!("Skipping response {:?}", rsp_adu.hdr);
                faults.raise(Fault::new(
                    rsp_adu.hdr,
                    rsp_adu.pdu.function_code(),
                    FaultCode::UnexpectedResponse,
                ));
            }
        };

        let rsp_adu = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(rsp_adu)) => rsp_adu,
            Ok(Err(err)) => {
                log::warn!("Connection failed: {err}");
                self.framed = None;
                return Err(self.faults.raise(fault(FaultCode::ConnectionLost)).into());
            }
            Err(_) => {
                return Err(self.faults.raise(fault(FaultCode::Timeout)).into());
            }
        };

        if let Err(err) = verify_response(&req_hdr, req_function, &rsp_adu) {
            log::warn!("{err}");
            return Err(self.faults.raise(fault(FaultCode::UnexpectedResponse)).into());
        }

        rsp_adu
            .into_result()
            .map_err(|fault| self.faults.raise(fault).into())
    }
}

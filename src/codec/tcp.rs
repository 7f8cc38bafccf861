// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::{Error, ErrorKind, Result};

use byteorder::{BigEndian, ByteOrder as _};
use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use super::*;

/// Frames the response stream of a connection.
///
/// Decoding waits until the complete frame announced by the length field
/// has arrived and rejects frames whose length disagrees with their PDU.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClientCodec;

impl Decoder for ClientCodec {
    type Item = ResponseAdu;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ResponseAdu>> {
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let protocol_id = BigEndian::read_u16(&buf[2..4]);
        if protocol_id != PROTOCOL_ID {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("invalid protocol identifier: 0x{protocol_id:04X}"),
            ));
        }

        // len = bytes of PDU + one byte (unit ID)
        let len = usize::from(BigEndian::read_u16(&buf[4..6]));
        if !(2..=MAX_PDU_SIZE + 1).contains(&len) {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("invalid frame length: {len}"),
            ));
        }

        let adu_len = HEADER_LEN - 1 + len;
        if buf.len() < adu_len {
            buf.reserve(adu_len - buf.len());
            return Ok(None);
        }

        let frame = buf.split_to(adu_len);
        log::trace!("Received frame: {:02X?}", &frame[..]);
        let adu = decode_response_adu(&frame)?;

        let pdu_len = response_pdu_size(&adu.pdu);
        if pdu_len + 1 != len {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("frame length {len} does not match PDU length {pdu_len}"),
            ));
        }

        Ok(Some(adu))
    }
}

impl<'a> Encoder<RequestAdu<'a>> for ClientCodec {
    type Error = Error;

    fn encode(&mut self, adu: RequestAdu<'a>, buf: &mut BytesMut) -> Result<()> {
        encode_request_adu_into(buf, &adu)
    }
}

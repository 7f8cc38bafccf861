// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stateless conversion between operations and application data units.

use std::io::{self, Error, ErrorKind};

use byteorder::{BigEndian, ByteOrder as _};
use bytes::{BufMut as _, Bytes, BytesMut};

use crate::frame::{
    Coil, ExceptionCode, FunctionCode, Header, Quantity, Request, RequestAdu, ResponseAdu,
    ResponsePdu, Word,
};

pub(crate) mod tcp;

/// Maximum request/response PDU size.
///
/// As defined by the Modbus application protocol.
pub(crate) const MAX_PDU_SIZE: usize = 253;

/// Transaction id, protocol id, length and unit id.
pub(crate) const HEADER_LEN: usize = 7;

pub(crate) const PROTOCOL_ID: u16 = 0x0000;

/// Size of the address/value echo of write responses.
const WRITE_ECHO_LEN: usize = 4;

const EXCEPTION_OFFSET: u8 = 0x80;

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn u16_len(len: usize) -> u16 {
    // This type conversion should always be safe, because either
    // the caller is responsible to pass a valid usize or the
    // possible values are limited by the protocol.
    debug_assert!(len <= u16::MAX.into());
    len as u16
}

/// Item count of caller supplied values, saturated to a [`Quantity`].
///
/// Oversized requests are rejected by [`request_pdu_size()`].
pub(crate) fn saturating_quantity(len: usize) -> Quantity {
    Quantity::try_from(len).unwrap_or(Quantity::MAX)
}

#[allow(clippy::cast_possible_truncation)]
fn u8_len(len: usize) -> u8 {
    debug_assert!(len <= u8::MAX.into());
    len as u8
}

/// Register payloads always occupy whole registers on the wire.
fn padded_len(len: usize) -> usize {
    len + len % 2
}

fn invalid_input(msg: &'static str) -> Error {
    Error::new(ErrorKind::InvalidInput, msg)
}

fn invalid_data(msg: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidData, msg.into())
}

/// Validate a request and calculate the size of its PDU.
///
/// Quantities must not be zero and the PDU must fit into a single frame.
/// Protocol maxima per function (e.g. 125 registers) are not enforced.
pub fn request_pdu_size(request: &Request<'_>) -> io::Result<usize> {
    use crate::frame::Request::*;
    let size = match request {
        ReadCoils(_, quantity)
        | ReadDiscreteInputs(_, quantity)
        | ReadHoldingRegisters(_, quantity)
        | ReadInputRegisters(_, quantity) => {
            if *quantity == 0 {
                return Err(invalid_input("quantity must not be zero"));
            }
            5
        }
        WriteSingleCoil(_, _) | WriteSingleRegister(_, _) => 5,
        WriteMultipleCoils(_, quantity, packed_coils) => {
            if *quantity == 0 || packed_coils.is_empty() {
                return Err(invalid_input("no coils to write"));
            }
            6 + packed_coils.len()
        }
        WriteMultipleRegisters(_, data) => {
            if data.is_empty() {
                return Err(invalid_input("no registers to write"));
            }
            6 + padded_len(data.len())
        }
        ReadWriteMultipleRegisters(_, quantity, _, data) => {
            if *quantity == 0 {
                return Err(invalid_input("quantity must not be zero"));
            }
            if data.is_empty() {
                return Err(invalid_input("no registers to write"));
            }
            10 + padded_len(data.len())
        }
    };
    if size > MAX_PDU_SIZE {
        return Err(invalid_input("request PDU size exceeded"));
    }
    Ok(size)
}

fn put_register_bytes(buf: &mut BytesMut, data: &[u8]) {
    buf.put_slice(data);
    if data.len() % 2 != 0 {
        buf.put_u8(0x00);
    }
}

/// Append the PDU of an already validated request.
fn encode_request_pdu(buf: &mut BytesMut, request: &Request<'_>) {
    use crate::frame::Request::*;
    buf.put_u8(request.function_code().value());
    match request {
        ReadCoils(address, quantity)
        | ReadDiscreteInputs(address, quantity)
        | ReadHoldingRegisters(address, quantity)
        | ReadInputRegisters(address, quantity) => {
            buf.put_u16(*address);
            buf.put_u16(*quantity);
        }
        WriteSingleCoil(address, state) => {
            buf.put_u16(*address);
            buf.put_u16(bool_to_coil(*state));
        }
        WriteSingleRegister(address, word) => {
            buf.put_u16(*address);
            buf.put_u16(*word);
        }
        WriteMultipleCoils(address, quantity, packed_coils) => {
            buf.put_u16(*address);
            buf.put_u16(*quantity);
            buf.put_u8(u8_len(packed_coils.len()));
            buf.put_slice(packed_coils);
        }
        WriteMultipleRegisters(address, data) => {
            let byte_count = padded_len(data.len());
            buf.put_u16(*address);
            buf.put_u16(u16_len(byte_count / 2));
            buf.put_u8(u8_len(byte_count));
            put_register_bytes(buf, data);
        }
        ReadWriteMultipleRegisters(read_address, quantity, write_address, data) => {
            let byte_count = padded_len(data.len());
            buf.put_u16(*read_address);
            buf.put_u16(*quantity);
            buf.put_u16(*write_address);
            buf.put_u16(u16_len(byte_count / 2));
            buf.put_u8(u8_len(byte_count));
            put_register_bytes(buf, data);
        }
    }
}

/// Append the complete ADU (MBAP header and PDU) of `adu` to `buf`.
pub fn encode_request_adu_into(buf: &mut BytesMut, adu: &RequestAdu<'_>) -> io::Result<()> {
    let pdu_size = request_pdu_size(&adu.pdu)?;
    buf.reserve(HEADER_LEN + pdu_size);
    buf.put_u16(adu.hdr.transaction_id);
    buf.put_u16(PROTOCOL_ID);
    // The length counts the unit id and the PDU.
    buf.put_u16(u16_len(pdu_size + 1));
    buf.put_u8(adu.hdr.unit_id);
    let pdu_start = buf.len();
    encode_request_pdu(buf, &adu.pdu);
    debug_assert_eq!(buf.len() - pdu_start, pdu_size);
    Ok(())
}

/// Encode `adu` into a new buffer.
pub fn encode_request_adu(adu: &RequestAdu<'_>) -> io::Result<Bytes> {
    let mut buf = BytesMut::new();
    encode_request_adu_into(&mut buf, adu)?;
    Ok(buf.freeze())
}

/// Decode a response frame starting at the MBAP header.
///
/// The transaction id and unit id are taken from the header as is.
/// The length field is not checked against `buf`, that is up to the
/// framing layer, see [`response_pdu_size()`].
pub fn decode_response_adu(buf: &[u8]) -> io::Result<ResponseAdu> {
    if buf.len() <= HEADER_LEN {
        return Err(invalid_data("too short"));
    }
    let hdr = Header {
        transaction_id: BigEndian::read_u16(&buf[0..2]),
        unit_id: buf[6],
    };
    let fn_code = buf[HEADER_LEN];
    let payload = &buf[HEADER_LEN + 1..];
    let pdu = if fn_code > EXCEPTION_OFFSET {
        let function = FunctionCode::new(fn_code - EXCEPTION_OFFSET).ok_or_else(|| {
            invalid_data(format!("invalid exception function code: 0x{fn_code:02X}"))
        })?;
        let exception = *payload
            .first()
            .ok_or_else(|| invalid_data("missing exception code"))?;
        ResponsePdu::Exception(function, ExceptionCode::new(exception))
    } else {
        let function = FunctionCode::new(fn_code)
            .ok_or_else(|| invalid_data(format!("invalid function code: 0x{fn_code:02X}")))?;
        let data = if function.is_write() {
            if payload.len() < WRITE_ECHO_LEN {
                return Err(invalid_data("too short"));
            }
            &payload[..WRITE_ECHO_LEN]
        } else {
            let byte_count = usize::from(
                *payload
                    .first()
                    .ok_or_else(|| invalid_data("missing byte count"))?,
            );
            if payload.len() < 1 + byte_count {
                return Err(invalid_data("too short"));
            }
            &payload[1..=byte_count]
        };
        ResponsePdu::Data(function, Bytes::copy_from_slice(data))
    };
    Ok(ResponseAdu { hdr, pdu })
}

/// Number of PDU bytes a decoded response occupied on the wire.
#[must_use]
pub fn response_pdu_size(pdu: &ResponsePdu) -> usize {
    match pdu {
        ResponsePdu::Exception(_, _) => 2,
        ResponsePdu::Data(function, _) if function.is_write() => 1 + WRITE_ECHO_LEN,
        ResponsePdu::Data(_, data) => 2 + data.len(),
    }
}

/// Convert a word into its big-endian wire representation.
#[must_use]
pub const fn word_to_bytes(word: Word) -> [u8; 2] {
    word.to_be_bytes()
}

/// Convert two big-endian bytes into a word.
#[must_use]
pub fn bytes_to_word(bytes: [u8; 2]) -> Word {
    BigEndian::read_u16(&bytes)
}

/// Marshal register values into big-endian bytes.
#[must_use]
pub fn words_to_bytes(words: &[Word]) -> Vec<u8> {
    words.iter().copied().flat_map(word_to_bytes).collect()
}

/// Unmarshal big-endian bytes into register values.
///
/// A single trailing byte of an odd-length buffer is returned
/// as a standalone value.
#[must_use]
pub fn bytes_to_words(bytes: &[u8]) -> Vec<Word> {
    bytes
        .chunks(2)
        .map(|chunk| match chunk {
            [hi, lo] => bytes_to_word([*hi, *lo]),
            [single] => Word::from(*single),
            _ => unreachable!(),
        })
        .collect()
}

/// Convert a coil state into its register encoding.
#[must_use]
pub const fn bool_to_coil(state: bool) -> u16 {
    if state {
        0xFF00
    } else {
        0x0000
    }
}

/// Convert a register encoding back into a coil state.
pub fn coil_to_bool(coil: u16) -> io::Result<bool> {
    match coil {
        0xFF00 => Ok(true),
        0x0000 => Ok(false),
        _ => Err(invalid_data(format!("invalid coil value: 0x{coil:04X}"))),
    }
}

/// Pack coils into bytes, the first coil in the least significant bit.
#[must_use]
pub fn pack_coils(coils: &[Coil]) -> Vec<u8> {
    let mut packed = vec![0; coils.len().div_ceil(8)];
    for (i, coil) in coils.iter().enumerate() {
        packed[i / 8] |= u8::from(*coil) << (i % 8);
    }
    packed
}

/// Unpack `count` coils from packed bytes.
///
/// Missing bits are never invented, the result is truncated to the
/// bits that are actually available.
#[must_use]
pub fn unpack_coils(bytes: &[u8], count: u16) -> Vec<Coil> {
    let count = usize::from(count).min(bytes.len() * 8);
    (0..count)
        .map(|i| (bytes[i / 8] >> (i % 8)) & 0b1 > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    fn encode(transaction_id: u16, unit_id: u8, request: Request<'_>) -> Bytes {
        encode_request_adu(&RequestAdu::new(transaction_id, unit_id, request)).unwrap()
    }

    /// Mimic a device that echoes writes and answers reads with `data`.
    fn echo_response(request: &[u8], data: &[u8]) -> Vec<u8> {
        let fn_code = request[HEADER_LEN];
        let mut rsp = request[..HEADER_LEN + 1].to_vec();
        if FunctionCode::new(fn_code).unwrap().is_write() {
            rsp.extend_from_slice(&request[HEADER_LEN + 1..HEADER_LEN + 5]);
        } else {
            rsp.push(u8_len(data.len()));
            rsp.extend_from_slice(data);
        }
        let len = u16_len(rsp.len() - 6);
        rsp[4..6].copy_from_slice(&len.to_be_bytes());
        rsp
    }

    #[test]
    fn encode_read_holding_registers() {
        let adu = encode(1, 1, Request::ReadHoldingRegisters(0, 10));
        assert_eq!(
            &adu[..],
            &[0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x0A]
        );
    }

    #[test]
    fn encode_reads_have_fixed_length() {
        for request in [
            Request::ReadCoils(0x12, 4),
            Request::ReadDiscreteInputs(0x03, 19),
            Request::ReadInputRegisters(0x09, 77),
        ] {
            let fn_code = request.function_code().value();
            let adu = encode(0x1234, 0x66, request);
            assert_eq!(adu.len(), 12);
            assert_eq!(&adu[..8], &[0x12, 0x34, 0x00, 0x00, 0x00, 0x06, 0x66, fn_code]);
        }
    }

    #[test]
    fn encode_zero_quantity_is_rejected() {
        let err = encode_request_adu(&RequestAdu::new(1, 1, Request::ReadCoils(0, 0))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = encode_request_adu(&RequestAdu::new(
            1,
            1,
            Request::WriteMultipleRegisters(0, Cow::Borrowed(&[])),
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn encode_does_not_clamp_protocol_maxima() {
        let adu = encode(1, 1, Request::ReadHoldingRegisters(0, 0xFFFF));
        assert_eq!(&adu[10..], &[0xFF, 0xFF]);
    }

    #[test]
    fn encode_write_single_coil() {
        let adu = encode(7, 2, Request::WriteSingleCoil(0x1234, true));
        assert_eq!(&adu[4..6], &[0x00, 0x06]);
        assert_eq!(&adu[7..], &[0x05, 0x12, 0x34, 0xFF, 0x00]);

        let adu = encode(7, 2, Request::WriteSingleCoil(0x1234, false));
        assert_eq!(&adu[7..], &[0x05, 0x12, 0x34, 0x00, 0x00]);
    }

    #[test]
    fn encode_write_single_register() {
        let adu = encode(7, 2, Request::WriteSingleRegister(0x07, 0xABCD));
        assert_eq!(&adu[4..6], &[0x00, 0x06]);
        assert_eq!(&adu[7..], &[0x06, 0x00, 0x07, 0xAB, 0xCD]);
    }

    #[test]
    fn encode_write_multiple_coils() {
        let request = Request::write_multiple_coils(0x3311, &[true, false, true, true]);
        let adu = encode(1, 1, request);
        assert_eq!(&adu[4..6], &[0x00, 0x08]);
        assert_eq!(&adu[7..], &[0x0F, 0x33, 0x11, 0x00, 0x04, 0x01, 0b_0000_1101]);
    }

    #[test]
    fn encode_write_multiple_coils_keeps_bit_count() {
        // The quantity is a bit count and independent of the byte count.
        let request = Request::WriteMultipleCoils(0, 10, Cow::Borrowed(&[0xFF, 0x03]));
        let adu = encode(1, 1, request);
        assert_eq!(&adu[7..], &[0x0F, 0x00, 0x00, 0x00, 0x0A, 0x02, 0xFF, 0x03]);
    }

    #[test]
    fn encode_write_multiple_registers() {
        let request = Request::write_multiple_registers(0x06, &[0xABCD, 0xEF12]);
        let adu = encode(1, 1, request);
        assert_eq!(&adu[4..6], &[0x00, 0x0B]);
        assert_eq!(
            &adu[7..],
            &[0x10, 0x00, 0x06, 0x00, 0x02, 0x04, 0xAB, 0xCD, 0xEF, 0x12]
        );
    }

    #[test]
    fn encode_write_multiple_registers_pads_odd_payload() {
        let request = Request::WriteMultipleRegisters(0x06, Cow::Borrowed(&[0xAB, 0xCD, 0xEF]));
        let adu = encode(1, 1, request);
        assert_eq!(&adu[4..6], &[0x00, 0x0B]);
        assert_eq!(
            &adu[7..],
            &[0x10, 0x00, 0x06, 0x00, 0x02, 0x04, 0xAB, 0xCD, 0xEF, 0x00]
        );
    }

    #[test]
    fn encode_read_write_multiple_registers() {
        let request = Request::read_write_multiple_registers(0x05, 51, 0x03, &[0xABCD, 0xEF12]);
        let adu = encode(1, 1, request);
        // 11 + 2 * write quantity
        assert_eq!(&adu[4..6], &[0x00, 15]);
        assert_eq!(
            &adu[7..],
            &[0x17, 0x00, 0x05, 0x00, 0x33, 0x00, 0x03, 0x00, 0x02, 0x04, 0xAB, 0xCD, 0xEF, 0x12]
        );
    }

    #[test]
    fn length_field_matches_pdu() {
        for request in [
            Request::ReadCoils(1, 1),
            Request::WriteSingleRegister(1, 1),
            Request::write_multiple_coils(1, &[true; 17]),
            Request::WriteMultipleRegisters(1, Cow::Borrowed(&[1, 2, 3, 4, 5])),
            Request::read_write_multiple_registers(1, 2, 3, &[4, 5, 6]),
        ] {
            let adu = encode(1, 1, request);
            let len = usize::from(BigEndian::read_u16(&adu[4..6]));
            assert_eq!(len, adu.len() - 6);
        }
    }

    #[test]
    fn oversized_request_is_rejected() {
        let words = vec![0u16; 124];
        let err = encode_request_adu(&RequestAdu::new(
            1,
            1,
            Request::write_multiple_registers(0, &words),
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn decode_read_response() {
        let buf = [
            0x00, 0x2A, 0x00, 0x00, 0x00, 0x07, 0x11, 0x03, 0x04, 0xAB, 0xCD, 0xEF, 0x12,
        ];
        let adu = decode_response_adu(&buf).unwrap();
        assert_eq!(adu.hdr, Header::new(42, 0x11));
        assert_eq!(
            adu.pdu,
            ResponsePdu::Data(
                FunctionCode::ReadHoldingRegisters,
                Bytes::from_static(&[0xAB, 0xCD, 0xEF, 0x12])
            )
        );
        assert_eq!(response_pdu_size(&adu.pdu), 6);
    }

    #[test]
    fn decode_returns_exactly_byte_count_bytes() {
        let buf = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x01, 0x01, 0x01, 0b_0000_0101, 0x99, 0x99,
        ];
        let adu = decode_response_adu(&buf).unwrap();
        assert_eq!(
            adu.pdu,
            ResponsePdu::Data(FunctionCode::ReadCoils, Bytes::from_static(&[0b_0000_0101]))
        );
    }

    #[test]
    fn decode_write_echo() {
        let buf = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x10, 0x00, 0x06, 0x00, 0x02,
        ];
        let adu = decode_response_adu(&buf).unwrap();
        assert_eq!(
            adu.pdu,
            ResponsePdu::Data(
                FunctionCode::WriteMultipleRegisters,
                Bytes::from_static(&[0x00, 0x06, 0x00, 0x02])
            )
        );
    }

    #[test]
    fn decode_exception() {
        let buf = [0x00, 0x05, 0x00, 0x00, 0x00, 0x03, 0x66, 0x83, 0x02];
        let adu = decode_response_adu(&buf).unwrap();
        assert_eq!(adu.hdr, Header::new(5, 0x66));
        assert_eq!(
            adu.pdu,
            ResponsePdu::Exception(
                FunctionCode::ReadHoldingRegisters,
                ExceptionCode::IllegalDataAddress
            )
        );
        assert!(adu.into_result().is_err());
    }

    #[test]
    fn decode_invalid_frames() {
        // header only
        assert!(decode_response_adu(&[0, 1, 0, 0, 0, 1, 1]).is_err());
        // unsupported function
        let err = decode_response_adu(&[0, 1, 0, 0, 0, 3, 1, 0x07, 0x00]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        // byte count exceeds the available data
        let err = decode_response_adu(&[0, 1, 0, 0, 0, 4, 1, 0x03, 0x04, 0x00]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        // truncated write echo
        assert!(decode_response_adu(&[0, 1, 0, 0, 0, 4, 1, 0x05, 0x00, 0x01]).is_err());
        // exception without code
        assert!(decode_response_adu(&[0, 1, 0, 0, 0, 2, 1, 0x81]).is_err());
    }

    #[test]
    fn round_trip_with_echo_device() {
        let registers = [0x1234, 0xFFFF, 0x0000];
        let register_bytes = words_to_bytes(&registers);

        let rsp = echo_response(
            &encode(9, 3, Request::ReadHoldingRegisters(0x100, 3)),
            &register_bytes,
        );
        let rsp = decode_response_adu(&rsp).unwrap().into_result().unwrap();
        assert_eq!(rsp.hdr, Header::new(9, 3));
        assert_eq!(bytes_to_words(&rsp.data), registers);

        let coils = [true, false, false, true, true];
        let rsp = echo_response(&encode(9, 3, Request::ReadCoils(0, 5)), &pack_coils(&coils));
        let rsp = decode_response_adu(&rsp).unwrap().into_result().unwrap();
        assert_eq!(unpack_coils(&rsp.data, 5), coils);

        let rsp = echo_response(&encode(9, 3, Request::WriteSingleCoil(0x42, true)), &[]);
        let rsp = decode_response_adu(&rsp).unwrap().into_result().unwrap();
        assert_eq!(bytes_to_words(&rsp.data), [0x42, bool_to_coil(true)]);

        let rsp = echo_response(
            &encode(9, 3, Request::write_multiple_registers(0x20, &registers)),
            &[],
        );
        let rsp = decode_response_adu(&rsp).unwrap().into_result().unwrap();
        assert_eq!(bytes_to_words(&rsp.data), [0x20, 3]);

        let rsp = echo_response(
            &encode(9, 3, Request::write_multiple_coils(0x30, &coils)),
            &[],
        );
        let rsp = decode_response_adu(&rsp).unwrap().into_result().unwrap();
        assert_eq!(bytes_to_words(&rsp.data), [0x30, 5]);

        let rsp = echo_response(
            &encode(9, 3, Request::read_write_multiple_registers(0, 3, 0x40, &[1])),
            &register_bytes,
        );
        let rsp = decode_response_adu(&rsp).unwrap().into_result().unwrap();
        assert_eq!(rsp.function, FunctionCode::ReadWriteMultipleRegisters);
        assert_eq!(bytes_to_words(&rsp.data), registers);
    }

    #[test]
    fn word_conversions() {
        for word in [0x0000, 0x0001, 0x00FF, 0x1234, 0x8000, 0xFFFF] {
            assert_eq!(bytes_to_word(word_to_bytes(word)), word);
        }
        assert_eq!(word_to_bytes(0x1234), [0x12, 0x34]);

        let bytes = [0x00, 0x01, 0xAB, 0xCD, 0xFF, 0xFF];
        let words = bytes_to_words(&bytes);
        assert_eq!(words, [0x0001, 0xABCD, 0xFFFF]);
        assert_eq!(words_to_bytes(&words), bytes);
    }

    #[test]
    fn odd_trailing_byte_is_a_standalone_value() {
        assert_eq!(bytes_to_words(&[0x12, 0x34, 0x56]), [0x1234, 0x0056]);
        assert!(bytes_to_words(&[]).is_empty());
    }

    #[test]
    fn convert_bool_to_coil() {
        assert_eq!(bool_to_coil(true), 0xFF00);
        assert_eq!(bool_to_coil(false), 0x0000);
    }

    #[test]
    fn convert_coil_to_bool() {
        assert!(coil_to_bool(0xFF00).unwrap());
        assert!(!coil_to_bool(0x0000).unwrap());
        assert!(coil_to_bool(0x1234).is_err());
    }

    #[test]
    fn pack_and_unpack_coils() {
        assert_eq!(pack_coils(&[]), Vec::<u8>::new());
        assert_eq!(pack_coils(&[true]), vec![0b_1]);
        assert_eq!(pack_coils(&[false, true]), vec![0b_10]);
        assert_eq!(pack_coils(&[true; 9]), vec![0xFF, 0b_1]);

        let bytes = [0b_1100_1101, 0b_1];
        assert_eq!(unpack_coils(&bytes, 4), vec![true, false, true, true]);
        assert_eq!(unpack_coils(&bytes, 9).len(), 9);
        assert_eq!(unpack_coils(&bytes, 100).len(), 16);
    }
}

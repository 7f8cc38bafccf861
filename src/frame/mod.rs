// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

pub(crate) mod tcp;

use std::{
    borrow::Cow,
    fmt::{self, Display},
};

use crate::codec::{pack_coils, words_to_bytes};

/// A Modbus function code.
///
/// Only the read/write operations a master issues against coils and
/// registers are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCode {
    /// 01 (0x01) Read Coils.
    ReadCoils,

    /// 02 (0x02) Read Discrete Inputs
    ReadDiscreteInputs,

    /// 03 (0x03) Read Holding Registers
    ReadHoldingRegisters,

    /// 04 (0x04) Read Input Registers
    ReadInputRegisters,

    /// 05 (0x05) Write Single Coil
    WriteSingleCoil,

    /// 06 (0x06) Write Single Register
    WriteSingleRegister,

    /// 15 (0x0F) Write Multiple Coils
    WriteMultipleCoils,

    /// 16 (0x10) Write Multiple Registers
    WriteMultipleRegisters,

    /// 23 (0x17) Read/Write Multiple Registers
    ReadWriteMultipleRegisters,
}

impl FunctionCode {
    /// Create a new [`FunctionCode`] with `value`.
    ///
    /// Returns `None` for codes outside of the supported set.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        let code = match value {
            0x01 => Self::ReadCoils,
            0x02 => Self::ReadDiscreteInputs,
            0x03 => Self::ReadHoldingRegisters,
            0x04 => Self::ReadInputRegisters,
            0x05 => Self::WriteSingleCoil,
            0x06 => Self::WriteSingleRegister,
            0x0F => Self::WriteMultipleCoils,
            0x10 => Self::WriteMultipleRegisters,
            0x17 => Self::ReadWriteMultipleRegisters,
            _ => return None,
        };
        Some(code)
    }

    /// Gets the [`u8`] value of the current [`FunctionCode`].
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::ReadCoils => 0x01,
            Self::ReadDiscreteInputs => 0x02,
            Self::ReadHoldingRegisters => 0x03,
            Self::ReadInputRegisters => 0x04,
            Self::WriteSingleCoil => 0x05,
            Self::WriteSingleRegister => 0x06,
            Self::WriteMultipleCoils => 0x0F,
            Self::WriteMultipleRegisters => 0x10,
            Self::ReadWriteMultipleRegisters => 0x17,
        }
    }

    /// Write operations are answered with a fixed-size echo
    /// instead of a byte count followed by data.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(
            self,
            Self::WriteSingleCoil
                | Self::WriteSingleRegister
                | Self::WriteMultipleCoils
                | Self::WriteMultipleRegisters
        )
    }
}

impl Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value().fmt(f)
    }
}

/// A Modbus protocol address is represented by 16 bit from `0` to `65535`.
///
/// This *protocol address* uses 0-based indexing, while the *coil address* or
/// *register address* is often specified as a number with 1-based indexing.
pub type Address = u16;

/// A Coil represents a single bit.
///
/// - `true` is equivalent to `ON`, `1` and `0xFF00`.
/// - `false` is equivalent to `OFF`, `0` and `0x0000`.
pub type Coil = bool;

/// Modbus uses 16 bit for its data items.
///
/// Transmitted using a big-endian representation.
pub type Word = u16;

/// Number of items to process.
pub type Quantity = u16;

/// A request represents a message from the client (master) to the server (slave).
///
/// Multi-item writes carry their payload as raw bytes exactly as they
/// are put on the wire. Use [`Request::write_multiple_coils()`] and
/// [`Request::write_multiple_registers()`] to build them from typed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    /// A request to read multiple coils.
    /// The first parameter is the address of the first coil to read.
    /// The second parameter is the number of coils to read.
    ReadCoils(Address, Quantity),

    /// A request to read multiple discrete inputs
    /// The first parameter is the address of the first discrete input to read.
    /// The second parameter is the number of discrete inputs to read.
    ReadDiscreteInputs(Address, Quantity),

    /// A request to read multiple holding registers.
    /// The first parameter is the address of the first holding register to read.
    /// The second parameter is the number of holding registers to read.
    ReadHoldingRegisters(Address, Quantity),

    /// A request to read multiple input registers.
    /// The first parameter is the address of the first input register to read.
    /// The second parameter is the number of input registers to read.
    ReadInputRegisters(Address, Quantity),

    /// A request to write a single coil.
    /// The first parameter is the address of the coil.
    /// The second parameter is the value to write to the coil.
    WriteSingleCoil(Address, Coil),

    /// A request to write a single register.
    /// The first parameter is the address of the register.
    /// The second parameter is the value to write to the register.
    WriteSingleRegister(Address, Word),

    /// A request to write multiple coils.
    /// The first parameter is the address of the first coil to write.
    /// The second parameter is the number of coils (bits) to write.
    /// The third parameter contains the packed coil bytes, LSB first.
    WriteMultipleCoils(Address, Quantity, Cow<'a, [u8]>),

    /// A request to write to multiple registers.
    /// The first parameter is the address of the first register to write.
    /// The second parameter contains the raw big-endian register bytes.
    /// An odd number of bytes is zero-padded to a register boundary.
    WriteMultipleRegisters(Address, Cow<'a, [u8]>),

    /// A request to simultaneously read multiple registers and write multiple registers.
    /// The first parameter is the address of the first register to read.
    /// The second parameter is the number of registers to read.
    /// The third parameter is the address of the first register to write.
    /// The fourth parameter contains the raw big-endian register bytes to write.
    ReadWriteMultipleRegisters(Address, Quantity, Address, Cow<'a, [u8]>),
}

impl Request<'_> {
    /// Build a [`Request::WriteMultipleCoils`] from unpacked coil values.
    #[must_use]
    pub fn write_multiple_coils(addr: Address, coils: &[Coil]) -> Request<'static> {
        Request::WriteMultipleCoils(
            addr,
            crate::codec::saturating_quantity(coils.len()),
            Cow::Owned(pack_coils(coils)),
        )
    }

    /// Build a [`Request::WriteMultipleRegisters`] from register values.
    #[must_use]
    pub fn write_multiple_registers(addr: Address, words: &[Word]) -> Request<'static> {
        Request::WriteMultipleRegisters(addr, Cow::Owned(words_to_bytes(words)))
    }

    /// Build a [`Request::ReadWriteMultipleRegisters`] from register values.
    #[must_use]
    pub fn read_write_multiple_registers(
        read_addr: Address,
        read_count: Quantity,
        write_addr: Address,
        words: &[Word],
    ) -> Request<'static> {
        Request::ReadWriteMultipleRegisters(
            read_addr,
            read_count,
            write_addr,
            Cow::Owned(words_to_bytes(words)),
        )
    }

    /// Converts the request into an owned instance with `'static'` lifetime.
    #[must_use]
    pub fn into_owned(self) -> Request<'static> {
        use Request::*;

        match self {
            ReadCoils(addr, qty) => ReadCoils(addr, qty),
            ReadDiscreteInputs(addr, qty) => ReadDiscreteInputs(addr, qty),
            ReadHoldingRegisters(addr, qty) => ReadHoldingRegisters(addr, qty),
            ReadInputRegisters(addr, qty) => ReadInputRegisters(addr, qty),
            WriteSingleCoil(addr, coil) => WriteSingleCoil(addr, coil),
            WriteSingleRegister(addr, word) => WriteSingleRegister(addr, word),
            WriteMultipleCoils(addr, qty, bytes) => {
                WriteMultipleCoils(addr, qty, Cow::Owned(bytes.into_owned()))
            }
            WriteMultipleRegisters(addr, bytes) => {
                WriteMultipleRegisters(addr, Cow::Owned(bytes.into_owned()))
            }
            ReadWriteMultipleRegisters(addr, qty, write_addr, bytes) => {
                ReadWriteMultipleRegisters(addr, qty, write_addr, Cow::Owned(bytes.into_owned()))
            }
        }
    }

    /// Get the [`FunctionCode`] of the [`Request`].
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        use Request::*;

        match self {
            ReadCoils(_, _) => FunctionCode::ReadCoils,
            ReadDiscreteInputs(_, _) => FunctionCode::ReadDiscreteInputs,

            ReadHoldingRegisters(_, _) => FunctionCode::ReadHoldingRegisters,
            ReadInputRegisters(_, _) => FunctionCode::ReadInputRegisters,

            WriteSingleCoil(_, _) => FunctionCode::WriteSingleCoil,
            WriteSingleRegister(_, _) => FunctionCode::WriteSingleRegister,

            WriteMultipleCoils(_, _, _) => FunctionCode::WriteMultipleCoils,
            WriteMultipleRegisters(_, _) => FunctionCode::WriteMultipleRegisters,

            ReadWriteMultipleRegisters(_, _, _, _) => FunctionCode::ReadWriteMultipleRegisters,
        }
    }
}

/// A server (slave) exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    /// 0x01
    IllegalFunction,
    /// 0x02
    IllegalDataAddress,
    /// 0x03
    IllegalDataValue,
    /// 0x04
    ServerDeviceFailure,
    /// 0x05
    Acknowledge,
    /// 0x06
    ServerDeviceBusy,
    /// 0x08
    MemoryParityError,
    /// 0x0A
    GatewayPathUnavailable,
    /// 0x0B
    GatewayTargetDevice,
    /// None of the above.
    ///
    /// Although encoding one of the predefined values as this is possible, it is not recommended.
    /// Instead, prefer to use [`Self::new()`] to prevent such ambiguities.
    Custom(u8),
}

impl From<ExceptionCode> for u8 {
    fn from(from: ExceptionCode) -> Self {
        use crate::frame::ExceptionCode::*;
        match from {
            IllegalFunction => 0x01,
            IllegalDataAddress => 0x02,
            IllegalDataValue => 0x03,
            ServerDeviceFailure => 0x04,
            Acknowledge => 0x05,
            ServerDeviceBusy => 0x06,
            MemoryParityError => 0x08,
            GatewayPathUnavailable => 0x0A,
            GatewayTargetDevice => 0x0B,
            Custom(code) => code,
        }
    }
}

impl ExceptionCode {
    /// Create a new [`ExceptionCode`] with `value`.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        use crate::frame::ExceptionCode::*;

        match value {
            0x01 => IllegalFunction,
            0x02 => IllegalDataAddress,
            0x03 => IllegalDataValue,
            0x04 => ServerDeviceFailure,
            0x05 => Acknowledge,
            0x06 => ServerDeviceBusy,
            0x08 => MemoryParityError,
            0x0A => GatewayPathUnavailable,
            0x0B => GatewayTargetDevice,
            other => Custom(other),
        }
    }

    pub(crate) fn description(&self) -> &str {
        use crate::frame::ExceptionCode::*;

        match *self {
            IllegalFunction => "Illegal function",
            IllegalDataAddress => "Illegal data address",
            IllegalDataValue => "Illegal data value",
            ServerDeviceFailure => "Server device failure",
            Acknowledge => "Acknowledge",
            ServerDeviceBusy => "Server device busy",
            MemoryParityError => "Memory parity error",
            GatewayPathUnavailable => "Gateway path unavailable",
            GatewayTargetDevice => "Gateway target device failed to respond",
            Custom(_) => "Custom",
        }
    }
}

impl Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.description(), u8::from(*self))
    }
}

pub use self::tcp::{Header, RequestAdu, Response, ResponseAdu, ResponsePdu, TransactionId, UnitId};

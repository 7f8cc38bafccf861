// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Simulated Modbus TCP device with coils and registers in memory.

#![allow(dead_code)]

use std::{
    net::SocketAddr,
    ops::Range,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use tokio::{
    io::{AsyncReadExt as _, AsyncWriteExt as _},
    net::{TcpListener, TcpStream},
};

/// Requests for this unit are never answered.
pub const SILENT_UNIT: u8 = 0xEE;

/// Requests for this unit close the connection.
pub const HANG_UP_UNIT: u8 = 0xDD;

/// Responses for this unit are held back until the next request for
/// it arrives and are then sent in reverse order.
pub const REVERSED_UNIT: u8 = 0xCC;

/// Number of coils and registers.
pub const SIZE: usize = 0x100;

const ILLEGAL_FUNCTION: u8 = 0x01;
const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
const ILLEGAL_DATA_VALUE: u8 = 0x03;

struct Memory {
    coils: Vec<bool>,
    registers: Vec<u16>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            coils: vec![false; SIZE],
            registers: (0..SIZE as u16).collect(),
        }
    }
}

fn range(addr: u16, cnt: u16) -> Result<Range<usize>, u8> {
    let start = usize::from(addr);
    let end = start + usize::from(cnt);
    if cnt == 0 {
        return Err(ILLEGAL_DATA_VALUE);
    }
    if end > SIZE {
        return Err(ILLEGAL_DATA_ADDRESS);
    }
    Ok(start..end)
}

fn word(data: &[u8], offset: usize) -> Result<u16, u8> {
    data.get(offset..offset + 2)
        .map(|bytes| u16::from_be_bytes([bytes[0], bytes[1]]))
        .ok_or(ILLEGAL_DATA_VALUE)
}

impl Memory {
    fn process(&mut self, pdu: &[u8]) -> Vec<u8> {
        let function = pdu[0];
        match self.try_process(function, &pdu[1..]) {
            Ok(data) => [&[function][..], &data].concat(),
            Err(exception) => vec![function | 0x80, exception],
        }
    }

    fn read_bits(&self, data: &[u8]) -> Result<Vec<u8>, u8> {
        let range = range(word(data, 0)?, word(data, 2)?)?;
        let coils = &self.coils[range];
        let mut packed = vec![0; coils.len().div_ceil(8)];
        for (i, coil) in coils.iter().enumerate() {
            packed[i / 8] |= u8::from(*coil) << (i % 8);
        }
        Ok([&[packed.len() as u8][..], &packed].concat())
    }

    fn read_words(&self, addr: u16, cnt: u16) -> Result<Vec<u8>, u8> {
        let range = range(addr, cnt)?;
        let bytes: Vec<u8> = self.registers[range]
            .iter()
            .flat_map(|word| word.to_be_bytes())
            .collect();
        Ok([&[bytes.len() as u8][..], &bytes].concat())
    }

    fn write_words(&mut self, addr: u16, cnt: u16, bytes: &[u8]) -> Result<(), u8> {
        let range = range(addr, cnt)?;
        if bytes.len() != range.len() * 2 {
            return Err(ILLEGAL_DATA_VALUE);
        }
        for (register, chunk) in self.registers[range].iter_mut().zip(bytes.chunks(2)) {
            *register = u16::from_be_bytes([chunk[0], chunk[1]]);
        }
        Ok(())
    }

    fn try_process(&mut self, function: u8, data: &[u8]) -> Result<Vec<u8>, u8> {
        match function {
            0x01 | 0x02 => self.read_bits(data),
            0x03 | 0x04 => self.read_words(word(data, 0)?, word(data, 2)?),
            0x05 => {
                let range = range(word(data, 0)?, 1)?;
                self.coils[range.start] = match word(data, 2)? {
                    0xFF00 => true,
                    0x0000 => false,
                    _ => return Err(ILLEGAL_DATA_VALUE),
                };
                Ok(data[..4].to_vec())
            }
            0x06 => {
                let range = range(word(data, 0)?, 1)?;
                self.registers[range.start] = word(data, 2)?;
                Ok(data[..4].to_vec())
            }
            0x0F => {
                let range = range(word(data, 0)?, word(data, 2)?)?;
                let packed = &data[5..];
                for (i, coil) in self.coils[range].iter_mut().enumerate() {
                    *coil = (packed[i / 8] >> (i % 8)) & 0b1 > 0;
                }
                Ok(data[..4].to_vec())
            }
            0x10 => {
                self.write_words(word(data, 0)?, word(data, 2)?, &data[5..])?;
                Ok(data[..4].to_vec())
            }
            0x17 => {
                self.write_words(word(data, 4)?, word(data, 6)?, &data[9..])?;
                self.read_words(word(data, 0)?, word(data, 2)?)
            }
            _ => Err(ILLEGAL_FUNCTION),
        }
    }
}

/// A device listening on an ephemeral local port.
pub struct Device {
    pub socket_addr: SocketAddr,
    memory: Arc<Mutex<Memory>>,
    connections: Arc<AtomicUsize>,
}

impl Device {
    /// Start listening. Must be called within a Tokio runtime.
    pub async fn start() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let socket_addr = listener.local_addr()?;
        let memory = Arc::new(Mutex::new(Memory::default()));
        let connections = Arc::new(AtomicUsize::new(0));
        tokio::spawn({
            let memory = Arc::clone(&memory);
            let connections = Arc::clone(&connections);
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(stream, Arc::clone(&memory)));
                }
            }
        });
        Ok(Self {
            socket_addr,
            memory,
            connections,
        })
    }

    pub fn coil(&self, addr: u16) -> bool {
        self.memory.lock().unwrap().coils[usize::from(addr)]
    }

    pub fn register(&self, addr: u16) -> u16 {
        self.memory.lock().unwrap().registers[usize::from(addr)]
    }

    /// Number of connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` connections have been accepted.
    pub async fn accepted(&self, count: usize) -> usize {
        for _ in 0..500 {
            if self.connections() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.connections()
    }
}

async fn serve(mut stream: TcpStream, memory: Arc<Mutex<Memory>>) {
    let mut held_back: Option<Vec<u8>> = None;
    loop {
        let mut header = [0; 7];
        if stream.read_exact(&mut header).await.is_err() {
            break;
        }
        let len = usize::from(u16::from_be_bytes([header[4], header[5]]));
        let mut pdu = vec![0; len.saturating_sub(1)];
        if pdu.is_empty() || stream.read_exact(&mut pdu).await.is_err() {
            break;
        }

        let unit_id = header[6];
        match unit_id {
            SILENT_UNIT => continue,
            HANG_UP_UNIT => break,
            _ => {}
        }

        let rsp_pdu = memory.lock().unwrap().process(&pdu);
        let mut frame = header[..4].to_vec();
        frame.extend_from_slice(&(rsp_pdu.len() as u16 + 1).to_be_bytes());
        frame.push(unit_id);
        frame.extend_from_slice(&rsp_pdu);

        if unit_id == REVERSED_UNIT {
            match held_back.take() {
                Some(first) => frame.extend_from_slice(&first),
                None => {
                    held_back = Some(frame);
                    continue;
                }
            }
        }
        if stream.write_all(&frame).await.is_err() {
            break;
        }
    }
}

/// A local address nothing is listening on.
pub async fn unused_socket_addr() -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    Ok(listener.local_addr()?)
}

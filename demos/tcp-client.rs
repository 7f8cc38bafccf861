// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Asynchronous TCP master example

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use modbus_master::prelude::*;

    env_logger::init();

    let socket_addr = "192.168.0.222:502".parse()?;
    let (mut master, mut events) = tcp::connect(socket_addr).await?;

    println!("Fetching the coupler ID");
    let data = master.read_input_registers(0x1000, 7).await?;
    let bytes: Vec<u8> = data.iter().fold(vec![], |mut x, elem| {
        x.extend_from_slice(&elem.to_be_bytes());
        x
    });
    let id = String::from_utf8_lossy(&bytes);
    println!("The coupler ID is '{id}'");

    println!("Dispatching two reads");
    let coils = master.send(Request::ReadCoils(0x0000, 16)).await?;
    let registers = master
        .send(Request::ReadHoldingRegisters(0x0000, 4))
        .await?;
    println!("Awaiting transactions {coils} and {registers}");
    for _ in 0..2 {
        match events.recv().await {
            Some(Event::Response(rsp)) => println!(
                "Transaction {} completed: {:02X?}",
                rsp.hdr.transaction_id,
                &rsp.data[..]
            ),
            Some(Event::Fault(fault)) => println!("Fault: {fault}"),
            Some(Event::Disconnected) | None => break,
        }
    }

    println!("Disconnecting");
    master.disconnect().await?;

    Ok(())
}

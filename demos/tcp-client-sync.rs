// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronous TCP master example

fn main() -> Result<(), Box<dyn std::error::Error>> {
    use modbus_master::prelude::*;

    env_logger::init();

    let socket_addr = "192.168.0.222:502".parse()?;
    let (mut ctx, mut events) = sync::tcp::connect_slave(socket_addr, Slave(1))?;

    let buff = ctx.read_input_registers(0x1000, 7)?;
    println!("Response is '{buff:?}'");

    ctx.write_single_coil(0x0010, true)?;

    let transaction_id = ctx.send(Request::ReadDiscreteInputs(0x0000, 8))?;
    println!("Submitted transaction {transaction_id}");
    if let Some(event) = events.blocking_recv() {
        println!("Event: {event:?}");
    }

    ctx.disconnect()?;

    Ok(())
}

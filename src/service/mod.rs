// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

pub(crate) mod dispatch;
pub(crate) mod tcp;

use crate::frame::{FunctionCode, Header, ResponseAdu};

/// Check that `rsp` answers a request with `req_hdr` and `req_function`.
///
/// # Errors
///
/// Returns a description of the first mismatch.
fn verify_response(
    req_hdr: &Header,
    req_function: FunctionCode,
    rsp: &ResponseAdu,
) -> Result<(), String> {
    if *req_hdr != rsp.hdr {
        return Err(format!(
            "Invalid response header: expected/request = {req_hdr:?}, actual/response = {:?}",
            rsp.hdr
        ));
    }
    let rsp_function = rsp.pdu.function_code();
    if req_function != rsp_function {
        return Err(format!(
            "Invalid response function: expected/request = {req_function:?}, actual/response = {rsp_function:?}"
        ));
    }
    Ok(())
}

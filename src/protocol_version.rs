// Copyright (c) Microsoft Corporation. All rights reserved.

//! Protocol version negotiated with the server during the handshake.

/// The protocol version this SDK speaks. The server must report the same
/// version in its `protocol.handshake` response.
pub const PROTOCOL_VERSION: u32 = 1;

/// Returns the protocol version this SDK speaks.
pub fn get_sdk_protocol_version() -> u32 {
    PROTOCOL_VERSION
}

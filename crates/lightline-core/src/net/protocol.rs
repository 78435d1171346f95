use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::actions::{ClientAction, ServerAction};

/// Maximum encoded action size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

/// Default simulation tick rate in Hz.
pub const DEFAULT_TICK_RATE_HZ: u32 = 64;

/// Encoding used on a transport. One action per message, no framing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// UTF-8 JSON text, the format browsers speak.
    #[default]
    Json,
    /// MessagePack with named fields.
    #[serde(rename = "msgpack")]
    MessagePack,
}

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode one action as a self-describing tagged record.
pub fn encode_action<A: Serialize>(format: WireFormat, action: &A) -> Result<Vec<u8>, ProtocolError> {
    let bytes = match format {
        WireFormat::Json => {
            serde_json::to_vec(action).map_err(|e| ProtocolError::SerializeError(e.to_string()))?
        },
        WireFormat::MessagePack => rmp_serde::to_vec_named(action)
            .map_err(|e| ProtocolError::SerializeError(e.to_string()))?,
    };
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(bytes.len()));
    }
    Ok(bytes)
}

/// Decode one action. Oversized input is rejected before parsing.
pub fn decode_action<A: DeserializeOwned>(format: WireFormat, data: &[u8]) -> Result<A, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }
    match format {
        WireFormat::Json => {
            serde_json::from_slice(data).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
        },
        WireFormat::MessagePack => {
            rmp_serde::from_slice(data).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
        },
    }
}

/// Encode a `ClientAction` to wire format.
pub fn encode_client_action(
    format: WireFormat,
    action: &ClientAction,
) -> Result<Vec<u8>, ProtocolError> {
    encode_action(format, action)
}

/// Decode raw wire data into a `ClientAction`.
pub fn decode_client_action(format: WireFormat, data: &[u8]) -> Result<ClientAction, ProtocolError> {
    decode_action(format, data)
}

/// Encode a `ServerAction` to wire format.
pub fn encode_server_action(
    format: WireFormat,
    action: &ServerAction,
) -> Result<Vec<u8>, ProtocolError> {
    encode_action(format, action)
}

/// Decode raw wire data into a `ServerAction`.
pub fn decode_server_action(format: WireFormat, data: &[u8]) -> Result<ServerAction, ProtocolError> {
    decode_action(format, data)
}

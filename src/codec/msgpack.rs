//! MsgPack codec using `rmp-serde`.
//!
//! Uses `to_vec_named` so structs are serialized as maps (with field names)
//! rather than positional arrays. Map format keeps the wire self-describing,
//! which matters for the dynamic `serde_json::Value` arguments: a positional
//! encoding would lose object keys.

use crate::codec::Codec;
use crate::error::Result;
use crate::message::{Request, Response};

/// MessagePack codec for the request/response envelopes.
///
/// The default codec. Struct-as-map encoding via `rmp_serde::to_vec_named`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl Codec for MsgPackCodec {
    fn encode_request(&self, request: &Request) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(request)?)
    }

    fn decode_request(&self, bytes: &[u8]) -> Result<Request> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    fn encode_response(&self, response: &Response) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(response)?)
    }

    fn decode_response(&self, bytes: &[u8]) -> Result<Response> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

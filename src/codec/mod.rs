//! Codec module - pluggable wire encoding for request/response envelopes.
//!
//! The invocation pipeline treats the codec as an opaque capability: it
//! encodes a [`Request`] to bytes on the client, decodes it on the server,
//! and the reverse for the [`Response`]. The trait is object safe so the
//! client and dispatcher can hold `Arc<dyn Codec>` and swap implementations
//! without recompiling the pipeline.
//!
//! [`MsgPackCodec`] is the default implementation.
//!
//! # Example
//!
//! ```
//! use breakwater::codec::{Codec, MsgPackCodec};
//! use breakwater::message::Request;
//!
//! let codec = MsgPackCodec;
//! let request = Request::new("UserService", "getUser", vec![], vec![]);
//! let bytes = codec.encode_request(&request).unwrap();
//! let decoded = codec.decode_request(&bytes).unwrap();
//! assert_eq!(decoded, request);
//! ```

mod msgpack;

pub use msgpack::MsgPackCodec;

use crate::error::Result;
use crate::message::{Request, Response};

/// Strategy converting request/response envelopes to and from bytes.
pub trait Codec: Send + Sync {
    /// Encode a request envelope to wire bytes.
    fn encode_request(&self, request: &Request) -> Result<Vec<u8>>;

    /// Decode wire bytes into a request envelope.
    fn decode_request(&self, bytes: &[u8]) -> Result<Request>;

    /// Encode a response envelope to wire bytes.
    fn encode_response(&self, response: &Response) -> Result<Vec<u8>>;

    /// Decode wire bytes into a response envelope.
    fn decode_response(&self, bytes: &[u8]) -> Result<Response>;
}

//! Body framing for both directions of a proxied exchange.
//!
//! ## Decoders (backend response bodies)
//! - [`PayloadDecoder`]: picks one of length, chunked, close-delimited or no body
//!
//! ## Encoders (client upload data)
//! - [`PayloadEncoder`]: frames upload chunks as chunked, fixed length or raw bytes

mod chunked_decoder;
mod chunked_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;

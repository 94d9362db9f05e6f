//! Body codecs, one per framing mode, composed behind [`PayloadDecoder`]
//! and [`PayloadEncoder`].

mod chunked_decoder;
mod chunked_encoder;
mod close_decoder;
mod length_decoder;
mod length_encoder;

mod payload_decoder;
pub(crate) use payload_decoder::PayloadDecoder;

mod payload_encoder;
pub(crate) use payload_encoder::PayloadEncoder;

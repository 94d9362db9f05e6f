//! Codecs for the message head: start lines, field blocks, and their
//! serialized form.

mod field;
pub(crate) use field::parse_field_block;

mod head_decoder;
pub(crate) use head_decoder::{RequestHeadDecoder, ResponseHeadDecoder};

mod head_encoder;
pub(crate) use head_encoder::{encode_request_head, encode_response_head};

mod start_line;

//! Payload codec for encoding/decoding orders
//!
//! Translates between operator arguments and CAN payload bytes using a
//! registered [`MessageType`].

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use thiserror::Error;

use super::{Frame, MessageType, ParameterType, MAX_PAYLOAD};

/// Codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Wrong parameter count. Having {actual} but expecting {expected}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("Parameter {parameter}: {reason}")]
    ParameterConversion { parameter: String, reason: String },

    #[error("Message data set too long: {size} bytes (max: {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Payload truncated at parameter {parameter}: {actual} of {expected} bytes")]
    TruncatedPayload {
        parameter: String,
        expected: usize,
        actual: usize,
    },
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Encode operator arguments into a payload, in schema parameter order.
///
/// `Char` parameters write the whole argument as UTF-8 while decode reads a
/// single byte back. The size check below is what keeps long strings off the
/// bus.
pub fn encode<S: AsRef<str>>(schema: &MessageType, values: &[S]) -> CodecResult<Bytes> {
    if values.len() != schema.parameters.len() {
        return Err(CodecError::ArityMismatch {
            expected: schema.parameters.len(),
            actual: values.len(),
        });
    }

    let mut buf = BytesMut::with_capacity(MAX_PAYLOAD);

    for (param, value) in schema.parameters.iter().zip(values) {
        let value = value.as_ref();
        let conversion_error = |e: std::num::ParseIntError| CodecError::ParameterConversion {
            parameter: param.name.clone(),
            reason: e.to_string(),
        };

        match param.kind {
            ParameterType::Int8 => buf.put_i8(value.parse::<i8>().map_err(conversion_error)?),
            ParameterType::Int16 => buf.put_i16(value.parse::<i16>().map_err(conversion_error)?),
            ParameterType::Int32 => buf.put_i32(value.parse::<i32>().map_err(conversion_error)?),
            ParameterType::Char => buf.put_slice(value.as_bytes()),
        }
    }

    if buf.len() > MAX_PAYLOAD {
        return Err(CodecError::PayloadTooLarge {
            size: buf.len(),
            max: MAX_PAYLOAD,
        });
    }

    Ok(buf.freeze())
}

/// Encode arguments and wrap the payload in a frame addressed by the schema id
pub fn encode_frame<S: AsRef<str>>(schema: &MessageType, values: &[S]) -> CodecResult<Frame> {
    let payload = encode(schema, values)?;
    Ok(Frame::new(schema.id, payload))
}

/// A decoded parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Char(char),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Char(c) => write!(f, "'{}'", c),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedField {
    pub name: String,
    pub value: FieldValue,
}

/// Result of decoding a payload against a known schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub name: String,
    pub id: u32,
    /// Leading fields that could be decoded, in schema order
    pub fields: Vec<DecodedField>,
    /// Set when the payload ended before the last declared field
    pub truncation: Option<CodecError>,
}

impl DecodedMessage {
    pub fn is_complete(&self) -> bool {
        self.truncation.is_none()
    }

    /// Look up a decoded field by parameter name
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }
}

impl fmt::Display for DecodedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id {})", self.name, self.id)?;
        for (i, field) in self.fields.iter().enumerate() {
            let sep = if i == 0 { ": " } else { ", " };
            write!(f, "{}{}={}", sep, field.name, field.value)?;
        }
        if let Some(truncation) = &self.truncation {
            write!(f, " [{}]", truncation)?;
        }
        Ok(())
    }
}

/// Outcome of decoding an inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Message(DecodedMessage),
    /// No schema registered for the id; echoed verbatim for display
    Raw(Frame),
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoded::Message(message) => write!(f, "{}", message),
            Decoded::Raw(frame) => write!(f, "{}", frame),
        }
    }
}

/// Decode a payload against a schema.
///
/// Reads from a private cursor over `payload`; the caller's bytes are never
/// consumed. A short payload yields the leading fields plus a truncation
/// marker instead of an error.
pub fn decode(schema: &MessageType, payload: &[u8]) -> DecodedMessage {
    let mut cursor = payload;
    let mut fields = Vec::with_capacity(schema.parameters.len());
    let mut truncation = None;

    for param in &schema.parameters {
        if cursor.remaining() < param.kind.width() {
            truncation = Some(CodecError::TruncatedPayload {
                parameter: param.name.clone(),
                expected: schema.payload_width(),
                actual: payload.len(),
            });
            break;
        }

        let value = match param.kind {
            ParameterType::Int8 => FieldValue::Int(cursor.get_i8() as i64),
            ParameterType::Int16 => FieldValue::Int(cursor.get_i16() as i64),
            ParameterType::Int32 => FieldValue::Int(cursor.get_i32() as i64),
            ParameterType::Char => FieldValue::Char(char::from(cursor.get_u8())),
        };

        fields.push(DecodedField {
            name: param.name.clone(),
            value,
        });
    }

    DecodedMessage {
        name: schema.name.clone(),
        id: schema.id,
        fields,
        truncation,
    }
}

/// Decode an inbound frame, falling back to the raw frame for unknown ids
pub fn decode_frame(schema: Option<&MessageType>, frame: &Frame) -> Decoded {
    match schema {
        Some(schema) => Decoded::Message(decode(schema, &frame.payload)),
        None => Decoded::Raw(frame.clone()),
    }
}

//! JSON-flavored argument packager written once against a document-value interface.
//!
//! A transport supplies the document type ([`JsonValue`]) and its
//! constructors ([`JsonTransport`]); [`JsonPackager`] does the rest.
//!
//! Request shape:
//! `{inputs: {name: scalar | {elem_size, extent[4], stride[4], min[4], host}}}`
//!
//! Reply shape:
//! `{outputs: {name: {elem_size, extent[4], stride[4], min[4], dimensions, type_code, host}}, time_usec}`

use log::trace;

use super::ArgumentPackager;
use crate::arg_value::ArgValue;
use crate::buffer::{BufferDescriptor, MAX_DIMENSIONS};
use crate::call_context::CallContext;
use crate::errors::{CodecError, CodecResult};
use crate::filter_metadata::{ArgumentInfo, ArgumentKind, ScalarValue, TypeCode};

const INPUTS: &str = "inputs";
const OUTPUTS: &str = "outputs";
const TIME_USEC: &str = "time_usec";

/// A possibly-absent node of a message document.
///
/// Getters return `None` when the node is not of the requested kind. Member
/// access on a non-map, or of a missing key, yields `None`.
pub trait JsonValue: Sized {
    fn is_undefined(&self) -> bool;
    fn is_map(&self) -> bool;
    fn as_bool(&self) -> Option<bool>;
    /// Any number, truncated to `i32`.
    fn as_int32(&self) -> Option<i32>;
    fn as_double(&self) -> Option<f64>;
    fn as_byte_array(&self) -> Option<Vec<u8>>;
    fn as_int32_array(&self) -> Option<Vec<i32>>;
    fn get_member(&self, name: &str) -> Option<&Self>;
    fn get_member_mut(&mut self, name: &str) -> Option<&mut Self>;
    /// Sets a member on a map. Returns false if this node is not a map.
    fn set_member(&mut self, name: &str, value: Self) -> bool;
}

/// Constructors for reply nodes plus access to the call's two documents.
pub trait JsonTransport {
    type Value: JsonValue;

    fn new_map(&self) -> Self::Value;
    fn new_int32_array(&self, data: &[i32]) -> Self::Value;
    fn new_byte_array(&self, data: &[u8]) -> Self::Value;
    fn new_int32(&self, value: i32) -> Self::Value;
    fn new_double(&self, value: f64) -> Self::Value;
    fn new_string(&self, value: &str) -> Self::Value;

    fn input_message(&self) -> &Self::Value;
    fn output_message(&mut self) -> &mut Self::Value;
}

/// Generic packager over any [`JsonTransport`].
#[derive(Debug, Clone)]
pub struct JsonPackager<T> {
    transport: T,
}

impl<T: JsonTransport> JsonPackager<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    fn inputs(&self) -> CodecResult<&T::Value> {
        let message = self.transport.input_message();
        if !message.is_map() {
            return Err(CodecError::MessageNotMap {
                message: "input".to_string(),
            });
        }
        let inputs = message.get_member(INPUTS);
        match inputs {
            Some(inputs) if inputs.is_map() => Ok(inputs),
            _ => Err(kind_error(inputs, "the input message", INPUTS, "a map")),
        }
    }
}

fn is_undefined<V: JsonValue>(value: Option<&V>) -> bool {
    value.is_none_or(JsonValue::is_undefined)
}

fn kind_error<V: JsonValue>(
    value: Option<&V>,
    context: &str,
    member: &str,
    expected: &str,
) -> CodecError {
    if is_undefined(value) {
        CodecError::MissingMember {
            context: context.to_string(),
            member: member.to_string(),
        }
    } else {
        CodecError::WrongKind {
            context: context.to_string(),
            member: member.to_string(),
            expected: expected.to_string(),
        }
    }
}

fn member_int32_array<V: JsonValue>(
    value: &V,
    context: &str,
    member: &str,
) -> CodecResult<[i32; MAX_DIMENSIONS]> {
    let node = value.get_member(member);
    let array = node
        .and_then(JsonValue::as_int32_array)
        .ok_or_else(|| kind_error(node, context, member, "an int32 array"))?;
    <[i32; MAX_DIMENSIONS]>::try_from(array.as_slice()).map_err(|_| {
        CodecError::ArrayLengthMismatch {
            context: context.to_string(),
            member: member.to_string(),
            expected: MAX_DIMENSIONS,
            actual: array.len(),
        }
    })
}

fn buffer_rank(arg: &ArgumentInfo) -> CodecResult<usize> {
    usize::try_from(arg.dimensions)
        .ok()
        .filter(|&d| d <= MAX_DIMENSIONS)
        .ok_or_else(|| CodecError::InvalidShape {
            name: arg.name.to_string(),
            reason: format!("{} dimensions declared", arg.dimensions),
        })
}

fn unpack_scalar<V: JsonValue>(arg: &ArgumentInfo, value: &V) -> CodecResult<ScalarValue> {
    // Documents do not distinguish numeric widths, so every integer goes through int32.
    let scalar = match (arg.type_code, arg.type_bits) {
        (TypeCode::UInt, 1) => value.as_bool().map(ScalarValue::Bool),
        (TypeCode::Float, 32) => value.as_double().map(|d| ScalarValue::Float32(d as f32)),
        (TypeCode::Float, 64) => value.as_double().map(ScalarValue::Float64),
        (TypeCode::Int, 8) => value.as_int32().map(|i| ScalarValue::Int8(i as i8)),
        (TypeCode::Int, 16) => value.as_int32().map(|i| ScalarValue::Int16(i as i16)),
        (TypeCode::Int, 32) => value.as_int32().map(ScalarValue::Int32),
        (TypeCode::Int, 64) => value.as_int32().map(|i| ScalarValue::Int64(i64::from(i))),
        (TypeCode::UInt, 8) => value.as_int32().map(|i| ScalarValue::UInt8(i as u8)),
        (TypeCode::UInt, 16) => value.as_int32().map(|i| ScalarValue::UInt16(i as u16)),
        (TypeCode::UInt, 32) => value.as_int32().map(|i| ScalarValue::UInt32(i as u32)),
        (TypeCode::UInt, 64) => value.as_int32().map(|i| ScalarValue::UInt64(i as u64)),
        (type_code, type_bits) => {
            return Err(CodecError::UnsupportedScalarType {
                name: arg.name.to_string(),
                type_code: type_code.as_str().to_string(),
                type_bits,
            });
        }
    };
    let expected = match arg.type_bits {
        1 => "a bool",
        _ => "a number",
    };
    scalar.ok_or_else(|| kind_error(Some(value), INPUTS, arg.name, expected))
}

fn unpack_buffer<V: JsonValue>(arg: &ArgumentInfo, value: &V) -> CodecResult<BufferDescriptor> {
    if !value.is_map() {
        return Err(kind_error(Some(value), INPUTS, arg.name, "a buffer map"));
    }
    let elem_size_node = value.get_member("elem_size");
    let elem_size = elem_size_node
        .and_then(JsonValue::as_int32)
        .ok_or_else(|| kind_error(elem_size_node, arg.name, "elem_size", "a number"))?;
    let extent = member_int32_array(value, arg.name, "extent")?;
    let stride = member_int32_array(value, arg.name, "stride")?;
    let min = member_int32_array(value, arg.name, "min")?;
    let host_node = value.get_member("host");
    let host = host_node
        .and_then(JsonValue::as_byte_array)
        .ok_or_else(|| kind_error(host_node, arg.name, "host", "a byte array"))?;

    let expected = arg.elem_size();
    if elem_size != expected {
        return Err(CodecError::ElemSizeMismatch {
            name: arg.name.to_string(),
            expected,
            actual: elem_size,
        });
    }

    let buf = BufferDescriptor {
        dev: 0,
        host: None,
        extent,
        stride,
        min,
        elem_size,
    };
    let required = buf
        .byte_len(buffer_rank(arg)?)
        .map_err(|e| CodecError::InvalidShape {
            name: arg.name.to_string(),
            reason: e.to_string(),
        })?;
    if host.len() < required {
        return Err(CodecError::HostTooSmall {
            name: arg.name.to_string(),
            required,
            actual: host.len(),
        });
    }
    Ok(BufferDescriptor {
        host: Some(host),
        ..buf
    })
}

impl<T: JsonTransport> ArgumentPackager for JsonPackager<T> {
    fn unpack_argument_value(
        &self,
        context: &dyn CallContext,
        arg: &ArgumentInfo,
    ) -> CodecResult<ArgValue> {
        if arg.kind == ArgumentKind::OutputBuffer {
            return Err(CodecError::InvalidArgumentKind {
                name: arg.name.to_string(),
                operation: "unpacked".to_string(),
                kind: arg.kind.label().to_string(),
            });
        }

        let value = self.inputs()?.get_member(arg.name);

        if arg.type_code == TypeCode::Handle {
            if !is_undefined(value) {
                return Err(CodecError::HandleArgumentPresent {
                    name: arg.name.to_string(),
                });
            }
            return Ok(ArgValue::Scalar(ScalarValue::Handle(context.handle())));
        }

        let value = value
            .filter(|v| !v.is_undefined())
            .ok_or_else(|| CodecError::MissingMember {
                context: INPUTS.to_string(),
                member: arg.name.to_string(),
            })?;

        trace!("unpacking {} {}", arg.kind.label(), arg.name);
        match arg.kind {
            ArgumentKind::InputBuffer => unpack_buffer(arg, value).map(ArgValue::Buffer),
            _ => unpack_scalar(arg, value).map(ArgValue::Scalar),
        }
    }

    fn pack_result_value(&mut self, arg: &ArgumentInfo, value: &ArgValue) -> CodecResult<()> {
        if arg.kind != ArgumentKind::OutputBuffer {
            return Err(CodecError::InvalidArgumentKind {
                name: arg.name.to_string(),
                operation: "packed as a result".to_string(),
                kind: arg.kind.label().to_string(),
            });
        }
        let buf = value
            .as_buffer()
            .ok_or_else(|| CodecError::InvalidArgumentKind {
                name: arg.name.to_string(),
                operation: "packed as a result".to_string(),
                kind: "scalar value".to_string(),
            })?;

        let len = buf
            .byte_len(buffer_rank(arg)?)
            .map_err(|e| CodecError::InvalidShape {
                name: arg.name.to_string(),
                reason: e.to_string(),
            })?;
        let host = buf.host().unwrap_or_default();
        let host = host.get(..len).ok_or_else(|| CodecError::HostTooSmall {
            name: arg.name.to_string(),
            required: len,
            actual: host.len(),
        })?;

        let t = &self.transport;
        let mut packed = t.new_map();
        let fields = [
            ("elem_size", t.new_int32(buf.elem_size)),
            ("extent", t.new_int32_array(&buf.extent)),
            ("stride", t.new_int32_array(&buf.stride)),
            ("min", t.new_int32_array(&buf.min)),
            ("dimensions", t.new_int32(arg.dimensions)),
            ("type_code", t.new_string(arg.type_code.as_str())),
            ("host", t.new_byte_array(host)),
        ];
        for (member, node) in fields {
            if !packed.set_member(member, node) {
                return Err(CodecError::SetMemberFailed {
                    context: arg.name.to_string(),
                    member: member.to_string(),
                });
            }
        }
        let fresh_outputs = t.new_map();

        let results = self.transport.output_message();
        if !results.is_map() {
            return Err(CodecError::MessageNotMap {
                message: "output".to_string(),
            });
        }
        let has_outputs = results.get_member(OUTPUTS).is_some_and(JsonValue::is_map);
        if !has_outputs && !results.set_member(OUTPUTS, fresh_outputs) {
            return Err(CodecError::SetMemberFailed {
                context: "the output message".to_string(),
                member: OUTPUTS.to_string(),
            });
        }
        let stored = results
            .get_member_mut(OUTPUTS)
            .is_some_and(|outputs| outputs.set_member(arg.name, packed));
        if !stored {
            return Err(CodecError::SetMemberFailed {
                context: OUTPUTS.to_string(),
                member: arg.name.to_string(),
            });
        }
        trace!("packed output {} ({} bytes)", arg.name, len);
        Ok(())
    }

    fn pack_result_time_usec(&mut self, time_usec: f64) -> CodecResult<()> {
        let node = self.transport.new_double(time_usec);
        let results = self.transport.output_message();
        if !results.is_map() {
            return Err(CodecError::MessageNotMap {
                message: "output".to_string(),
            });
        }
        if !results.set_member(TIME_USEC, node) {
            return Err(CodecError::SetMemberFailed {
                context: "the output message".to_string(),
                member: TIME_USEC.to_string(),
            });
        }
        Ok(())
    }
}

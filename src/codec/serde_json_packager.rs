//! `serde_json` transport for the JSON-flavored packager.
//!
//! Byte arrays and int32 arrays are plain JSON arrays of numbers; `null` and
//! missing members are both undefined.

use serde_json::{Map, Value};

use super::json_packager::{JsonPackager, JsonTransport, JsonValue};

impl JsonValue for Value {
    fn is_undefined(&self) -> bool {
        self.is_null()
    }

    fn is_map(&self) -> bool {
        self.is_object()
    }

    fn as_bool(&self) -> Option<bool> {
        Value::as_bool(self)
    }

    fn as_int32(&self) -> Option<i32> {
        let Value::Number(number) = self else {
            return None;
        };
        number
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .or_else(|| number.as_f64().map(|f| f as i32))
    }

    fn as_double(&self) -> Option<f64> {
        Value::as_f64(self)
    }

    fn as_byte_array(&self) -> Option<Vec<u8>> {
        self.as_array()?
            .iter()
            .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect()
    }

    fn as_int32_array(&self) -> Option<Vec<i32>> {
        self.as_array()?
            .iter()
            .map(<Value as JsonValue>::as_int32)
            .collect()
    }

    fn get_member(&self, name: &str) -> Option<&Self> {
        self.get(name)
    }

    fn get_member_mut(&mut self, name: &str) -> Option<&mut Self> {
        self.get_mut(name)
    }

    fn set_member(&mut self, name: &str, value: Self) -> bool {
        match self.as_object_mut() {
            Some(map) => {
                map.insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }
}

/// Holds the request document and the reply being built.
#[derive(Debug, Clone)]
pub struct SerdeJsonTransport {
    input: Value,
    output: Value,
}

impl SerdeJsonTransport {
    pub fn new(input: Value) -> Self {
        Self {
            input,
            output: Value::Object(Map::new()),
        }
    }

    pub fn output(&self) -> &Value {
        &self.output
    }

    pub fn into_output(self) -> Value {
        self.output
    }
}

impl JsonTransport for SerdeJsonTransport {
    type Value = Value;

    fn new_map(&self) -> Value {
        Value::Object(Map::new())
    }

    fn new_int32_array(&self, data: &[i32]) -> Value {
        Value::from(data)
    }

    fn new_byte_array(&self, data: &[u8]) -> Value {
        Value::from(data)
    }

    fn new_int32(&self, value: i32) -> Value {
        Value::from(value)
    }

    fn new_double(&self, value: f64) -> Value {
        Value::from(value)
    }

    fn new_string(&self, value: &str) -> Value {
        Value::from(value)
    }

    fn input_message(&self) -> &Value {
        &self.input
    }

    fn output_message(&mut self) -> &mut Value {
        &mut self.output
    }
}

pub type SerdeJsonPackager = JsonPackager<SerdeJsonTransport>;

impl JsonPackager<SerdeJsonTransport> {
    pub fn from_message(message: Value) -> Self {
        JsonPackager::new(SerdeJsonTransport::new(message))
    }

    /// The reply document built so far.
    pub fn results(&self) -> &Value {
        self.transport().output()
    }

    pub fn into_results(self) -> Value {
        self.into_transport().into_output()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::arg_value::ArgValue;
    use crate::buffer::BufferDescriptor;
    use crate::call_context::CallContext;
    use crate::codec::ArgumentPackager;
    use crate::errors::CodecError;
    use crate::filter_metadata::{ArgumentInfo, ScalarValue, TypeCode};

    struct HandleContext;

    impl CallContext for HandleContext {
        fn error(&self, _message: &str) {}
        fn print(&self, _message: &str) {}
        fn handle(&self) -> u64 {
            77
        }
    }

    const IMAGE: ArgumentInfo = ArgumentInfo::input_buffer("image", TypeCode::UInt, 8, 3);

    fn unpack(message: Value, arg: &ArgumentInfo) -> Result<ArgValue, CodecError> {
        SerdeJsonPackager::from_message(message).unpack_argument_value(&HandleContext, arg)
    }

    #[test]
    fn test_unpack_scalars_with_loose_numbers() {
        let message = json!({"inputs": {"f": 2.5, "b": false, "i": 300, "u": 7.9}});

        let f = unpack(message.clone(), &ArgumentInfo::scalar("f", TypeCode::Float, 32)).unwrap();
        assert_eq!(f, ArgValue::Scalar(ScalarValue::Float32(2.5)));

        let b = unpack(message.clone(), &ArgumentInfo::scalar("b", TypeCode::UInt, 1)).unwrap();
        assert_eq!(b, ArgValue::Scalar(ScalarValue::Bool(false)));

        let i = unpack(message.clone(), &ArgumentInfo::scalar("i", TypeCode::Int, 8)).unwrap();
        assert_eq!(i, ArgValue::Scalar(ScalarValue::Int8(44)));

        let u = unpack(message, &ArgumentInfo::scalar("u", TypeCode::UInt, 16)).unwrap();
        assert_eq!(u, ArgValue::Scalar(ScalarValue::UInt16(7)));
    }

    #[test]
    fn test_bool_argument_rejects_numbers() {
        let result = unpack(
            json!({"inputs": {"b": 1}}),
            &ArgumentInfo::scalar("b", TypeCode::UInt, 1),
        );
        assert!(matches!(result, Err(CodecError::WrongKind { .. })));
    }

    #[test]
    fn test_handle_comes_from_context() {
        let value = unpack(json!({"inputs": {}}), &ArgumentInfo::user_context()).unwrap();
        assert_eq!(value, ArgValue::Scalar(ScalarValue::Handle(77)));
    }

    #[test]
    fn test_handle_in_inputs_is_rejected() {
        let result = unpack(
            json!({"inputs": {"__user_context": 1}}),
            &ArgumentInfo::user_context(),
        );
        assert_eq!(
            result,
            Err(CodecError::HandleArgumentPresent {
                name: "__user_context".to_string()
            })
        );
    }

    #[test]
    fn test_missing_inputs_and_members() {
        let arg = ArgumentInfo::scalar("f", TypeCode::Float, 32);
        assert!(matches!(
            unpack(json!([1, 2]), &arg),
            Err(CodecError::MessageNotMap { .. })
        ));
        assert!(matches!(
            unpack(json!({}), &arg),
            Err(CodecError::MissingMember { .. })
        ));
        assert_eq!(
            unpack(json!({"inputs": {}}), &arg),
            Err(CodecError::MissingMember {
                context: "inputs".to_string(),
                member: "f".to_string()
            })
        );
    }

    #[test]
    fn test_unsupported_scalar_type() {
        let arg = ArgumentInfo::scalar("h", TypeCode::Float, 16);
        assert!(matches!(
            unpack(json!({"inputs": {"h": 1.0}}), &arg),
            Err(CodecError::UnsupportedScalarType { type_bits: 16, .. })
        ));
    }

    #[test]
    fn test_output_buffers_cannot_be_unpacked() {
        let arg = ArgumentInfo::output_buffer("out", TypeCode::UInt, 8, 3);
        assert!(matches!(
            unpack(json!({"inputs": {"out": {}}}), &arg),
            Err(CodecError::InvalidArgumentKind { .. })
        ));
    }

    #[test]
    fn test_unpack_buffer() {
        let message = json!({"inputs": {"image": {
            "elem_size": 1,
            "extent": [2, 1, 1, 0],
            "stride": [1, 2, 2, 0],
            "min": [0, 0, 0, 0],
            "host": [9, 8],
        }}});

        let value = unpack(message, &IMAGE).unwrap();

        let buf = value.as_buffer().unwrap();
        assert_eq!(buf.host().unwrap(), &[9, 8]);
        assert_eq!(buf.extent, [2, 1, 1, 0]);
        assert_eq!(buf.stride, [1, 2, 2, 0]);
        assert_eq!(buf.elem_size, 1);
    }

    #[test]
    fn test_buffer_shape_arrays_need_four_elements() {
        let message = json!({"inputs": {"image": {
            "elem_size": 1,
            "extent": [2, 1, 1],
            "stride": [1, 2, 2, 0],
            "min": [0, 0, 0, 0],
            "host": [9, 8],
        }}});
        assert_eq!(
            unpack(message, &IMAGE),
            Err(CodecError::ArrayLengthMismatch {
                context: "image".to_string(),
                member: "extent".to_string(),
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_buffer_host_must_cover_shape() {
        let message = json!({"inputs": {"image": {
            "elem_size": 1,
            "extent": [4, 1, 1, 0],
            "stride": [1, 4, 4, 0],
            "min": [0, 0, 0, 0],
            "host": [1, 2],
        }}});
        assert_eq!(
            unpack(message, &IMAGE),
            Err(CodecError::HostTooSmall {
                name: "image".to_string(),
                required: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn test_buffer_elem_size_must_match_type() {
        let message = json!({"inputs": {"image": {
            "elem_size": 2,
            "extent": [1, 1, 1, 0],
            "stride": [1, 1, 1, 0],
            "min": [0, 0, 0, 0],
            "host": [1, 2],
        }}});
        assert!(matches!(
            unpack(message, &IMAGE),
            Err(CodecError::ElemSizeMismatch {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_byte_array_rejects_out_of_range_values() {
        assert_eq!(json!([0, 255]).as_byte_array(), Some(vec![0, 255]));
        assert_eq!(json!([0, 256]).as_byte_array(), None);
        assert_eq!(json!([-1]).as_byte_array(), None);
    }

    #[test]
    fn test_member_access_borrows_the_document() {
        let mut message = json!({"inputs": {"a": [1, 2]}, "n": null});

        let inputs = JsonValue::get_member(&message, "inputs").unwrap();
        assert!(std::ptr::eq(
            JsonValue::get_member(inputs, "a").unwrap(),
            &message["inputs"]["a"]
        ));
        assert!(JsonValue::get_member(&message, "missing").is_none());
        assert!(JsonValue::get_member(&json!([1]), "a").is_none());
        assert!(JsonValue::get_member(&message, "n").unwrap().is_undefined());

        let a = JsonValue::get_member_mut(&mut message, "inputs").unwrap();
        assert!(a.set_member("b", json!(3)));
        assert_eq!(message["inputs"]["b"], json!(3));
    }

    #[test]
    fn test_one_packager_unpacks_every_argument() {
        let packager = SerdeJsonPackager::from_message(json!({"inputs": {
            "image": {
                "elem_size": 1,
                "extent": [1, 1, 1, 0],
                "stride": [1, 1, 1, 0],
                "min": [0, 0, 0, 0],
                "host": [4],
            },
            "level": 3,
            "skip": null,
        }}));
        let level = ArgumentInfo::scalar("level", TypeCode::Int, 32);
        let skip = ArgumentInfo::scalar("skip", TypeCode::Int, 32);

        let image = packager.unpack_argument_value(&HandleContext, &IMAGE).unwrap();
        let level = packager.unpack_argument_value(&HandleContext, &level).unwrap();

        assert_eq!(image.as_buffer().unwrap().host().unwrap(), &[4]);
        assert_eq!(level, ArgValue::Scalar(ScalarValue::Int32(3)));
        assert_eq!(
            packager.unpack_argument_value(&HandleContext, &skip),
            Err(CodecError::MissingMember {
                context: "inputs".to_string(),
                member: "skip".to_string()
            })
        );
    }

    #[test]
    fn test_pack_outputs_created_lazily() {
        let out_a = ArgumentInfo::output_buffer("a", TypeCode::UInt, 8, 2);
        let out_b = ArgumentInfo::output_buffer("b", TypeCode::UInt, 8, 2);
        let mut buf = BufferDescriptor::planar([2, 1, 0, 0], 1).unwrap();
        buf.host = Some(vec![5, 6]);

        let mut packager = SerdeJsonPackager::from_message(json!({}));
        assert_eq!(packager.results(), &json!({}));

        packager
            .pack_result_value(&out_a, &ArgValue::Buffer(buf.clone()))
            .unwrap();
        packager
            .pack_result_value(&out_b, &ArgValue::Buffer(buf))
            .unwrap();
        packager.pack_result_time_usec(12.5).unwrap();

        let expected_buffer = json!({
            "elem_size": 1,
            "extent": [2, 1, 0, 0],
            "stride": [1, 2, 0, 0],
            "min": [0, 0, 0, 0],
            "dimensions": 2,
            "type_code": "uint",
            "host": [5, 6],
        });
        assert_eq!(
            packager.into_results(),
            json!({
                "outputs": {"a": expected_buffer.clone(), "b": expected_buffer},
                "time_usec": 12.5,
            })
        );
    }

    #[test]
    fn test_pack_rejects_inputs_and_scalars() {
        let mut packager = SerdeJsonPackager::from_message(json!({}));
        assert!(matches!(
            packager.pack_result_value(&IMAGE, &ArgValue::default()),
            Err(CodecError::InvalidArgumentKind { .. })
        ));
        let out = ArgumentInfo::output_buffer("out", TypeCode::UInt, 8, 3);
        assert!(matches!(
            packager.pack_result_value(&out, &ArgValue::Scalar(ScalarValue::UInt8(1))),
            Err(CodecError::InvalidArgumentKind { .. })
        ));
        assert_eq!(packager.results(), &json!({}));
    }
}

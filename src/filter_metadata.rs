//! Static description of a kernel's argument list.
//!
//! Filter metadata is produced alongside each compiled kernel and is never
//! mutated at runtime. Everything here is `const`-constructible so kernels can
//! declare their metadata as `static` items.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::arg_value::ArgValue;
use crate::call_context::CallContext;

/// Entry point of a kernel.
///
/// Receives one [`ArgValue`] per declared argument, in declaration order, and
/// returns 0 on success. On failure the kernel reports a human-readable message
/// through [`CallContext::error`] before returning its nonzero status.
pub type ArgvFunc = fn(&dyn CallContext, &mut [ArgValue]) -> i32;

/// The role an argument plays in a kernel call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    InputScalar = 0,
    InputBuffer = 1,
    OutputBuffer = 2,
}

impl ArgumentKind {
    pub fn is_buffer(self) -> bool {
        !matches!(self, ArgumentKind::InputScalar)
    }

    pub fn label(self) -> &'static str {
        match self {
            ArgumentKind::InputScalar => "input scalar",
            ArgumentKind::InputBuffer => "input buffer",
            ArgumentKind::OutputBuffer => "output buffer",
        }
    }
}

// Serialized as its numeric code.
impl Serialize for ArgumentKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// Numeric category of an argument's elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeCode {
    Int,
    UInt,
    Float,
    Handle,
}

impl TypeCode {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeCode::Int => "int",
            TypeCode::UInt => "uint",
            TypeCode::Float => "float",
            TypeCode::Handle => "handle",
        }
    }
}

/// A typed scalar value. Booleans are modeled as `uint(1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Handle(u64),
}

impl ScalarValue {
    pub fn type_code(&self) -> TypeCode {
        match self {
            ScalarValue::Int8(_)
            | ScalarValue::Int16(_)
            | ScalarValue::Int32(_)
            | ScalarValue::Int64(_) => TypeCode::Int,
            ScalarValue::Bool(_)
            | ScalarValue::UInt8(_)
            | ScalarValue::UInt16(_)
            | ScalarValue::UInt32(_)
            | ScalarValue::UInt64(_) => TypeCode::UInt,
            ScalarValue::Float32(_) | ScalarValue::Float64(_) => TypeCode::Float,
            ScalarValue::Handle(_) => TypeCode::Handle,
        }
    }

    pub fn type_bits(&self) -> u8 {
        match self {
            ScalarValue::Bool(_) => 1,
            ScalarValue::Int8(_) | ScalarValue::UInt8(_) => 8,
            ScalarValue::Int16(_) | ScalarValue::UInt16(_) => 16,
            ScalarValue::Int32(_) | ScalarValue::UInt32(_) | ScalarValue::Float32(_) => 32,
            ScalarValue::Int64(_)
            | ScalarValue::UInt64(_)
            | ScalarValue::Float64(_)
            | ScalarValue::Handle(_) => 64,
        }
    }

    /// Returns true if this value has exactly the given type.
    pub fn matches_type(&self, type_code: TypeCode, type_bits: u8) -> bool {
        self.type_code() == type_code && self.type_bits() == type_bits
    }

    /// Widens any numeric value to f64. Booleans and handles yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ScalarValue::Int8(v) => Some(v as f64),
            ScalarValue::Int16(v) => Some(v as f64),
            ScalarValue::Int32(v) => Some(v as f64),
            ScalarValue::Int64(v) => Some(v as f64),
            ScalarValue::UInt8(v) => Some(v as f64),
            ScalarValue::UInt16(v) => Some(v as f64),
            ScalarValue::UInt32(v) => Some(v as f64),
            ScalarValue::UInt64(v) => Some(v as f64),
            ScalarValue::Float32(v) => Some(v as f64),
            ScalarValue::Float64(v) => Some(v),
            ScalarValue::Bool(_) | ScalarValue::Handle(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            ScalarValue::Bool(b) => Some(b),
            _ => None,
        }
    }
}

// Numbers serialize as JSON numbers, bools as JSON bools, handles as a literal 0.
impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            ScalarValue::Bool(v) => serializer.serialize_bool(v),
            ScalarValue::Int8(v) => serializer.serialize_i8(v),
            ScalarValue::Int16(v) => serializer.serialize_i16(v),
            ScalarValue::Int32(v) => serializer.serialize_i32(v),
            ScalarValue::Int64(v) => serializer.serialize_i64(v),
            ScalarValue::UInt8(v) => serializer.serialize_u8(v),
            ScalarValue::UInt16(v) => serializer.serialize_u16(v),
            ScalarValue::UInt32(v) => serializer.serialize_u32(v),
            ScalarValue::UInt64(v) => serializer.serialize_u64(v),
            ScalarValue::Float32(v) => serializer.serialize_f32(v),
            ScalarValue::Float64(v) => serializer.serialize_f64(v),
            ScalarValue::Handle(_) => serializer.serialize_u8(0),
        }
    }
}

/// Static description of a single kernel argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArgumentInfo {
    pub name: &'static str,
    pub kind: ArgumentKind,
    /// Number of buffer dimensions; zero for scalars.
    pub dimensions: i32,
    pub type_code: TypeCode,
    pub type_bits: u8,
    /// Default value, input scalars only.
    pub def: Option<ScalarValue>,
    /// Minimum value, input scalars only.
    pub min: Option<ScalarValue>,
    /// Maximum value, input scalars only.
    pub max: Option<ScalarValue>,
}

impl ArgumentInfo {
    pub const fn scalar(name: &'static str, type_code: TypeCode, type_bits: u8) -> Self {
        Self {
            name,
            kind: ArgumentKind::InputScalar,
            dimensions: 0,
            type_code,
            type_bits,
            def: None,
            min: None,
            max: None,
        }
    }

    pub const fn input_buffer(
        name: &'static str,
        type_code: TypeCode,
        type_bits: u8,
        dimensions: i32,
    ) -> Self {
        Self {
            name,
            kind: ArgumentKind::InputBuffer,
            dimensions,
            type_code,
            type_bits,
            def: None,
            min: None,
            max: None,
        }
    }

    pub const fn output_buffer(
        name: &'static str,
        type_code: TypeCode,
        type_bits: u8,
        dimensions: i32,
    ) -> Self {
        Self {
            name,
            kind: ArgumentKind::OutputBuffer,
            dimensions,
            type_code,
            type_bits,
            def: None,
            min: None,
            max: None,
        }
    }

    /// The context handle argument every kernel receives first.
    pub const fn user_context() -> Self {
        Self::scalar("__user_context", TypeCode::Handle, 64)
    }

    pub const fn with_default(mut self, def: ScalarValue) -> Self {
        self.def = Some(def);
        self
    }

    pub const fn with_range(mut self, min: ScalarValue, max: ScalarValue) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Bytes per element, rounding sub-byte types such as bool up to one byte.
    pub fn elem_size(&self) -> i32 {
        i32::from(self.type_bits.div_ceil(8))
    }
}

/// Static description of a kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterMetadata {
    pub version: i32,
    pub target: &'static str,
    pub name: &'static str,
    pub arguments: &'static [ArgumentInfo],
}

/// A kernel's metadata paired with its callable entry point.
#[derive(Clone, Copy)]
pub struct FilterInfo {
    pub metadata: &'static FilterMetadata,
    pub argv_func: ArgvFunc,
}

impl fmt::Debug for FilterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterInfo")
            .field("metadata", self.metadata)
            .finish_non_exhaustive()
    }
}

impl FilterInfo {
    pub const fn new(metadata: &'static FilterMetadata, argv_func: ArgvFunc) -> Self {
        Self {
            metadata,
            argv_func,
        }
    }

    pub fn name(&self) -> &'static str {
        self.metadata.name
    }
}

//! Description documents for filter metadata.
//!
//! The document lists the filter's `version`, `target`, `name` and its
//! `arguments` in declaration order. Buffers carry `dimensions`; scalars carry
//! whichever of `def`, `min` and `max` are set, and omit the rest.

use serde::Serialize;
use serde_json::Value;

use crate::errors::{DescribeError, DescribeResult};
use crate::filter_metadata::{ArgumentInfo, ArgumentKind, FilterMetadata, ScalarValue, TypeCode};

#[derive(Debug, Serialize)]
struct FilterDescription<'a> {
    version: i32,
    target: &'a str,
    name: &'a str,
    arguments: Vec<ArgumentDescription<'a>>,
}

#[derive(Debug, Serialize)]
struct ArgumentDescription<'a> {
    name: &'a str,
    kind: ArgumentKind,
    type_code: TypeCode,
    type_bits: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    def: Option<ScalarValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<ScalarValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<ScalarValue>,
}

/// Returns true if scalars of this type can be represented in a document.
pub fn is_supported_scalar_type(type_code: TypeCode, type_bits: u8) -> bool {
    matches!(
        (type_code, type_bits),
        (TypeCode::Float, 32 | 64)
            | (TypeCode::Int, 8 | 16 | 32 | 64)
            | (TypeCode::UInt, 1 | 8 | 16 | 32 | 64)
            | (TypeCode::Handle, 64)
    )
}

fn describe_argument(arg: &ArgumentInfo) -> DescribeResult<ArgumentDescription<'_>> {
    if arg.kind.is_buffer() {
        return Ok(ArgumentDescription {
            name: arg.name,
            kind: arg.kind,
            type_code: arg.type_code,
            type_bits: arg.type_bits,
            dimensions: Some(arg.dimensions),
            def: None,
            min: None,
            max: None,
        });
    }

    if !is_supported_scalar_type(arg.type_code, arg.type_bits) {
        return Err(DescribeError::UnsupportedScalarType {
            name: arg.name.to_string(),
            type_code: arg.type_code.as_str().to_string(),
            type_bits: arg.type_bits,
        });
    }
    for (field, value) in [("def", arg.def), ("min", arg.min), ("max", arg.max)] {
        if value.is_some_and(|v| !v.matches_type(arg.type_code, arg.type_bits)) {
            return Err(DescribeError::ScalarTypeMismatch {
                name: arg.name.to_string(),
                field: field.to_string(),
            });
        }
    }
    Ok(ArgumentDescription {
        name: arg.name,
        kind: arg.kind,
        type_code: arg.type_code,
        type_bits: arg.type_bits,
        dimensions: None,
        def: arg.def,
        min: arg.min,
        max: arg.max,
    })
}

fn build_description(metadata: &FilterMetadata) -> DescribeResult<FilterDescription<'_>> {
    let arguments = metadata
        .arguments
        .iter()
        .map(describe_argument)
        .collect::<DescribeResult<Vec<_>>>()?;
    Ok(FilterDescription {
        version: metadata.version,
        target: metadata.target,
        name: metadata.name,
        arguments,
    })
}

/// Describes the metadata as a document value.
pub fn describe(metadata: &FilterMetadata) -> DescribeResult<Value> {
    Ok(serde_json::to_value(build_description(metadata)?)?)
}

/// Describes the metadata as compact JSON text, with fields in declaration order.
pub fn describe_as_json(metadata: &FilterMetadata) -> DescribeResult<String> {
    Ok(serde_json::to_string(&build_description(metadata)?)?)
}

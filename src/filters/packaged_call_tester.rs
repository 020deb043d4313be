//! Exercises every scalar type and a multi-output call.
//!
//! Takes two 3-D uint8 images with repeated edges and produces three outputs:
//! `f.0 = a + b`, `f.1 = a + b + 63` and `f.2 = a + b + 127`, all wrapping in
//! uint8. The scalar arguments are accepted and type-checked but unused.

use log::debug;

use super::{
    TARGET, buffer_arg, buffer_arg_mut, check_arguments, clamp_to_region, finish, read_u8,
    region_coords, request_planar, write_u8,
};
use crate::arg_value::{ArgValue, is_bounds_query};
use crate::buffer::BufferDescriptor;
use crate::call_context::CallContext;
use crate::errors::KernelResult;
use crate::filter_metadata::{ArgumentInfo, FilterInfo, FilterMetadata, ScalarValue, TypeCode};

const NAME: &str = "packaged_call_tester";

const INPUT1: usize = 1;
const INPUT2: usize = 2;
const FIRST_OUTPUT: usize = 14;

/// Added to `a + b` for each output, in output order.
const OUTPUT_OFFSETS: [u8; 3] = [0, 63, 127];

static ARGUMENTS: [ArgumentInfo; 17] = [
    ArgumentInfo::user_context(),
    ArgumentInfo::input_buffer("input1", TypeCode::UInt, 8, 3),
    ArgumentInfo::input_buffer("input2", TypeCode::UInt, 8, 3),
    ArgumentInfo::scalar("f", TypeCode::Float, 32)
        .with_default(ScalarValue::Float32(1.0))
        .with_range(ScalarValue::Float32(0.0), ScalarValue::Float32(10.0)),
    ArgumentInfo::scalar("d", TypeCode::Float, 64)
        .with_default(ScalarValue::Float64(1.0))
        .with_range(ScalarValue::Float64(0.0), ScalarValue::Float64(10.0)),
    ArgumentInfo::scalar("b", TypeCode::UInt, 1).with_default(ScalarValue::Bool(true)),
    ArgumentInfo::scalar("u8", TypeCode::UInt, 8)
        .with_default(ScalarValue::UInt8(8))
        .with_range(ScalarValue::UInt8(0), ScalarValue::UInt8(255)),
    ArgumentInfo::scalar("u16", TypeCode::UInt, 16)
        .with_default(ScalarValue::UInt16(16))
        .with_range(ScalarValue::UInt16(0), ScalarValue::UInt16(255)),
    ArgumentInfo::scalar("u32", TypeCode::UInt, 32)
        .with_default(ScalarValue::UInt32(32))
        .with_range(ScalarValue::UInt32(0), ScalarValue::UInt32(255)),
    ArgumentInfo::scalar("u64", TypeCode::UInt, 64)
        .with_default(ScalarValue::UInt64(64))
        .with_range(ScalarValue::UInt64(0), ScalarValue::UInt64(255)),
    ArgumentInfo::scalar("i8", TypeCode::Int, 8)
        .with_default(ScalarValue::Int8(8))
        .with_range(ScalarValue::Int8(0), ScalarValue::Int8(127)),
    ArgumentInfo::scalar("i16", TypeCode::Int, 16)
        .with_default(ScalarValue::Int16(16))
        .with_range(ScalarValue::Int16(0), ScalarValue::Int16(255)),
    ArgumentInfo::scalar("i32", TypeCode::Int, 32)
        .with_default(ScalarValue::Int32(32))
        .with_range(ScalarValue::Int32(0), ScalarValue::Int32(255)),
    ArgumentInfo::scalar("i64", TypeCode::Int, 64)
        .with_default(ScalarValue::Int64(64))
        .with_range(ScalarValue::Int64(0), ScalarValue::Int64(255)),
    ArgumentInfo::output_buffer("f.0", TypeCode::UInt, 8, 3),
    ArgumentInfo::output_buffer("f.1", TypeCode::UInt, 8, 3),
    ArgumentInfo::output_buffer("f.2", TypeCode::UInt, 8, 3),
];

pub static METADATA: FilterMetadata = FilterMetadata {
    version: 0,
    target: TARGET,
    name: NAME,
    arguments: &ARGUMENTS,
};

pub fn filter_info() -> FilterInfo {
    FilterInfo::new(&METADATA, packaged_call_tester_argv)
}

pub fn packaged_call_tester_argv(context: &dyn CallContext, args: &mut [ArgValue]) -> i32 {
    finish(context, run(context, args))
}

fn run(context: &dyn CallContext, args: &mut [ArgValue]) -> KernelResult<()> {
    check_arguments(&METADATA, args)?;

    if is_bounds_query(args) {
        for index in [INPUT1, INPUT2] {
            let input = buffer_arg_mut(&METADATA, args, index)?;
            request_planar(NAME, ARGUMENTS[index].name, input)?;
        }
        return Ok(());
    }

    debug!("{NAME}: running with {} threads", context.num_threads());
    let (inputs, outputs) = args.split_at_mut(FIRST_OUTPUT);
    let input1 = buffer_arg(&METADATA, inputs, INPUT1)?;
    let input2 = buffer_arg(&METADATA, inputs, INPUT2)?;

    for (k, offset) in OUTPUT_OFFSETS.into_iter().enumerate() {
        let name = ARGUMENTS[FIRST_OUTPUT + k].name;
        let output = buffer_arg_mut(&METADATA, outputs, k)?;
        for coord in region_coords(NAME, name, output.min, output.extent)? {
            let a = sample_repeat_edge("input1", input1, coord)?;
            let b = sample_repeat_edge("input2", input2, coord)?;
            write_u8(
                NAME,
                name,
                output,
                coord,
                a.wrapping_add(b).wrapping_add(offset),
            )?;
        }
    }
    Ok(())
}

fn sample_repeat_edge(name: &str, buf: &BufferDescriptor, coord: [i32; 3]) -> KernelResult<u8> {
    read_u8(NAME, name, buf, clamp_to_region(NAME, name, buf, coord)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_context::LoggingCallContext;

    fn scalars() -> Vec<ArgValue> {
        ARGUMENTS[3..FIRST_OUTPUT]
            .iter()
            .filter_map(|arg| arg.def)
            .map(ArgValue::Scalar)
            .collect()
    }

    fn image(width: i32, data: Vec<u8>) -> ArgValue {
        ArgValue::Buffer(BufferDescriptor {
            host: Some(data),
            extent: [width, 1, 1, 0],
            stride: [1, width, width, 0],
            elem_size: 1,
            ..BufferDescriptor::default()
        })
    }

    fn args(input1: ArgValue, input2: ArgValue, outputs: [ArgValue; 3]) -> Vec<ArgValue> {
        let mut args = vec![ArgValue::Scalar(ScalarValue::Handle(0)), input1, input2];
        args.extend(scalars());
        args.extend(outputs);
        args
    }

    #[test]
    fn test_bounds_query_requests_planar_inputs() {
        let mut input = image(3, vec![0; 3]);
        if let ArgValue::Buffer(buf) = &mut input {
            buf.host = None;
            buf.stride = [0, 0, 0, 0];
        }
        let output = ArgValue::Buffer(BufferDescriptor {
            extent: [3, 1, 1, 0],
            elem_size: 1,
            ..BufferDescriptor::default()
        });
        let mut args = args(
            input.clone(),
            input,
            [output.clone(), output.clone(), output],
        );

        let status = packaged_call_tester_argv(&LoggingCallContext::default(), &mut args);

        assert_eq!(status, 0);
        assert_eq!(args[INPUT1].as_buffer().unwrap().stride, [1, 3, 3, 0]);
    }

    #[test]
    fn test_outputs_repeat_input_edges() {
        let outputs = [0, 1, 2].map(|_| {
            ArgValue::Buffer(BufferDescriptor::planar([3, 1, 1, 0], 1).unwrap())
        });
        let mut args = args(image(2, vec![10, 20]), image(1, vec![1]), outputs);

        let status = packaged_call_tester_argv(&LoggingCallContext::default(), &mut args);

        assert_eq!(status, 0);
        let host = |k: usize| args[FIRST_OUTPUT + k].as_buffer().unwrap().host().unwrap();
        assert_eq!(host(0), &[11, 21, 21]);
        assert_eq!(host(1), &[74, 84, 84]);
        assert_eq!(host(2), &[138, 148, 148]);
    }

    #[test]
    fn test_sums_wrap() {
        let outputs = [0, 1, 2].map(|_| {
            ArgValue::Buffer(BufferDescriptor::planar([1, 1, 1, 0], 1).unwrap())
        });
        let mut args = args(image(1, vec![200]), image(1, vec![100]), outputs);

        assert_eq!(packaged_call_tester_argv(&LoggingCallContext::default(), &mut args), 0);
        assert_eq!(args[FIRST_OUTPUT + 2].as_buffer().unwrap().host().unwrap(), &[171]);
    }

    #[test]
    fn test_wrong_scalar_type_is_reported() {
        let outputs = [0, 1, 2].map(|_| {
            ArgValue::Buffer(BufferDescriptor::planar([1, 1, 1, 0], 1).unwrap())
        });
        let mut args = args(image(1, vec![0]), image(1, vec![1]), outputs);
        args[3] = ArgValue::Scalar(ScalarValue::Float64(1.0));

        assert_eq!(
            packaged_call_tester_argv(&LoggingCallContext::default(), &mut args),
            crate::errors::KERNEL_FAILURE_STATUS
        );
    }
}

//! Scales every sample of a 3-D uint8 image by `brightness_level`, saturating at 255.

use log::debug;

use super::{
    TARGET, buffer_arg, buffer_arg_mut, check_arguments, finish, read_u8, region_coords,
    request_planar, write_u8,
};
use crate::arg_value::{ArgValue, is_bounds_query};
use crate::call_context::CallContext;
use crate::errors::{KernelError, KernelResult};
use crate::filter_metadata::{ArgumentInfo, FilterInfo, FilterMetadata, ScalarValue, TypeCode};

const NAME: &str = "brighten";

const INPUT: usize = 1;
const LEVEL: usize = 2;
const OUTPUT: usize = 3;

static ARGUMENTS: [ArgumentInfo; 4] = [
    ArgumentInfo::user_context(),
    ArgumentInfo::input_buffer("input", TypeCode::UInt, 8, 3),
    ArgumentInfo::scalar("brightness_level", TypeCode::Float, 32)
        .with_default(ScalarValue::Float32(1.5))
        .with_range(ScalarValue::Float32(1.0), ScalarValue::Float32(10.0)),
    ArgumentInfo::output_buffer("output", TypeCode::UInt, 8, 3),
];

pub static METADATA: FilterMetadata = FilterMetadata {
    version: 0,
    target: TARGET,
    name: NAME,
    arguments: &ARGUMENTS,
};

pub fn filter_info() -> FilterInfo {
    FilterInfo::new(&METADATA, brighten_argv)
}

pub fn brighten_argv(context: &dyn CallContext, args: &mut [ArgValue]) -> i32 {
    finish(context, run(context, args))
}

fn brighten(value: u8, level: f32) -> u8 {
    // Float-to-int `as` truncates and saturates.
    (f32::from(value) * level).min(255.0) as u8
}

fn run(context: &dyn CallContext, args: &mut [ArgValue]) -> KernelResult<()> {
    check_arguments(&METADATA, args)?;

    let (inputs, outputs) = args.split_at_mut(OUTPUT);
    let output = buffer_arg_mut(&METADATA, outputs, 0)?;

    if is_bounds_query(inputs) || output.host.is_none() {
        // The input region needed is exactly the output region.
        let input = buffer_arg_mut(&METADATA, inputs, INPUT)?;
        for i in 0..3 {
            input.min[i] = output.min[i];
            input.extent[i] = output.extent[i];
        }
        return request_planar(NAME, "input", input);
    }

    let level = match inputs[LEVEL] {
        ArgValue::Scalar(ScalarValue::Float32(level)) => level,
        _ => {
            return Err(KernelError::ArgumentMismatch {
                filter: NAME.to_string(),
                name: ARGUMENTS[LEVEL].name.to_string(),
                expected: "a float32 scalar".to_string(),
            });
        }
    };
    let input = buffer_arg(&METADATA, inputs, INPUT)?;

    debug!("{NAME}: running with {} threads", context.num_threads());
    for coord in region_coords(NAME, "output", output.min, output.extent)? {
        let value = brighten(read_u8(NAME, "input", input, coord)?, level);
        if coord == [0, 0, 0] {
            context.print(&format!("Brightening picture by a factor of {level}"));
        }
        write_u8(NAME, "output", output, coord, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::buffer::BufferDescriptor;

    #[derive(Default)]
    struct Recorder {
        prints: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
    }

    impl CallContext for Recorder {
        fn error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }

        fn print(&self, message: &str) {
            self.prints.lock().unwrap().push(message.to_string());
        }
    }

    fn args(input: BufferDescriptor, level: f32, output: BufferDescriptor) -> Vec<ArgValue> {
        vec![
            ArgValue::Scalar(ScalarValue::Handle(0)),
            ArgValue::Buffer(input),
            ArgValue::Scalar(ScalarValue::Float32(level)),
            ArgValue::Buffer(output),
        ]
    }

    #[test]
    fn test_brighten_saturates() {
        assert_eq!(brighten(10, 1.5), 15);
        assert_eq!(brighten(101, 2.5), 252);
        assert_eq!(brighten(200, 10.0), 255);
    }

    #[test]
    fn test_brighten_image_prints_once() {
        let mut input = BufferDescriptor::planar([2, 1, 1, 0], 1).unwrap();
        input.host = Some(vec![10, 100]);
        let output = BufferDescriptor::planar([2, 1, 1, 0], 1).unwrap();
        let mut args = args(input, 2.0, output);
        let recorder = Recorder::default();

        assert_eq!(brighten_argv(&recorder, &mut args), 0);

        assert_eq!(args[OUTPUT].as_buffer().unwrap().host().unwrap(), &[20, 200]);
        assert_eq!(
            *recorder.prints.lock().unwrap(),
            vec!["Brightening picture by a factor of 2".to_string()]
        );
        assert!(recorder.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_bounds_query_requests_output_region() {
        let input = BufferDescriptor {
            extent: [8, 8, 3, 0],
            stride: [3, 24, 1, 0],
            elem_size: 1,
            ..BufferDescriptor::default()
        };
        let output = BufferDescriptor {
            extent: [4, 2, 3, 0],
            elem_size: 1,
            ..BufferDescriptor::default()
        };
        let mut args = args(input, 1.5, output);

        assert_eq!(brighten_argv(&Recorder::default(), &mut args), 0);

        let input = args[INPUT].as_buffer().unwrap();
        assert_eq!(input.extent, [4, 2, 3, 0]);
        assert_eq!(input.stride, [1, 4, 8, 0]);
    }

    #[test]
    fn test_input_smaller_than_output_is_reported() {
        let mut input = BufferDescriptor::planar([1, 1, 1, 0], 1).unwrap();
        input.host = Some(vec![1]);
        let output = BufferDescriptor::planar([2, 1, 1, 0], 1).unwrap();
        let mut args = args(input, 1.5, output);
        let recorder = Recorder::default();

        assert_eq!(
            brighten_argv(&recorder, &mut args),
            crate::errors::KERNEL_FAILURE_STATUS
        );
        assert_eq!(recorder.errors.lock().unwrap().len(), 1);
    }
}

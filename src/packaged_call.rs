//! Two-phase invocation of a kernel from a packaged request.
//!
//! A call moves through `Unpacking -> BoundsQuery -> Adapting -> Executing ->
//! Packing -> Done`. The bounds query runs the kernel with no host storage on
//! any buffer so it reports the shapes it needs; those shapes then drive the
//! relayout of inputs and the allocation of outputs before the real call.
//!
//! Kernel failures are returned with the kernel's own status. Any other
//! failure is reported once through [`CallContext::error`] with
//! [`MARSHALING_FAILURE_MESSAGE`] and maps to [`MARSHALING_FAILURE_STATUS`].
//!
//! [`MARSHALING_FAILURE_STATUS`]: crate::errors::MARSHALING_FAILURE_STATUS

use std::fmt;
use std::time::Instant;

use log::{debug, info, warn};

use crate::arg_value::ArgValue;
use crate::buffer::{BufferDescriptor, MAX_DIMENSIONS};
use crate::call_context::CallContext;
use crate::codec::ArgumentPackager;
use crate::errors::{
    CallPhase, LayoutError, MARSHALING_FAILURE_MESSAGE, PackagedCallError, PackagedCallResult,
};
use crate::filter_metadata::{ArgumentInfo, ArgumentKind, FilterInfo};
use crate::layout::{adapt_input_buffer_layout, prepare_output_buffer};

/// Output extent guessed for the bounds query when the filter has no input buffer.
pub const DEFAULT_OUTPUT_EXTENT: [i32; MAX_DIMENSIONS] = [100, 100, 4, 0];

/// Measurements of a successful call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallStats {
    /// Wall-clock duration of the executing kernel call only, in microseconds.
    pub time_usec: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallState {
    Start,
    Unpacking,
    BoundsQuery,
    Adapting,
    Executing,
    Packing,
    Done,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::Start => "start",
            CallState::Unpacking => "unpacking",
            CallState::BoundsQuery => "bounds query",
            CallState::Adapting => "adapting",
            CallState::Executing => "executing",
            CallState::Packing => "packing",
            CallState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Runs `filter` with arguments read from `packager`, writing outputs and timing back into it.
///
/// Handle arguments receive `context.handle()`, and the kernel reports
/// through `context` during both phases.
pub fn make_packaged_call(
    context: &dyn CallContext,
    filter: &FilterInfo,
    packager: &mut dyn ArgumentPackager,
) -> PackagedCallResult<CallStats> {
    let mut call = PackagedCall::new(context, filter);
    let result = call.run(packager);
    match &result {
        Ok(stats) => info!(
            "{}: completed in {:.1} usec",
            filter.name(),
            stats.time_usec
        ),
        Err(e) if e.is_marshaling_failure() => {
            warn!("{}: failed while {}: {}", filter.name(), call.state, e);
            context.error(MARSHALING_FAILURE_MESSAGE);
        }
        Err(e) => warn!("{}: {}", filter.name(), e),
    }
    result
}

/// Returns the extent of the first input buffer, or [`DEFAULT_OUTPUT_EXTENT`].
fn choose_output_extent(args: &[ArgumentInfo], values: &[ArgValue]) -> [i32; MAX_DIMENSIONS] {
    args.iter()
        .zip(values)
        .find(|(arg, _)| arg.kind == ArgumentKind::InputBuffer)
        .and_then(|(_, value)| value.as_buffer())
        .map_or(DEFAULT_OUTPUT_EXTENT, |buf| buf.extent)
}

fn expect_buffer<'v>(
    arg: &ArgumentInfo,
    value: &'v ArgValue,
) -> Result<&'v BufferDescriptor, LayoutError> {
    value.as_buffer().ok_or_else(|| LayoutError::NotABuffer {
        name: arg.name.to_string(),
    })
}

struct PackagedCall<'a> {
    context: &'a dyn CallContext,
    filter: &'a FilterInfo,
    values: Vec<ArgValue>,
    state: CallState,
}

impl<'a> PackagedCall<'a> {
    fn new(context: &'a dyn CallContext, filter: &'a FilterInfo) -> Self {
        Self {
            context,
            filter,
            values: vec![ArgValue::default(); filter.metadata.arguments.len()],
            state: CallState::Start,
        }
    }

    fn args(&self) -> &'static [ArgumentInfo] {
        self.filter.metadata.arguments
    }

    fn enter(&mut self, state: CallState) {
        debug!("{}: {} -> {}", self.filter.name(), self.state, state);
        self.state = state;
    }

    fn run(&mut self, packager: &mut dyn ArgumentPackager) -> PackagedCallResult<CallStats> {
        self.unpack(packager)?;
        let constraints = self.bounds_query()?;
        self.adapt(&constraints)?;
        let time_usec = self.execute()?;
        self.pack(packager, time_usec)?;
        self.enter(CallState::Done);
        Ok(CallStats { time_usec })
    }

    fn unpack(&mut self, packager: &dyn ArgumentPackager) -> PackagedCallResult<()> {
        self.enter(CallState::Unpacking);
        let args = self.args();
        for (arg, value) in args.iter().zip(self.values.iter_mut()) {
            if arg.kind == ArgumentKind::OutputBuffer {
                continue;
            }
            *value = packager.unpack_argument_value(self.context, arg)?;
        }
        Ok(())
    }

    /// Runs the kernel with host-less buffers and returns the shapes it wrote back.
    fn bounds_query(&mut self) -> PackagedCallResult<Vec<ArgValue>> {
        self.enter(CallState::BoundsQuery);
        let args = self.args();
        let guess = choose_output_extent(args, &self.values);
        let mut query: Vec<ArgValue> = args
            .iter()
            .zip(&self.values)
            .map(|(arg, value)| match (arg.kind, value) {
                (ArgumentKind::OutputBuffer, _) => {
                    let mut extent = [0; MAX_DIMENSIONS];
                    for (e, slot) in extent.iter_mut().enumerate() {
                        if (e as i32) < arg.dimensions {
                            *slot = guess[e];
                        }
                    }
                    ArgValue::Buffer(BufferDescriptor {
                        extent,
                        elem_size: arg.elem_size(),
                        ..BufferDescriptor::default()
                    })
                }
                (ArgumentKind::InputBuffer, ArgValue::Buffer(buf)) => {
                    ArgValue::Buffer(buf.without_host())
                }
                _ => value.clone(),
            })
            .collect();

        let status = (self.filter.argv_func)(self.context, &mut query);
        if status != 0 {
            return Err(PackagedCallError::Kernel {
                phase: CallPhase::BoundsQuery,
                status,
            });
        }
        Ok(query)
    }

    fn adapt(&mut self, constraints: &[ArgValue]) -> PackagedCallResult<()> {
        self.enter(CallState::Adapting);
        let args = self.args();
        for ((arg, value), constraint) in args.iter().zip(self.values.iter_mut()).zip(constraints) {
            match arg.kind {
                ArgumentKind::InputScalar => {}
                ArgumentKind::InputBuffer => {
                    let constraint = expect_buffer(arg, constraint)?;
                    let buf = value.as_buffer_mut().ok_or_else(|| LayoutError::NotABuffer {
                        name: arg.name.to_string(),
                    })?;
                    adapt_input_buffer_layout(arg, constraint, buf)?;
                }
                ArgumentKind::OutputBuffer => {
                    let constraint = expect_buffer(arg, constraint)?;
                    *value = ArgValue::Buffer(prepare_output_buffer(arg, constraint)?);
                }
            }
        }
        Ok(())
    }

    fn execute(&mut self) -> PackagedCallResult<f64> {
        self.enter(CallState::Executing);
        let start = Instant::now();
        let status = (self.filter.argv_func)(self.context, &mut self.values);
        let elapsed = start.elapsed();
        if status != 0 {
            return Err(PackagedCallError::Kernel {
                phase: CallPhase::Execute,
                status,
            });
        }
        Ok(elapsed.as_secs_f64() * 1_000_000.0)
    }

    fn pack(&mut self, packager: &mut dyn ArgumentPackager, time_usec: f64) -> PackagedCallResult<()> {
        self.enter(CallState::Packing);
        packager.pack_result_time_usec(time_usec)?;
        for (arg, value) in self.args().iter().zip(&self.values) {
            if arg.kind == ArgumentKind::OutputBuffer {
                packager.pack_result_value(arg, value)?;
            }
        }
        Ok(())
    }
}

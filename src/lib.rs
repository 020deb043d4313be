//! Runtime for invoking ahead-of-time compiled kernels from dynamically typed requests.
//!
//! A request names a kernel and carries its inputs as a loosely typed
//! document. The runtime unpacks the inputs into typed scalars and buffers,
//! asks the kernel which layouts it needs with a bounds query, relays out
//! inputs and allocates outputs to match, runs the kernel, and packs the
//! outputs and timing into a reply.
//!
//! The main entry points are [`make_packaged_call`] for a single call through
//! any [`ArgumentPackager`], [`FilterRegistry`] for lookup by name, and
//! [`Shell`] for handling whole `{verb, id, data}` requests.

pub mod arg_value;
pub mod buffer;
pub mod call_context;
pub mod codec;
pub mod copy;
pub mod describe;
pub mod errors;
pub mod filter_metadata;
pub mod filters;
pub mod layout;
pub mod packaged_call;
pub mod registry;
pub mod shell;

pub use arg_value::ArgValue;
pub use buffer::BufferDescriptor;
pub use call_context::{CallConfig, CallContext, LoggingCallContext};
pub use codec::{ArgumentPackager, SerdeJsonPackager};
pub use describe::{describe, describe_as_json};
pub use filter_metadata::{
    ArgumentInfo, ArgumentKind, FilterInfo, FilterMetadata, ScalarValue, TypeCode,
};
pub use packaged_call::{CallStats, make_packaged_call};
pub use registry::FilterRegistry;
pub use shell::{ResponseSink, Shell};

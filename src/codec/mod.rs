//! Conversion between message documents and kernel argument values.
//!
//! [`ArgumentPackager`] is the seam between the invocation engine and
//! whatever carries requests and replies. The JSON-flavored family in
//! [`json_packager`] implements it once over a small document-value
//! interface, and [`serde_json_packager`] plugs `serde_json` into that
//! interface.

use crate::arg_value::ArgValue;
use crate::call_context::CallContext;
use crate::errors::CodecResult;
use crate::filter_metadata::ArgumentInfo;

pub mod json_packager;
pub mod serde_json_packager;

pub use json_packager::{JsonPackager, JsonTransport, JsonValue};
pub use serde_json_packager::{SerdeJsonPackager, SerdeJsonTransport};

/// Reads argument values out of a request and writes results into a reply.
pub trait ArgumentPackager {
    /// Produces the value of a non-output argument from the request.
    ///
    /// Handle-typed arguments take `context.handle()` and must not appear in
    /// the request.
    fn unpack_argument_value(
        &self,
        context: &dyn CallContext,
        arg: &ArgumentInfo,
    ) -> CodecResult<ArgValue>;

    /// Writes the final value of an output buffer argument into the reply.
    fn pack_result_value(&mut self, arg: &ArgumentInfo, value: &ArgValue) -> CodecResult<()>;

    /// Writes the measured kernel latency into the reply.
    fn pack_result_time_usec(&mut self, time_usec: f64) -> CodecResult<()>;
}

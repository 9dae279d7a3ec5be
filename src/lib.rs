//! Runtime support for natively compiled method bodies.
//!
//! Generated native code resolves classes, fields and methods of the managed
//! runtime through a shared [`Runtime`] service, narrows floating point values
//! with the managed runtime's rules and reports failures through guest
//! exceptions plus an [`Unwind`] signal.

pub mod descriptor;
pub mod host;
pub mod runtime;

pub use host::{FieldId, HostRuntime, MethodId, Ref};
pub use runtime::*;

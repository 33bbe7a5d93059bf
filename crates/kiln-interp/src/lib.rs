// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Reference interpreter for lowered IR.
//!
//! Runs `IrModule`s directly, with the runtime support routines provided
//! by the host. Used to check that lowered code behaves like its source.

mod error;
mod eval;
mod host;
mod machine;
mod value;

pub use error::InterpError;
pub use machine::Machine;
pub use value::{Callable, Pointer, Root, Value};

// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Lowering of the typed AST into the flat, label-addressed IR.
//!
//! The entry points are [`lower_module`] and [`lower_program`]. Each
//! routine is lowered into its own [`kiln_ir::IrProc`]; a routine that
//! fails to lower is reported and dropped without affecting its siblings.

pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod flow;
pub mod intern;
pub mod lower;
pub mod proc_ctx;
pub mod raises;
pub mod runtime;
pub mod slots;
pub mod symbols;
pub mod types;
pub mod value;

pub use config::{CallChecking, LowerConfig};
pub use context::ModuleCtx;
pub use driver::{lower_module, lower_program};
pub use error::{ErrorClass, LowerError, LowerErrorKind};
pub use intern::{Interner, SharedInterner};
pub use proc_ctx::ProcCtx;
pub use runtime::{RuntimeLib, TableRuntime};
pub use slots::{SlotManager, Temp};
pub use types::{CachingTypeMapper, TypeMapper};
pub use value::Value;

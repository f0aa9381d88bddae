//! Stack-State: stack backend layer for account vending
//!
//! Every managed account is represented by a named stack in an external
//! infrastructure-automation backend. This crate defines the backend
//! contract and ships two implementations.
//!
//! ## Key Components
//!
//! - `StackBackend`: create/select/list stacks, write config, refresh
//! - `QualifiedName`: validated `org/project/name` stack identifier
//! - `MemoryStackBackend`: in-memory fake with failure injection
//! - `PulumiCliBackend`: drives the `pulumi` CLI from a scratch workspace

pub mod backend;
mod error;
pub mod fakes;
pub mod pulumi_cli;

pub use backend::{QualifiedName, StackBackend, StackRecord, StackResult, WorkspaceProgram};
pub use error::StackError;
pub use pulumi_cli::{PulumiCliBackend, PulumiCliConfig};

//! # defproto-core
//!
//! A library for converting resolved protobuf schema definitions back into
//! canonical `google.protobuf` descriptor messages.
//!
//! This crate provides the core functionality for:
//! - Building a fully resolved, in-memory schema model ([`SchemaPool`])
//! - Converting any schema entity into its `*DescriptorProto` form
//! - Charging every output allocation to a caller-supplied [`Arena`]
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`model`]: The read-only schema model and its handle types
//! - [`arena`]: The allocation-gating trait and a metering implementation
//! - [`convert`]: The per-entity descriptor converters
//! - [`error`]: The single conversion failure mode
//!
//! ## Example
//!
//! ```
//! use defproto_core::{FieldKind, FieldNode, FileNode, Label, MessageNode};
//! use defproto_core::{MeteredArena, SchemaPool};
//!
//! let mut pool = SchemaPool::new();
//! let greeting = pool.add_message(MessageNode {
//!     name: "Greeting".into(),
//!     full_name: "demo.Greeting".into(),
//!     ..Default::default()
//! });
//! pool.message_mut(greeting)
//!     .fields
//!     .push(FieldNode::new("text", 1, Label::Optional, FieldKind::String));
//! let file = pool.add_file(FileNode {
//!     name: "demo.proto".into(),
//!     package: "demo".into(),
//!     messages: vec![greeting],
//!     ..Default::default()
//! });
//!
//! let arena = MeteredArena::new();
//! let descriptor = pool.file(file).to_proto(&arena).unwrap();
//! assert_eq!(descriptor.message_type[0].name(), "Greeting");
//! assert!(arena.bytes_used() > 0);
//! ```
//!
//! ## Extensibility
//!
//! Memory policy lives behind the [`Arena`] trait: implement it to impose a
//! budget, meter usage, or inject failures in tests. [`MeteredArena`] is the
//! stock implementation.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod arena;
pub mod convert;
pub mod error;
pub mod model;

// Re-export primary types for convenience
pub use arena::{Arena, MeteredArena};
pub use error::ArenaExhausted;
pub use model::{
    DefaultValue, EnumDef, EnumId, EnumNode, EnumValueDef, EnumValueNode, ExtensionRange,
    FieldDef, FieldKind, FieldNode, FileDef, FileId, FileNode, Label, MessageDef, MessageId,
    MessageNode, MethodDef, MethodNode, OneofDef, OneofNode, ReservedRange, SchemaPool,
    ServiceDef, ServiceId, ServiceNode, Syntax,
};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Plain data nodes of the schema model.
//!
//! Nodes are the storage behind the handle types in [`super`]. They are
//! constructed directly by the caller (or by whatever loader sits in front of
//! this crate) with every cross-reference already expressed as a typed id
//! into the owning [`SchemaPool`], never as a name awaiting lookup.
//!
//! [`SchemaPool`]: super::SchemaPool

use bytes::Bytes;
use prost_types::{
    EnumOptions, EnumValueOptions, ExtensionRangeOptions, FieldOptions, FileOptions,
    MessageOptions, MethodOptions, OneofOptions, ServiceOptions,
};

use super::{EnumId, FileId, MessageId, ServiceId};

/// Syntax mode of a schema file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Syntax {
    /// Legacy proto2 syntax. The implicit default; never emitted explicitly.
    #[default]
    Proto2,
    /// Legacy proto3 syntax, emitted as the literal `"proto3"` token.
    Proto3,
    /// Edition-based mode, carrying the `google.protobuf.Edition` number.
    /// Emitted as the literal `"editions"` token; the number itself is a
    /// model-side fact with no descriptor slot.
    Editions(i32),
}

/// Cardinality of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Label {
    /// Singular field.
    #[default]
    Optional,
    /// Required field (proto2 only).
    Required,
    /// Repeated field.
    Repeated,
}

/// Declared value type of a field.
///
/// Message-, group- and enum-typed fields carry the resolved id of their
/// target type; the converter only ever reads the target's full name (and,
/// for enum defaults, its value list).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 64-bit floating point.
    Double,
    /// 32-bit floating point.
    Float,
    /// Varint-encoded signed 64-bit integer.
    Int64,
    /// Varint-encoded unsigned 64-bit integer.
    Uint64,
    /// Varint-encoded signed 32-bit integer.
    Int32,
    /// Fixed-width unsigned 64-bit integer.
    Fixed64,
    /// Fixed-width unsigned 32-bit integer.
    Fixed32,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    String,
    /// Length-delimited sub-message of the referenced type.
    Message(MessageId),
    /// Tag-delimited group of the referenced type (proto2 only).
    Group(MessageId),
    /// Arbitrary byte string.
    Bytes,
    /// Varint-encoded unsigned 32-bit integer.
    Uint32,
    /// Enum constant of the referenced type.
    Enum(EnumId),
    /// Fixed-width signed 32-bit integer.
    Sfixed32,
    /// Fixed-width signed 64-bit integer.
    Sfixed64,
    /// ZigZag varint-encoded signed 32-bit integer.
    Sint32,
    /// ZigZag varint-encoded signed 64-bit integer.
    Sint64,
}

/// Explicit default value of a field.
///
/// Only the scalar kinds can carry a default; message- and group-typed
/// fields are excluded by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Boolean default.
    Bool(bool),
    /// Enum default, as the numeric value of some constant of the field's
    /// enum type.
    Enum(i32),
    /// Signed 32-bit default.
    Int32(i32),
    /// Signed 64-bit default.
    Int64(i64),
    /// Unsigned 32-bit default.
    Uint32(u32),
    /// Unsigned 64-bit default.
    Uint64(u64),
    /// Single-precision default.
    Float(f32),
    /// Double-precision default.
    Double(f64),
    /// String default, stored verbatim.
    String(String),
    /// Bytes default, stored raw (unescaped).
    Bytes(Bytes),
}

/// A numeric range reserved by a message or enum, stored as two plain
/// integers exactly as declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReservedRange {
    /// First number of the range.
    pub start: i32,
    /// End marker of the range.
    pub end: i32,
}

/// A numeric range a message opens for extension fields.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRange {
    /// First number of the range.
    pub start: i32,
    /// End marker of the range (exclusive).
    pub end: i32,
    /// Options attached to the range declaration, if any.
    pub options: Option<ExtensionRangeOptions>,
}

/// A schema file.
#[derive(Debug, Clone, Default)]
pub struct FileNode {
    /// File name, e.g. `"demo/ping.proto"`.
    pub name: String,
    /// Package name; empty for the unnamed package.
    pub package: String,
    /// Syntax mode of the file.
    pub syntax: Syntax,
    /// Files this file imports, in declaration order.
    pub dependencies: Vec<FileId>,
    /// Indexes into `dependencies` of the public imports.
    pub public_dependency: Vec<i32>,
    /// Indexes into `dependencies` of the weak imports.
    pub weak_dependency: Vec<i32>,
    /// Top-level messages, in declaration order.
    pub messages: Vec<MessageId>,
    /// Top-level enums, in declaration order.
    pub enums: Vec<EnumId>,
    /// Services, in declaration order.
    pub services: Vec<ServiceId>,
    /// Top-level extension fields, in declaration order.
    pub extensions: Vec<FieldNode>,
    /// File options, if any.
    pub options: Option<FileOptions>,
}

/// A message type.
#[derive(Debug, Clone, Default)]
pub struct MessageNode {
    /// Short name, e.g. `"Ping"`.
    pub name: String,
    /// Fully qualified name without leading dot, e.g. `"demo.Ping"`.
    pub full_name: String,
    /// Member fields, in declaration order.
    pub fields: Vec<FieldNode>,
    /// Oneof groups, in declaration order. Fields point back into this list
    /// through [`FieldNode::oneof_index`].
    pub oneofs: Vec<OneofNode>,
    /// Nested message types, in declaration order.
    pub nested_messages: Vec<MessageId>,
    /// Nested enum types, in declaration order.
    pub nested_enums: Vec<EnumId>,
    /// Extension fields declared inside this message body (their extendee is
    /// some other message), in declaration order.
    pub nested_extensions: Vec<FieldNode>,
    /// Extension number ranges.
    pub extension_ranges: Vec<ExtensionRange>,
    /// Reserved number ranges.
    pub reserved_ranges: Vec<ReservedRange>,
    /// Reserved field names.
    pub reserved_names: Vec<String>,
    /// Message options, if any.
    pub options: Option<MessageOptions>,
}

/// A field, either a message member or an extension.
#[derive(Debug, Clone)]
pub struct FieldNode {
    /// Field name.
    pub name: String,
    /// Field number.
    pub number: i32,
    /// Cardinality.
    pub label: Label,
    /// Declared value type.
    pub kind: FieldKind,
    /// JSON name, present only when one was explicitly declared.
    pub json_name: Option<String>,
    /// The message this field extends, when the field is an extension.
    pub extendee: Option<MessageId>,
    /// Explicit default value, if one was declared.
    pub default: Option<DefaultValue>,
    /// Zero-based index of the containing oneof among the parent message's
    /// oneofs, when the field belongs to one.
    pub oneof_index: Option<i32>,
    /// True for proto3 implicit-presence optionals synthesized into a
    /// single-field oneof by the schema system (not user-declared oneof
    /// members).
    pub proto3_optional: bool,
    /// Field options, if any.
    pub options: Option<FieldOptions>,
}

impl FieldNode {
    /// Creates a field with the given identity and no optional attributes.
    pub fn new(name: impl Into<String>, number: i32, label: Label, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            number,
            label,
            kind,
            json_name: None,
            extendee: None,
            default: None,
            oneof_index: None,
            proto3_optional: false,
            options: None,
        }
    }
}

/// A oneof group. Member fields are not listed here; they reference their
/// group by index from [`FieldNode::oneof_index`].
#[derive(Debug, Clone, Default)]
pub struct OneofNode {
    /// Oneof name.
    pub name: String,
    /// Oneof options, if any.
    pub options: Option<OneofOptions>,
}

/// An enum type.
#[derive(Debug, Clone, Default)]
pub struct EnumNode {
    /// Short name.
    pub name: String,
    /// Fully qualified name without leading dot.
    pub full_name: String,
    /// Enum constants, in declaration order.
    pub values: Vec<EnumValueNode>,
    /// Reserved number ranges.
    pub reserved_ranges: Vec<ReservedRange>,
    /// Reserved constant names.
    pub reserved_names: Vec<String>,
    /// Enum options, if any.
    pub options: Option<EnumOptions>,
}

/// A single enum constant.
#[derive(Debug, Clone, Default)]
pub struct EnumValueNode {
    /// Constant name.
    pub name: String,
    /// Constant number.
    pub number: i32,
    /// Value options, if any.
    pub options: Option<EnumValueOptions>,
}

impl EnumValueNode {
    /// Creates a constant with the given name and number.
    pub fn new(name: impl Into<String>, number: i32) -> Self {
        Self {
            name: name.into(),
            number,
            options: None,
        }
    }
}

/// A service.
#[derive(Debug, Clone, Default)]
pub struct ServiceNode {
    /// Service name.
    pub name: String,
    /// Methods, in declaration order.
    pub methods: Vec<MethodNode>,
    /// Service options, if any.
    pub options: Option<ServiceOptions>,
}

/// A service method.
#[derive(Debug, Clone)]
pub struct MethodNode {
    /// Method name.
    pub name: String,
    /// Resolved input message type.
    pub input: MessageId,
    /// Resolved output message type.
    pub output: MessageId,
    /// True when the client streams its requests.
    pub client_streaming: bool,
    /// True when the server streams its responses.
    pub server_streaming: bool,
    /// Method options, if any.
    pub options: Option<MethodOptions>,
}

impl MethodNode {
    /// Creates a unary method with the given identity.
    pub fn new(name: impl Into<String>, input: MessageId, output: MessageId) -> Self {
        Self {
            name: name.into(),
            input,
            output,
            client_streaming: false,
            server_streaming: false,
            options: None,
        }
    }
}

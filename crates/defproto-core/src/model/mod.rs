//! Read-only schema model consumed by the descriptor converters.
//!
//! The model is the fully resolved, in-memory form of a schema: a
//! [`SchemaPool`] owning flat arrays of file, message, enum and service
//! nodes, plus lightweight copyable handle types ([`FileDef`],
//! [`MessageDef`], [`FieldDef`], ...) that pair a node with its pool and
//! expose read accessors.
//!
//! Every cross-reference (a field's sub-message type, an extension's
//! extendee, a method's input and output) is a typed id into the pool,
//! never a name that still needs lookup. Nothing in this crate resolves
//! names; the caller wires the ids when building the pool:
//!
//! ```
//! use defproto_core::{FieldKind, FieldNode, Label, MessageNode, SchemaPool};
//!
//! let mut pool = SchemaPool::new();
//! let ping = pool.add_message(MessageNode {
//!     name: "Ping".into(),
//!     full_name: "demo.Ping".into(),
//!     ..Default::default()
//! });
//! pool.message_mut(ping)
//!     .fields
//!     .push(FieldNode::new("seq", 1, Label::Optional, FieldKind::Int32));
//!
//! assert_eq!(pool.message(ping).fields().len(), 1);
//! ```
//!
//! Handles are only meaningful for the pool that issued them; indexing a
//! pool with a foreign or stale id panics.

mod node;

pub use node::{
    DefaultValue, EnumNode, EnumValueNode, ExtensionRange, FieldKind, FieldNode, FileNode, Label,
    MessageNode, MethodNode, OneofNode, ReservedRange, ServiceNode, Syntax,
};

use prost_types::{
    EnumOptions, EnumValueOptions, FieldOptions, FileOptions, MessageOptions, MethodOptions,
    OneofOptions, ServiceOptions,
};

/// Identifier of a file in a [`SchemaPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(usize);

/// Identifier of a message type in a [`SchemaPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(usize);

/// Identifier of an enum type in a [`SchemaPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumId(usize);

/// Identifier of a service in a [`SchemaPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceId(usize);

/// Owner of all schema nodes, and the factory for handles onto them.
#[derive(Debug, Default)]
pub struct SchemaPool {
    files: Vec<FileNode>,
    messages: Vec<MessageNode>,
    enums: Vec<EnumNode>,
    services: Vec<ServiceNode>,
}

impl SchemaPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file node, returning its id.
    pub fn add_file(&mut self, node: FileNode) -> FileId {
        self.files.push(node);
        FileId(self.files.len() - 1)
    }

    /// Adds a message node, returning its id.
    pub fn add_message(&mut self, node: MessageNode) -> MessageId {
        self.messages.push(node);
        MessageId(self.messages.len() - 1)
    }

    /// Adds an enum node, returning its id.
    pub fn add_enum(&mut self, node: EnumNode) -> EnumId {
        self.enums.push(node);
        EnumId(self.enums.len() - 1)
    }

    /// Adds a service node, returning its id.
    pub fn add_service(&mut self, node: ServiceNode) -> ServiceId {
        self.services.push(node);
        ServiceId(self.services.len() - 1)
    }

    /// Mutable access to a file node, for wiring children after insertion.
    pub fn file_mut(&mut self, id: FileId) -> &mut FileNode {
        &mut self.files[id.0]
    }

    /// Mutable access to a message node.
    pub fn message_mut(&mut self, id: MessageId) -> &mut MessageNode {
        &mut self.messages[id.0]
    }

    /// Mutable access to an enum node.
    pub fn enum_mut(&mut self, id: EnumId) -> &mut EnumNode {
        &mut self.enums[id.0]
    }

    /// Mutable access to a service node.
    pub fn service_mut(&mut self, id: ServiceId) -> &mut ServiceNode {
        &mut self.services[id.0]
    }

    /// Returns a handle onto a file.
    pub fn file(&self, id: FileId) -> FileDef<'_> {
        FileDef { pool: self, id }
    }

    /// Returns a handle onto a message type.
    pub fn message(&self, id: MessageId) -> MessageDef<'_> {
        MessageDef { pool: self, id }
    }

    /// Returns a handle onto an enum type.
    pub fn enum_type(&self, id: EnumId) -> EnumDef<'_> {
        EnumDef { pool: self, id }
    }

    /// Returns a handle onto a service.
    pub fn service(&self, id: ServiceId) -> ServiceDef<'_> {
        ServiceDef { pool: self, id }
    }
}

/// Handle onto a schema file.
#[derive(Debug, Clone, Copy)]
pub struct FileDef<'a> {
    pool: &'a SchemaPool,
    id: FileId,
}

impl<'a> FileDef<'a> {
    fn node(&self) -> &'a FileNode {
        &self.pool.files[self.id.0]
    }

    /// File name.
    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    /// Package name; empty for the unnamed package.
    pub fn package(&self) -> &'a str {
        &self.node().package
    }

    /// Syntax mode of the file.
    pub fn syntax(&self) -> Syntax {
        self.node().syntax
    }

    /// Imported files, in declaration order.
    pub fn dependencies(&self) -> impl ExactSizeIterator<Item = FileDef<'a>> + 'a {
        let pool = self.pool;
        self.node()
            .dependencies
            .iter()
            .map(move |&id| FileDef { pool, id })
    }

    /// Precomputed indexes into the dependency list of the public imports.
    pub fn public_dependency_indexes(&self) -> &'a [i32] {
        &self.node().public_dependency
    }

    /// Precomputed indexes into the dependency list of the weak imports.
    pub fn weak_dependency_indexes(&self) -> &'a [i32] {
        &self.node().weak_dependency
    }

    /// Top-level messages, in declaration order.
    pub fn messages(&self) -> impl ExactSizeIterator<Item = MessageDef<'a>> + 'a {
        let pool = self.pool;
        self.node()
            .messages
            .iter()
            .map(move |&id| MessageDef { pool, id })
    }

    /// Top-level enums, in declaration order.
    pub fn enums(&self) -> impl ExactSizeIterator<Item = EnumDef<'a>> + 'a {
        let pool = self.pool;
        self.node().enums.iter().map(move |&id| EnumDef { pool, id })
    }

    /// Services, in declaration order.
    pub fn services(&self) -> impl ExactSizeIterator<Item = ServiceDef<'a>> + 'a {
        let pool = self.pool;
        self.node()
            .services
            .iter()
            .map(move |&id| ServiceDef { pool, id })
    }

    /// Top-level extension fields, in declaration order.
    pub fn extensions(&self) -> impl ExactSizeIterator<Item = FieldDef<'a>> + 'a {
        let pool = self.pool;
        let id = self.id;
        (0..self.node().extensions.len()).map(move |index| FieldDef {
            pool,
            slot: FieldSlot::FileExtension(id, index),
        })
    }

    /// File options, if any.
    pub fn options(&self) -> Option<&'a FileOptions> {
        self.node().options.as_ref()
    }
}

/// Handle onto a message type.
#[derive(Debug, Clone, Copy)]
pub struct MessageDef<'a> {
    pool: &'a SchemaPool,
    id: MessageId,
}

impl<'a> MessageDef<'a> {
    fn node(&self) -> &'a MessageNode {
        &self.pool.messages[self.id.0]
    }

    /// Short name of the message.
    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    /// Fully qualified name, without the leading dot.
    pub fn full_name(&self) -> &'a str {
        &self.node().full_name
    }

    /// Member fields, in declaration order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = FieldDef<'a>> + 'a {
        let pool = self.pool;
        let id = self.id;
        (0..self.node().fields.len()).map(move |index| FieldDef {
            pool,
            slot: FieldSlot::Member(id, index),
        })
    }

    /// Oneof groups, in declaration order.
    pub fn oneofs(&self) -> impl ExactSizeIterator<Item = OneofDef<'a>> + 'a {
        let pool = self.pool;
        let id = self.id;
        (0..self.node().oneofs.len()).map(move |index| OneofDef {
            pool,
            message: id,
            index,
        })
    }

    /// Nested message types, in declaration order.
    pub fn nested_messages(&self) -> impl ExactSizeIterator<Item = MessageDef<'a>> + 'a {
        let pool = self.pool;
        self.node()
            .nested_messages
            .iter()
            .map(move |&id| MessageDef { pool, id })
    }

    /// Nested enum types, in declaration order.
    pub fn nested_enums(&self) -> impl ExactSizeIterator<Item = EnumDef<'a>> + 'a {
        let pool = self.pool;
        self.node()
            .nested_enums
            .iter()
            .map(move |&id| EnumDef { pool, id })
    }

    /// Extension fields declared inside this message body.
    pub fn nested_extensions(&self) -> impl ExactSizeIterator<Item = FieldDef<'a>> + 'a {
        let pool = self.pool;
        let id = self.id;
        (0..self.node().nested_extensions.len()).map(move |index| FieldDef {
            pool,
            slot: FieldSlot::MessageExtension(id, index),
        })
    }

    /// Extension number ranges.
    pub fn extension_ranges(&self) -> &'a [ExtensionRange] {
        &self.node().extension_ranges
    }

    /// Reserved number ranges.
    pub fn reserved_ranges(&self) -> &'a [ReservedRange] {
        &self.node().reserved_ranges
    }

    /// Reserved field names.
    pub fn reserved_names(&self) -> &'a [String] {
        &self.node().reserved_names
    }

    /// Message options, if any.
    pub fn options(&self) -> Option<&'a MessageOptions> {
        self.node().options.as_ref()
    }
}

/// Where a field node lives: message member, extension declared inside a
/// message body, or top-level extension of a file.
#[derive(Debug, Clone, Copy)]
enum FieldSlot {
    Member(MessageId, usize),
    MessageExtension(MessageId, usize),
    FileExtension(FileId, usize),
}

/// Handle onto a field or extension.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef<'a> {
    pool: &'a SchemaPool,
    slot: FieldSlot,
}

impl<'a> FieldDef<'a> {
    fn node(&self) -> &'a FieldNode {
        match self.slot {
            FieldSlot::Member(id, index) => &self.pool.messages[id.0].fields[index],
            FieldSlot::MessageExtension(id, index) => {
                &self.pool.messages[id.0].nested_extensions[index]
            }
            FieldSlot::FileExtension(id, index) => &self.pool.files[id.0].extensions[index],
        }
    }

    /// Field name.
    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    /// Field number.
    pub fn number(&self) -> i32 {
        self.node().number
    }

    /// Cardinality.
    pub fn label(&self) -> Label {
        self.node().label
    }

    /// Declared value type.
    pub fn kind(&self) -> FieldKind {
        self.node().kind
    }

    /// Explicitly declared JSON name, if any.
    pub fn json_name(&self) -> Option<&'a str> {
        self.node().json_name.as_deref()
    }

    /// The referenced message type, when this field is a sub-message or
    /// group reference.
    pub fn sub_message(&self) -> Option<MessageDef<'a>> {
        match self.node().kind {
            FieldKind::Message(id) | FieldKind::Group(id) => Some(MessageDef {
                pool: self.pool,
                id,
            }),
            _ => None,
        }
    }

    /// The referenced enum type, when this field is enum-typed.
    pub fn sub_enum(&self) -> Option<EnumDef<'a>> {
        match self.node().kind {
            FieldKind::Enum(id) => Some(EnumDef {
                pool: self.pool,
                id,
            }),
            _ => None,
        }
    }

    /// The extended message, when this field is an extension.
    pub fn extendee(&self) -> Option<MessageDef<'a>> {
        self.node().extendee.map(|id| MessageDef {
            pool: self.pool,
            id,
        })
    }

    /// Explicit default value, if one was declared.
    pub fn default_value(&self) -> Option<&'a DefaultValue> {
        self.node().default.as_ref()
    }

    /// Zero-based index of the containing oneof, when the field belongs to
    /// one.
    pub fn oneof_index(&self) -> Option<i32> {
        self.node().oneof_index
    }

    /// True for schema-synthesized proto3 implicit-presence optionals.
    pub fn proto3_optional(&self) -> bool {
        self.node().proto3_optional
    }

    /// Field options, if any.
    pub fn options(&self) -> Option<&'a FieldOptions> {
        self.node().options.as_ref()
    }
}

/// Handle onto a oneof group.
#[derive(Debug, Clone, Copy)]
pub struct OneofDef<'a> {
    pool: &'a SchemaPool,
    message: MessageId,
    index: usize,
}

impl<'a> OneofDef<'a> {
    fn node(&self) -> &'a OneofNode {
        &self.pool.messages[self.message.0].oneofs[self.index]
    }

    /// Oneof name.
    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    /// Oneof options, if any.
    pub fn options(&self) -> Option<&'a OneofOptions> {
        self.node().options.as_ref()
    }
}

/// Handle onto an enum type.
#[derive(Debug, Clone, Copy)]
pub struct EnumDef<'a> {
    pool: &'a SchemaPool,
    id: EnumId,
}

impl<'a> EnumDef<'a> {
    fn node(&self) -> &'a EnumNode {
        &self.pool.enums[self.id.0]
    }

    /// Short name of the enum.
    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    /// Fully qualified name, without the leading dot.
    pub fn full_name(&self) -> &'a str {
        &self.node().full_name
    }

    /// Enum constants, in declaration order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = EnumValueDef<'a>> + 'a {
        let pool = self.pool;
        let id = self.id;
        (0..self.node().values.len()).map(move |index| EnumValueDef {
            pool,
            enum_id: id,
            index,
        })
    }

    /// Finds the first constant with the given number, if any.
    pub fn find_value_by_number(&self, number: i32) -> Option<EnumValueDef<'a>> {
        self.node()
            .values
            .iter()
            .position(|v| v.number == number)
            .map(|index| EnumValueDef {
                pool: self.pool,
                enum_id: self.id,
                index,
            })
    }

    /// Reserved number ranges.
    pub fn reserved_ranges(&self) -> &'a [ReservedRange] {
        &self.node().reserved_ranges
    }

    /// Reserved constant names.
    pub fn reserved_names(&self) -> &'a [String] {
        &self.node().reserved_names
    }

    /// Enum options, if any.
    pub fn options(&self) -> Option<&'a EnumOptions> {
        self.node().options.as_ref()
    }
}

/// Handle onto an enum constant.
#[derive(Debug, Clone, Copy)]
pub struct EnumValueDef<'a> {
    pool: &'a SchemaPool,
    enum_id: EnumId,
    index: usize,
}

impl<'a> EnumValueDef<'a> {
    fn node(&self) -> &'a EnumValueNode {
        &self.pool.enums[self.enum_id.0].values[self.index]
    }

    /// Constant name.
    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    /// Constant number.
    pub fn number(&self) -> i32 {
        self.node().number
    }

    /// Value options, if any.
    pub fn options(&self) -> Option<&'a EnumValueOptions> {
        self.node().options.as_ref()
    }
}

/// Handle onto a service.
#[derive(Debug, Clone, Copy)]
pub struct ServiceDef<'a> {
    pool: &'a SchemaPool,
    id: ServiceId,
}

impl<'a> ServiceDef<'a> {
    fn node(&self) -> &'a ServiceNode {
        &self.pool.services[self.id.0]
    }

    /// Service name.
    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    /// Methods, in declaration order.
    pub fn methods(&self) -> impl ExactSizeIterator<Item = MethodDef<'a>> + 'a {
        let pool = self.pool;
        let id = self.id;
        (0..self.node().methods.len()).map(move |index| MethodDef {
            pool,
            service: id,
            index,
        })
    }

    /// Service options, if any.
    pub fn options(&self) -> Option<&'a ServiceOptions> {
        self.node().options.as_ref()
    }
}

/// Handle onto a service method.
#[derive(Debug, Clone, Copy)]
pub struct MethodDef<'a> {
    pool: &'a SchemaPool,
    service: ServiceId,
    index: usize,
}

impl<'a> MethodDef<'a> {
    fn node(&self) -> &'a MethodNode {
        &self.pool.services[self.service.0].methods[self.index]
    }

    /// Method name.
    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    /// Resolved input message type.
    pub fn input(&self) -> MessageDef<'a> {
        MessageDef {
            pool: self.pool,
            id: self.node().input,
        }
    }

    /// Resolved output message type.
    pub fn output(&self) -> MessageDef<'a> {
        MessageDef {
            pool: self.pool,
            id: self.node().output,
        }
    }

    /// True when the client streams its requests.
    pub fn client_streaming(&self) -> bool {
        self.node().client_streaming
    }

    /// True when the server streams its responses.
    pub fn server_streaming(&self) -> bool {
        self.node().server_streaming
    }

    /// Method options, if any.
    pub fn options(&self) -> Option<&'a MethodOptions> {
        self.node().options.as_ref()
    }
}

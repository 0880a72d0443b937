//! Entity converters: one function per schema entity kind, rebuilding the
//! corresponding descriptor node and recursing into children.
//!
//! Each converter allocates a fresh output node, copies scalar attributes
//! through the value encoders, bulk-reserves one same-length slot array per
//! repeated child category and fills it in source order, then deep-copies
//! any attached options. The walk is a single depth-first pass with no
//! intermediate state; the only abort path is arena exhaustion, which every
//! converter propagates with `?` straight back to the entry point that
//! started the conversion.
//!
//! The public surface of this module is the `to_proto` method on each of the
//! eight top-level handle kinds.

mod encode;

use std::mem::size_of;

use prost_types::field_descriptor_proto::{Label as ProtoLabel, Type as ProtoType};
use prost_types::{
    descriptor_proto, enum_descriptor_proto, DescriptorProto, EnumDescriptorProto,
    EnumValueDescriptorProto, FieldDescriptorProto, FileDescriptorProto, MethodDescriptorProto,
    OneofDescriptorProto, ServiceDescriptorProto,
};
use tracing::{debug, trace};

use crate::arena::Arena;
use crate::error::{ArenaExhausted, Result};
use crate::model::{
    EnumDef, EnumValueDef, ExtensionRange, FieldDef, FieldKind, FileDef, Label, MessageDef,
    MethodDef, OneofDef, ReservedRange, ServiceDef, Syntax,
};

/// Allocation context for one conversion call: the caller's arena plus the
/// mapping of exhaustion onto the error channel.
pub(crate) struct Context<'a> {
    arena: &'a dyn Arena,
}

impl<'a> Context<'a> {
    pub(crate) fn new(arena: &'a dyn Arena) -> Self {
        Self { arena }
    }

    /// Charges `size` bytes to the arena before the storage is created.
    fn alloc(&self, size: usize) -> Result<()> {
        if self.arena.allocate(size) {
            Ok(())
        } else {
            Err(ArenaExhausted)
        }
    }

    /// Duplicates a model-owned string into arena-charged storage, so output
    /// text never aliases the source model.
    fn dup(&self, text: &str) -> Result<String> {
        self.alloc(text.len())?;
        Ok(text.to_owned())
    }

    /// Charges an already formatted string to the arena.
    fn owned(&self, text: String) -> Result<String> {
        self.alloc(text.len())?;
        Ok(text)
    }

    /// Builds the canonical fully qualified type reference: `"." + name`.
    /// Always absolute, regardless of nesting depth.
    fn qualify(&self, full_name: &str) -> Result<String> {
        self.alloc(full_name.len() + 1)?;
        let mut qualified = String::with_capacity(full_name.len() + 1);
        qualified.push('.');
        qualified.push_str(full_name);
        Ok(qualified)
    }

    /// Bulk-reserves an `len`-slot output array in a single charge.
    fn vec<T>(&self, len: usize) -> Result<Vec<T>> {
        self.alloc(size_of::<T>().saturating_mul(len))?;
        Ok(Vec::with_capacity(len))
    }
}

/// Converts every child of one repeated category, preserving source order.
fn convert_children<S, T, F>(
    ctx: &Context<'_>,
    children: impl ExactSizeIterator<Item = S>,
    convert: F,
) -> Result<Vec<T>>
where
    F: Fn(&Context<'_>, S) -> Result<T>,
{
    let mut slots = ctx.vec::<T>(children.len())?;
    for child in children {
        slots.push(convert(ctx, child)?);
    }
    Ok(slots)
}

fn dup_all(ctx: &Context<'_>, names: &[String]) -> Result<Vec<String>> {
    let mut out = ctx.vec::<String>(names.len())?;
    for name in names {
        out.push(ctx.dup(name)?);
    }
    Ok(out)
}

fn copy_indexes(ctx: &Context<'_>, indexes: &[i32]) -> Result<Vec<i32>> {
    let mut out = ctx.vec::<i32>(indexes.len())?;
    out.extend_from_slice(indexes);
    Ok(out)
}

fn descriptor_label(label: Label) -> ProtoLabel {
    match label {
        Label::Optional => ProtoLabel::Optional,
        Label::Required => ProtoLabel::Required,
        Label::Repeated => ProtoLabel::Repeated,
    }
}

fn descriptor_type(kind: FieldKind) -> ProtoType {
    match kind {
        FieldKind::Double => ProtoType::Double,
        FieldKind::Float => ProtoType::Float,
        FieldKind::Int64 => ProtoType::Int64,
        FieldKind::Uint64 => ProtoType::Uint64,
        FieldKind::Int32 => ProtoType::Int32,
        FieldKind::Fixed64 => ProtoType::Fixed64,
        FieldKind::Fixed32 => ProtoType::Fixed32,
        FieldKind::Bool => ProtoType::Bool,
        FieldKind::String => ProtoType::String,
        FieldKind::Message(_) => ProtoType::Message,
        FieldKind::Group(_) => ProtoType::Group,
        FieldKind::Bytes => ProtoType::Bytes,
        FieldKind::Uint32 => ProtoType::Uint32,
        FieldKind::Enum(_) => ProtoType::Enum,
        FieldKind::Sfixed32 => ProtoType::Sfixed32,
        FieldKind::Sfixed64 => ProtoType::Sfixed64,
        FieldKind::Sint32 => ProtoType::Sint32,
        FieldKind::Sint64 => ProtoType::Sint64,
    }
}

fn field_to_proto(ctx: &Context<'_>, field: FieldDef<'_>) -> Result<FieldDescriptorProto> {
    ctx.alloc(size_of::<FieldDescriptorProto>())?;
    let mut proto = FieldDescriptorProto {
        name: Some(ctx.dup(field.name())?),
        number: Some(field.number()),
        label: Some(descriptor_label(field.label()) as i32),
        r#type: Some(descriptor_type(field.kind()) as i32),
        ..Default::default()
    };

    if let Some(json_name) = field.json_name() {
        proto.json_name = Some(ctx.dup(json_name)?);
    }

    // A sub-message reference wins the type-name slot; enum qualification
    // only applies to enum-typed fields.
    if let Some(message) = field.sub_message() {
        proto.type_name = Some(ctx.qualify(message.full_name())?);
    } else if let Some(enum_type) = field.sub_enum() {
        proto.type_name = Some(ctx.qualify(enum_type.full_name())?);
    }

    if let Some(extendee) = field.extendee() {
        proto.extendee = Some(ctx.qualify(extendee.full_name())?);
    }

    if let Some(default) = field.default_value() {
        proto.default_value = Some(encode::format_default(ctx, field, default)?);
    }

    if let Some(index) = field.oneof_index() {
        proto.oneof_index = Some(index);
    }

    if field.proto3_optional() {
        proto.proto3_optional = Some(true);
    }

    if let Some(options) = field.options() {
        proto.options = Some(encode::copy_options(ctx, options)?);
    }

    Ok(proto)
}

fn oneof_to_proto(ctx: &Context<'_>, oneof: OneofDef<'_>) -> Result<OneofDescriptorProto> {
    ctx.alloc(size_of::<OneofDescriptorProto>())?;
    let mut proto = OneofDescriptorProto {
        name: Some(ctx.dup(oneof.name())?),
        ..Default::default()
    };

    if let Some(options) = oneof.options() {
        proto.options = Some(encode::copy_options(ctx, options)?);
    }

    Ok(proto)
}

fn enum_value_to_proto(
    ctx: &Context<'_>,
    value: EnumValueDef<'_>,
) -> Result<EnumValueDescriptorProto> {
    ctx.alloc(size_of::<EnumValueDescriptorProto>())?;
    let mut proto = EnumValueDescriptorProto {
        name: Some(ctx.dup(value.name())?),
        number: Some(value.number()),
        ..Default::default()
    };

    if let Some(options) = value.options() {
        proto.options = Some(encode::copy_options(ctx, options)?);
    }

    Ok(proto)
}

fn enum_to_proto(ctx: &Context<'_>, enum_type: EnumDef<'_>) -> Result<EnumDescriptorProto> {
    ctx.alloc(size_of::<EnumDescriptorProto>())?;
    let mut proto = EnumDescriptorProto {
        name: Some(ctx.dup(enum_type.name())?),
        ..Default::default()
    };

    proto.value = convert_children(ctx, enum_type.values(), enum_value_to_proto)?;
    proto.reserved_range = convert_children(
        ctx,
        enum_type.reserved_ranges().iter(),
        enum_reserved_range_to_proto,
    )?;
    proto.reserved_name = dup_all(ctx, enum_type.reserved_names())?;

    if let Some(options) = enum_type.options() {
        proto.options = Some(encode::copy_options(ctx, options)?);
    }

    Ok(proto)
}

fn extension_range_to_proto(
    ctx: &Context<'_>,
    range: &ExtensionRange,
) -> Result<descriptor_proto::ExtensionRange> {
    ctx.alloc(size_of::<descriptor_proto::ExtensionRange>())?;
    let mut proto = descriptor_proto::ExtensionRange {
        start: Some(range.start),
        end: Some(range.end),
        options: None,
    };

    if let Some(options) = &range.options {
        proto.options = Some(encode::copy_options(ctx, options)?);
    }

    Ok(proto)
}

fn reserved_range_to_proto(
    ctx: &Context<'_>,
    range: &ReservedRange,
) -> Result<descriptor_proto::ReservedRange> {
    ctx.alloc(size_of::<descriptor_proto::ReservedRange>())?;
    Ok(descriptor_proto::ReservedRange {
        start: Some(range.start),
        end: Some(range.end),
    })
}

fn enum_reserved_range_to_proto(
    ctx: &Context<'_>,
    range: &ReservedRange,
) -> Result<enum_descriptor_proto::EnumReservedRange> {
    ctx.alloc(size_of::<enum_descriptor_proto::EnumReservedRange>())?;
    Ok(enum_descriptor_proto::EnumReservedRange {
        start: Some(range.start),
        end: Some(range.end),
    })
}

fn message_to_proto(ctx: &Context<'_>, message: MessageDef<'_>) -> Result<DescriptorProto> {
    ctx.alloc(size_of::<DescriptorProto>())?;
    let mut proto = DescriptorProto {
        name: Some(ctx.dup(message.name())?),
        ..Default::default()
    };

    proto.field = convert_children(ctx, message.fields(), field_to_proto)?;
    proto.oneof_decl = convert_children(ctx, message.oneofs(), oneof_to_proto)?;
    proto.nested_type = convert_children(ctx, message.nested_messages(), message_to_proto)?;
    proto.enum_type = convert_children(ctx, message.nested_enums(), enum_to_proto)?;
    proto.extension = convert_children(ctx, message.nested_extensions(), field_to_proto)?;
    proto.extension_range = convert_children(
        ctx,
        message.extension_ranges().iter(),
        extension_range_to_proto,
    )?;
    proto.reserved_range = convert_children(
        ctx,
        message.reserved_ranges().iter(),
        reserved_range_to_proto,
    )?;
    proto.reserved_name = dup_all(ctx, message.reserved_names())?;

    if let Some(options) = message.options() {
        proto.options = Some(encode::copy_options(ctx, options)?);
    }

    Ok(proto)
}

fn method_to_proto(ctx: &Context<'_>, method: MethodDef<'_>) -> Result<MethodDescriptorProto> {
    ctx.alloc(size_of::<MethodDescriptorProto>())?;
    let mut proto = MethodDescriptorProto {
        name: Some(ctx.dup(method.name())?),
        input_type: Some(ctx.qualify(method.input().full_name())?),
        output_type: Some(ctx.qualify(method.output().full_name())?),
        ..Default::default()
    };

    // Streaming flags are only emitted when set, never as an explicit false.
    if method.client_streaming() {
        proto.client_streaming = Some(true);
    }
    if method.server_streaming() {
        proto.server_streaming = Some(true);
    }

    if let Some(options) = method.options() {
        proto.options = Some(encode::copy_options(ctx, options)?);
    }

    Ok(proto)
}

fn service_to_proto(ctx: &Context<'_>, service: ServiceDef<'_>) -> Result<ServiceDescriptorProto> {
    ctx.alloc(size_of::<ServiceDescriptorProto>())?;
    let mut proto = ServiceDescriptorProto {
        name: Some(ctx.dup(service.name())?),
        ..Default::default()
    };

    proto.method = convert_children(ctx, service.methods(), method_to_proto)?;

    if let Some(options) = service.options() {
        proto.options = Some(encode::copy_options(ctx, options)?);
    }

    Ok(proto)
}

fn file_to_proto(ctx: &Context<'_>, file: FileDef<'_>) -> Result<FileDescriptorProto> {
    ctx.alloc(size_of::<FileDescriptorProto>())?;
    let mut proto = FileDescriptorProto {
        name: Some(ctx.dup(file.name())?),
        ..Default::default()
    };

    if !file.package().is_empty() {
        proto.package = Some(ctx.dup(file.package())?);
    }

    // Proto2 is the implicit default and is never spelled out. Edition-based
    // files are marked by the "editions" token; the edition number itself has
    // no slot in this descriptor schema and stays a model-side fact.
    match file.syntax() {
        Syntax::Proto2 => {}
        Syntax::Proto3 => proto.syntax = Some(ctx.dup("proto3")?),
        Syntax::Editions(_) => proto.syntax = Some(ctx.dup("editions")?),
    }

    proto.dependency = convert_children(ctx, file.dependencies(), |ctx, dep| ctx.dup(dep.name()))?;
    proto.public_dependency = copy_indexes(ctx, file.public_dependency_indexes())?;
    proto.weak_dependency = copy_indexes(ctx, file.weak_dependency_indexes())?;

    proto.message_type = convert_children(ctx, file.messages(), message_to_proto)?;
    proto.enum_type = convert_children(ctx, file.enums(), enum_to_proto)?;
    proto.service = convert_children(ctx, file.services(), service_to_proto)?;
    proto.extension = convert_children(ctx, file.extensions(), field_to_proto)?;

    if let Some(options) = file.options() {
        proto.options = Some(encode::copy_options(ctx, options)?);
    }

    Ok(proto)
}

/// Runs one entry-point conversion, catching the exhaustion unwind.
fn convert_entry<T>(
    kind: &'static str,
    name: &str,
    convert: impl FnOnce() -> Result<T>,
) -> Option<T> {
    trace!(kind, name, "starting descriptor conversion");
    match convert() {
        Ok(proto) => Some(proto),
        Err(ArenaExhausted) => {
            debug!(kind, name, "descriptor conversion aborted: arena exhausted");
            None
        }
    }
}

impl FileDef<'_> {
    /// Converts this file definition into its descriptor form, with every
    /// allocation charged to `arena`.
    ///
    /// Returns `None` when the arena reports exhaustion; any partially built
    /// output is discarded.
    pub fn to_proto(&self, arena: &dyn Arena) -> Option<FileDescriptorProto> {
        let ctx = Context::new(arena);
        convert_entry("file", self.name(), || file_to_proto(&ctx, *self))
    }
}

impl MessageDef<'_> {
    /// Converts this message definition into its descriptor form.
    ///
    /// Returns `None` when the arena reports exhaustion.
    pub fn to_proto(&self, arena: &dyn Arena) -> Option<DescriptorProto> {
        let ctx = Context::new(arena);
        convert_entry("message", self.name(), || message_to_proto(&ctx, *self))
    }
}

impl EnumDef<'_> {
    /// Converts this enum definition into its descriptor form.
    ///
    /// Returns `None` when the arena reports exhaustion.
    pub fn to_proto(&self, arena: &dyn Arena) -> Option<EnumDescriptorProto> {
        let ctx = Context::new(arena);
        convert_entry("enum", self.name(), || enum_to_proto(&ctx, *self))
    }
}

impl EnumValueDef<'_> {
    /// Converts this enum constant into its descriptor form.
    ///
    /// Returns `None` when the arena reports exhaustion.
    pub fn to_proto(&self, arena: &dyn Arena) -> Option<EnumValueDescriptorProto> {
        let ctx = Context::new(arena);
        convert_entry("enum value", self.name(), || enum_value_to_proto(&ctx, *self))
    }
}

impl FieldDef<'_> {
    /// Converts this field definition into its descriptor form.
    ///
    /// Returns `None` when the arena reports exhaustion.
    pub fn to_proto(&self, arena: &dyn Arena) -> Option<FieldDescriptorProto> {
        let ctx = Context::new(arena);
        convert_entry("field", self.name(), || field_to_proto(&ctx, *self))
    }
}

impl OneofDef<'_> {
    /// Converts this oneof definition into its descriptor form.
    ///
    /// Returns `None` when the arena reports exhaustion.
    pub fn to_proto(&self, arena: &dyn Arena) -> Option<OneofDescriptorProto> {
        let ctx = Context::new(arena);
        convert_entry("oneof", self.name(), || oneof_to_proto(&ctx, *self))
    }
}

impl ServiceDef<'_> {
    /// Converts this service definition into its descriptor form.
    ///
    /// Returns `None` when the arena reports exhaustion.
    pub fn to_proto(&self, arena: &dyn Arena) -> Option<ServiceDescriptorProto> {
        let ctx = Context::new(arena);
        convert_entry("service", self.name(), || service_to_proto(&ctx, *self))
    }
}

impl MethodDef<'_> {
    /// Converts this method definition into its descriptor form.
    ///
    /// Returns `None` when the arena reports exhaustion.
    pub fn to_proto(&self, arena: &dyn Arena) -> Option<MethodDescriptorProto> {
        let ctx = Context::new(arena);
        convert_entry("method", self.name(), || method_to_proto(&ctx, *self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::MeteredArena;
    use crate::model::{
        DefaultValue, EnumNode, EnumValueNode, FieldNode, FileNode, MessageNode, MethodNode,
        OneofNode, SchemaPool, ServiceNode,
    };
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use prost_types::uninterpreted_option::NamePart;
    use prost_types::{ExtensionRangeOptions, FieldOptions, MessageOptions, UninterpretedOption};
    use std::cell::Cell;

    /// Arena that grants a fixed number of allocations, then fails.
    struct FailAfter(Cell<usize>);

    impl FailAfter {
        fn new(grants: usize) -> Self {
            Self(Cell::new(grants))
        }
    }

    impl Arena for FailAfter {
        fn allocate(&self, _size: usize) -> bool {
            let remaining = self.0.get();
            self.0.set(remaining.saturating_sub(1));
            remaining > 0
        }
    }

    #[test]
    fn test_file_scenario_int32_default() {
        let mut pool = SchemaPool::new();
        let m = pool.add_message(MessageNode {
            name: "M".into(),
            full_name: "a.b.M".into(),
            ..Default::default()
        });
        let mut x = FieldNode::new("x", 1, Label::Optional, FieldKind::Int32);
        x.default = Some(DefaultValue::Int32(5));
        pool.message_mut(m).fields.push(x);
        let file = pool.add_file(FileNode {
            name: "a.proto".into(),
            package: "a.b".into(),
            messages: vec![m],
            ..Default::default()
        });

        let arena = MeteredArena::new();
        let proto = pool.file(file).to_proto(&arena).unwrap();

        assert_eq!(proto.name(), "a.proto");
        assert_eq!(proto.package(), "a.b");
        assert_eq!(proto.message_type[0].name(), "M");
        let field = &proto.message_type[0].field[0];
        assert_eq!(field.name(), "x");
        assert_eq!(field.number(), 1);
        assert_eq!(field.r#type(), ProtoType::Int32);
        assert_eq!(field.default_value(), "5");
    }

    #[test]
    fn test_field_without_optional_attributes_emits_no_slots() {
        let mut pool = SchemaPool::new();
        let m = pool.add_message(Default::default());
        pool.message_mut(m)
            .fields
            .push(FieldNode::new("plain", 4, Label::Repeated, FieldKind::String));
        let field = pool.message(m).fields().next().unwrap();

        let arena = MeteredArena::new();
        let proto = field.to_proto(&arena).unwrap();

        assert_eq!(proto.label(), ProtoLabel::Repeated);
        assert!(proto.default_value.is_none());
        assert!(proto.oneof_index.is_none());
        assert!(proto.proto3_optional.is_none());
        assert!(proto.type_name.is_none());
        assert!(proto.extendee.is_none());
        assert!(proto.json_name.is_none());
        assert!(proto.options.is_none());
    }

    #[test]
    fn test_sub_message_wins_type_name_slot() {
        let mut pool = SchemaPool::new();
        let inner = pool.add_message(MessageNode {
            name: "Inner".into(),
            full_name: "pkg.Inner".into(),
            ..Default::default()
        });
        let e = pool.add_enum(EnumNode {
            name: "Mode".into(),
            full_name: "pkg.Mode".into(),
            values: vec![EnumValueNode::new("MODE_UNKNOWN", 0)],
            ..Default::default()
        });
        let outer = pool.add_message(Default::default());
        pool.message_mut(outer).fields.extend([
            FieldNode::new("msg", 1, Label::Optional, FieldKind::Message(inner)),
            FieldNode::new("grp", 2, Label::Optional, FieldKind::Group(inner)),
            FieldNode::new("mode", 3, Label::Optional, FieldKind::Enum(e)),
        ]);

        let arena = MeteredArena::new();
        let proto = pool.message(outer).to_proto(&arena).unwrap();

        assert_eq!(proto.field[0].type_name(), ".pkg.Inner");
        assert_eq!(proto.field[0].r#type(), ProtoType::Message);
        assert_eq!(proto.field[1].type_name(), ".pkg.Inner");
        assert_eq!(proto.field[1].r#type(), ProtoType::Group);
        assert_eq!(proto.field[2].type_name(), ".pkg.Mode");
        assert_eq!(proto.field[2].r#type(), ProtoType::Enum);
    }

    #[test]
    fn test_extension_emits_qualified_extendee() {
        let mut pool = SchemaPool::new();
        let target = pool.add_message(MessageNode {
            name: "Target".into(),
            full_name: "pkg.Target".into(),
            extension_ranges: vec![ExtensionRange {
                start: 100,
                end: 200,
                options: None,
            }],
            ..Default::default()
        });
        let mut ext = FieldNode::new("tag", 100, Label::Optional, FieldKind::String);
        ext.extendee = Some(target);
        let file = pool.add_file(FileNode {
            name: "ext.proto".into(),
            package: "pkg".into(),
            messages: vec![target],
            extensions: vec![ext],
            ..Default::default()
        });

        let arena = MeteredArena::new();
        let proto = pool.file(file).to_proto(&arena).unwrap();

        assert_eq!(proto.extension[0].name(), "tag");
        assert_eq!(proto.extension[0].extendee(), ".pkg.Target");
        let range = &proto.message_type[0].extension_range[0];
        assert_eq!((range.start(), range.end()), (100, 200));
    }

    #[test]
    fn test_extension_range_options_are_copied() {
        let range_options = ExtensionRangeOptions {
            uninterpreted_option: vec![UninterpretedOption {
                name: vec![NamePart {
                    name_part: "my.range_marker".into(),
                    is_extension: true,
                }],
                identifier_value: Some("tagged".into()),
                ..Default::default()
            }],
        };
        let mut pool = SchemaPool::new();
        let m = pool.add_message(MessageNode {
            name: "Open".into(),
            full_name: "Open".into(),
            extension_ranges: vec![ExtensionRange {
                start: 10,
                end: 20,
                options: Some(range_options.clone()),
            }],
            ..Default::default()
        });

        let arena = MeteredArena::new();
        let proto = pool.message(m).to_proto(&arena).unwrap();

        let range = &proto.extension_range[0];
        assert_eq!((range.start(), range.end()), (10, 20));
        assert_eq!(range.options.as_ref().unwrap(), &range_options);
    }

    #[test]
    fn test_explicit_json_name_is_emitted_verbatim() {
        let mut pool = SchemaPool::new();
        let m = pool.add_message(Default::default());
        let mut field = FieldNode::new("user_id", 1, Label::Optional, FieldKind::String);
        field.json_name = Some("userId".into());
        pool.message_mut(m).fields.push(field);

        let arena = MeteredArena::new();
        let proto = pool.message(m).fields().next().unwrap().to_proto(&arena).unwrap();
        assert_eq!(proto.json_name(), "userId");
    }

    #[test]
    fn test_oneof_index_and_proto3_optional() {
        let mut pool = SchemaPool::new();
        let m = pool.add_message(MessageNode {
            name: "Choice".into(),
            full_name: "Choice".into(),
            oneofs: vec![
                OneofNode {
                    name: "kind".into(),
                    options: None,
                },
                OneofNode {
                    name: "_maybe".into(),
                    options: None,
                },
            ],
            ..Default::default()
        });
        let mut member = FieldNode::new("left", 1, Label::Optional, FieldKind::Int32);
        member.oneof_index = Some(0);
        let mut synthetic = FieldNode::new("maybe", 2, Label::Optional, FieldKind::Int32);
        synthetic.oneof_index = Some(1);
        synthetic.proto3_optional = true;
        pool.message_mut(m).fields.extend([member, synthetic]);

        let arena = MeteredArena::new();
        let proto = pool.message(m).to_proto(&arena).unwrap();

        assert_eq!(proto.oneof_decl.len(), 2);
        assert_eq!(proto.oneof_decl[0].name(), "kind");
        assert_eq!(proto.field[0].oneof_index(), 0);
        assert!(proto.field[0].proto3_optional.is_none());
        assert_eq!(proto.field[1].oneof_index(), 1);
        assert_eq!(proto.field[1].proto3_optional, Some(true));
    }

    #[test]
    fn test_enum_conversion_emits_all_categories() {
        let mut pool = SchemaPool::new();
        let e = pool.add_enum(EnumNode {
            name: "Status".into(),
            full_name: "Status".into(),
            values: vec![
                EnumValueNode::new("STATUS_UNKNOWN", 0),
                EnumValueNode::new("STATUS_OK", 1),
            ],
            reserved_ranges: vec![ReservedRange { start: 5, end: 9 }],
            reserved_names: vec!["STATUS_OLD".into()],
            ..Default::default()
        });

        let arena = MeteredArena::new();
        let proto = pool.enum_type(e).to_proto(&arena).unwrap();

        assert_eq!(proto.name(), "Status");
        let names: Vec<_> = proto.value.iter().map(|v| v.name()).collect();
        assert_eq!(names, ["STATUS_UNKNOWN", "STATUS_OK"]);
        assert_eq!(proto.reserved_range[0].start(), 5);
        assert_eq!(proto.reserved_range[0].end(), 9);
        assert_eq!(proto.reserved_name, ["STATUS_OLD"]);
    }

    #[test]
    fn test_method_streaming_flags_only_when_true() {
        let mut pool = SchemaPool::new();
        let msg = pool.add_message(MessageNode {
            name: "Frame".into(),
            full_name: "rpc.Frame".into(),
            ..Default::default()
        });
        let svc = pool.add_service(ServiceNode {
            name: "Transfer".into(),
            methods: vec![
                MethodNode::new("Unary", msg, msg),
                MethodNode {
                    client_streaming: true,
                    server_streaming: true,
                    ..MethodNode::new("Pipe", msg, msg)
                },
            ],
            options: None,
        });

        let arena = MeteredArena::new();
        let proto = pool.service(svc).to_proto(&arena).unwrap();

        assert_eq!(proto.name(), "Transfer");
        let unary = &proto.method[0];
        assert_eq!(unary.input_type(), ".rpc.Frame");
        assert_eq!(unary.output_type(), ".rpc.Frame");
        assert!(unary.client_streaming.is_none());
        assert!(unary.server_streaming.is_none());
        let pipe = &proto.method[1];
        assert_eq!(pipe.client_streaming, Some(true));
        assert_eq!(pipe.server_streaming, Some(true));
    }

    #[test]
    fn test_syntax_token_emission() {
        let mut pool = SchemaPool::new();
        let proto2 = pool.add_file(FileNode {
            name: "two.proto".into(),
            ..Default::default()
        });
        let proto3 = pool.add_file(FileNode {
            name: "three.proto".into(),
            syntax: Syntax::Proto3,
            ..Default::default()
        });
        let editions = pool.add_file(FileNode {
            name: "editions.proto".into(),
            syntax: Syntax::Editions(1000),
            ..Default::default()
        });

        let arena = MeteredArena::new();
        let two = pool.file(proto2).to_proto(&arena).unwrap();
        assert!(two.syntax.is_none());
        assert!(two.package.is_none());

        let three = pool.file(proto3).to_proto(&arena).unwrap();
        assert_eq!(three.syntax(), "proto3");

        let editioned = pool.file(editions).to_proto(&arena).unwrap();
        assert_eq!(editioned.syntax(), "editions");
    }

    #[test]
    fn test_dependency_lists_copied_in_order() {
        let mut pool = SchemaPool::new();
        let base = pool.add_file(FileNode {
            name: "base.proto".into(),
            ..Default::default()
        });
        let extra = pool.add_file(FileNode {
            name: "extra.proto".into(),
            ..Default::default()
        });
        let main = pool.add_file(FileNode {
            name: "main.proto".into(),
            dependencies: vec![base, extra],
            public_dependency: vec![0],
            weak_dependency: vec![1],
            ..Default::default()
        });

        let arena = MeteredArena::new();
        let proto = pool.file(main).to_proto(&arena).unwrap();

        assert_eq!(proto.dependency, ["base.proto", "extra.proto"]);
        assert_eq!(proto.public_dependency, [0]);
        assert_eq!(proto.weak_dependency, [1]);
    }

    #[test]
    fn test_child_order_preserved_within_each_category() {
        let mut pool = SchemaPool::new();
        let nested_b = pool.add_message(MessageNode {
            name: "B".into(),
            full_name: "Outer.B".into(),
            ..Default::default()
        });
        let nested_a = pool.add_message(MessageNode {
            name: "A".into(),
            full_name: "Outer.A".into(),
            ..Default::default()
        });
        let outer = pool.add_message(MessageNode {
            name: "Outer".into(),
            full_name: "Outer".into(),
            nested_messages: vec![nested_b, nested_a],
            ..Default::default()
        });
        for (name, number) in [("z", 9), ("a", 1), ("m", 5)] {
            pool.message_mut(outer)
                .fields
                .push(FieldNode::new(name, number, Label::Optional, FieldKind::Bool));
        }

        let arena = MeteredArena::new();
        let proto = pool.message(outer).to_proto(&arena).unwrap();

        let field_names: Vec<_> = proto.field.iter().map(|f| f.name()).collect();
        assert_eq!(field_names, ["z", "a", "m"]);
        let nested_names: Vec<_> = proto.nested_type.iter().map(|m| m.name()).collect();
        assert_eq!(nested_names, ["B", "A"]);
    }

    #[test]
    fn test_options_are_deep_copied_onto_nodes() {
        let mut pool = SchemaPool::new();
        let m = pool.add_message(MessageNode {
            name: "M".into(),
            full_name: "M".into(),
            options: Some(MessageOptions {
                deprecated: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        });
        let mut field = FieldNode::new("x", 1, Label::Optional, FieldKind::Int32);
        field.options = Some(FieldOptions {
            packed: Some(false),
            ..Default::default()
        });
        pool.message_mut(m).fields.push(field);

        let arena = MeteredArena::new();
        let proto = pool.message(m).to_proto(&arena).unwrap();

        assert_eq!(proto.options.as_ref().unwrap().deprecated, Some(true));
        assert_eq!(proto.field[0].options.as_ref().unwrap().packed, Some(false));
    }

    #[test]
    fn test_bytes_default_escapes_into_text() {
        let mut pool = SchemaPool::new();
        let m = pool.add_message(Default::default());
        let mut field = FieldNode::new("blob", 1, Label::Optional, FieldKind::Bytes);
        field.default = Some(DefaultValue::Bytes(Bytes::from_static(b"\x00A")));
        pool.message_mut(m).fields.push(field);

        let arena = MeteredArena::new();
        let proto = pool.message(m).fields().next().unwrap().to_proto(&arena).unwrap();
        assert_eq!(proto.default_value(), "\\000A");
    }

    #[test]
    fn test_exhausted_arena_yields_absent_result() {
        let mut pool = SchemaPool::new();
        let m = pool.add_message(MessageNode {
            name: "M".into(),
            full_name: "a.b.M".into(),
            ..Default::default()
        });
        pool.message_mut(m)
            .fields
            .push(FieldNode::new("x", 1, Label::Optional, FieldKind::Int32));
        let file = pool.add_file(FileNode {
            name: "a.proto".into(),
            package: "a.b".into(),
            messages: vec![m],
            ..Default::default()
        });

        // Fails on the third allocation, deep inside the walk.
        let arena = FailAfter::new(2);
        assert!(pool.file(file).to_proto(&arena).is_none());

        // An unbounded arena converts the same model fine.
        let arena = MeteredArena::new();
        assert!(pool.file(file).to_proto(&arena).is_some());
    }

    #[test]
    fn test_every_allocation_is_gated() {
        let mut pool = SchemaPool::new();
        let m = pool.add_message(MessageNode {
            name: "M".into(),
            full_name: "M".into(),
            ..Default::default()
        });
        let file = pool.add_file(FileNode {
            name: "a.proto".into(),
            messages: vec![m],
            ..Default::default()
        });

        // Count how many grants a full conversion needs, then check that
        // every strictly smaller grant fails.
        let counting = MeteredArena::new();
        pool.file(file).to_proto(&counting).unwrap();
        let total = counting.allocation_count();
        assert!(total > 2);

        for grants in 0..total {
            let arena = FailAfter::new(grants);
            assert!(
                pool.file(file).to_proto(&arena).is_none(),
                "conversion survived with only {grants} of {total} grants"
            );
        }
    }
}

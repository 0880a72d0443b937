//! Value re-encoding: default-value stringification, byte escaping, and the
//! options deep copy.
//!
//! Everything here produces arena-charged owned storage so the output tree
//! is fully independent of the schema model it was converted from.

use bytes::BytesMut;
use prost::Message;

use super::Context;
use crate::error::Result;
use crate::model::{DefaultValue, FieldDef};

/// Renders a field's explicit default value in its canonical textual form.
///
/// Dispatch is closed over the scalar default kinds; message- and
/// group-typed fields cannot carry a [`DefaultValue`] by construction. An
/// enum default must name an existing constant of the field's enum type;
/// anything else is a caller contract violation and panics.
pub(super) fn format_default(
    ctx: &Context<'_>,
    field: FieldDef<'_>,
    value: &DefaultValue,
) -> Result<String> {
    match value {
        DefaultValue::Bool(v) => ctx.dup(if *v { "true" } else { "false" }),
        DefaultValue::Enum(number) => {
            let enum_type = field
                .sub_enum()
                .expect("enum default declared on a non-enum field");
            let constant = enum_type
                .find_value_by_number(*number)
                .expect("enum default does not name an existing constant");
            ctx.dup(constant.name())
        }
        DefaultValue::Int32(v) => ctx.owned(v.to_string()),
        DefaultValue::Int64(v) => ctx.owned(v.to_string()),
        DefaultValue::Uint32(v) => ctx.owned(v.to_string()),
        DefaultValue::Uint64(v) => ctx.owned(v.to_string()),
        DefaultValue::Float(v) => float_text(ctx, f64::from(*v), 9),
        DefaultValue::Double(v) => float_text(ctx, *v, 17),
        DefaultValue::String(v) => ctx.dup(v),
        DefaultValue::Bytes(v) => escape_bytes(ctx, v),
    }
}

/// Renders a floating-point default with the given number of significant
/// digits. The special values are checked before the generic formatter.
fn float_text(ctx: &Context<'_>, value: f64, digits: usize) -> Result<String> {
    if value == f64::INFINITY {
        return ctx.dup("inf");
    }
    if value == f64::NEG_INFINITY {
        return ctx.dup("-inf");
    }
    // NaN is the only value that compares unequal to itself.
    #[allow(clippy::eq_op)]
    if value != value {
        return ctx.dup("nan");
    }
    ctx.owned(format_sig(value, digits))
}

/// Formats `value` with at most `digits` significant decimal digits, in the
/// manner of printf's `%g`: fixed notation for moderate exponents,
/// `e±DD` scientific notation otherwise, trailing zeros trimmed.
fn format_sig(value: f64, digits: usize) -> String {
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = sci
        .split_once('e')
        .expect("scientific formatting always yields an exponent");
    let exponent: i32 = exponent
        .parse()
        .expect("scientific formatting always yields a decimal exponent");

    if exponent < -4 || exponent >= digits as i32 {
        let mantissa = trim_fraction(mantissa);
        if exponent < 0 {
            format!("{mantissa}e-{:02}", -exponent)
        } else {
            format!("{mantissa}e+{exponent:02}")
        }
    } else {
        // Re-render in fixed notation with exactly the digits that remain
        // after the integer part, then drop the trailing zeros.
        let precision = (digits as i32 - 1 - exponent).max(0) as usize;
        let fixed = format!("{value:.precision$}");
        trim_fraction(&fixed).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Two-character escapes shared with the C string escaping convention.
fn special_escape(byte: u8) -> Option<u8> {
    match byte {
        b'\n' => Some(b'n'),
        b'\r' => Some(b'r'),
        b'\t' => Some(b't'),
        b'\\' => Some(b'\\'),
        b'\'' => Some(b'\''),
        b'"' => Some(b'"'),
        _ => None,
    }
}

fn is_print(byte: u8) -> bool {
    (0x20..=0x7f).contains(&byte)
}

/// Escapes a raw byte string into its canonical textual form: special
/// two-character escapes, printable ASCII verbatim, three-digit octal
/// escapes for everything else.
///
/// The exact output length is computed in a first pass so the destination
/// is charged and reserved once, then a second pass writes the bytes.
pub(super) fn escape_bytes(ctx: &Context<'_>, raw: &[u8]) -> Result<String> {
    let mut len = 0;
    for &byte in raw {
        len += if special_escape(byte).is_some() {
            2
        } else if is_print(byte) {
            1
        } else {
            4
        };
    }
    ctx.alloc(len)?;

    let mut out = String::with_capacity(len);
    for &byte in raw {
        if let Some(escape) = special_escape(byte) {
            out.push('\\');
            out.push(escape as char);
        } else if is_print(byte) {
            out.push(byte as char);
        } else {
            out.push('\\');
            out.push((b'0' + (byte >> 6)) as char);
            out.push((b'0' + ((byte >> 3) & 0x7)) as char);
            out.push((b'0' + (byte & 0x7)) as char);
        }
    }
    Ok(out)
}

/// Deep-copies an options sub-message by round-tripping it through its own
/// binary encoding.
///
/// Options payloads are opaque to the converters: they may carry arbitrarily
/// nested structure that a field-by-field copy would have to know about.
/// Serialize-then-parse reproduces the payload with full structural
/// fidelity, and both halves are charged to the allocation context. The
/// payload is a typed message, so "unknown" structure here means unresolved
/// custom options travelling as `uninterpreted_option` entries, not raw
/// unknown fields.
pub(super) fn copy_options<M>(ctx: &Context<'_>, src: &M) -> Result<M>
where
    M: Message + Default,
{
    let len = src.encoded_len();
    ctx.alloc(len)?;
    let mut buf = BytesMut::with_capacity(len);
    src.encode(&mut buf)
        .expect("encoding into a growable buffer cannot fail");

    ctx.alloc(len)?;
    let copy = M::decode(buf.freeze()).expect("a just-encoded message always re-parses");
    Ok(copy)
}

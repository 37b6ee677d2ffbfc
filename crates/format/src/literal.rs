// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Debug rendering of constant values
//!
//! Scalars render directly. Records render as `Type { field = value }` and
//! sequences as `[a, b]`; both collapse once nested deeper than
//! `max_literal_depth`, and sequences longer than `max_sequence_items` are
//! elided with a count.

use relq_ir::Value;

use crate::writer::TextWriter;

pub(crate) fn write_value(w: &mut TextWriter, value: &Value) {
    write_nested(w, value, 0);
}

fn write_nested(w: &mut TextWriter, value: &Value, depth: usize) {
    match value {
        Value::Null => w.write_str("null"),
        Value::Bool(b) => write!(w, "{}", b),
        Value::Int32(v) => write!(w, "{}", v),
        Value::Int64(v) => write!(w, "{}L", v),
        Value::Float64(v) => write!(w, "{:?}", v),
        Value::String(s) => write!(w, "{:?}", s),
        Value::Bytes(bytes) => {
            w.write_str("0x");
            for b in bytes {
                write!(w, "{:02X}", b);
            }
        }
        Value::Sequence(items) => write_sequence(w, items, depth),
        Value::Record(record) => {
            if depth >= w.options().max_literal_depth {
                w.write_str("{ ... }");
                return;
            }
            if record.fields.is_empty() {
                write!(w, "{} {{}}", record.type_name);
                return;
            }
            write!(w, "{} {{ ", record.type_name);
            for (i, (name, field)) in record.fields.iter().enumerate() {
                if i > 0 {
                    w.write_str(", ");
                }
                write!(w, "{} = ", name);
                write_nested(w, field, depth + 1);
            }
            w.write_str(" }");
        }
    }
}

fn write_sequence(w: &mut TextWriter, items: &[Value], depth: usize) {
    match items {
        [] => w.write_str("[]"),
        [single] => {
            w.write_str("[");
            write_nested(w, single, depth + 1);
            w.write_str("]");
        }
        _ if depth >= w.options().max_literal_depth => w.write_str("[...]"),
        _ => {
            let shown = w.options().max_sequence_items.min(items.len());
            w.write_str("[");
            for (i, item) in items[..shown].iter().enumerate() {
                if i > 0 {
                    w.write_str(", ");
                }
                write_nested(w, item, depth + 1);
            }
            if shown < items.len() {
                write!(w, ", ... +{}", items.len() - shown);
            }
            w.write_str("]");
        }
    }
}

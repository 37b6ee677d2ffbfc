// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Text writer
//!
//! The engine both formatters write through. It owns two pieces of state
//! that must never leak between sibling constructs, and exposes each only
//! through a closure-scoped helper:
//!
//! - the indent level ([`TextWriter::indented`]);
//! - the alias visibility frames ([`TextWriter::scoped`],
//!   [`TextWriter::capture`]).
//!
//! ## Aliases
//!
//! An alias becomes visible when its declaration is written (a table or
//! select in a source position) and stays visible until the frame it was
//! declared in is closed. Referencing an alias that is not visible renders
//! `??A7??`; declaring an alias a second time renders `!!A7!!`. Visible
//! aliases are named `t0`, `t1`, ... in declaration order, or by raw id
//! when [`FormatOptions::show_alias_ids`] is set.

use std::collections::{HashMap, HashSet};
use std::fmt;

use relq_ir::TableAlias;

use crate::options::FormatOptions;

/// Indent- and scope-aware output buffer
#[derive(Debug)]
pub struct TextWriter {
    options: FormatOptions,
    out: String,
    level: usize,
    at_line_start: bool,
    frames: Vec<Vec<TableAlias>>,
    names: HashMap<TableAlias, String>,
    declared: HashSet<TableAlias>,
}

impl TextWriter {
    pub fn new(options: FormatOptions) -> Self {
        Self {
            options,
            out: String::new(),
            level: 0,
            at_line_start: true,
            frames: vec![Vec::new()],
            names: HashMap::new(),
            declared: HashSet::new(),
        }
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    pub fn write_str(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        if self.at_line_start {
            let width = self.level * self.options.indent_width;
            self.out.extend(std::iter::repeat_n(' ', width));
            self.at_line_start = false;
        }
        self.out.push_str(s);
    }

    /// Target of `write!`; writing into a `String` cannot fail
    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>) {
        match args.as_str() {
            Some(s) => self.write_str(s),
            None => self.write_str(&args.to_string()),
        }
    }

    pub fn newline(&mut self) {
        self.out.push('\n');
        self.at_line_start = true;
    }

    /// Run `f` one indent level deeper
    pub fn indented<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.level += 1;
        let result = f(self);
        self.level -= 1;
        result
    }

    pub fn indent_level(&self) -> usize {
        self.level
    }

    /// Run `f` against an empty buffer and return what it wrote
    ///
    /// The buffer starts at the beginning of a line at the current indent;
    /// alias state is shared with the main output. Used to declare a
    /// clause's aliases before the text that references them is written.
    pub fn buffered<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> (R, String) {
        let out = std::mem::take(&mut self.out);
        let at_line_start = std::mem::replace(&mut self.at_line_start, true);
        let result = f(self);
        let text = std::mem::replace(&mut self.out, out);
        self.at_line_start = at_line_start;
        (result, text)
    }

    /// Append text from [`buffered`](Self::buffered); call at a line start
    /// with the indent the text was produced at
    pub fn splice(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.out.push_str(text);
        self.at_line_start = text.ends_with('\n');
    }

    /// Run `f` in a fresh alias frame, closed again afterwards
    pub fn scoped<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.capture(f).0
    }

    /// Like [`scoped`](Self::scoped), also returning the aliases `f` declared
    pub fn capture<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> (R, Vec<TableAlias>) {
        let mark = self.frames.len();
        self.frames.push(Vec::new());
        let result = f(self);
        let frame = self.frames.pop().unwrap_or_default();
        debug_assert_eq!(self.frames.len(), mark);
        (result, frame)
    }

    /// Make already-declared aliases visible in the current frame
    pub fn bring_into_scope(&mut self, aliases: &[TableAlias]) {
        if let Some(frame) = self.frames.last_mut() {
            frame.extend_from_slice(aliases);
        }
    }

    /// Declare `alias` in the current frame and return the text for its
    /// declaration position
    pub fn declare(&mut self, alias: TableAlias) -> String {
        self.bring_into_scope(&[alias]);
        if !self.declared.insert(alias) {
            return format!("!!{}!!", alias);
        }
        let name = if self.options.show_alias_ids {
            alias.to_string()
        } else {
            format!("t{}", self.names.len())
        };
        self.names.insert(alias, name.clone());
        name
    }

    pub fn is_visible(&self, alias: TableAlias) -> bool {
        self.frames.iter().any(|frame| frame.contains(&alias))
    }

    /// Text for a reference to `alias`
    pub fn reference(&self, alias: TableAlias) -> String {
        match self.names.get(&alias) {
            Some(name) if self.is_visible(alias) => name.clone(),
            _ => format!("??{}??", alias),
        }
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_restored_after_scope() {
        let mut w = TextWriter::new(FormatOptions::default());
        w.write_str("a");
        w.indented(|w| {
            w.newline();
            w.write_str("b");
            w.indented(|w| {
                w.newline();
                write!(w, "{}", 'c');
            });
        });
        w.newline();
        w.write_str("d");
        assert_eq!(w.indent_level(), 0);
        assert_eq!(w.finish(), "a\n  b\n    c\nd");
    }

    #[test]
    fn test_blank_lines_have_no_indent() {
        let mut w = TextWriter::new(FormatOptions::default());
        w.indented(|w| {
            w.newline();
            w.newline();
            w.write_str("x");
        });
        assert_eq!(w.finish(), "\n\n  x");
    }

    #[test]
    fn test_alias_naming_and_markers() {
        let mut w = TextWriter::new(FormatOptions::default());
        let a = TableAlias::from_raw(7);
        let b = TableAlias::from_raw(3);
        assert_eq!(w.reference(a), "??A7??");
        assert_eq!(w.declare(a), "t0");
        assert_eq!(w.declare(b), "t1");
        assert_eq!(w.reference(a), "t0");
        assert_eq!(w.declare(a), "!!A7!!");
    }

    #[test]
    fn test_buffered_splice_keeps_indent() {
        let mut w = TextWriter::new(FormatOptions::default());
        w.indented(|w| {
            let (name, from) = w.buffered(|w| {
                w.write_str("FROM x AS ");
                let name = w.declare(TableAlias::from_raw(0));
                w.write_str(&name);
                name
            });
            write!(w, "SELECT {}.a", name);
            w.newline();
            w.splice(&from);
        });
        assert_eq!(w.finish(), "  SELECT t0.a\n  FROM x AS t0");
    }

    #[test]
    fn test_alias_ids_option() {
        let mut w = TextWriter::new(FormatOptions::default().with_alias_ids(true));
        assert_eq!(w.declare(TableAlias::from_raw(4)), "A4");
    }

    #[test]
    fn test_frames_hide_inner_declarations() {
        let mut w = TextWriter::new(FormatOptions::default());
        let inner = TableAlias::from_raw(1);
        let ((), captured) = w.capture(|w| {
            w.declare(inner);
        });
        assert_eq!(captured, vec![inner]);
        assert!(!w.is_visible(inner));
        assert_eq!(w.reference(inner), "??A1??");

        w.scoped(|w| {
            w.bring_into_scope(&captured);
            assert_eq!(w.reference(inner), "t0");
        });
        assert!(!w.is_visible(inner));
    }
}

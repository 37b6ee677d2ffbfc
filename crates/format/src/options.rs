// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use serde::{Deserialize, Serialize};

/// Rendering options shared by both formatters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// Spaces per indent level
    pub indent_width: usize,
    /// Nesting depth after which composite constants collapse to `{ ... }`
    pub max_literal_depth: usize,
    /// Items rendered per sequence constant before eliding the rest
    pub max_sequence_items: usize,
    /// Render aliases by raw id (`A7`) instead of `t0`, `t1`, ...
    pub show_alias_ids: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent_width: 2,
            max_literal_depth: 3,
            max_sequence_items: 16,
            show_alias_ids: false,
        }
    }
}

impl FormatOptions {
    pub fn with_indent_width(mut self, indent_width: usize) -> Self {
        self.indent_width = indent_width;
        self
    }

    pub fn with_max_literal_depth(mut self, depth: usize) -> Self {
        self.max_literal_depth = depth;
        self
    }

    pub fn with_max_sequence_items(mut self, items: usize) -> Self {
        self.max_sequence_items = items;
        self
    }

    pub fn with_alias_ids(mut self, show: bool) -> Self {
        self.show_alias_ids = show;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: FormatOptions = serde_json::from_str(r#"{ "indent_width": 4 }"#).unwrap();
        assert_eq!(options.indent_width, 4);
        assert_eq!(options.max_literal_depth, 3);
        assert_eq!(options.max_sequence_items, 16);
        assert!(!options.show_alias_ids);
    }
}

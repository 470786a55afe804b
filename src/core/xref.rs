// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Cross-reference recording and output.
//!
//! Every symbol gets an ordered list of signed 1-based line numbers:
//! negative entries are definition sites, positive entries are uses.
//! Uses are recorded whenever an expression resolves the symbol, so a
//! directive evaluated on both passes contributes its line twice.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::core::symbol_table::SymbolTable;
use crate::core::text_utils::to_lower;

#[derive(Debug, Default)]
pub struct CrossReference {
    entries: BTreeMap<String, Vec<i32>>,
}

impl CrossReference {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Record a definition site. `lineno` is zero-based.
    pub fn record_def(&mut self, name: &str, lineno: usize) {
        self.entries
            .entry(to_lower(name))
            .or_default()
            .push(-(lineno as i32 + 1));
    }

    /// Record a use site. `lineno` is zero-based.
    pub fn record_use(&mut self, name: &str, lineno: usize) {
        self.entries
            .entry(to_lower(name))
            .or_default()
            .push(lineno as i32 + 1);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Signed line numbers recorded for a symbol, in recording order.
    #[must_use]
    pub fn lines(&self, name: &str) -> Option<&[i32]> {
        self.entries.get(&to_lower(name)).map(Vec::as_slice)
    }

    /// Write the cross-reference file. One line per symbol, sorted by name:
    /// the name padded to 20 columns, the symbol's value as 4 hex digits,
    /// then the recorded line numbers sorted by absolute value with
    /// definition sites prefixed `#`.
    pub fn write_crf_file<W: Write>(&self, mut out: W, symbols: &SymbolTable) -> io::Result<()> {
        writeln!(out, "--- Cross-Reference Listing ---")?;
        writeln!(out)?;
        for (name, lines) in &self.entries {
            let addr = symbols.lookup(name).unwrap_or(0);
            write!(out, "{name:<20}{addr:04X}   ")?;
            let mut sorted = lines.clone();
            sorted.sort_by_key(|line| line.abs());
            for line in sorted {
                if line < 0 {
                    write!(out, "#{} ", -line)?;
                } else {
                    write!(out, "{line} ")?;
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::CrossReference;
    use crate::core::symbol_table::SymbolTable;

    #[test]
    fn records_defs_and_uses_signed() {
        let mut xref = CrossReference::new();
        xref.record_def("loop", 4);
        xref.record_use("loop", 9);
        assert_eq!(xref.lines("LOOP"), Some(&[-5, 10][..]));
    }

    #[test]
    fn crf_file_sorts_by_absolute_line() {
        let mut xref = CrossReference::new();
        xref.record_use("start", 9);
        xref.record_def("start", 1);
        let mut symbols = SymbolTable::new();
        let _ = symbols.add("start", 0x0100);

        let mut out = Vec::new();
        xref.write_crf_file(&mut out, &symbols).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("--- Cross-Reference Listing ---"));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("start               0100   #2 10 "));
    }
}

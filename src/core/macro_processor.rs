// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Macro table and M80-style textual expansion helpers.

use std::collections::{BTreeMap, HashMap};

use crate::core::error::{AsmError, AsmErrorKind, Diagnostic};
use crate::core::text_utils::{rest_after_words, split_args, to_lower};

/// Expansion depth guard for macros invoking macros.
pub const MAX_EXPANSION_DEPTH: usize = 64;

/// A user-defined macro: lowercase name, ordered parameter names, and the
/// verbatim body lines between the header and `ENDM`/`MEND`.
#[derive(Debug, Clone)]
pub struct Macro {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<String>,
}

/// All macros discovered by the definition pre-pass.
///
/// The scan runs once, before either assembly pass, because a macro may be
/// defined after its first textual use.
#[derive(Debug, Default)]
pub struct MacroTable {
    macros: HashMap<String, Macro>,
}

impl MacroTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            macros: HashMap::new(),
        }
    }

    /// Walk the whole source and collect every macro definition.
    ///
    /// A line is a header iff its second word, lowercased, is `macro`; the
    /// first word names the macro and the rest of the line lists its
    /// parameters. `endm` or `mend` as the first word closes the body.
    pub fn scan(lines: &[String]) -> Result<Self, Diagnostic> {
        let mut table = Self::new();
        let mut current: Option<Macro> = None;

        for (lineno, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            let mut words = trimmed.split_whitespace();
            let first = to_lower(words.next().unwrap_or(""));
            let second = to_lower(words.next().unwrap_or(""));

            if second == "macro" {
                if current.is_some() {
                    return Err(Diagnostic::new(
                        lineno,
                        AsmError::new(
                            AsmErrorKind::Macro,
                            "nested macro definitions are not supported",
                            None,
                        ),
                    ));
                }
                current = Some(Macro {
                    name: first,
                    params: split_args(rest_after_words(trimmed, 2), ','),
                    body: Vec::new(),
                });
            } else if first == "endm" || first == "mend" {
                let Some(def) = current.take() else {
                    return Err(Diagnostic::new(
                        lineno,
                        AsmError::new(AsmErrorKind::Macro, "ENDM without MACRO", None),
                    ));
                };
                table.macros.insert(def.name.clone(), def);
            } else if let Some(def) = current.as_mut() {
                def.body.push(line.clone());
            }
        }

        if current.is_some() {
            return Err(Diagnostic::new(
                lines.len(),
                AsmError::new(
                    AsmErrorKind::Macro,
                    "MACRO definition not closed with ENDM",
                    None,
                ),
            ));
        }
        Ok(table)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(&to_lower(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(&to_lower(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

/// Collect the `LOCAL` declarations of a macro body and map each name to
/// its unique rewritten form `name_<counter>`. Sorted so substitution
/// order is deterministic.
#[must_use]
pub fn collect_local_labels(body: &[String], counter: u32) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for line in body {
        let trimmed = line.trim();
        let mut words = trimmed.split_whitespace();
        if to_lower(words.next().unwrap_or("")) != "local" {
            continue;
        }
        for name in split_args(rest_after_words(trimmed, 1), ',') {
            if !name.is_empty() {
                map.insert(name.clone(), format!("{name}_{counter}"));
            }
        }
    }
    map
}

/// Replace every occurrence of `needle`, advancing past each replacement so
/// newly inserted text is never re-matched. Plain textual substitution;
/// hygiene beyond local-label renaming is intentionally not attempted.
#[must_use]
pub fn substitute(line: &str, needle: &str, replacement: &str) -> String {
    if needle.is_empty() {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(pos) = rest.find(needle) {
        out.push_str(&rest[..pos]);
        out.push_str(replacement);
        rest = &rest[pos + needle.len()..];
    }
    out.push_str(rest);
    out
}

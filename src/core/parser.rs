// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Source line parsing.
//!
//! A line is split into `label`, `mnemonic`, `operand1`, `operand2` and
//! `comment`. The grammar is the classic M80 one: `;` starts a comment,
//! labels end with `:` (except for `EQU`, which may omit it), and operands
//! are split at the first comma outside quotes and `<...>` byte lists.

use crate::core::text_utils::to_lower;

/// One parsed source line. Fields are empty strings when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLine {
    pub label: String,
    pub mnemonic: String,
    pub operand1: String,
    pub operand2: String,
    pub comment: String,
}

/// Parse a raw source line.
///
/// `label` and `mnemonic` come back lowercased; operands keep their case.
pub fn parse_line(raw: &str) -> ParsedLine {
    let mut parsed = ParsedLine::default();
    let mut line = raw.replace('\t', " ");

    if let Some(pos) = line.find(';') {
        parsed.comment = line[pos + 1..].trim().to_string();
        line.truncate(pos);
    }
    let mut line = line.trim().to_string();
    if line.is_empty() {
        return parsed;
    }

    // EQU may appear without a label colon: "NAME EQU expr".
    let lowered = to_lower(&line);
    if let Some(pos) = lowered.find(" equ ") {
        parsed.label = to_lower(line[..pos].trim());
        parsed.mnemonic = "equ".to_string();
        parsed.operand1 = line[pos + 5..].trim().to_string();
        return parsed;
    }

    if let Some(pos) = line.find(':') {
        parsed.label = to_lower(line[..pos].trim());
        line = line[pos + 1..].trim().to_string();
    }

    let mut words = line.splitn(2, char::is_whitespace);
    parsed.mnemonic = to_lower(words.next().unwrap_or(""));
    let operands = words.next().unwrap_or("").trim();

    // Split operands at the first comma outside quotes and <...>.
    let mut in_quotes = false;
    let mut bracket_level = 0i32;
    let mut split_pos = None;
    for (idx, c) in operands.char_indices() {
        match c {
            '\'' | '"' => in_quotes = !in_quotes,
            '<' => bracket_level += 1,
            '>' => bracket_level -= 1,
            ',' if !in_quotes && bracket_level == 0 => {
                split_pos = Some(idx);
                break;
            }
            _ => {}
        }
    }
    match split_pos {
        Some(idx) => {
            parsed.operand1 = operands[..idx].trim().to_string();
            parsed.operand2 = operands[idx + 1..].trim().to_string();
        }
        None => parsed.operand1 = operands.to_string(),
    }

    parsed
}

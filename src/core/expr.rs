// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Recursive-descent expression evaluation.
//!
//! The grammar has two precedence levels, left-associative within a level:
//!
//! ```text
//! expr   := term (('+' | '-' | 'or' | 'xor') term)*
//! term   := factor (('*' | '/' | 'and') factor)*
//! factor := '(' expr ')' | 'low' ident | 'high' ident | atom
//! atom   := number | char_const | '$' | ident
//! ```
//!
//! A `-` fuses into a numeric literal only where a factor is expected, so
//! `3-5` subtracts while `-5` alone is a negative literal. Tokens past the
//! end of a recognized expression are ignored.

use crate::core::error::{AsmError, AsmErrorKind};
use crate::core::symbol_table::SymbolTable;
use crate::core::text_utils::{is_ident_char, is_ident_start, Cursor};
use crate::core::xref::CrossReference;

/// Parse a numeric literal with an M80 radix suffix: `H` hex, `Q` octal,
/// `B` binary, default decimal. A leading `-` forces decimal. Returns
/// `None` for anything that does not parse exactly, including hex digits
/// under a `B` suffix.
#[must_use]
pub fn parse_radix_number(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.starts_with('-') {
        return text.parse::<i64>().ok();
    }
    let (digits, radix) = match text.as_bytes()[text.len() - 1].to_ascii_lowercase() {
        b'h' => (&text[..text.len() - 1], 16),
        b'q' => (&text[..text.len() - 1], 8),
        b'b' => (&text[..text.len() - 1], 2),
        _ => (text, 10),
    };
    i64::from_str_radix(digits, radix).ok()
}

/// Expression evaluator over the shared assembler state.
///
/// Symbol resolution records a use in the cross-reference. During pass 1 an
/// undefined symbol silently evaluates to 0 (forward references); pass 2 is
/// strict. `strict` forces pass-1 lookups to fail too (used by `EQU`).
pub struct ExprEval<'a> {
    symbols: &'a SymbolTable,
    xref: &'a mut CrossReference,
    address: u16,
    pass: u8,
    lineno: usize,
    strict: bool,
}

impl<'a> ExprEval<'a> {
    pub fn new(
        symbols: &'a SymbolTable,
        xref: &'a mut CrossReference,
        address: u16,
        pass: u8,
        lineno: usize,
    ) -> Self {
        Self {
            symbols,
            xref,
            address,
            pass,
            lineno,
            strict: false,
        }
    }

    /// Make undefined symbols fatal regardless of pass.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Evaluate a full expression string.
    pub fn evaluate(&mut self, expr: &str) -> Result<i64, AsmError> {
        let mut cursor = Cursor::new(expr);
        self.parse_expr(&mut cursor)
    }

    /// Evaluate an `IF` condition: either a relational between two
    /// sub-expressions or a bare expression tested against zero.
    ///
    /// Relational operators are probed in priority order (`NE`/`!=`,
    /// `EQ`/`=`, `GE`/`>=`, `LE`/`<=`, `GT`/`>`, `LT`/`<`), word form
    /// before symbol form, leftmost occurrence first. Word forms match only
    /// at identifier boundaries.
    pub fn evaluate_conditional(&mut self, expr: &str) -> Result<bool, AsmError> {
        const OPS: [(&str, &str); 6] = [
            ("ne", "!="),
            ("eq", "="),
            ("ge", ">="),
            ("le", "<="),
            ("gt", ">"),
            ("lt", "<"),
        ];

        let lowered = expr.to_ascii_lowercase();
        for (word, symbol) in OPS {
            let found = find_word(&lowered, word)
                .map(|pos| (pos, word.len()))
                .or_else(|| lowered.find(symbol).map(|pos| (pos, symbol.len())));
            let Some((pos, len)) = found else { continue };

            let lhs = self.evaluate(&expr[..pos])?;
            let rhs = self.evaluate(&expr[pos + len..])?;
            return Ok(match word {
                "ne" => lhs != rhs,
                "eq" => lhs == rhs,
                "ge" => lhs >= rhs,
                "le" => lhs <= rhs,
                "gt" => lhs > rhs,
                _ => lhs < rhs,
            });
        }

        Ok(self.evaluate(expr)? != 0)
    }

    fn parse_expr(&mut self, cursor: &mut Cursor<'_>) -> Result<i64, AsmError> {
        let mut result = self.parse_term(cursor)?;
        loop {
            let mark = cursor.pos();
            match operator_token(cursor).as_str() {
                "+" => result = result.wrapping_add(self.parse_term(cursor)?),
                "-" => result = result.wrapping_sub(self.parse_term(cursor)?),
                "or" => result |= self.parse_term(cursor)?,
                "xor" => result ^= self.parse_term(cursor)?,
                _ => {
                    cursor.set_pos(mark);
                    break;
                }
            }
        }
        Ok(result)
    }

    fn parse_term(&mut self, cursor: &mut Cursor<'_>) -> Result<i64, AsmError> {
        let mut result = self.parse_factor(cursor)?;
        loop {
            let mark = cursor.pos();
            match operator_token(cursor).as_str() {
                "*" => result = result.wrapping_mul(self.parse_factor(cursor)?),
                "/" => {
                    let rhs = self.parse_factor(cursor)?;
                    if rhs == 0 {
                        return Err(AsmError::new(
                            AsmErrorKind::Expression,
                            "division by zero in expression",
                            None,
                        ));
                    }
                    result /= rhs;
                }
                "and" => result &= self.parse_factor(cursor)?,
                _ => {
                    cursor.set_pos(mark);
                    break;
                }
            }
        }
        Ok(result)
    }

    fn parse_factor(&mut self, cursor: &mut Cursor<'_>) -> Result<i64, AsmError> {
        let token = term_token(cursor);
        if token == "(" {
            let result = self.parse_expr(cursor)?;
            if term_token(cursor) != ")" {
                return Err(AsmError::new(
                    AsmErrorKind::Expression,
                    "mismatched parentheses in expression",
                    None,
                ));
            }
            return Ok(result);
        }
        match token.to_ascii_lowercase().as_str() {
            "low" => {
                let ident = term_token(cursor);
                self.lookup_masked(&ident, "LOW", |val| val & 0xff)
            }
            "high" => {
                let ident = term_token(cursor);
                self.lookup_masked(&ident, "HIGH", |val| (val >> 8) & 0xff)
            }
            _ => self.single_term(&token),
        }
    }

    fn lookup_masked(
        &mut self,
        ident: &str,
        op_name: &str,
        mask: fn(i64) -> i64,
    ) -> Result<i64, AsmError> {
        let name = ident.trim().to_ascii_lowercase();
        if let Some(val) = self.symbols.lookup(&name) {
            return Ok(mask(val as i64));
        }
        if self.pass == 2 || self.strict {
            return Err(AsmError::new(
                AsmErrorKind::Expression,
                &format!("undefined label in {op_name} operator"),
                Some(&name),
            ));
        }
        Ok(0)
    }

    fn single_term(&mut self, token: &str) -> Result<i64, AsmError> {
        let term = token.trim();
        if term.is_empty() {
            return Ok(0);
        }
        let bytes = term.as_bytes();
        if bytes.len() == 3 && bytes[0] == b'\'' && bytes[2] == b'\'' {
            return Ok(bytes[1] as i64);
        }
        let term = term.to_ascii_lowercase();
        if term == "$" {
            return Ok(self.address as i64);
        }
        let bytes = term.as_bytes();
        if bytes[0].is_ascii_digit() || (term.len() > 1 && bytes[0] == b'-') {
            return parse_radix_number(&term).ok_or_else(|| {
                AsmError::new(AsmErrorKind::Expression, "invalid number format", Some(&term))
            });
        }
        if let Some(val) = self.symbols.lookup(&term) {
            self.xref.record_use(&term, self.lineno);
            return Ok(val as i64);
        }
        if self.pass == 2 || self.strict {
            return Err(AsmError::new(
                AsmErrorKind::Expression,
                "undefined label in expression",
                Some(&term),
            ));
        }
        Ok(0)
    }
}

/// Read a token where a factor is expected: an identifier, a numeric
/// literal (a `-` immediately followed by a digit starts one), a quoted
/// character constant, or a single symbol character. Empty at end of input.
fn term_token(cursor: &mut Cursor<'_>) -> String {
    cursor.skip_ws();
    let Some(first) = cursor.peek() else {
        return String::new();
    };
    if is_ident_start(first) {
        return cursor.take_ident().unwrap_or_default();
    }
    let mut token = String::new();
    if first == b'\'' {
        token.push(cursor.next().unwrap_or(b'\'') as char);
        while let Some(c) = cursor.next() {
            token.push(c as char);
            if c == b'\'' {
                break;
            }
        }
        return token;
    }
    let starts_number =
        first.is_ascii_digit() || (first == b'-' && cursor.peek_next().is_some_and(|c| c.is_ascii_digit()));
    if starts_number {
        token.push(cursor.next().unwrap_or(b'0') as char);
        while cursor.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
            token.push(cursor.next().unwrap_or(b'0') as char);
        }
    } else if let Some(c) = cursor.next() {
        token.push(c as char);
    }
    token
}

/// Read a token where an operator is expected: an alphabetic word (`and`,
/// `or`, `xor`) or a single symbol character. No negative-literal fusion
/// here, so `3-5` reads as `3`, `-`, `5`.
fn operator_token(cursor: &mut Cursor<'_>) -> String {
    cursor.skip_ws();
    let Some(first) = cursor.peek() else {
        return String::new();
    };
    if first.is_ascii_alphabetic() {
        return cursor.take_ident().unwrap_or_default().to_ascii_lowercase();
    }
    let mut token = String::new();
    if let Some(c) = cursor.next() {
        token.push(c as char);
    }
    token
}

/// Find `needle` in `haystack` at an identifier boundary.
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut start = 0;
    while let Some(rel) = haystack[start..].find(needle) {
        let pos = start + rel;
        let end = pos + needle.len();
        let left_ok = pos == 0 || !is_ident_char(bytes[pos - 1]);
        let right_ok = end == bytes.len() || !is_ident_char(bytes[end]);
        if left_ok && right_ok {
            return Some(pos);
        }
        start = pos + 1;
    }
    None
}

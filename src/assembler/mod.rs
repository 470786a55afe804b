// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Two-pass M80-compatible assembler - main entry point.
//!
//! `assemble` runs the macro pre-pass, then pass 1 (symbol table, address
//! bookkeeping) and pass 2 (byte emission, listing) over the same line
//! processor. All shared state lives in [`Assembler`]; instruction handlers
//! receive it by exclusive access.

pub mod cli;

use std::fs::{self, File};
use std::io::{BufWriter, Write};

use clap::Parser;

use crate::core::conditional::IfStack;
use crate::core::error::{AsmError, AsmErrorKind, AsmRunError, Diagnostic};
use crate::core::expr::ExprEval;
use crate::core::listing::ListingSink;
use crate::core::macro_processor::{
    collect_local_labels, substitute, MacroTable, MAX_EXPANSION_DEPTH,
};
use crate::core::parser::{parse_line, ParsedLine};
use crate::core::symbol_table::{SymbolTable, SymbolTableResult};
use crate::core::text_utils::{first_word, rest_after_words, split_args, to_lower};
use crate::core::xref::CrossReference;
use crate::i8080;

use cli::{input_base, normalize_args, Cli};

pub use cli::VERSION;

/// Immediate operand width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateWidth {
    Byte,
    Word,
}

/// Shared assembler state threaded through both passes.
pub struct Assembler {
    pub(crate) lineno: usize,
    pub(crate) address: u16,
    pub(crate) pass: u8,
    pub(crate) assembly_finished: bool,
    pub(crate) macro_expansion_counter: u32,
    pub(crate) output: Vec<u8>,
    pub(crate) origin_set: bool,
    pub(crate) symbols: SymbolTable,
    pub(crate) macros: MacroTable,
    pub(crate) if_stack: IfStack,
    pub(crate) xref: CrossReference,
    pub(crate) line: ParsedLine,
    listing: Option<ListingSink>,
    octal_listing: bool,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lineno: 0,
            address: 0,
            pass: 1,
            assembly_finished: false,
            macro_expansion_counter: 0,
            output: Vec::new(),
            origin_set: false,
            symbols: SymbolTable::new(),
            macros: MacroTable::new(),
            if_stack: IfStack::new(),
            xref: CrossReference::new(),
            line: ParsedLine::default(),
            listing: None,
            octal_listing: false,
        }
    }

    /// Install a pass-2 listing sink.
    pub fn set_listing_sink(&mut self, out: Box<dyn Write>) {
        self.listing = Some(ListingSink::new(out, self.octal_listing));
    }

    /// Switch the listing to octal address/byte formatting.
    pub fn set_octal_listing(&mut self, enabled: bool) {
        self.octal_listing = enabled;
        if let Some(sink) = &mut self.listing {
            sink.set_octal(enabled);
        }
    }

    /// Emitted bytes, valid after a successful `assemble`.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    #[must_use]
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    #[must_use]
    pub fn cross_reference(&self) -> &CrossReference {
        &self.xref
    }

    /// Assemble the source: macro pre-pass, pass 1, pass 2.
    ///
    /// The pre-pass runs over the whole source because macros may be
    /// defined after their first textual use. Between passes the location
    /// counter, output buffer, expansion counter and END flag are reset
    /// while the symbol and macro tables carry over.
    pub fn assemble(&mut self, lines: &[String]) -> Result<(), Diagnostic> {
        self.reset_state();
        self.macros = MacroTable::scan(lines)?;

        self.pass = 1;
        self.do_pass(lines)?;

        self.pass = 2;
        self.address = 0;
        self.output.clear();
        self.origin_set = false;
        self.assembly_finished = false;
        self.macro_expansion_counter = 0;
        self.do_pass(lines)?;

        if let Some(sink) = &mut self.listing {
            sink.flush()
                .map_err(|err| io_diagnostic(self.lineno, &err))?;
        }
        Ok(())
    }

    fn reset_state(&mut self) {
        self.lineno = 0;
        self.address = 0;
        self.pass = 1;
        self.assembly_finished = false;
        self.macro_expansion_counter = 0;
        self.output.clear();
        self.origin_set = false;
        self.symbols.clear();
        self.macros = MacroTable::new();
        self.xref.clear();
        self.line = ParsedLine::default();
    }

    /// One full traversal of the source. Macro definition blocks are
    /// skipped here (the pre-pass already owns them); everything else goes
    /// through the expansion-aware line processor. In pass 2 each processed
    /// line is mirrored to the listing sink with the bytes it produced.
    fn do_pass(&mut self, lines: &[String]) -> Result<(), Diagnostic> {
        let mut in_macro_def = false;
        self.if_stack.clear();

        for (lineno, current) in lines.iter().enumerate() {
            if self.assembly_finished {
                break;
            }
            self.lineno = lineno;
            let line_address = self.address;
            let bytes_before = self.output.len();

            let trimmed = current.trim();
            if trimmed.is_empty() {
                if self.pass == 2 {
                    if let Some(sink) = &mut self.listing {
                        sink.write_source_only(current)
                            .map_err(|err| io_diagnostic(lineno, &err))?;
                    }
                }
                continue;
            }

            let mut words = trimmed.split_whitespace();
            let first = words.next().unwrap_or("");
            if to_lower(words.next().unwrap_or("")) == "macro" {
                in_macro_def = true;
            }
            if in_macro_def {
                let lower_first = to_lower(first);
                if lower_first == "endm" || lower_first == "mend" {
                    in_macro_def = false;
                }
                continue;
            }

            self.expand_and_process_line(current, lineno, 0)?;

            if self.pass == 2 {
                if let Some(sink) = &mut self.listing {
                    sink.write_record(line_address, &self.output[bytes_before..], current)
                        .map_err(|err| io_diagnostic(lineno, &err))?;
                }
            }
        }

        if !self.if_stack.is_empty() {
            return Err(Diagnostic::new(
                lines.len(),
                AsmError::new(
                    AsmErrorKind::Conditional,
                    "IF block not closed with ENDIF",
                    None,
                ),
            ));
        }
        Ok(())
    }

    /// The recursive heart of the assembler: conditional directives, macro
    /// expansion, and dispatch of ordinary instructions. Macro bodies are
    /// fed back through here with the invoking line number preserved for
    /// diagnostics.
    fn expand_and_process_line(
        &mut self,
        line: &str,
        original_lineno: usize,
        depth: usize,
    ) -> Result<(), Diagnostic> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(Diagnostic::new(
                original_lineno,
                AsmError::new(
                    AsmErrorKind::Macro,
                    "macro expansion exceeded maximum depth",
                    None,
                ),
            ));
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            return Ok(());
        }
        let lower_first = to_lower(first_word(trimmed).unwrap_or(""));

        if lower_first == "if" {
            let is_active = !self.if_stack.should_skip();
            let condition = rest_after_words(trimmed, 1).to_string();
            let result = is_active && self.evaluate_conditional(&condition, original_lineno)?;
            self.if_stack.push(result);
            return Ok(());
        }
        if lower_first == "endif" {
            if self.if_stack.pop().is_none() {
                return Err(Diagnostic::new(
                    original_lineno,
                    AsmError::new(AsmErrorKind::Conditional, "ENDIF without IF", None),
                ));
            }
            return Ok(());
        }
        if self.if_stack.should_skip() {
            return Ok(());
        }
        // ERROR is accepted and ignored; LOCAL only matters inside a macro
        // body and is consumed at expansion time.
        if lower_first == "error" || lower_first == "local" {
            return Ok(());
        }

        if let Some(def) = self.macros.get(&lower_first).cloned() {
            self.macro_expansion_counter += 1;
            let counter = self.macro_expansion_counter;

            let args = split_args(rest_after_words(trimmed, 1), ',');
            if args.len() != def.params.len() {
                return Err(Diagnostic::new(
                    original_lineno,
                    AsmError::new(
                        AsmErrorKind::Macro,
                        "macro argument count mismatch",
                        Some(&def.name),
                    ),
                ));
            }

            let locals = collect_local_labels(&def.body, counter);
            for body_line in &def.body {
                let mut expanded = body_line.clone();
                for (param, arg) in def.params.iter().zip(&args) {
                    expanded = substitute(&expanded, param, arg);
                }
                for (name, unique) in &locals {
                    expanded = substitute(&expanded, name, unique);
                }
                self.expand_and_process_line(&expanded, original_lineno, depth + 1)?;
            }
            return Ok(());
        }

        self.lineno = original_lineno;
        self.line = parse_line(line);
        self.process_instruction()
    }

    fn process_instruction(&mut self) -> Result<(), Diagnostic> {
        if self.line.mnemonic.is_empty() && self.line.label.is_empty() {
            return Ok(());
        }
        if self.line.mnemonic.is_empty() {
            // Bare label: bind it to the current address.
            return self.pass_action(0, &[], true);
        }
        match i8080::lookup(&self.line.mnemonic) {
            Some(kind) => i8080::handler::process(self, kind),
            None => {
                let mnemonic = self.line.mnemonic.clone();
                Err(self.fail(AsmErrorKind::Instruction, "unknown mnemonic", Some(&mnemonic)))
            }
        }
    }

    /// Per-pass action shared by every handler. Pass 1 binds the line's
    /// label (when present and not gated off) to the current address and
    /// advances the location counter; pass 2 appends the bytes and advances
    /// identically, which is what keeps the two passes address-aligned.
    pub(crate) fn pass_action(
        &mut self,
        size: u16,
        bytes: &[u8],
        should_add_label: bool,
    ) -> Result<(), Diagnostic> {
        if self.pass == 1 {
            if !self.line.label.is_empty() && should_add_label {
                self.add_label()?;
            }
        } else {
            self.output.extend_from_slice(bytes);
        }
        self.address = self.address.wrapping_add(size);
        Ok(())
    }

    fn add_label(&mut self) -> Result<(), Diagnostic> {
        let label = self.line.label.clone();
        if self.symbols.add(&label, self.address) == SymbolTableResult::Duplicate {
            return Err(self.fail(AsmErrorKind::Symbol, "duplicate label", Some(&label)));
        }
        self.xref.record_def(&label, self.lineno);
        Ok(())
    }

    pub(crate) fn check_operands(&self, valid: bool) -> Result<(), Diagnostic> {
        if valid {
            return Ok(());
        }
        Err(self.fail(
            AsmErrorKind::Instruction,
            "invalid operands for mnemonic",
            Some(&self.line.mnemonic),
        ))
    }

    pub(crate) fn fail(&self, kind: AsmErrorKind, msg: &str, param: Option<&str>) -> Diagnostic {
        Diagnostic::new(self.lineno, AsmError::new(kind, msg, param))
    }

    pub(crate) fn evaluate_expression(&mut self, expr: &str) -> Result<i64, Diagnostic> {
        let lineno = self.lineno;
        ExprEval::new(&self.symbols, &mut self.xref, self.address, self.pass, lineno)
            .evaluate(expr)
            .map_err(|err| Diagnostic::new(lineno, err))
    }

    pub(crate) fn evaluate_expression_strict(&mut self, expr: &str) -> Result<i64, Diagnostic> {
        let lineno = self.lineno;
        ExprEval::new(&self.symbols, &mut self.xref, self.address, self.pass, lineno)
            .strict()
            .evaluate(expr)
            .map_err(|err| Diagnostic::new(lineno, err))
    }

    fn evaluate_conditional(&mut self, expr: &str, lineno: usize) -> Result<bool, Diagnostic> {
        ExprEval::new(&self.symbols, &mut self.xref, self.address, self.pass, lineno)
            .evaluate_conditional(expr)
            .map_err(|err| Diagnostic::new(lineno, err))
    }

    /// Emit the immediate operand of the current line (pass 2 only).
    /// MVI/LXI carry it in the second operand slot, everything else in the
    /// first.
    pub(crate) fn immediate_operand(&mut self, width: ImmediateWidth) -> Result<(), Diagnostic> {
        if self.pass != 2 {
            return Ok(());
        }
        let operand = if self.line.mnemonic == "lxi" || self.line.mnemonic == "mvi" {
            self.line.operand2.clone()
        } else {
            self.line.operand1.clone()
        };
        let number = self.evaluate_expression(&operand)?;
        self.output.push((number & 0xff) as u8);
        if width == ImmediateWidth::Word {
            self.output.push(((number >> 8) & 0xff) as u8);
        }
        Ok(())
    }

    /// Emit a 16-bit address operand, low byte first (pass 2 only).
    pub(crate) fn emit_address16(&mut self, operand: &str) -> Result<(), Diagnostic> {
        if self.pass != 2 {
            return Ok(());
        }
        let number = self.evaluate_expression(operand)?;
        self.output.push((number & 0xff) as u8);
        self.output.push(((number >> 8) & 0xff) as u8);
        Ok(())
    }
}

fn io_diagnostic(lineno: usize, err: &std::io::Error) -> Diagnostic {
    Diagnostic::new(
        lineno,
        AsmError::new(AsmErrorKind::Io, "listing write failed", Some(&err.to_string())),
    )
}

/// Run the assembler with command-line arguments.
pub fn run() -> Result<(), AsmRunError> {
    let cli = Cli::parse_from(normalize_args(std::env::args()));
    run_with(&cli)
}

fn run_with(cli: &Cli) -> Result<(), AsmRunError> {
    let in_name = cli.infile.display().to_string();
    let source = fs::read_to_string(&cli.infile)
        .map_err(|_| AsmRunError::io("cannot open input file", &in_name))?;
    let lines: Vec<String> = source.lines().map(str::to_string).collect();

    let base = input_base(&cli.infile);
    let out_name = cli
        .outfile
        .clone()
        .unwrap_or_else(|| format!("{base}.com"));
    let sym_name = format!("{base}.sym");
    let lst_name = format!("{base}.lst");
    let crf_name = format!("{base}.crf");

    let mut assembler = Assembler::new();
    assembler.set_octal_listing(cli.octal);
    if cli.listing {
        let file = File::create(&lst_name)
            .map_err(|_| AsmRunError::io("cannot open listing file", &lst_name))?;
        assembler.set_listing_sink(Box::new(BufWriter::new(file)));
    }

    assembler.assemble(&lines)?;

    fs::write(&out_name, assembler.output())
        .map_err(|_| AsmRunError::io("cannot open output file", &out_name))?;
    println!("{} bytes written to {}", assembler.output().len(), out_name);

    if cli.cref {
        if !assembler.cross_reference().is_empty() {
            let file = File::create(&crf_name)
                .map_err(|_| AsmRunError::io("cannot open cross-reference file", &crf_name))?;
            assembler
                .cross_reference()
                .write_crf_file(BufWriter::new(file), assembler.symbol_table())
                .map_err(|_| AsmRunError::io("cannot write cross-reference file", &crf_name))?;
        }
        println!("Cross-Reference file written to {crf_name}");
    }
    if cli.listing {
        println!("Listing file written to {lst_name}");
    }
    if cli.symbols {
        if !assembler.symbol_table().is_empty() {
            let file = File::create(&sym_name)
                .map_err(|_| AsmRunError::io("cannot open symbol file", &sym_name))?;
            assembler
                .symbol_table()
                .write_sym_file(BufWriter::new(file))
                .map_err(|_| AsmRunError::io("cannot write symbol file", &sym_name))?;
        }
        println!(
            "{} symbols written to {}",
            assembler.symbol_table().len(),
            sym_name
        );
    }

    Ok(())
}

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Operand validation, opcode computation and directive bodies.
//!
//! Every instruction handler follows the same three steps: validate the
//! operand shape, compute the opcode byte(s), then hand size and bytes to
//! [`Assembler::pass_action`]. Immediate and address operands are emitted
//! after `pass_action` has advanced the location counter, so `$` inside an
//! operand denotes the address following the instruction (M80
//! compatibility).

use crate::assembler::{Assembler, ImmediateWidth};
use crate::core::error::{AsmErrorKind, Diagnostic};
use crate::core::expr::parse_radix_number;
use crate::core::symbol_table::SymbolTableResult;
use crate::core::text_utils::split_args;

use super::reg8_code;
use super::table::OpKind;

/// Dispatch a looked-up operation class.
pub fn process(asm: &mut Assembler, kind: OpKind) -> Result<(), Diagnostic> {
    match kind {
        OpKind::Implied(opcode) => implied(asm, opcode),
        OpKind::RegPair(base) => reg_pair(asm, base),
        OpKind::Reg8Dest(base) => reg8_dest(asm, base),
        OpKind::Reg8Src(base) => reg8_src(asm, base),
        OpKind::Move => mov(asm),
        OpKind::MoveImmediate => mvi(asm),
        OpKind::LoadPairImmediate => lxi(asm),
        OpKind::Immediate8(opcode) => immediate8(asm, opcode),
        OpKind::Address16(opcode) => address16(asm, opcode),
        OpKind::Restart => restart(asm),
        OpKind::StoreAccum => accum_pair(asm, 0x02),
        OpKind::LoadAccum => accum_pair(asm, 0x0A),
        OpKind::DefineBytes => define_bytes(asm),
        OpKind::DefineWords => define_words(asm),
        OpKind::DefineStorage => define_storage(asm),
        OpKind::SetOrigin => set_origin(asm),
        OpKind::Equate => equate(asm),
        OpKind::EndOfSource => end_of_source(asm),
        OpKind::Ignored => Ok(()),
    }
}

fn implied(asm: &mut Assembler, opcode: u8) -> Result<(), Diagnostic> {
    asm.check_operands(asm.line.operand1.is_empty() && asm.line.operand2.is_empty())?;
    asm.pass_action(1, &[opcode], true)
}

fn reg_pair(asm: &mut Assembler, base: u8) -> Result<(), Diagnostic> {
    asm.check_operands(!asm.line.operand1.is_empty() && asm.line.operand2.is_empty())?;
    let opcode = base + reg_pair_code(asm)?;
    asm.pass_action(1, &[opcode], true)
}

fn reg8_dest(asm: &mut Assembler, base: u8) -> Result<(), Diagnostic> {
    asm.check_operands(!asm.line.operand1.is_empty() && asm.line.operand2.is_empty())?;
    let opcode = base + (reg8(asm, &asm.line.operand1)? << 3);
    asm.pass_action(1, &[opcode], true)
}

fn reg8_src(asm: &mut Assembler, base: u8) -> Result<(), Diagnostic> {
    asm.check_operands(!asm.line.operand1.is_empty() && asm.line.operand2.is_empty())?;
    let opcode = base + reg8(asm, &asm.line.operand1)?;
    asm.pass_action(1, &[opcode], true)
}

fn mov(asm: &mut Assembler) -> Result<(), Diagnostic> {
    asm.check_operands(!asm.line.operand1.is_empty() && !asm.line.operand2.is_empty())?;
    let opcode = 0x40 + (reg8(asm, &asm.line.operand1)? << 3) + reg8(asm, &asm.line.operand2)?;
    asm.pass_action(1, &[opcode], true)
}

fn mvi(asm: &mut Assembler) -> Result<(), Diagnostic> {
    asm.check_operands(!asm.line.operand1.is_empty() && !asm.line.operand2.is_empty())?;
    let opcode = 0x06 + (reg8(asm, &asm.line.operand1)? << 3);
    asm.pass_action(2, &[opcode], true)?;
    asm.immediate_operand(ImmediateWidth::Byte)
}

fn lxi(asm: &mut Assembler) -> Result<(), Diagnostic> {
    asm.check_operands(!asm.line.operand1.is_empty() && !asm.line.operand2.is_empty())?;
    let opcode = 0x01 + reg_pair_code(asm)?;
    asm.pass_action(3, &[opcode], true)?;
    asm.immediate_operand(ImmediateWidth::Word)
}

fn immediate8(asm: &mut Assembler, opcode: u8) -> Result<(), Diagnostic> {
    asm.check_operands(!asm.line.operand1.is_empty() && asm.line.operand2.is_empty())?;
    asm.pass_action(2, &[opcode], true)?;
    asm.immediate_operand(ImmediateWidth::Byte)
}

fn address16(asm: &mut Assembler, opcode: u8) -> Result<(), Diagnostic> {
    asm.check_operands(!asm.line.operand1.is_empty() && asm.line.operand2.is_empty())?;
    asm.pass_action(3, &[opcode], true)?;
    let operand = asm.line.operand1.clone();
    asm.emit_address16(&operand)
}

fn restart(asm: &mut Assembler) -> Result<(), Diagnostic> {
    asm.check_operands(!asm.line.operand1.is_empty() && asm.line.operand2.is_empty())?;
    let operand = asm.line.operand1.clone();
    let vector = parse_radix_number(&operand)
        .ok_or_else(|| asm.fail(AsmErrorKind::Expression, "invalid number format", Some(&operand)))?;
    if !(0..=7).contains(&vector) {
        return Err(asm.fail(AsmErrorKind::Range, "invalid restart vector", None));
    }
    asm.pass_action(1, &[0xC7 + ((vector as u8) << 3)], true)
}

/// STAX/LDAX: only the BC and DE pairs exist, selected by bit 4.
fn accum_pair(asm: &mut Assembler, base: u8) -> Result<(), Diagnostic> {
    asm.check_operands(!asm.line.operand1.is_empty() && asm.line.operand2.is_empty())?;
    match asm.line.operand1.to_ascii_lowercase().as_str() {
        "b" => asm.pass_action(1, &[base], true),
        "d" => asm.pass_action(1, &[base + 0x10], true),
        _ => {
            let mnemonic = asm.line.mnemonic.clone();
            Err(asm.fail(AsmErrorKind::Range, "only registers B and D are valid for", Some(&mnemonic)))
        }
    }
}

fn reg8(asm: &Assembler, name: &str) -> Result<u8, Diagnostic> {
    reg8_code(name)
        .ok_or_else(|| asm.fail(AsmErrorKind::Range, "invalid 8-bit register", Some(name)))
}

/// Register-pair field for the current line. PSW is only legal with
/// PUSH/POP, where it replaces SP.
fn reg_pair_code(asm: &Assembler) -> Result<u8, Diagnostic> {
    let mnemonic = &asm.line.mnemonic;
    let is_push_pop = mnemonic == "push" || mnemonic == "pop";
    match asm.line.operand1.to_ascii_lowercase().as_str() {
        "b" | "bc" => Ok(0x00),
        "d" | "de" => Ok(0x10),
        "h" | "hl" => Ok(0x20),
        "psw" if is_push_pop => Ok(0x30),
        "psw" => Err(asm.fail(
            AsmErrorKind::Range,
            "PSW cannot be used with instruction",
            Some(mnemonic),
        )),
        "sp" if !is_push_pop => Ok(0x30),
        "sp" => Err(asm.fail(
            AsmErrorKind::Range,
            "SP cannot be used with instruction",
            Some(mnemonic),
        )),
        _ => Err(asm.fail(
            AsmErrorKind::Range,
            "invalid 16-bit register",
            Some(&asm.line.operand1),
        )),
    }
}

fn is_quote_delimited(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
}

/// DB: strings emit one byte per character, `<a,b,...>` lists one byte per
/// inner expression, anything else one byte per expression. A label binds
/// to the address of the first emitted item only.
fn define_bytes(asm: &mut Assembler) -> Result<(), Diagnostic> {
    let mut all = asm.line.operand1.clone();
    if !asm.line.operand2.is_empty() {
        all.push(',');
        all.push_str(&asm.line.operand2);
    }
    asm.check_operands(!all.is_empty())?;

    let has_label = !asm.line.label.is_empty();
    let mut first_emission = true;
    for arg in split_args(&all, ',') {
        if arg.len() > 2 && arg.starts_with('<') && arg.ends_with('>') {
            for byte_expr in split_args(&arg[1..arg.len() - 1], ',') {
                asm.pass_action(1, &[], has_label && first_emission)?;
                if asm.pass == 2 {
                    let val = asm.evaluate_expression(&byte_expr)?;
                    asm.output.push((val & 0xff) as u8);
                }
                first_emission = false;
            }
        } else if is_quote_delimited(&arg) {
            let inner = &arg[1..arg.len() - 1];
            asm.pass_action(inner.len() as u16, &[], has_label && first_emission)?;
            if asm.pass == 2 {
                asm.output.extend_from_slice(inner.as_bytes());
            }
        } else {
            asm.pass_action(1, &[], has_label && first_emission)?;
            if asm.pass == 2 {
                let val = asm.evaluate_expression(&arg)?;
                asm.output.push((val & 0xff) as u8);
            }
        }
        first_emission = false;
    }
    Ok(())
}

/// DW: two bytes per expression, low byte first.
fn define_words(asm: &mut Assembler) -> Result<(), Diagnostic> {
    let mut all = asm.line.operand1.clone();
    if !asm.line.operand2.is_empty() {
        all.push(',');
        all.push_str(&asm.line.operand2);
    }
    asm.check_operands(!all.is_empty())?;

    let has_label = !asm.line.label.is_empty();
    let mut first_emission = true;
    for arg in split_args(&all, ',') {
        asm.pass_action(2, &[], has_label && first_emission)?;
        if asm.pass == 2 {
            asm.emit_address16(&arg)?;
        }
        first_emission = false;
    }
    Ok(())
}

/// DS: advance the location counter, optionally with an explicit fill byte.
fn define_storage(asm: &mut Assembler) -> Result<(), Diagnostic> {
    asm.check_operands(!asm.line.operand1.is_empty())?;
    let size_expr = asm.line.operand1.clone();
    let size = asm.evaluate_expression(&size_expr)?;
    if size < 0 {
        return Err(asm.fail(AsmErrorKind::Range, "DS size cannot be negative", None));
    }
    let fill = if asm.line.operand2.is_empty() {
        0
    } else {
        let fill_expr = asm.line.operand2.clone();
        (asm.evaluate_expression(&fill_expr)? & 0xff) as u8
    };
    if asm.pass == 2 {
        asm.output.extend(std::iter::repeat(fill).take(size as usize));
    }
    asm.pass_action(size as u16, &[], true)
}

/// ORG: move the location counter. The first ORG of a pass-2 run (before
/// any emission) establishes the image origin; every later forward move
/// pads the output with zero bytes.
fn set_origin(asm: &mut Assembler) -> Result<(), Diagnostic> {
    asm.check_operands(
        !asm.line.operand1.is_empty()
            && asm.line.label.is_empty()
            && asm.line.operand2.is_empty(),
    )?;
    let operand = asm.line.operand1.clone();
    let new_address = asm.evaluate_expression(&operand)? as u16;
    if asm.pass == 2 {
        if asm.output.is_empty() && !asm.origin_set {
            asm.origin_set = true;
        } else if new_address > asm.address {
            let gap = (new_address - asm.address) as usize;
            asm.output.extend(std::iter::repeat(0u8).take(gap));
        }
    }
    asm.address = new_address;
    Ok(())
}

/// EQU: define the label from the operand value. Pass 1 only; the operand
/// must be resolvable there.
fn equate(asm: &mut Assembler) -> Result<(), Diagnostic> {
    if asm.line.label.is_empty() {
        return Err(asm.fail(AsmErrorKind::Directive, "missing EQU label", None));
    }
    asm.check_operands(!asm.line.operand1.is_empty() && asm.line.operand2.is_empty())?;
    let operand = asm.line.operand1.clone();
    let value = if asm.pass == 1 {
        asm.evaluate_expression_strict(&operand)?
    } else {
        asm.evaluate_expression(&operand)?
    };
    if asm.pass == 1 {
        let label = asm.line.label.clone();
        if asm.symbols.add(&label, value as u16) == SymbolTableResult::Duplicate {
            return Err(asm.fail(AsmErrorKind::Symbol, "duplicate label", Some(&label)));
        }
    }
    Ok(())
}

fn end_of_source(asm: &mut Assembler) -> Result<(), Diagnostic> {
    asm.check_operands(
        asm.line.label.is_empty()
            && asm.line.operand1.is_empty()
            && asm.line.operand2.is_empty(),
    )?;
    asm.assembly_finished = true;
    Ok(())
}

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Property-based tests using proptest.
//!
//! These verify assembler invariants across generated input spaces,
//! complementing the targeted unit and end-to-end tests.

use asm80::core::expr::ExprEval;
use asm80::core::xref::CrossReference;
use asm80::{parse_radix_number, Assembler, SymbolTable};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

/// Instructions with a statically known size, drawn from a curated pool.
fn sized_instruction() -> impl Strategy<Value = (&'static str, usize)> {
    prop::sample::select(vec![
        ("NOP", 1),
        ("HLT", 1),
        ("RET", 1),
        ("XCHG", 1),
        ("DAA", 1),
        ("RIM", 1),
        ("SIM", 1),
        ("MOV A,B", 1),
        ("MOV M,A", 1),
        ("INR C", 1),
        ("DCR D", 1),
        ("ADD E", 1),
        ("XRA A", 1),
        ("PUSH PSW", 1),
        ("POP H", 1),
        ("DAD SP", 1),
        ("STAX B", 1),
        ("LDAX D", 1),
        ("RST 3", 1),
        ("MVI A, 41H", 2),
        ("MVI M, 0", 2),
        ("ADI 1", 2),
        ("CPI 0FFH", 2),
        ("OUT 10H", 2),
        ("IN 0", 2),
        ("LXI H, 1234H", 3),
        ("LXI SP, 0", 3),
        ("JMP 5", 3),
        ("CALL 100H", 3),
        ("LDA 1234H", 3),
        ("SHLD 2", 3),
        ("DB 1, 2", 2),
        ("DW 1234H", 2),
        ("DS 3", 3),
    ])
}

fn program() -> impl Strategy<Value = Vec<(&'static str, usize)>> {
    prop::collection::vec(sized_instruction(), 0..40)
}

// ── Properties ──────────────────────────────────────────────────────────

proptest! {
    /// Radix round-trip: every u16 reads back identically through all
    /// four literal forms.
    #[test]
    fn radix_round_trip(n in any::<u16>()) {
        let n = n as i64;
        prop_assert_eq!(parse_radix_number(&format!("{n}")), Some(n));
        prop_assert_eq!(parse_radix_number(&format!("{n:X}H")), Some(n));
        prop_assert_eq!(parse_radix_number(&format!("{n:o}Q")), Some(n));
        prop_assert_eq!(parse_radix_number(&format!("{n:b}B")), Some(n));
    }

    /// Operand-size coherence: the emitted byte count equals the sum of
    /// the sizes each instruction declared to pass 1 (with no ORG, this is
    /// also the final location counter).
    #[test]
    fn output_size_matches_declared_sizes(prog in program()) {
        let lines: Vec<String> = prog.iter().map(|(text, _)| text.to_string()).collect();
        let expected: usize = prog.iter().map(|(_, size)| size).sum();
        let mut asm = Assembler::new();
        asm.assemble(&lines).unwrap();
        prop_assert_eq!(asm.output().len(), expected);
    }

    /// Pass determinism: assembling the same program twice, with a fresh
    /// or a reused assembler, yields identical bytes.
    #[test]
    fn assembly_is_deterministic(prog in program()) {
        let lines: Vec<String> = prog.iter().map(|(text, _)| text.to_string()).collect();
        let mut first = Assembler::new();
        first.assemble(&lines).unwrap();
        let mut second = Assembler::new();
        second.assemble(&lines).unwrap();
        prop_assert_eq!(first.output(), second.output());

        second.assemble(&lines).unwrap();
        prop_assert_eq!(first.output(), second.output());
    }

    /// Expression idempotence: evaluation is a pure function of the symbol
    /// table and location counter.
    #[test]
    fn expression_evaluation_is_idempotent(addr in any::<u16>(), k in any::<u16>()) {
        let mut symbols = SymbolTable::new();
        let _ = symbols.add("k", k);
        let mut xref = CrossReference::new();
        let mut eval = ExprEval::new(&symbols, &mut xref, addr, 2, 0);
        let first = eval.evaluate("K * 2 + $ - 1").unwrap();
        let second = eval.evaluate("K * 2 + $ - 1").unwrap();
        prop_assert_eq!(first, second);
    }
}

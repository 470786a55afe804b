// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Static mnemonic table for the 8080/8085 plus the assembler directives.

/// Operation class of a mnemonic: how its operands are validated and how
/// its bytes are produced. Base opcodes carry the family encoding described
/// in the module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// No operands, one opcode byte.
    Implied(u8),
    /// Register pair in bits 4-5, one byte.
    RegPair(u8),
    /// 8-bit destination register in bits 3-5, one byte.
    Reg8Dest(u8),
    /// 8-bit source register in bits 0-2, one byte.
    Reg8Src(u8),
    /// MOV: destination and source registers.
    Move,
    /// MVI: destination register, then one immediate byte.
    MoveImmediate,
    /// LXI: register pair, then a little-endian immediate word.
    LoadPairImmediate,
    /// Opcode byte followed by one immediate byte.
    Immediate8(u8),
    /// Opcode byte followed by a little-endian 16-bit address.
    Address16(u8),
    /// RST n, n in 0..=7.
    Restart,
    /// STAX B / STAX D.
    StoreAccum,
    /// LDAX B / LDAX D.
    LoadAccum,
    /// DB directive.
    DefineBytes,
    /// DW directive.
    DefineWords,
    /// DS directive.
    DefineStorage,
    /// ORG directive.
    SetOrigin,
    /// EQU directive.
    Equate,
    /// END directive.
    EndOfSource,
    /// NAME / TITLE: accepted and ignored.
    Ignored,
}

/// Look up a lowercased mnemonic.
#[must_use]
pub fn lookup(mnemonic: &str) -> Option<OpKind> {
    use OpKind::*;

    Some(match mnemonic {
        // Moves and immediates
        "mov" => Move,
        "mvi" => MoveImmediate,
        "lxi" => LoadPairImmediate,

        // Register-pair operations
        "dad" => RegPair(0x09),
        "inx" => RegPair(0x03),
        "dcx" => RegPair(0x0B),
        "push" => RegPair(0xC5),
        "pop" => RegPair(0xC1),

        // 8-bit register operations
        "inr" => Reg8Dest(0x04),
        "dcr" => Reg8Dest(0x05),
        "add" => Reg8Src(0x80),
        "adc" => Reg8Src(0x88),
        "sub" => Reg8Src(0x90),
        "sbb" => Reg8Src(0x98),
        "ana" => Reg8Src(0xA0),
        "xra" => Reg8Src(0xA8),
        "ora" => Reg8Src(0xB0),
        "cmp" => Reg8Src(0xB8),

        // Accumulator <-> (BC)/(DE)
        "stax" => StoreAccum,
        "ldax" => LoadAccum,

        // Immediate arithmetic and I/O
        "adi" => Immediate8(0xC6),
        "aci" => Immediate8(0xCE),
        "sui" => Immediate8(0xD6),
        "sbi" => Immediate8(0xDE),
        "ani" => Immediate8(0xE6),
        "xri" => Immediate8(0xEE),
        "ori" => Immediate8(0xF6),
        "cpi" => Immediate8(0xFE),
        "out" => Immediate8(0xD3),
        "in" => Immediate8(0xDB),

        // Jumps, calls, loads and stores with a direct address
        "jmp" => Address16(0xC3),
        "jnz" => Address16(0xC2),
        "jz" => Address16(0xCA),
        "jnc" => Address16(0xD2),
        "jc" => Address16(0xDA),
        "jpo" => Address16(0xE2),
        "jpe" => Address16(0xEA),
        "jp" => Address16(0xF2),
        "jm" => Address16(0xFA),
        "cnz" => Address16(0xC4),
        "cz" => Address16(0xCC),
        "cnc" => Address16(0xD4),
        "cc" => Address16(0xDC),
        "cpo" => Address16(0xE4),
        "cpe" => Address16(0xEC),
        "cp" => Address16(0xF4),
        "cm" => Address16(0xFC),
        "call" => Address16(0xCD),
        "lda" => Address16(0x3A),
        "sta" => Address16(0x32),
        "lhld" => Address16(0x2A),
        "shld" => Address16(0x22),

        "rst" => Restart,

        // No-operand opcodes
        "nop" => Implied(0x00),
        "rlc" => Implied(0x07),
        "rrc" => Implied(0x0F),
        "ral" => Implied(0x17),
        "rar" => Implied(0x1F),
        "daa" => Implied(0x27),
        "cma" => Implied(0x2F),
        "stc" => Implied(0x37),
        "cmc" => Implied(0x3F),
        "hlt" => Implied(0x76),
        "rnz" => Implied(0xC0),
        "rz" => Implied(0xC8),
        "ret" => Implied(0xC9),
        "rnc" => Implied(0xD0),
        "rc" => Implied(0xD8),
        "rpo" => Implied(0xE0),
        "xthl" => Implied(0xE3),
        "rpe" => Implied(0xE8),
        "pchl" => Implied(0xE9),
        "rp" => Implied(0xF0),
        "di" => Implied(0xF3),
        "rm" => Implied(0xF8),
        "sphl" => Implied(0xF9),
        "ei" => Implied(0xFB),
        "xchg" => Implied(0xEB),

        // 8085 extensions
        "rim" => Implied(0x20),
        "sim" => Implied(0x30),

        // Directives
        "db" => DefineBytes,
        "dw" => DefineWords,
        "ds" => DefineStorage,
        "org" => SetOrigin,
        "equ" => Equate,
        "end" => EndOfSource,
        "name" | "title" => Ignored,

        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::{lookup, OpKind};

    #[test]
    fn covers_opcodes_and_directives() {
        assert_eq!(lookup("nop"), Some(OpKind::Implied(0x00)));
        assert_eq!(lookup("mvi"), Some(OpKind::MoveImmediate));
        assert_eq!(lookup("jmp"), Some(OpKind::Address16(0xC3)));
        assert_eq!(lookup("rim"), Some(OpKind::Implied(0x20)));
        assert_eq!(lookup("sim"), Some(OpKind::Implied(0x30)));
        assert_eq!(lookup("db"), Some(OpKind::DefineBytes));
        assert_eq!(lookup("title"), Some(OpKind::Ignored));
        assert_eq!(lookup("ldir"), None);
    }

    #[test]
    fn lookup_expects_lowercase() {
        assert_eq!(lookup("NOP"), None);
    }
}

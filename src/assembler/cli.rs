// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument normalization.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};

pub const VERSION: &str = "1.0";

const LONG_ABOUT: &str = "M80-compatible cross-assembler for the Intel 8080/8085.

Assembles a source file into a flat binary image (CP/M .COM style).
Optional side artifacts: a symbol table (-s), a formatted listing (-l)
and a cross-reference (-c). M80-style switch spellings /L, /C and /O
are accepted; -o2 or /O formats the listing in octal.";

#[derive(Parser, Debug)]
#[command(
    name = "asm80",
    version = VERSION,
    about = "M80-compatible Intel 8080/8085 cross-assembler",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    #[arg(value_name = "FILE", help = "Input assembly source file")]
    pub infile: PathBuf,
    #[arg(
        short = 'o',
        long = "outfile",
        value_name = "FILE",
        long_help = "Binary output path. Defaults to the input base name with a .com extension."
    )]
    pub outfile: Option<String>,
    #[arg(
        short = 's',
        long = "symbols",
        action = ArgAction::SetTrue,
        long_help = "Write a symbol table file (<base>.sym)."
    )]
    pub symbols: bool,
    #[arg(
        short = 'l',
        long = "list",
        action = ArgAction::SetTrue,
        long_help = "Write a listing file (<base>.lst). Also spelled /L."
    )]
    pub listing: bool,
    #[arg(
        short = 'c',
        long = "cref",
        action = ArgAction::SetTrue,
        long_help = "Write a cross-reference file (<base>.crf). Also spelled /C."
    )]
    pub cref: bool,
    #[arg(
        long = "octal",
        action = ArgAction::SetTrue,
        long_help = "Format listing addresses and bytes in octal. Spelled -o2 or /O on the command line."
    )]
    pub octal: bool,
}

/// Rewrite M80-style switch spellings into canonical flags before clap
/// sees them: `/L` -> `-l`, `/C` -> `-c`, `/O` and `-o2` -> `--octal`.
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| {
            match arg.as_str() {
                "/L" | "/l" | "-L" => "-l",
                "/C" | "/c" | "-C" => "-c",
                "/O" | "/o" | "-o2" => "--octal",
                _ => return arg,
            }
            .to_string()
        })
        .collect()
}

/// Base name of the input file: directory and extension stripped, so side
/// artifacts land in the working directory.
#[must_use]
pub fn input_base(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "out".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        let args = normalize_args(args.iter().map(|s| s.to_string()));
        Cli::parse_from(args)
    }

    #[test]
    fn positional_input_and_defaults() {
        let cli = parse(&["asm80", "prog.asm"]);
        assert_eq!(cli.infile, PathBuf::from("prog.asm"));
        assert_eq!(cli.outfile, None);
        assert!(!cli.symbols && !cli.listing && !cli.cref && !cli.octal);
    }

    #[test]
    fn output_override_and_switches() {
        let cli = parse(&["asm80", "prog.asm", "-o", "boot.com", "-s", "-l", "-c"]);
        assert_eq!(cli.outfile.as_deref(), Some("boot.com"));
        assert!(cli.symbols && cli.listing && cli.cref);
    }

    #[test]
    fn slash_switches_are_normalized() {
        let cli = parse(&["asm80", "prog.asm", "/L", "/C", "/O"]);
        assert!(cli.listing && cli.cref && cli.octal);
    }

    #[test]
    fn octal_via_dash_o2() {
        let cli = parse(&["asm80", "prog.asm", "-o2"]);
        assert!(cli.octal);
        assert_eq!(cli.outfile, None);
    }

    #[test]
    fn unknown_switch_is_rejected() {
        let args = normalize_args(
            ["asm80", "prog.asm", "--bogus"].iter().map(|s| s.to_string()),
        );
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn input_base_strips_directory_and_extension() {
        assert_eq!(input_base(Path::new("src/boot/prog.asm")), "prog");
        assert_eq!(input_base(Path::new("prog")), "prog");
        assert_eq!(input_base(Path::new("archive.tar.asm")), "archive.tar");
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Listing file generation.
//!
//! During pass 2 every processed source line gets one record: a 20-column
//! left-justified data prefix (emission address and emitted bytes) followed
//! by the verbatim source text. Blank source lines are echoed as-is.

use std::io::{self, Write};

/// Pass-2 listing writer over an installed sink.
pub struct ListingSink {
    out: Box<dyn Write>,
    octal: bool,
}

impl ListingSink {
    pub fn new(out: Box<dyn Write>, octal: bool) -> Self {
        Self { out, octal }
    }

    pub fn set_octal(&mut self, enabled: bool) {
        self.octal = enabled;
    }

    pub fn write_record(&mut self, addr: u16, bytes: &[u8], source: &str) -> io::Result<()> {
        writeln!(self.out, "{:<20}{}", data_column(addr, bytes, self.octal), source)
    }

    pub fn write_source_only(&mut self, source: &str) -> io::Result<()> {
        writeln!(self.out, "{source}")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Format the address-and-bytes prefix of a listing record.
///
/// Hex: 4 uppercase hex address digits, 2 per byte. Octal: 6 address
/// digits, 3 per byte. Bytes are each followed by a single space.
#[must_use]
pub fn data_column(addr: u16, bytes: &[u8], octal: bool) -> String {
    let mut out = if octal {
        format!("{addr:06o}  ")
    } else {
        format!("{addr:04X}  ")
    };
    for byte in bytes {
        if octal {
            out.push_str(&format!("{byte:03o} "));
        } else {
            out.push_str(&format!("{byte:02X} "));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// `Write` handle over a buffer the test can still read.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn hex_column_format() {
        assert_eq!(data_column(0x0100, &[0x3E, 0x41], false), "0100  3E 41 ");
        assert_eq!(data_column(0, &[], false), "0000  ");
    }

    #[test]
    fn octal_column_format() {
        assert_eq!(data_column(0o400, &[0o76, 0o101], true), "000400  076 101 ");
    }

    #[test]
    fn records_are_padded_to_twenty_columns() {
        let buf = SharedBuf::default();
        let mut sink = ListingSink::new(Box::new(buf.clone()), false);
        sink.write_record(0, &[0x76], "    HLT").unwrap();
        sink.write_source_only("").unwrap();
        assert_eq!(buf.contents(), "0000  76                HLT\n\n");
    }
}

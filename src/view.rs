//! Text renderings of run results: the memory strip and escaped output.

use std::fmt::Write as _;

use nu_ansi_term::Style;

use crate::tape::{Tape, TAPE_LEN};
use crate::theme::Palette;

/// Render the page of `window` cells that contains the data pointer.
///
/// With a palette the pointer cell is painted; without one (plain output for
/// pipes) it is wrapped in brackets instead.
pub fn render_memory(tape: &Tape, window: usize, palette: Option<&Palette>) -> String {
    let window = window.clamp(1, TAPE_LEN);
    let ptr = tape.cursor();
    let base = ptr - ptr % window;
    let end = (base + window).min(TAPE_LEN);

    let mut out = String::new();
    let _ = writeln!(out, "cells {base}..{end}");

    for (i, value) in tape.cells()[base..end].iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let cell_text = format!("{value:>3}");
        if base + i == ptr {
            match palette {
                Some(p) => {
                    let style = Style::new().fg(p.base).on(p.accent).bold();
                    let _ = write!(out, "{}", style.paint(cell_text));
                }
                None => {
                    let _ = write!(out, "[{cell_text}]");
                }
            }
        } else {
            match palette {
                Some(p) if *value == 0 => {
                    let _ = write!(out, "{}", Style::new().fg(p.dim).paint(cell_text));
                }
                Some(p) => {
                    let _ = write!(out, "{}", Style::new().fg(p.text).paint(cell_text));
                }
                None => out.push_str(&cell_text),
            }
        }
    }
    out.push('\n');
    let _ = write!(out, "ptr={ptr} cell={}", tape.current());
    out
}

/// Printable ASCII as-is, `\n` `\r` `\t` kept, everything else as `\xHH`.
pub fn escape_output(output: &str) -> String {
    let mut out = String::with_capacity(output.len());
    for c in output.chars() {
        match c {
            ' '..='~' | '\n' | '\r' | '\t' => out.push(c),
            c if u32::from(c) <= 0xFF => {
                let _ = write!(out, "\\x{:02X}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out
}

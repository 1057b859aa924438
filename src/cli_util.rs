use std::io::{self, Write};

use crate::engine::{EngineError, TraceStep};

/// Pretty-print an [`EngineError`] with caret positioning.
/// If `program` is `Some("bf")`, prefix messages with "bf: ..." for CLI run mode
pub fn print_engine_error(program: Option<&str>, code: &str, err: &EngineError) {
    let stderr = io::stderr();
    let mut handle = stderr.lock();
    let _ = write_engine_error(&mut handle, program, code, err);
    let _ = handle.flush();
}

/// Like [`print_engine_error`] but into any writer.
pub fn write_engine_error<W: Write>(
    w: &mut W,
    program: Option<&str>,
    code: &str,
    err: &EngineError,
) -> io::Result<()> {
    let prefix_program = |msg: &str| {
        if let Some(p) = program {
            format!("{p}: {msg}")
        } else {
            msg.to_string()
        }
    };

    match err {
        EngineError::UnmatchedOpenBracket { ip } => {
            let msg = prefix_program("Parse error: unmatched bracket '['");
            write_error_with_context(w, &msg, code, *ip)
        }
        EngineError::UnmatchedCloseBracket { ip } => {
            let msg = prefix_program("Parse error: unmatched bracket ']'");
            write_error_with_context(w, &msg, code, *ip)
        }
        // Budget aborts carry no position worth pointing at.
        other => writeln!(w, "{other}"),
    }
}

/// Write a concise error with instruction index and a caret context window,
/// working with UTF-8 by slicing using char indices.
fn write_error_with_context<W: Write>(w: &mut W, prefix: &str, code: &str, pos: usize) -> io::Result<()> {
    writeln!(w, "{prefix} at instruction {pos}")?;

    // Show a short window around the position for context
    const WINDOW_CHARS: usize = 32;

    let total_chars = code.chars().count();
    let start_char = pos.saturating_sub(WINDOW_CHARS);
    let end_char = (pos + WINDOW_CHARS + 1).min(total_chars);

    let start_byte = char_to_byte_index(code, start_char);
    let end_byte = char_to_byte_index(code, end_char);
    let slice = &code[start_byte..end_byte];

    // Newlines in the window would break the caret alignment.
    let slice: String = slice
        .chars()
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .collect();
    writeln!(w, "  {slice}")?;

    // Caret under the exact position
    let caret_offset_chars = pos.saturating_sub(start_char);
    writeln!(w, "  {}^", " ".repeat(caret_offset_chars))
}

/// Convert a char index into a byte index in the given UTF-8 string.
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(byte_idx, _)| byte_idx)
        .unwrap_or(s.len())
}

/// Print the step-by-step table produced by a traced run.
pub fn print_trace<W: Write>(w: &mut W, trace: &[TraceStep]) -> io::Result<()> {
    writeln!(w, "STEP | IP  | PTR | CELL | INSTR | ACTION")?;
    writeln!(
        w,
        "-----+-----+-----+------+-------+------------------------------------------------"
    )?;
    for row in trace {
        writeln!(
            w,
            "{:<4} | {:<3} | {:<3} | {:<4} |  {}    | {}",
            row.step, row.ip, row.ptr, row.cell, row.instr, row.action
        )?;
    }
    Ok(())
}

use std::env;
use std::io::{self, IsTerminal, Write};

use nu_ansi_term::Style;
use reedline::{DefaultPrompt, DefaultPromptSegment, Highlighter, HistoryItem, Signal, StyledText};
use tracing::{debug, warn};

use crate::budget::{run_supervised, RunLimits};
use crate::config::Preferences;
use crate::session::Session;
use crate::theme::Palette;
use crate::{bf_only, cli_util, view};

pub const META_HELP: &str = r#"Meta commands (line starts with ":")
  :run             Execute the code entered so far, then keep reading
  :reset           Zero the tape, move the pointer home, clear pending input
  :mem             Print the memory cells around the pointer
  :input TEXT      Set the pending input read by `,` (TEXT kept as typed)
  :dark | :light   Switch the color palette (saved to the preferences file)
  :help            Show this help
  :exit            Exit immediately (code 0)
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Everything the REPL keeps between submissions.
pub struct ReplState {
    session: Session,
    prefs: Preferences,
    limits: RunLimits,
    // Test hook: BF_REPL_ONCE=1 exits after one execution
    once: bool,
    palette_changed: bool,
}

impl ReplState {
    pub fn new(prefs: Preferences, limits: RunLimits) -> Self {
        Self {
            session: Session::new(),
            prefs,
            limits,
            once: env::var("BF_REPL_ONCE").ok().as_deref() == Some("1"),
            palette_changed: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn palette(&self) -> Palette {
        self.prefs.palette()
    }

    /// True once after a `:dark` or `:light` command.
    pub fn take_palette_change(&mut self) -> bool {
        std::mem::take(&mut self.palette_changed)
    }

    /// Process one submission line by line.
    ///
    /// Code lines are buffered; a meta command first executes whatever code
    /// precedes it, and any code left at the end is executed last.
    pub fn submit<O: Write, E: Write>(&mut self, submission: &str, out: &mut O, err: &mut E) -> Flow {
        let mut code = String::new();

        for line in submission.lines() {
            let Some(meta) = line.trim_start().strip_prefix(':') else {
                code.push_str(line);
                code.push('\n');
                continue;
            };

            // Only the single separator goes; `:input` keeps the rest verbatim.
            let (cmd, arg) = meta.split_once([' ', '\t']).unwrap_or((meta, ""));

            if cmd == "exit" {
                return Flow::Exit;
            }
            if self.execute(&std::mem::take(&mut code), out, err) == Flow::Exit {
                return Flow::Exit;
            }

            match cmd {
                "run" => {}
                "help" => {
                    let _ = write!(err, "{META_HELP}");
                }
                "reset" => self.session.reset(),
                "mem" => {
                    let palette = err_palette(&self.prefs);
                    let rendered =
                        view::render_memory(self.session.tape(), self.prefs.memory_window, palette.as_ref());
                    let _ = writeln!(err, "{rendered}");
                }
                "input" => self.session.set_input(arg),
                "dark" | "light" => self.set_dark_mode(cmd == "dark", err),
                other => {
                    let _ = writeln!(err, "unknown meta command ':{other}' (try :help)");
                }
            }
        }

        let flow = self.execute(&code, out, err);
        let _ = out.flush();
        let _ = err.flush();
        flow
    }

    fn set_dark_mode<E: Write>(&mut self, dark: bool, err: &mut E) {
        self.prefs.dark_mode = dark;
        self.palette_changed = true;
        match self.prefs.save() {
            Ok(path) => debug!(path = %path.display(), dark, "saved palette preference"),
            Err(e) => {
                warn!("could not save preferences: {e}");
                let _ = writeln!(err, "repl: could not save preferences: {e}");
            }
        }
    }

    /// Executes a single Brainfuck program contained in `buffer`.
    /// - Program output goes to `out`.
    /// - Errors are printed concisely to `err`.
    /// - A newline is always written to `out` after execution (success or error)
    ///   so that the prompt begins at column 0 on the next iteration.
    fn execute<O: Write, E: Write>(&mut self, buffer: &str, out: &mut O, err: &mut E) -> Flow {
        let filtered = bf_only(buffer.trim());
        if filtered.is_empty() {
            return Flow::Continue;
        }

        let session = &mut self.session;
        let result = run_supervised(&self.limits, |ctrl| session.run(&filtered, Some(ctrl)));

        match result {
            Ok(outcome) => {
                let _ = write!(out, "{}", outcome.output);
            }
            Err(failure) => {
                let _ = write!(out, "{}", failure.partial.output);
                if failure.error.is_timeout() {
                    let _ = writeln!(
                        err,
                        "Execution aborted: wall-clock timeout exceeded ({} ms)",
                        self.limits.timeout_ms
                    );
                } else {
                    let _ = cli_util::write_engine_error(err, None, &filtered, &failure.error);
                }
            }
        }
        let _ = writeln!(out);
        let _ = out.flush();
        let _ = err.flush();

        if self.once { Flow::Exit } else { Flow::Continue }
    }
}

/// Palette for text written to stderr; plain text when stderr is piped.
fn err_palette(prefs: &Preferences) -> Option<Palette> {
    io::stderr().is_terminal().then(|| prefs.palette())
}

pub fn repl_loop(state: &mut ReplState) -> io::Result<()> {
    // Initialize interactive line editor
    let mut editor = init_line_editor(state.palette())?;

    loop {
        // Prompt and read a multi-line submission via editor
        let Some(submission) = read_submission_interactive(&mut editor)? else {
            // EOF or editor closed. End the session cleanly to avoid hanging when stdin is closed
            println!();
            io::stdout().flush()?;
            return Ok(());
        };

        if submission.trim().is_empty() {
            continue; // Ignore empty submissions
        }

        let flow = state.submit(&submission, &mut io::stdout().lock(), &mut io::stderr().lock());
        if flow == Flow::Exit {
            return Ok(());
        }

        if state.take_palette_change() {
            editor = editor.with_highlighter(Box::new(BrainfuckHighlighter::new(state.palette())));
        }
    }
}

fn init_line_editor(palette: Palette) -> io::Result<reedline::Reedline> {
    use reedline::{
        default_emacs_keybindings, EditCommand, Emacs, KeyCode, KeyModifiers, Reedline, ReedlineEvent,
    };

    // Start from default emacs-like bindings and adjust:
    // - Enter -> InsertNewLine (do not submit)
    // - Ctrl+D -> AcceptLine (submit)
    // - Ctrl+Z -> AcceptLine (submit, for Windows)
    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Edit(vec![EditCommand::InsertNewline]));
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('z'), ReedlineEvent::Submit);

    // Up/down move within the current multiline buffer, not history.
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down);

    // Alt+Up/Alt+Down or Ctrl+Up/Ctrl+Down to navigate history items.
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Up, ReedlineEvent::PreviousHistory);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Up, ReedlineEvent::PreviousHistory);
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Down, ReedlineEvent::NextHistory);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Down, ReedlineEvent::NextHistory);

    let history = reedline::FileBackedHistory::new(1_000)
        .map_err(|e| io::Error::other(e.to_string()))?;

    let editor = Reedline::create()
        .with_highlighter(Box::new(BrainfuckHighlighter::new(palette)))
        .with_history(Box::new(history))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    Ok(editor)
}

/// Collect all lines until EOF.
pub fn read_submission<R: io::BufRead>(stdin: &mut R) -> Option<String> {
    let mut buffer = String::new();

    loop {
        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => buffer.push_str(&line),
            Err(_) => return None,
        }
    }

    if buffer.is_empty() { None } else { Some(buffer) }
}

fn read_submission_interactive(editor: &mut reedline::Reedline) -> io::Result<Option<String>> {
    let prompt = DefaultPrompt::new(DefaultPromptSegment::Basic("bf".to_string()), DefaultPromptSegment::Empty);

    // Render prompt and read until user submits with Ctrl+D or Ctrl+Z
    match editor.read_line(&prompt) {
        Ok(Signal::Success(buffer)) => {
            // One history item per submitted buffer (program-level)
            if !buffer.trim().is_empty() {
                let _ = editor.history_mut().save(HistoryItem::from_command_line(buffer.clone()));
            }
            Ok(Some(buffer))
        }
        Ok(Signal::CtrlC) => Ok(None), // Global SIGINT, exit immediately
        Ok(Signal::CtrlD) => Ok(None), // EOF, exit cleanly
        Err(e) => {
            eprintln!("repl: editor error: {e}");
            let _ = io::stderr().flush();
            Ok(None)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplMode {
    Bare,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFlagOverride {
    None,
    Bare,
    Editor,
}

pub fn select_mode(flag: ModeFlagOverride) -> Result<ReplMode, String> {
    // Flag override
    match flag {
        ModeFlagOverride::Bare => return Ok(ReplMode::Bare),
        ModeFlagOverride::Editor => {
            if !io::stdin().is_terminal() {
                return Err("cannot start editor: stdin is not a TTY (use --bare or BF_REPL_MODE=bare)".to_string());
            }
            return Ok(ReplMode::Editor);
        }
        ModeFlagOverride::None => {}
    }

    // Environment override
    if let Ok(val) = env::var("BF_REPL_MODE") {
        let v = val.trim().to_ascii_lowercase();
        return match v.as_str() {
            "bare" => Ok(ReplMode::Bare),
            "editor" => {
                if !io::stdin().is_terminal() {
                    return Err("cannot start editor: stdin is not a TTY (use BF_REPL_MODE=bare)".to_string());
                }
                Ok(ReplMode::Editor)
            }
            _ => Err(format!("invalid BF_REPL_MODE value: {val}, must be 'bare' or 'editor'")),
        };
    }

    // Auto-detect
    if io::stdin().is_terminal() {
        Ok(ReplMode::Editor)
    } else {
        Ok(ReplMode::Bare)
    }
}

/// Read stdin to EOF and process it as a single submission.
pub fn execute_bare_once(state: &mut ReplState) -> io::Result<()> {
    let mut locked = io::BufReader::new(io::stdin().lock());
    if let Some(submission) = read_submission(&mut locked) {
        state.submit(&submission, &mut io::stdout().lock(), &mut io::stderr().lock());
    }
    Ok(())
}

struct BrainfuckHighlighter {
    // Per-char styles for BF commands, and a fallback for non-commands
    map_plus: Style,
    map_minus: Style,
    map_lt: Style,
    map_gt: Style,
    map_dot: Style,
    map_comma: Style,
    map_bracket: Style,
    map_meta: Style,
    map_other: Style,
}

impl BrainfuckHighlighter {
    // > <   => SKY/TEAL (movement)
    // + -   => GREEN/RED (data modification)
    // . ,   => YELLOW/PEACH (I/O)
    // [ ]   => MAUVE (flow control)
    fn new(p: Palette) -> Self {
        Self {
            map_gt: Style::new().fg(p.op_right).bold(),
            map_lt: Style::new().fg(p.op_left).bold(),
            map_plus: Style::new().fg(p.op_inc).bold(),
            map_minus: Style::new().fg(p.op_dec).bold(),
            map_dot: Style::new().fg(p.op_output).bold(),
            map_comma: Style::new().fg(p.op_input).bold(),
            map_bracket: Style::new().fg(p.op_bracket).bold(),
            map_meta: Style::new().fg(p.accent).italic(),
            map_other: Style::new().fg(p.dim),
        }
    }

    #[inline]
    fn style_for(&self, ch: char) -> Style {
        match ch {
            '>' => self.map_gt,
            '<' => self.map_lt,
            '+' => self.map_plus,
            '-' => self.map_minus,
            '.' => self.map_dot,
            ',' => self.map_comma,
            '[' | ']' => self.map_bracket,
            _ => self.map_other,
        }
    }

    fn highlight_line(&self, out: &mut StyledText, line: &str) {
        if line.trim_start().starts_with(':') {
            out.push((self.map_meta, line.to_string()));
            return;
        }

        let mut current_style: Option<Style> = None;
        let mut buffer = String::new();

        for ch in line.chars() {
            let style = self.style_for(ch);
            match current_style {
                Some(s) if s == style => buffer.push(ch),
                Some(s) => {
                    out.push((s, std::mem::take(&mut buffer)));
                    current_style = Some(style);
                    buffer.push(ch);
                }
                None => {
                    current_style = Some(style);
                    buffer.push(ch);
                }
            }
        }

        if let Some(s) = current_style {
            if !buffer.is_empty() {
                out.push((s, buffer));
            }
        }
    }
}

impl Highlighter for BrainfuckHighlighter {
    fn highlight(&self, text: &str, _cursor: usize) -> StyledText {
        let mut out = StyledText::new();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                out.push((Style::new(), "\n".to_string()));
            }
            self.highlight_line(&mut out, line);
        }
        out
    }
}

//! Rewrites the first `Diagram(...)` constructor call of a generated script so
//! the rendered image lands at a caller-chosen file name.
//!
//! The script is lexed just enough to tell code apart from comments and string
//! literals, so a `Diagram(` inside a comment, a docstring or a `print("...")`
//! is never mistaken for the constructor. Only the first real call is
//! considered; everything after it passes through untouched.

use tracing::{debug, warn};

/// Name of the constructor whose output path is controlled.
pub const CONSTRUCTOR: &str = "Diagram";

/// Name given to diagrams whose constructor call carries neither a name nor a
/// filename.
pub const DEFAULT_DIAGRAM_NAME: &str = "Architecture Diagram";

/// Returns `code` with the first constructor call bound to `output_filename`.
///
/// - A call that already names a filename is left as is.
/// - A call with a name but no filename gets `filename="..."` appended before
///   its closing parenthesis, so `Diagram("x")` and `Diagram("x"):` keep their
///   trailing form.
/// - A call with neither gets a default name and the filename as leading
///   arguments.
///
/// Code without a constructor call is returned unmodified.
pub fn patch(code: &str, output_filename: &str) -> String {
    let mask = code_mask(code);

    let Some(call) = find_constructor(code, &mask) else {
        debug!("no {CONSTRUCTOR} constructor call found, leaving code unmodified");
        return code.to_string();
    };

    let filename_arg = format!("filename={}", python_string(output_filename));

    let (at, insertion) = if call.has_filename() {
        debug!(line = call.line, "constructor already names a filename");
        return code.to_string();
    } else if call.has_name() {
        let Some(close) = call.close else {
            warn!(line = call.line, "constructor call is never closed, leaving code unmodified");
            return code.to_string();
        };
        let separator = if call.trailing_comma { " " } else { ", " };
        (close, format!("{separator}{filename_arg}"))
    } else {
        let name_arg = format!("name={}", python_string(DEFAULT_DIAGRAM_NAME));
        let trailer = if call.args.is_empty() { "" } else { ", " };
        (call.open, format!("{name_arg}, {filename_arg}{trailer}"))
    };

    debug!(line = call.line, "injecting output filename into constructor call");

    let mut patched = String::with_capacity(code.len() + insertion.len());
    patched.push_str(&code[..at]);
    patched.push_str(&insertion);
    patched.push_str(&code[at..]);
    patched
}

/// One argument of the constructor call, classified by shape only.
#[derive(Debug, PartialEq, Eq)]
enum Arg {
    Positional,
    Keyword(String),
    Unpacked,
}

#[derive(Debug)]
struct CallSite {
    /// 1-based line of the constructor token.
    line: usize,
    /// Byte offset just past the opening parenthesis.
    open: usize,
    /// Byte offset of the matching closing parenthesis, if the call is closed.
    close: Option<usize>,
    args: Vec<Arg>,
    trailing_comma: bool,
}

impl CallSite {
    fn has_keyword(&self, name: &str) -> bool {
        self.args
            .iter()
            .any(|arg| matches!(arg, Arg::Keyword(k) if k == name))
    }

    fn positional_count(&self) -> usize {
        self.args
            .iter()
            .filter(|arg| **arg == Arg::Positional)
            .count()
    }

    fn has_name(&self) -> bool {
        self.has_keyword("name") || self.positional_count() >= 1
    }

    fn has_filename(&self) -> bool {
        self.has_keyword("filename") || self.positional_count() >= 2
    }
}

/// Lexer states. Strings opened with a single quote end at the line break;
/// triple-quoted strings may span lines.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Lex {
    Code,
    Comment,
    Str { quote: u8, triple: bool },
}

/// Marks every byte of `code` that is source code, as opposed to a comment or
/// the inside of a string literal.
fn code_mask(code: &str) -> Vec<bool> {
    let bytes = code.as_bytes();
    let mut mask = vec![false; bytes.len()];
    let mut state = Lex::Code;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match state {
            Lex::Code => match b {
                b'#' => {
                    state = Lex::Comment;
                    i += 1;
                }
                b'"' | b'\'' => {
                    let triple = bytes[i..].starts_with(&[b, b, b]);
                    state = Lex::Str { quote: b, triple };
                    i += if triple { 3 } else { 1 };
                }
                _ => {
                    mask[i] = true;
                    i += 1;
                }
            },
            Lex::Comment => {
                if b == b'\n' {
                    state = Lex::Code;
                    mask[i] = true;
                }
                i += 1;
            }
            Lex::Str { quote, triple } => {
                if b == b'\\' {
                    i += 2;
                } else if triple && bytes[i..].starts_with(&[quote, quote, quote]) {
                    state = Lex::Code;
                    i += 3;
                } else if !triple && b == quote {
                    state = Lex::Code;
                    i += 1;
                } else if !triple && b == b'\n' {
                    state = Lex::Code;
                    mask[i] = true;
                    i += 1;
                } else {
                    i += 1;
                }
            }
        }
    }

    mask
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn find_constructor(code: &str, mask: &[bool]) -> Option<CallSite> {
    let bytes = code.as_bytes();
    let token = CONSTRUCTOR.as_bytes();

    let start = (0..bytes.len()).find(|&i| {
        let end = i + token.len();
        end < bytes.len()
            && &bytes[i..end] == token
            && mask[i..=end].iter().all(|&m| m)
            && (i == 0 || !is_ident_byte(bytes[i - 1]))
            && after_spaces(bytes, end).is_some_and(|j| bytes[j] == b'(' && mask[j])
    })?;

    let open = after_spaces(bytes, start + token.len())? + 1;
    let line = code[..start].matches('\n').count() + 1;
    let (close, raw_args) = split_arguments(code, mask, open);

    let trailing_comma = raw_args.last().is_some_and(|a| a.trim().is_empty()) && raw_args.len() > 1;
    let args = raw_args
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(classify_argument)
        .collect();

    Some(CallSite {
        line,
        open,
        close,
        args,
        trailing_comma,
    })
}

/// Index of the first non-space, non-tab byte at or after `from`.
fn after_spaces(bytes: &[u8], from: usize) -> Option<usize> {
    (from..bytes.len()).find(|&j| bytes[j] != b' ' && bytes[j] != b'\t')
}

/// Splits the argument list starting at `open` on top-level commas. Returns
/// the offset of the closing parenthesis (if any) and the raw argument texts.
fn split_arguments<'a>(code: &'a str, mask: &[bool], open: usize) -> (Option<usize>, Vec<&'a str>) {
    let bytes = code.as_bytes();
    let mut depth = 0usize;
    let mut segment_start = open;
    let mut args = Vec::new();

    for j in open..bytes.len() {
        if !mask[j] {
            continue;
        }
        match bytes[j] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' if depth == 0 => {
                args.push(&code[segment_start..j]);
                return (Some(j), args);
            }
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                args.push(&code[segment_start..j]);
                segment_start = j + 1;
            }
            _ => {}
        }
    }

    args.push(&code[segment_start..]);
    (None, args)
}

fn classify_argument(arg: &str) -> Arg {
    if arg.starts_with('*') {
        return Arg::Unpacked;
    }

    let ident_len = arg.bytes().take_while(|&b| is_ident_byte(b)).count();
    let rest = arg[ident_len..].trim_start();
    if ident_len > 0 && rest.starts_with('=') && !rest.starts_with("==") {
        Arg::Keyword(arg[..ident_len].to_string())
    } else {
        Arg::Positional
    }
}

fn python_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

//! Small utility helpers used across modules.

use std::sync::OnceLock;

use regex::Regex;

/// Words that can never name a function the harness calls.
const RESERVED: &[&str] = &[
  "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
  "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if", "import",
  "in", "instanceof", "let", "new", "null", "return", "static", "super", "switch", "this", "throw",
  "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// True if `name` is a plain ASCII JavaScript identifier and not a reserved word.
/// The entry point is spliced into the harness, so nothing else is accepted.
pub fn is_js_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  let first_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$');
  first_ok
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    && !RESERVED.contains(&name)
}

/// Names of the functions a source declares at its top level, in source order.
///
/// Recognises `function name(`, `function* name(`, `async function name(` and
/// `const|let|var name = <function or arrow>`. Declarations inside blocks,
/// strings, comments, or expressions (`x = function f() {}`) are skipped.
pub fn top_level_functions(source: &str) -> Vec<String> {
  static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
  let patterns = PATTERNS.get_or_init(|| {
    [
      Regex::new(r"\bfunction\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(").expect("invalid function declaration regex"),
      Regex::new(r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\b|function\b|\(|[A-Za-z_$][\w$]*\s*=>)")
        .expect("invalid function binding regex"),
    ]
  });

  let (code, depth) = mask_source(source);
  let mut found: Vec<(usize, String)> = Vec::new();
  for re in patterns {
    for caps in re.captures_iter(&code) {
      let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else { continue };
      let start = declaration_start(&code, whole.start());
      if depth[start] != 0 || follows_operator(&code[..start]) || !is_js_identifier(name.as_str()) {
        continue;
      }
      found.push((start, name.as_str().to_string()));
    }
  }
  found.sort_by_key(|(pos, _)| *pos);
  found.into_iter().map(|(_, name)| name).collect()
}

/// Widen a `function` match to a preceding `async` so the operator check
/// looks at what comes before the whole declaration.
fn declaration_start(code: &str, start: usize) -> usize {
  let before = code[..start].trim_end();
  match before.strip_suffix("async") {
    Some(rest) if !rest.ends_with(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$') => rest.len(),
    _ => start,
  }
}

fn follows_operator(before: &str) -> bool {
  before
    .trim_end()
    .chars()
    .last()
    .is_some_and(|c| "=(,:?![&|+-*/%<>^~".contains(c))
}

/// Blank out strings and comments (byte offsets are preserved) and record the
/// bracket nesting depth at every byte.
fn mask_source(source: &str) -> (String, Vec<u32>) {
  #[derive(Clone, Copy, PartialEq)]
  enum Mode {
    Code,
    Str(char),
    LineComment,
    BlockComment,
  }

  let mut code = String::with_capacity(source.len());
  let mut depth = Vec::with_capacity(source.len() + 1);
  let mut level: u32 = 0;
  let mut mode = Mode::Code;
  let mut chars = source.chars().peekable();
  let mut escaped = false;

  while let Some(c) = chars.next() {
    let mut blank = mode != Mode::Code;
    match mode {
      Mode::Code => match c {
        '\'' | '"' | '`' => {
          mode = Mode::Str(c);
          blank = true;
        }
        '/' if chars.peek() == Some(&'/') => {
          mode = Mode::LineComment;
          blank = true;
        }
        '/' if chars.peek() == Some(&'*') => {
          mode = Mode::BlockComment;
          blank = true;
        }
        '{' | '(' | '[' => level += 1,
        '}' | ')' | ']' => level = level.saturating_sub(1),
        _ => {}
      },
      Mode::Str(quote) => {
        if escaped {
          escaped = false;
        } else if c == '\\' {
          escaped = true;
        } else if c == quote {
          mode = Mode::Code;
        }
      }
      Mode::LineComment => {
        if c == '\n' {
          mode = Mode::Code;
        }
      }
      Mode::BlockComment => {
        if c == '*' && chars.peek() == Some(&'/') {
          chars.next();
          code.push_str("  ");
          depth.extend([level, level]);
          mode = Mode::Code;
          continue;
        }
      }
    }
    if blank && c != '\n' {
      code.extend(std::iter::repeat(' ').take(c.len_utf8()));
    } else {
      code.push(c);
    }
    depth.extend(std::iter::repeat(level).take(c.len_utf8()));
  }
  depth.push(level);
  (code, depth)
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

//! Brace expansion:  `{a,b,c}` patterns and `{lo..hi[..incr]}` sequences.

use indicio::{clue, INFO};

use crate::variable::match_variable;
use crate::{Error, COLLECTOR};

//////////////////////////////////////////// biometrics ////////////////////////////////////////////

static BRACE_PATTERN: biometrics::Counter = biometrics::Counter::new("shexpand.brace.pattern");
static BRACE_SEQUENCE: biometrics::Counter = biometrics::Counter::new("shexpand.brace.sequence");
static BRACE_NOT_EXPANDED: biometrics::Counter =
    biometrics::Counter::new("shexpand.brace.not_expanded");
static BRACE_SEQUENCE_TOO_LONG: biometrics::Counter =
    biometrics::Counter::new("shexpand.brace.sequence_too_long");

pub(crate) fn register_biometrics(collector: &biometrics::Collector) {
    collector.register_counter(&BRACE_PATTERN);
    collector.register_counter(&BRACE_SEQUENCE);
    collector.register_counter(&BRACE_NOT_EXPANDED);
    collector.register_counter(&BRACE_SEQUENCE_TOO_LONG);
}

///////////////////////////////////////////// BracePair ////////////////////////////////////////////

/// The byte offsets of a matched `{` and `}`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BracePair {
    pub start: usize,
    pub end: usize,
}

/// Match the brace at `start`, which must hold a `{`.
///
/// Returns the offset one past the matching `}`, or `None` if the brace is never closed.  A
/// backslash escapes the byte that follows it.  Variable tokens are skipped whole, so the braces of
/// `${x}` never count toward the depth.
pub fn match_brace(input: &str, start: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    if bytes.get(start) != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    let mut idx = start;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => {
                idx += 2;
                continue;
            }
            b'$' => {
                if let Some(end) = match_variable(input, idx) {
                    idx = end;
                    continue;
                }
            }
            b'{' => {
                depth += 1;
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
        idx += 1;
    }
    None
}

/// Find every brace pair in the input, ordered by the offset of the opening brace.
///
/// Unlike the expansion pass, which leaves unbalanced braces alone, this reports them.
pub fn match_braces(input: &str) -> Result<Vec<BracePair>, Error> {
    let bytes = input.as_bytes();
    let mut stack = vec![];
    let mut pairs = vec![];
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => {
                idx += 2;
                continue;
            }
            b'$' => {
                if let Some(end) = match_variable(input, idx) {
                    idx = end;
                    continue;
                }
            }
            b'{' => {
                stack.push(idx);
            }
            b'}' => {
                let Some(start) = stack.pop() else {
                    return Err(Error::mismatched_closing_brace(idx));
                };
                pairs.push(BracePair { start, end: idx });
            }
            _ => {}
        }
        idx += 1;
    }
    if let Some(start) = stack.pop() {
        return Err(Error::mismatched_brace(start));
    }
    pairs.sort_by_key(|p| p.start);
    Ok(pairs)
}

/////////////////////////////////////////// BraceSequence //////////////////////////////////////////

/// The most values a sequence may produce.  Longer sequences are left unexpanded.
pub const MAX_SEQUENCE_LEN: u64 = 1 << 20;

/// A `{lo..hi[..incr]}` sequence.
///
/// The sign of `increment` always follows the direction from `start` to `end`; only the magnitude
/// the user wrote is kept.  A sequence never holds more than [MAX_SEQUENCE_LEN] values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BraceSequence {
    pub is_alphabetic: bool,
    pub start: i64,
    pub end: i64,
    pub increment: i64,
}

impl BraceSequence {
    /// Parse the text between the braces of a sequence.
    pub fn parse(body: &str) -> Option<Self> {
        if !body
            .bytes()
            .all(|c| c.is_ascii_alphanumeric() || c == b'.' || c == b'-')
        {
            return None;
        }
        let fields = body.split("..").collect::<Vec<_>>();
        if fields.len() != 2 && fields.len() != 3 {
            return None;
        }
        let increment = match fields.get(2) {
            Some(field) => parse_integer(field)?,
            None => 1,
        };
        let (is_alphabetic, start, end) =
            match (parse_integer(fields[0]), parse_integer(fields[1])) {
                (Some(start), Some(end)) => (false, start, end),
                (None, None) => (true, parse_letter(fields[0])?, parse_letter(fields[1])?),
                _ => {
                    return None;
                }
            };
        let magnitude = if increment == 0 {
            1
        } else {
            increment.checked_abs()?
        };
        let increment = if start <= end { magnitude } else { -magnitude };
        let sequence = Self {
            is_alphabetic,
            start,
            end,
            increment,
        };
        if sequence.value_count() > MAX_SEQUENCE_LEN {
            BRACE_SEQUENCE_TOO_LONG.click();
            return None;
        }
        Some(sequence)
    }

    /// The number of values in the sequence.
    pub fn value_count(&self) -> u64 {
        let span = (i128::from(self.end) - i128::from(self.start)).unsigned_abs();
        let step = i128::from(self.increment).unsigned_abs();
        u64::try_from(span / step + 1).unwrap_or(u64::MAX)
    }

    /// The values of the sequence, rendered as they appear in the expansion.
    pub fn values(&self) -> Vec<String> {
        let mut values = vec![];
        let mut current = self.start;
        while (self.increment > 0 && current <= self.end)
            || (self.increment < 0 && current >= self.end)
        {
            values.push(self.render(current));
            match current.checked_add(self.increment) {
                Some(next) => current = next,
                None => break,
            }
        }
        values
    }

    fn render(&self, value: i64) -> String {
        if self.is_alphabetic {
            u32::try_from(value)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        } else {
            value.to_string()
        }
    }
}

fn parse_integer(field: &str) -> Option<i64> {
    let digits = field.strip_prefix('-').unwrap_or(field);
    if digits.is_empty() || !digits.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn parse_letter(field: &str) -> Option<i64> {
    match field.as_bytes() {
        [c] if c.is_ascii_alphabetic() => Some(*c as i64),
        _ => None,
    }
}

////////////////////////////////////////// BraceExpression /////////////////////////////////////////

#[derive(Clone, Debug, Eq, PartialEq)]
enum BraceExpression<'a> {
    Pattern(Vec<&'a str>),
    Sequence(BraceSequence),
}

impl<'a> BraceExpression<'a> {
    fn parse(body: &'a str) -> Option<Self> {
        if let Some(sequence) = BraceSequence::parse(body) {
            BRACE_SEQUENCE.click();
            Some(Self::Sequence(sequence))
        } else if let Some(parts) = parse_pattern(body) {
            BRACE_PATTERN.click();
            Some(Self::Pattern(parts))
        } else {
            None
        }
    }

    fn alternatives(&self) -> Vec<String> {
        match self {
            Self::Pattern(parts) => parts.iter().map(|p| p.to_string()).collect(),
            Self::Sequence(sequence) => sequence.values(),
        }
    }
}

// Split the body of a pattern on its top-level commas.  A body without a top-level comma is not a
// pattern:  bash leaves `{single}` alone.
fn parse_pattern(body: &str) -> Option<Vec<&str>> {
    let bytes = body.as_bytes();
    let mut parts = vec![];
    let mut depth = 0usize;
    let mut part_start = 0;
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => {
                idx += 2;
                continue;
            }
            b'$' => {
                if let Some(end) = match_variable(body, idx) {
                    idx = end;
                    continue;
                }
            }
            b'{' => {
                depth += 1;
            }
            b'}' => {
                depth = depth.saturating_sub(1);
            }
            b',' if depth == 0 => {
                parts.push(&body[part_start..idx]);
                part_start = idx + 1;
            }
            _ => {}
        }
        idx += 1;
    }
    if parts.is_empty() {
        return None;
    }
    parts.push(&body[part_start..]);
    Some(parts)
}

/////////////////////////////////////////// expand_braces //////////////////////////////////////////

/// Expand every brace pattern and sequence in the input.
///
/// Each expression expands the word around it (back to the previous space and forward to the next)
/// into one space-separated word per alternative, in the order written.  Nested and subsequent
/// expressions within the word are expanded recursively on each alternative; text already produced
/// is never scanned again.  Escaped, unterminated, or otherwise malformed braces are left as they
/// are.
pub fn expand_braces(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut output = String::with_capacity(input.len());
    let mut copied = 0;
    let mut word_start = 0;
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => {
                idx += 2;
                continue;
            }
            b'$' => {
                if let Some(end) = match_variable(input, idx) {
                    idx = end;
                    continue;
                }
            }
            b' ' => {
                word_start = idx + 1;
            }
            b'{' => {
                if let Some(close) = match_brace(input, idx) {
                    if let Some(expr) = BraceExpression::parse(&input[idx + 1..close - 1]) {
                        let word_end = postscript_end(input, close);
                        let preamble = &input[word_start..idx];
                        let postscript = &input[close..word_end];
                        let variants = expr
                            .alternatives()
                            .iter()
                            .map(|alt| expand_braces(&format!("{preamble}{alt}{postscript}")))
                            .collect::<Vec<_>>();
                        output.push_str(&input[copied..word_start]);
                        output.push_str(&variants.join(" "));
                        copied = word_end;
                        idx = word_end;
                        continue;
                    }
                    BRACE_NOT_EXPANDED.click();
                    clue!(COLLECTOR, INFO, {
                        brace_not_expanded: &input[idx..close],
                    });
                }
            }
            _ => {}
        }
        idx += 1;
    }
    output.push_str(&input[copied..]);
    output
}

// The postscript runs to the next unescaped space that is not inside a variable or brace.
fn postscript_end(input: &str, close: usize) -> usize {
    let bytes = input.as_bytes();
    let mut idx = close;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => {
                idx += 2;
                continue;
            }
            b' ' => {
                return idx;
            }
            b'$' => {
                if let Some(end) = match_variable(input, idx) {
                    idx = end;
                    continue;
                }
            }
            b'{' => {
                if let Some(end) = match_brace(input, idx) {
                    idx = end;
                    continue;
                }
            }
            _ => {}
        }
        idx += 1;
    }
    bytes.len()
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

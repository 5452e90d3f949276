//! Scanners for `$name` and `${...}` tokens.
//!
//! Every scanner here works on byte offsets.  The delimiters are all ASCII, so every offset a
//! scanner returns lands on a character boundary.

/// True iff `c` may begin an ordinary parameter name.
pub fn is_name_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

/// True iff `c` may continue an ordinary parameter name.
pub fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// True iff `c` names one of the shell's special parameters.
pub fn is_special(c: u8) -> bool {
    matches!(c, b'*' | b'@' | b'#' | b'?' | b'$' | b'!' | b'-')
}

/// True iff `s` is an ordinary parameter name.
pub fn is_identifier(s: &str) -> bool {
    let bytes = s.as_bytes();
    !bytes.is_empty() && is_name_start(bytes[0]) && bytes[1..].iter().all(|c| is_name_char(*c))
}

/// Match the variable token that starts at `start`, which must hold a `$`.
///
/// Returns the offset one past the end of the token.  Returns `None` when there is no token:  a
/// lone `$`, a `$(`, or a `${` that is never closed.
///
/// `$1` through `$9` are always exactly two characters; `$10` is `$1` followed by a literal `0`.
pub fn match_variable(input: &str, start: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    if bytes.get(start) != Some(&b'$') {
        return None;
    }
    let next = *bytes.get(start + 1)?;
    if next == b'{' {
        match_braced(bytes, start + 1)
    } else if next.is_ascii_digit() || is_special(next) {
        Some(start + 2)
    } else if is_name_start(next) {
        let len = bytes[start + 1..]
            .iter()
            .take_while(|c| is_name_char(**c))
            .count();
        Some(start + 1 + len)
    } else {
        None
    }
}

// Scan from the `{` at `open` to its matching `}`.  A backslash escapes the byte that follows.
fn match_braced(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut idx = open;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => {
                idx += 2;
                continue;
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

/// Match the parameter name at the start of `s`.
///
/// Returns the name and the text that follows it.  Ordinary names are returned as written.
/// Positional and special parameters are returned with a leading `$` so that `${10}` yields
/// `"$10"` and `${*}` yields `"$*"`.  A multi-digit positional name with a leading zero does not
/// match.
pub fn match_parameter_name(s: &str) -> Option<(String, &str)> {
    let bytes = s.as_bytes();
    let first = *bytes.first()?;
    if is_name_start(first) {
        let len = bytes.iter().take_while(|c| is_name_char(**c)).count();
        Some((s[..len].to_string(), &s[len..]))
    } else if first.is_ascii_digit() {
        let len = bytes.iter().take_while(|c| c.is_ascii_digit()).count();
        if len > 1 && first == b'0' {
            return None;
        }
        Some((format!("${}", &s[..len]), &s[len..]))
    } else if is_special(first) {
        Some((format!("${}", first as char), &s[1..]))
    } else {
        None
    }
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

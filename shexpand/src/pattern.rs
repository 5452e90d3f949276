//! Glob matching for the removal, replacement, and case-conversion operators.

use crate::Error;

/////////////////////////////////////////////// Glob ///////////////////////////////////////////////

/// A pattern prepared for matching many texts.  See [Glob::matcher].
pub type Matcher<'a> = Box<dyn Fn(&str) -> Result<bool, Error> + 'a>;

/// A Glob matches shell patterns against text.
///
/// Prefix results are the byte length of the matched prefix.  Suffix results are the byte offset
/// at which the matched suffix starts.  Offsets always fall on character boundaries.
pub trait Glob {
    /// True iff the pattern matches the whole of `text`.
    fn matches(&self, pattern: &str, text: &str) -> Result<bool, Error>;

    /// Prepare `pattern` once for matching against many texts.  Implementations that compile
    /// patterns should override this so that callers pay for compilation once per operation.
    fn matcher<'a>(&'a self, pattern: &str) -> Result<Matcher<'a>, Error> {
        let pattern = pattern.to_string();
        Ok(Box::new(move |text: &str| self.matches(&pattern, text)))
    }

    /// The shortest prefix of `value` the pattern matches.
    fn shortest_prefix(&self, pattern: &str, value: &str) -> Result<Option<usize>, Error> {
        let matches = self.matcher(pattern)?;
        for idx in boundaries(value) {
            if matches(&value[..idx])? {
                return Ok(Some(idx));
            }
        }
        Ok(None)
    }

    /// The longest prefix of `value` the pattern matches.
    fn longest_prefix(&self, pattern: &str, value: &str) -> Result<Option<usize>, Error> {
        let matches = self.matcher(pattern)?;
        for idx in boundaries(value).rev() {
            if matches(&value[..idx])? {
                return Ok(Some(idx));
            }
        }
        Ok(None)
    }

    /// The shortest suffix of `value` the pattern matches.
    fn shortest_suffix(&self, pattern: &str, value: &str) -> Result<Option<usize>, Error> {
        let matches = self.matcher(pattern)?;
        for idx in boundaries(value).rev() {
            if matches(&value[idx..])? {
                return Ok(Some(idx));
            }
        }
        Ok(None)
    }

    /// The longest suffix of `value` the pattern matches.
    fn longest_suffix(&self, pattern: &str, value: &str) -> Result<Option<usize>, Error> {
        let matches = self.matcher(pattern)?;
        for idx in boundaries(value) {
            if matches(&value[idx..])? {
                return Ok(Some(idx));
            }
        }
        Ok(None)
    }
}

// Every character boundary of `value`, including both ends, in ascending order.
pub(crate) fn boundaries(value: &str) -> impl DoubleEndedIterator<Item = usize> {
    value
        .char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(value.len()))
        .collect::<Vec<_>>()
        .into_iter()
}

///////////////////////////////////////////// ShellGlob ////////////////////////////////////////////

/// The default Glob, built on the `glob` crate.
///
/// It understands `*`, `?`, `[...]`, and `[!...]` (or `[^...]`).  A backslash makes the character
/// that follows it literal, as does a `[` that is never closed.  `*` matches `/` like it does in
/// parameter expansion.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShellGlob;

impl ShellGlob {
    /// Compile the shell pattern.
    pub fn compile(pattern: &str) -> Result<glob::Pattern, Error> {
        glob::Pattern::new(&translate(pattern))
            .map_err(|err| Error::invalid_glob(pattern, err.to_string()))
    }
}

impl Glob for ShellGlob {
    fn matches(&self, pattern: &str, text: &str) -> Result<bool, Error> {
        Ok(Self::compile(pattern)?.matches(text))
    }

    fn matcher<'a>(&'a self, pattern: &str) -> Result<Matcher<'a>, Error> {
        let compiled = Self::compile(pattern)?;
        Ok(Box::new(move |text: &str| Ok(compiled.matches(text))))
    }
}

// Rewrite shell pattern syntax into the syntax of the glob crate.  Escapes become bracketed
// literals, `[^` becomes `[!`, an unclosed `[` becomes a literal, and runs of `*` collapse because
// `**` has a meaning of its own there.
fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut output = String::with_capacity(pattern.len());
    let mut idx = 0;
    let mut prev_was_star = false;
    while idx < chars.len() {
        let c = chars[idx];
        idx += 1;
        match c {
            '\\' => match chars.get(idx) {
                Some(escaped) => {
                    output.push_str(&glob::Pattern::escape(&escaped.to_string()));
                    idx += 1;
                }
                None => {
                    output.push('\\');
                }
            },
            '*' if prev_was_star => {}
            '[' => match bracket_end(&chars, idx) {
                Some(end) => {
                    output.push('[');
                    if chars[idx] == '^' {
                        output.push('!');
                        idx += 1;
                    }
                    // The glob crate has no escapes inside a set.
                    while idx < end {
                        if chars[idx] == '\\' && idx + 1 < end {
                            idx += 1;
                        }
                        output.push(chars[idx]);
                        idx += 1;
                    }
                    output.push(']');
                    idx = end + 1;
                }
                None => {
                    output.push_str("[[]");
                }
            },
            c => {
                output.push(c);
            }
        }
        prev_was_star = c == '*';
    }
    output
}

// The index of the `]` closing the set whose body starts at `start`.  A `]` that leads the body,
// after any negation, is a member of the set.
fn bracket_end(chars: &[char], start: usize) -> Option<usize> {
    let mut idx = start;
    if matches!(chars.get(idx), Some('!' | '^')) {
        idx += 1;
    }
    if chars.get(idx) == Some(&']') {
        idx += 1;
    }
    while idx < chars.len() {
        match chars[idx] {
            '\\' => idx += 2,
            ']' => return Some(idx),
            _ => idx += 1,
        }
    }
    None
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation() {
        assert_eq!("*.txt", translate("*.txt"));
        assert_eq!("*", translate("***"));
        assert_eq!("[*]a", translate("\\*a"));
        assert_eq!("[!a-z]", translate("[^a-z]"));
        assert_eq!("[!a-z]", translate("[!a-z]"));
        assert_eq!("a\\", translate("a\\"));
        assert_eq!("a*[*]", translate("a*\\*"));
    }

    #[test]
    fn matching() {
        let glob = ShellGlob;
        assert!(glob.matches("*.txt", "notes.txt").unwrap());
        assert!(glob.matches("*", "a/b/c").unwrap());
        assert!(glob.matches("?", "é").unwrap());
        assert!(glob.matches("[a-z]", "q").unwrap());
        assert!(!glob.matches("[a-z]", "Q").unwrap());
        assert!(glob.matches("\\*", "*").unwrap());
        assert!(!glob.matches("\\*", "x").unwrap());
    }

    #[test]
    fn prefixes_and_suffixes() {
        let glob = ShellGlob;
        let value = "/usr/local/bin";
        assert_eq!(Some(1), glob.shortest_prefix("*/", value).unwrap());
        assert_eq!(Some(11), glob.longest_prefix("*/", value).unwrap());
        assert_eq!(Some(10), glob.shortest_suffix("/*", value).unwrap());
        assert_eq!(Some(0), glob.longest_suffix("/*", value).unwrap());
        assert_eq!(None, glob.shortest_prefix("x*", value).unwrap());
        assert_eq!(None, glob.longest_suffix("*x", value).unwrap());
    }

    #[test]
    fn default_methods_agree() {
        struct Slow;
        impl Glob for Slow {
            fn matches(&self, pattern: &str, text: &str) -> Result<bool, Error> {
                ShellGlob.matches(pattern, text)
            }
        }
        let value = "aXbXcé";
        for pattern in ["*X", "X*", "a*", "*é", "?", "*"] {
            assert_eq!(
                ShellGlob.shortest_prefix(pattern, value),
                Slow.shortest_prefix(pattern, value)
            );
            assert_eq!(
                ShellGlob.longest_prefix(pattern, value),
                Slow.longest_prefix(pattern, value)
            );
            assert_eq!(
                ShellGlob.shortest_suffix(pattern, value),
                Slow.shortest_suffix(pattern, value)
            );
            assert_eq!(
                ShellGlob.longest_suffix(pattern, value),
                Slow.longest_suffix(pattern, value)
            );
        }
    }

    #[test]
    fn unclosed_sets_are_literal() {
        assert_eq!("a[[]", translate("a["));
        assert_eq!("[[]a-", translate("[a-"));
        assert_eq!("[[]!]", translate("[!]"));
        assert_eq!("[]a]", translate("[]a]"));
        assert_eq!("[!]a]", translate("[^]a]"));
        assert_eq!("[]]", translate("[\\]]"));
        let glob = ShellGlob;
        assert!(glob.matches("a[", "a[").unwrap());
        assert!(!glob.matches("a[", "a").unwrap());
        assert!(glob.matches("[a-", "[a-").unwrap());
        assert!(glob.matches("[]]", "]").unwrap());
        assert_eq!(Some(2), glob.shortest_prefix("a[", "a[b").unwrap());
    }

    #[test]
    fn matcher_agrees_with_matches() {
        struct Slow;
        impl Glob for Slow {
            fn matches(&self, pattern: &str, text: &str) -> Result<bool, Error> {
                ShellGlob.matches(pattern, text)
            }
        }
        let shell = ShellGlob;
        let slow_glob = Slow;
        for pattern in ["*.rs", "[a-c]?", "x[", "\\*"] {
            let fast = shell.matcher(pattern).unwrap();
            let slow = slow_glob.matcher(pattern).unwrap();
            for text in ["lib.rs", "b!", "x[", "*", ""] {
                assert_eq!(shell.matches(pattern, text).unwrap(), fast(text).unwrap());
                assert_eq!(fast(text).unwrap(), slow(text).unwrap());
            }
        }
    }
}

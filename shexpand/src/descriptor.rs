//! Parse a `$name` or `${...}` token into a [ParameterDescriptor].
//!
//! Parsing never fails loudly.  A token that bash would reject as a bad substitution yields `None`
//! and the caller leaves the token in the output untouched.

use crate::variable::{is_identifier, match_parameter_name, match_variable};

/////////////////////////////////////////////// Kind ///////////////////////////////////////////////

/// The operator of a parameter expansion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    /// `$name`, `${name}`
    Value,
    /// `${name:-word}`
    WithDefault,
    /// `${name-word}`
    WithDefaultUnset,
    /// `${name:=word}`
    SetDefault,
    /// `${name=word}`
    SetDefaultUnset,
    /// `${name:?word}`
    WriteError,
    /// `${name?word}`
    WriteErrorUnset,
    /// `${name:+word}`
    Alternative,
    /// `${name+word}`
    AlternativeUnset,
    /// `${name:offset}`
    Substring,
    /// `${name:offset:length}`
    SubstringLength,
    /// `${!prefix*}`, `${!prefix@}`
    PrefixNames,
    /// `${#name}`
    Length,
    /// `${name#pattern}`
    RemovePrefixShortest,
    /// `${name##pattern}`
    RemovePrefixLongest,
    /// `${name%pattern}`
    RemoveSuffixShortest,
    /// `${name%%pattern}`
    RemoveSuffixLongest,
    /// `${name/pattern/string}`
    ReplaceFirst,
    /// `${name//pattern/string}`
    ReplaceAll,
    /// `${name/#pattern/string}`
    ReplacePrefix,
    /// `${name/%pattern/string}`
    ReplaceSuffix,
    /// `${name^pattern}`
    UppercaseFirst,
    /// `${name^^pattern}`
    UppercaseAll,
    /// `${name,pattern}`
    LowercaseFirst,
    /// `${name,,pattern}`
    LowercaseAll,
    /// `${name@a}`
    Describe,
    /// `${name@A}`
    Declare,
    /// `${name@E}`
    Escape,
    /// `${name@P}`
    Prompt,
    /// `${name@Q}`
    Quote,
}

//////////////////////////////////////// ParameterDescriptor ///////////////////////////////////////

/// A parsed parameter expansion.
///
/// `operands[0]` is always the parameter name.  Ordinary names are stored without a `$`;
/// positional and special parameters keep theirs (`"$1"`, `"$*"`).  The remaining operands depend
/// upon the kind:  the word of the default family, the offset and length of a substring, the
/// pattern and replacement of a replacement, or the optional pattern of a case conversion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParameterDescriptor {
    pub kind: Kind,
    pub operands: Vec<String>,
    /// True for `${!name...}`.  Never true when the name is the literal `!`.
    pub indirect: bool,
}

impl ParameterDescriptor {
    fn new(kind: Kind, operands: Vec<String>, indirect: bool) -> Self {
        Self {
            kind,
            operands,
            indirect,
        }
    }

    fn value(name: String, indirect: bool) -> Self {
        Self::new(Kind::Value, vec![name], indirect)
    }

    // A dangling operator is a plain value expansion.
    fn with_word(kind: Kind, name: String, word: &str, indirect: bool) -> Self {
        if word.is_empty() {
            Self::value(name, indirect)
        } else {
            Self::new(kind, vec![name, word.to_string()], indirect)
        }
    }

    /// The name of the parameter.
    pub fn name(&self) -> &str {
        &self.operands[0]
    }

    /// The operand at `idx`, or the empty string if there is none.
    pub fn operand(&self, idx: usize) -> &str {
        self.operands.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Parse the exact text of a variable token, as matched by
    /// [match_variable](crate::variable::match_variable).
    pub fn parse(token: &str) -> Option<Self> {
        let rest = token.strip_prefix('$')?;
        match rest.strip_prefix('{') {
            Some(braced) => Self::parse_body(braced.strip_suffix('}')?),
            None => {
                let (name, tail) = match_parameter_name(rest)?;
                if !tail.is_empty() {
                    return None;
                }
                Some(Self::value(name, false))
            }
        }
    }

    fn parse_body(body: &str) -> Option<Self> {
        let bytes = body.as_bytes();
        if bytes.is_empty() {
            return None;
        }
        if bytes.len() == 1 {
            let (name, _) = match_parameter_name(body)?;
            return Some(Self::value(name, false));
        }
        if bytes.iter().all(u8::is_ascii_digit) {
            let (name, _) = match_parameter_name(body)?;
            return Some(Self::value(name, false));
        }
        if let Some(named) = body.strip_prefix('!') {
            let prefix = named
                .strip_suffix('*')
                .or_else(|| named.strip_suffix('@'));
            if let Some(prefix) = prefix {
                if is_identifier(prefix) {
                    return Some(Self::new(
                        Kind::PrefixNames,
                        vec![prefix.to_string()],
                        false,
                    ));
                }
            }
        }
        // `${#:-x}` is an operator applied to `$#`, not a length.
        if let Some((name, tail)) = body.strip_prefix('#').and_then(match_parameter_name) {
            if !tail.is_empty() {
                return None;
            }
            return Some(Self::new(Kind::Length, vec![name], false));
        }
        let (indirect, named) = match body.strip_prefix('!') {
            Some(named) if named.starts_with('!') => {
                return None;
            }
            Some(named) if match_parameter_name(named).is_some() => (true, named),
            _ => (false, body),
        };
        let (name, op) = match_parameter_name(named)?;
        Self::parse_operator(name, op, indirect)
    }

    fn parse_operator(name: String, op: &str, indirect: bool) -> Option<Self> {
        let Some(first) = op.chars().next() else {
            return Some(Self::value(name, indirect));
        };
        let tail = &op[first.len_utf8()..];
        match first {
            ':' => Self::parse_colon(name, tail, indirect),
            '-' => Some(Self::with_word(Kind::WithDefaultUnset, name, tail, indirect)),
            '=' => Some(Self::with_word(Kind::SetDefaultUnset, name, tail, indirect)),
            '?' => Some(Self::with_word(Kind::WriteErrorUnset, name, tail, indirect)),
            '+' => Some(Self::with_word(Kind::AlternativeUnset, name, tail, indirect)),
            '#' => Some(match tail.strip_prefix('#') {
                Some(pattern) => {
                    Self::with_word(Kind::RemovePrefixLongest, name, pattern, indirect)
                }
                None => Self::with_word(Kind::RemovePrefixShortest, name, tail, indirect),
            }),
            '%' => Some(match tail.strip_prefix('%') {
                Some(pattern) => {
                    Self::with_word(Kind::RemoveSuffixLongest, name, pattern, indirect)
                }
                None => Self::with_word(Kind::RemoveSuffixShortest, name, tail, indirect),
            }),
            '/' => Some(Self::parse_replace(name, tail, indirect)),
            '^' => Some(match tail.strip_prefix('^') {
                Some(pattern) => Self::case(Kind::UppercaseAll, name, pattern, indirect),
                None => Self::case(Kind::UppercaseFirst, name, tail, indirect),
            }),
            ',' => Some(match tail.strip_prefix(',') {
                Some(pattern) => Self::case(Kind::LowercaseAll, name, pattern, indirect),
                None => Self::case(Kind::LowercaseFirst, name, tail, indirect),
            }),
            '@' => Self::parse_transform(name, tail, indirect),
            _ => None,
        }
    }

    fn parse_colon(name: String, tail: &str, indirect: bool) -> Option<Self> {
        let Some(first) = tail.chars().next() else {
            return Some(Self::value(name, indirect));
        };
        let word = &tail[first.len_utf8()..];
        match first {
            '-' => Some(Self::with_word(Kind::WithDefault, name, word, indirect)),
            '=' => Some(Self::with_word(Kind::SetDefault, name, word, indirect)),
            '?' => Some(Self::with_word(Kind::WriteError, name, word, indirect)),
            '+' => Some(Self::with_word(Kind::Alternative, name, word, indirect)),
            _ => {
                let (offset, length) = match tail.split_once(':') {
                    Some((offset, length)) => (offset, Some(length)),
                    None => (tail, None),
                };
                let offset = parse_number(offset)?;
                match length {
                    Some(length) => {
                        let length = parse_number(length)?;
                        Some(Self::new(
                            Kind::SubstringLength,
                            vec![name, offset, length],
                            indirect,
                        ))
                    }
                    None => Some(Self::new(Kind::Substring, vec![name, offset], indirect)),
                }
            }
        }
    }

    fn parse_replace(name: String, tail: &str, indirect: bool) -> Self {
        let (kind, rest) = if let Some(rest) = tail.strip_prefix('/') {
            (Kind::ReplaceAll, rest)
        } else if let Some(rest) = tail.strip_prefix('#') {
            (Kind::ReplacePrefix, rest)
        } else if let Some(rest) = tail.strip_prefix('%') {
            (Kind::ReplaceSuffix, rest)
        } else {
            (Kind::ReplaceFirst, tail)
        };
        if rest.is_empty() {
            return Self::value(name, indirect);
        }
        let (pattern, replacement) = split_unescaped(rest, b'/');
        if pattern.is_empty() && matches!(kind, Kind::ReplaceFirst | Kind::ReplaceAll) {
            return Self::value(name, indirect);
        }
        Self::new(
            kind,
            vec![name, pattern.to_string(), replacement.to_string()],
            indirect,
        )
    }

    fn case(kind: Kind, name: String, pattern: &str, indirect: bool) -> Self {
        if pattern.is_empty() {
            Self::new(kind, vec![name], indirect)
        } else {
            Self::new(kind, vec![name, pattern.to_string()], indirect)
        }
    }

    fn parse_transform(name: String, tail: &str, indirect: bool) -> Option<Self> {
        let kind = match tail {
            "" => {
                return Some(Self::value(name, indirect));
            }
            "a" => Kind::Describe,
            "A" => Kind::Declare,
            "E" => Kind::Escape,
            "P" => Kind::Prompt,
            "Q" => Kind::Quote,
            _ => {
                return None;
            }
        };
        Some(Self::new(kind, vec![name], indirect))
    }
}

// A signed decimal integer, optionally preceded by blanks so `${x: -1}` differs from `${x:-1}`.
fn parse_number(s: &str) -> Option<String> {
    let s = s.trim_start();
    s.parse::<i64>().ok()?;
    Some(s.to_string())
}

// Split at the first unescaped `sep` outside a variable token.  Without one, the second half is
// empty.
fn split_unescaped(s: &str, sep: u8) -> (&str, &str) {
    let bytes = s.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'\\' {
            idx += 2;
            continue;
        }
        if bytes[idx] == b'$' {
            if let Some(end) = match_variable(s, idx) {
                idx = end;
                continue;
            }
        }
        if bytes[idx] == sep {
            return (&s[..idx], &s[idx + 1..]);
        }
        idx += 1;
    }
    (s, "")
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(token: &str) -> Option<ParameterDescriptor> {
        ParameterDescriptor::parse(token)
    }

    fn d(kind: Kind, operands: &[&str], indirect: bool) -> Option<ParameterDescriptor> {
        Some(ParameterDescriptor {
            kind,
            operands: operands.iter().map(|s| s.to_string()).collect(),
            indirect,
        })
    }

    #[test]
    fn values() {
        assert_eq!(d(Kind::Value, &["FOO"], false), parse("$FOO"));
        assert_eq!(d(Kind::Value, &["FOO"], false), parse("${FOO}"));
        assert_eq!(d(Kind::Value, &["x"], false), parse("${x}"));
        assert_eq!(d(Kind::Value, &["$1"], false), parse("$1"));
        assert_eq!(d(Kind::Value, &["$1"], false), parse("${1}"));
        assert_eq!(d(Kind::Value, &["$10"], false), parse("${10}"));
        assert_eq!(d(Kind::Value, &["$*"], false), parse("$*"));
        assert_eq!(d(Kind::Value, &["$#"], false), parse("${#}"));
        assert_eq!(d(Kind::Value, &["$!"], false), parse("${!}"));
        assert_eq!(d(Kind::Value, &["$$"], false), parse("$$"));
    }

    #[test]
    fn rejected() {
        assert_eq!(None, parse("${}"));
        assert_eq!(None, parse("${01}"));
        assert_eq!(None, parse("${FOO BAR}"));
        assert_eq!(None, parse("${:-x}"));
        assert_eq!(None, parse("${FOO:x}"));
        assert_eq!(None, parse("${FOO:1:x}"));
        assert_eq!(None, parse("${FOO@x}"));
        assert_eq!(None, parse("${FOO@QQ}"));
        assert_eq!(None, parse("${FOO;}"));
        assert_eq!(None, parse("$"));
        assert_eq!(None, parse("FOO"));
    }

    #[test]
    fn double_bang_is_never_indirect() {
        for token in [
            "${!!}",
            "${!!:-x}",
            "${!!-x}",
            "${!!:=x}",
            "${!!:?x}",
            "${!!:+x}",
            "${!!:1}",
            "${!!:1:2}",
            "${!!#x}",
            "${!!##x}",
            "${!!%x}",
            "${!!/x/y}",
            "${!!^}",
            "${!!*}",
        ] {
            assert_eq!(None, parse(token), "token={token:?}");
        }
    }

    #[test]
    fn indirect() {
        assert_eq!(d(Kind::Value, &["FOO"], true), parse("${!FOO}"));
        assert_eq!(
            d(Kind::WithDefault, &["FOO", "x"], true),
            parse("${!FOO:-x}")
        );
        assert_eq!(d(Kind::Value, &["$1"], true), parse("${!1}"));
        assert_eq!(
            d(Kind::WithDefault, &["$!", "x"], false),
            parse("${!:-x}")
        );
    }

    #[test]
    fn prefix_names() {
        assert_eq!(d(Kind::PrefixNames, &["FOO"], false), parse("${!FOO*}"));
        assert_eq!(d(Kind::PrefixNames, &["FOO"], false), parse("${!FOO@}"));
    }

    #[test]
    fn length() {
        assert_eq!(d(Kind::Length, &["FOO"], false), parse("${#FOO}"));
        assert_eq!(d(Kind::Length, &["$*"], false), parse("${#*}"));
        assert_eq!(d(Kind::Length, &["$@"], false), parse("${#@}"));
        assert_eq!(d(Kind::Length, &["$12"], false), parse("${#12}"));
        assert_eq!(None, parse("${#FOO:-x}"));
        assert_eq!(None, parse("${#FOO#x}"));
        assert_eq!(d(Kind::WithDefault, &["$#", "x"], false), parse("${#:-x}"));
    }

    #[test]
    fn defaults() {
        assert_eq!(
            d(Kind::WithDefault, &["FOO", "bar baz"], false),
            parse("${FOO:-bar baz}")
        );
        assert_eq!(
            d(Kind::SetDefault, &["FOO", "x"], false),
            parse("${FOO:=x}")
        );
        assert_eq!(
            d(Kind::WriteError, &["FOO", "unset"], false),
            parse("${FOO:?unset}")
        );
        assert_eq!(
            d(Kind::Alternative, &["FOO", "${BAR}"], false),
            parse("${FOO:+${BAR}}")
        );
        assert_eq!(
            d(Kind::WithDefaultUnset, &["FOO", "x"], false),
            parse("${FOO-x}")
        );
        assert_eq!(
            d(Kind::SetDefaultUnset, &["FOO", "x"], false),
            parse("${FOO=x}")
        );
        assert_eq!(
            d(Kind::WriteErrorUnset, &["FOO", "x"], false),
            parse("${FOO?x}")
        );
        assert_eq!(
            d(Kind::AlternativeUnset, &["FOO", "x"], false),
            parse("${FOO+x}")
        );
    }

    #[test]
    fn dangling_operators_are_values() {
        for token in [
            "${FOO:}", "${FOO:-}", "${FOO:=}", "${FOO:?}", "${FOO:+}", "${FOO-}", "${FOO#}",
            "${FOO##}", "${FOO%}", "${FOO%%}", "${FOO/}", "${FOO//}", "${FOO@}",
        ] {
            assert_eq!(d(Kind::Value, &["FOO"], false), parse(token), "token={token:?}");
        }
    }

    #[test]
    fn substrings() {
        assert_eq!(
            d(Kind::Substring, &["FOO", "3"], false),
            parse("${FOO:3}")
        );
        assert_eq!(
            d(Kind::SubstringLength, &["FOO", "3", "4"], false),
            parse("${FOO:3:4}")
        );
        assert_eq!(
            d(Kind::Substring, &["FOO", "-3"], false),
            parse("${FOO: -3}")
        );
        assert_eq!(
            d(Kind::SubstringLength, &["FOO", "1", "-1"], false),
            parse("${FOO:1:-1}")
        );
        assert_eq!(None, parse("${FOO:1:}"));
        assert_eq!(None, parse("${FOO:99999999999999999999}"));
    }

    #[test]
    fn removals() {
        assert_eq!(
            d(Kind::RemovePrefixShortest, &["FOO", "*/"], false),
            parse("${FOO#*/}")
        );
        assert_eq!(
            d(Kind::RemovePrefixLongest, &["FOO", "*/"], false),
            parse("${FOO##*/}")
        );
        assert_eq!(
            d(Kind::RemoveSuffixShortest, &["FOO", ".*"], false),
            parse("${FOO%.*}")
        );
        assert_eq!(
            d(Kind::RemoveSuffixLongest, &["FOO", ".*"], false),
            parse("${FOO%%.*}")
        );
        assert_eq!(
            d(Kind::RemovePrefixShortest, &["$*", "[a-z]"], false),
            parse("${*#[a-z]}")
        );
    }

    #[test]
    fn replacements() {
        assert_eq!(
            d(Kind::ReplaceFirst, &["FOO", "a", "b"], false),
            parse("${FOO/a/b}")
        );
        assert_eq!(
            d(Kind::ReplaceAll, &["FOO", "a", "b"], false),
            parse("${FOO//a/b}")
        );
        assert_eq!(
            d(Kind::ReplacePrefix, &["FOO", "a", "b"], false),
            parse("${FOO/#a/b}")
        );
        assert_eq!(
            d(Kind::ReplaceSuffix, &["FOO", "a", "b"], false),
            parse("${FOO/%a/b}")
        );
        assert_eq!(
            d(Kind::ReplaceFirst, &["FOO", "a", ""], false),
            parse("${FOO/a}")
        );
        assert_eq!(
            d(Kind::ReplaceAll, &["FOO", "a\\/b", "c/d"], false),
            parse("${FOO//a\\/b/c/d}")
        );
        assert_eq!(
            d(Kind::ReplacePrefix, &["FOO", "", "pre"], false),
            parse("${FOO/#/pre}")
        );
    }

    #[test]
    fn replace_with_nested_pattern() {
        assert_eq!(
            d(Kind::ReplaceFirst, &["V", "${P%/*}", "ROOT"], false),
            parse("${V/${P%/*}/ROOT}")
        );
        assert_eq!(
            d(Kind::ReplaceAll, &["V", "$P", "${Q//a/b}"], false),
            parse("${V//$P/${Q//a/b}}")
        );
    }

    #[test]
    fn case_conversion() {
        assert_eq!(d(Kind::UppercaseFirst, &["FOO"], false), parse("${FOO^}"));
        assert_eq!(d(Kind::UppercaseAll, &["FOO"], false), parse("${FOO^^}"));
        assert_eq!(
            d(Kind::UppercaseAll, &["FOO", "[aeiou]"], false),
            parse("${FOO^^[aeiou]}")
        );
        assert_eq!(d(Kind::LowercaseFirst, &["FOO"], false), parse("${FOO,}"));
        assert_eq!(
            d(Kind::LowercaseAll, &["FOO", "X"], false),
            parse("${FOO,,X}")
        );
    }

    #[test]
    fn transforms() {
        assert_eq!(d(Kind::Describe, &["FOO"], false), parse("${FOO@a}"));
        assert_eq!(d(Kind::Declare, &["FOO"], false), parse("${FOO@A}"));
        assert_eq!(d(Kind::Escape, &["FOO"], false), parse("${FOO@E}"));
        assert_eq!(d(Kind::Prompt, &["FOO"], false), parse("${FOO@P}"));
        assert_eq!(d(Kind::Quote, &["FOO"], false), parse("${FOO@Q}"));
    }

    #[test]
    fn accessors() {
        let desc = ParameterDescriptor::parse("${FOO:-bar}").unwrap();
        assert_eq!("FOO", desc.name());
        assert_eq!("bar", desc.operand(1));
        assert_eq!("", desc.operand(2));
    }
}

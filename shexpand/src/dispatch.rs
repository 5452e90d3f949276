//! Evaluate parameter expansions against an [Environment] and a [Glob].

use indicio::{clue, ERROR, INFO};

use crate::descriptor::{Kind, ParameterDescriptor};
use crate::pattern::boundaries;
use crate::variable::match_variable;
use crate::{tilde, Environment, Error, Glob, COLLECTOR};

//////////////////////////////////////////// biometrics ////////////////////////////////////////////

static PARAMETER_EXPANDED: biometrics::Counter =
    biometrics::Counter::new("shexpand.parameter.expanded");
static MALFORMED_PARAMETER: biometrics::Counter =
    biometrics::Counter::new("shexpand.parameter.malformed");
static ASSIGNMENT: biometrics::Counter = biometrics::Counter::new("shexpand.parameter.assignment");

pub(crate) fn register_biometrics(collector: &biometrics::Collector) {
    collector.register_counter(&PARAMETER_EXPANDED);
    collector.register_counter(&MALFORMED_PARAMETER);
    collector.register_counter(&ASSIGNMENT);
}

//////////////////////////////////////////// Positional ////////////////////////////////////////////

/// The values of `$1` through `$N`, where `N` is the value of `$#`.
pub struct Positional<'a> {
    env: &'a dyn Environment,
    next: usize,
    count: usize,
}

impl<'a> Positional<'a> {
    pub fn new(env: &'a dyn Environment) -> Self {
        let count = env
            .lookup_var("$#")
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);
        Self {
            env,
            next: 1,
            count,
        }
    }
}

impl Iterator for Positional<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.next > self.count {
            return None;
        }
        let value = self
            .env
            .lookup_var(&format!("${}", self.next))
            .unwrap_or_default();
        self.next += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count + 1).saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

//////////////////////////////////////////// Dispatcher ////////////////////////////////////////////

/// A Dispatcher expands every parameter of a string.
pub struct Dispatcher<'a> {
    env: &'a mut dyn Environment,
    glob: &'a dyn Glob,
    abort_on_write_error: bool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(env: &'a mut dyn Environment, glob: &'a dyn Glob) -> Self {
        Self {
            env,
            glob,
            abort_on_write_error: false,
        }
    }

    /// Make `${name:?word}` fail with [Error::Requested] instead of substituting its message.
    pub fn abort_on_write_error(mut self, abort: bool) -> Self {
        self.abort_on_write_error = abort;
        self
    }

    /// Replace every well-formed parameter token in `input` with its value.  Malformed tokens are
    /// left as written.  Backslash escapes are skipped and left in place.
    pub fn expand_parameters(&mut self, input: &str) -> Result<String, Error> {
        let bytes = input.as_bytes();
        let mut output = String::with_capacity(input.len());
        let mut copied = 0;
        let mut idx = 0;
        while idx < bytes.len() {
            match bytes[idx] {
                b'\\' => {
                    idx += 2;
                    continue;
                }
                b'$' => {
                    if let Some(end) = match_variable(input, idx) {
                        let token = &input[idx..end];
                        match ParameterDescriptor::parse(token) {
                            Some(desc) => {
                                PARAMETER_EXPANDED.click();
                                output.push_str(&input[copied..idx]);
                                output.push_str(&self.evaluate(&desc)?);
                                copied = end;
                            }
                            None => {
                                MALFORMED_PARAMETER.click();
                                clue!(COLLECTOR, INFO, {
                                    malformed_parameter: token,
                                });
                            }
                        }
                        idx = end;
                        continue;
                    }
                }
                _ => {}
            }
            idx += 1;
        }
        output.push_str(&input[copied..]);
        Ok(output)
    }

    /// Expand an operand word:  a leading tilde, then parameters.  Braces are never expanded and
    /// escapes are left for the final stage of the enclosing expansion.
    pub fn expand_word(&mut self, word: &str) -> Result<String, Error> {
        let word = tilde::expand_tilde_prefix(&*self.env, word);
        self.expand_parameters(&word)
    }

    /// Evaluate one parsed parameter expansion.
    pub fn evaluate(&mut self, desc: &ParameterDescriptor) -> Result<String, Error> {
        let name = self.resolve_name(desc);
        if name != "$*" && name != "$@" {
            let value = self.env.lookup_var(&name);
            return self.apply(desc, &name, value);
        }
        let values = Positional::new(&*self.env).collect::<Vec<_>>();
        match desc.kind {
            Kind::Length => Ok(values.len().to_string()),
            Kind::Substring | Kind::SubstringLength => {
                let mut list = vec![self.env.lookup_var("$0").unwrap_or_default()];
                list.extend(values);
                Ok(slice(&list, desc.operand(1), substring_length(desc)).join(" "))
            }
            Kind::WithDefault
            | Kind::WithDefaultUnset
            | Kind::SetDefault
            | Kind::SetDefaultUnset
            | Kind::WriteError
            | Kind::WriteErrorUnset
            | Kind::Alternative
            | Kind::AlternativeUnset => {
                let value = if values.is_empty() {
                    None
                } else {
                    Some(values.join(" "))
                };
                self.apply(desc, &name, value)
            }
            _ => {
                let mut results = Vec::with_capacity(values.len());
                for value in values {
                    results.push(self.apply(desc, &name, Some(value))?);
                }
                Ok(results.join(" "))
            }
        }
    }

    // One hop of indirection.  A value that names a positional or special parameter gets its `$`.
    fn resolve_name(&self, desc: &ParameterDescriptor) -> String {
        if !desc.indirect {
            return desc.name().to_string();
        }
        let target = self.env.lookup_var(desc.name()).unwrap_or_default();
        let bytes = target.as_bytes();
        let positional = !bytes.is_empty() && bytes.iter().all(u8::is_ascii_digit);
        let special = bytes.len() == 1 && crate::variable::is_special(bytes[0]);
        if positional || special {
            format!("${}", target)
        } else {
            target
        }
    }

    fn apply(
        &mut self,
        desc: &ParameterDescriptor,
        name: &str,
        value: Option<String>,
    ) -> Result<String, Error> {
        let is_set = value.is_some();
        let value = value.unwrap_or_default();
        match desc.kind {
            Kind::Value => Ok(value),
            Kind::WithDefault => {
                if value.is_empty() {
                    self.expand_word(desc.operand(1))
                } else {
                    Ok(value)
                }
            }
            Kind::WithDefaultUnset => {
                if !is_set {
                    self.expand_word(desc.operand(1))
                } else {
                    Ok(value)
                }
            }
            Kind::SetDefault => {
                if value.is_empty() {
                    self.set_default(name, desc.operand(1))
                } else {
                    Ok(value)
                }
            }
            Kind::SetDefaultUnset => {
                if !is_set {
                    self.set_default(name, desc.operand(1))
                } else {
                    Ok(value)
                }
            }
            Kind::WriteError => {
                if value.is_empty() {
                    self.write_error(name, desc.operand(1))
                } else {
                    Ok(value)
                }
            }
            Kind::WriteErrorUnset => {
                if !is_set {
                    self.write_error(name, desc.operand(1))
                } else {
                    Ok(value)
                }
            }
            Kind::Alternative => {
                if value.is_empty() {
                    Ok(String::new())
                } else {
                    self.expand_word(desc.operand(1))
                }
            }
            Kind::AlternativeUnset => {
                if is_set {
                    self.expand_word(desc.operand(1))
                } else {
                    Ok(String::new())
                }
            }
            Kind::Substring | Kind::SubstringLength => {
                let chars = value.chars().collect::<Vec<_>>();
                Ok(slice(&chars, desc.operand(1), substring_length(desc))
                    .iter()
                    .collect())
            }
            Kind::PrefixNames => {
                let mut names = self.env.match_var_names(desc.name());
                names.sort();
                Ok(names.join(" "))
            }
            Kind::Length => Ok(value.chars().count().to_string()),
            Kind::RemovePrefixShortest => {
                let pattern = self.expand_word(desc.operand(1))?;
                Ok(match self.glob.shortest_prefix(&pattern, &value)? {
                    Some(idx) => value[idx..].to_string(),
                    None => value,
                })
            }
            Kind::RemovePrefixLongest => {
                let pattern = self.expand_word(desc.operand(1))?;
                Ok(match self.glob.longest_prefix(&pattern, &value)? {
                    Some(idx) => value[idx..].to_string(),
                    None => value,
                })
            }
            Kind::RemoveSuffixShortest => {
                let pattern = self.expand_word(desc.operand(1))?;
                Ok(match self.glob.shortest_suffix(&pattern, &value)? {
                    Some(idx) => value[..idx].to_string(),
                    None => value,
                })
            }
            Kind::RemoveSuffixLongest => {
                let pattern = self.expand_word(desc.operand(1))?;
                Ok(match self.glob.longest_suffix(&pattern, &value)? {
                    Some(idx) => value[..idx].to_string(),
                    None => value,
                })
            }
            Kind::ReplaceFirst | Kind::ReplaceAll => {
                let pattern = self.expand_word(desc.operand(1))?;
                let replacement = self.expand_word(desc.operand(2))?;
                self.replace(&value, &pattern, &replacement, desc.kind == Kind::ReplaceAll)
            }
            Kind::ReplacePrefix => {
                let pattern = self.expand_word(desc.operand(1))?;
                let replacement = self.expand_word(desc.operand(2))?;
                Ok(match self.glob.longest_prefix(&pattern, &value)? {
                    Some(idx) => format!("{}{}", replacement, &value[idx..]),
                    None => value,
                })
            }
            Kind::ReplaceSuffix => {
                let pattern = self.expand_word(desc.operand(1))?;
                let replacement = self.expand_word(desc.operand(2))?;
                Ok(match self.glob.longest_suffix(&pattern, &value)? {
                    Some(idx) => format!("{}{}", &value[..idx], replacement),
                    None => value,
                })
            }
            Kind::UppercaseFirst => self.convert_case(&value, desc.operand(1), true, false),
            Kind::UppercaseAll => self.convert_case(&value, desc.operand(1), true, true),
            Kind::LowercaseFirst => self.convert_case(&value, desc.operand(1), false, false),
            Kind::LowercaseAll => self.convert_case(&value, desc.operand(1), false, true),
            // TODO(rescrv): give @Q and @E their own quoting rules.
            Kind::Describe | Kind::Declare | Kind::Escape | Kind::Prompt | Kind::Quote => {
                Ok(value)
            }
        }
    }

    fn set_default(&mut self, name: &str, word: &str) -> Result<String, Error> {
        let word = self.expand_word(word)?;
        ASSIGNMENT.click();
        if let Err(err) = self.env.assign_to_var(name, &word) {
            clue!(COLLECTOR, ERROR, {
                assignment_failed: name,
                what: err.to_string(),
            });
            return Err(err);
        }
        Ok(self.env.lookup_var(name).unwrap_or_default())
    }

    fn write_error(&mut self, name: &str, word: &str) -> Result<String, Error> {
        let word = self.expand_word(word)?;
        let name = name.strip_prefix('$').unwrap_or(name);
        let message = format!("{}: {}", name, word);
        if self.abort_on_write_error {
            Err(Error::Requested(message))
        } else {
            Ok(message)
        }
    }

    // Replace the longest nonempty match at the leftmost position, or at every position when
    // `all` is set.  An empty value is replaced only when the pattern matches the empty string.
    fn replace(
        &self,
        value: &str,
        pattern: &str,
        replacement: &str,
        all: bool,
    ) -> Result<String, Error> {
        let glob = self.glob;
        let matches = glob.matcher(pattern)?;
        if value.is_empty() {
            return Ok(if matches("")? {
                replacement.to_string()
            } else {
                String::new()
            });
        }
        let mut output = String::with_capacity(value.len());
        let mut idx = 0;
        while idx < value.len() {
            let rest = &value[idx..];
            let mut matched = None;
            for end in boundaries(rest).rev().take_while(|end| *end > 0) {
                if matches(&rest[..end])? {
                    matched = Some(end);
                    break;
                }
            }
            if let Some(len) = matched {
                output.push_str(replacement);
                idx += len;
                if !all {
                    break;
                }
                continue;
            }
            let len = rest.chars().next().map(char::len_utf8).unwrap_or(1);
            output.push_str(&rest[..len]);
            idx += len;
        }
        output.push_str(&value[idx..]);
        Ok(output)
    }

    fn convert_case(
        &mut self,
        value: &str,
        pattern: &str,
        upper: bool,
        all: bool,
    ) -> Result<String, Error> {
        let pattern = self.expand_word(pattern)?;
        let glob = self.glob;
        let matches = if pattern.is_empty() {
            None
        } else {
            Some(glob.matcher(&pattern)?)
        };
        let mut output = String::with_capacity(value.len());
        let mut buf = [0u8; 4];
        for (idx, c) in value.char_indices() {
            if idx > 0 && !all {
                output.push_str(&value[idx..]);
                break;
            }
            let selected = match &matches {
                Some(matches) => matches(c.encode_utf8(&mut buf))?,
                None => true,
            };
            if selected {
                if upper {
                    output.extend(c.to_uppercase());
                } else {
                    output.extend(c.to_lowercase());
                }
            } else {
                output.push(c);
            }
        }
        Ok(output)
    }
}

fn substring_length(desc: &ParameterDescriptor) -> Option<&str> {
    match desc.kind {
        Kind::SubstringLength => Some(desc.operand(2)),
        _ => None,
    }
}

// Slice `items` the way `${name:offset:length}` does.  A negative offset counts back from the
// end; a negative length is an end offset counted back from the end.  Out of range is empty.
fn slice<'a, T>(items: &'a [T], offset: &str, length: Option<&str>) -> &'a [T] {
    let len = items.len() as i64;
    let offset = offset.trim_start().parse::<i64>().unwrap_or(0);
    let start = if offset < 0 { len + offset } else { offset };
    if start < 0 || start > len {
        return &[];
    }
    let end = match length.map(|l| l.trim_start().parse::<i64>().unwrap_or(0)) {
        None => len,
        Some(length) if length >= 0 => start.saturating_add(length).min(len),
        Some(length) => len + length,
    };
    if end < start {
        return &[];
    }
    &items[start as usize..end as usize]
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

//! Tilde expansion of a leading `~`, `~+`, `~-`, or `~user` on each word.

use crate::variable::match_variable;
use crate::Environment;

//////////////////////////////////////////// biometrics ////////////////////////////////////////////

static TILDE_EXPANDED: biometrics::Counter = biometrics::Counter::new("shexpand.tilde.expanded");
static TILDE_UNRESOLVED: biometrics::Counter =
    biometrics::Counter::new("shexpand.tilde.unresolved");

pub(crate) fn register_biometrics(collector: &biometrics::Collector) {
    collector.register_counter(&TILDE_EXPANDED);
    collector.register_counter(&TILDE_UNRESOLVED);
}

//////////////////////////////////////////// TildePrefix ///////////////////////////////////////////

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TildeKind {
    /// `~`:  the value of `HOME`.
    Home,
    /// `~+`:  the value of `PWD`.
    Pwd,
    /// `~-`:  the value of `OLDPWD`.
    OldPwd,
    /// `~user`:  the home directory of `user`.
    Username,
}

/// The classification of the text between a `~` and the first `/` of a word.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TildePrefix {
    pub kind: TildeKind,
    /// Empty unless `kind` is `Username`.
    pub username: String,
}

impl TildePrefix {
    /// Classify the prefix that follows the `~`.  Returns `None` if the prefix cannot be a login
    /// name, e.g. because it holds a quote or a variable.
    pub fn parse(prefix: &str) -> Option<Self> {
        let kind = match prefix {
            "" => TildeKind::Home,
            "+" => TildeKind::Pwd,
            "-" => TildeKind::OldPwd,
            _ => {
                if !prefix
                    .bytes()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, b'_' | b'-' | b'.'))
                {
                    return None;
                }
                return Some(Self {
                    kind: TildeKind::Username,
                    username: prefix.to_string(),
                });
            }
        };
        Some(Self {
            kind,
            username: String::new(),
        })
    }

    /// Resolve the prefix against the environment.
    pub fn resolve(&self, env: &dyn Environment) -> Option<String> {
        match self.kind {
            TildeKind::Home => env.lookup_var("HOME"),
            TildeKind::Pwd => env.lookup_var("PWD"),
            TildeKind::OldPwd => env.lookup_var("OLDPWD"),
            TildeKind::Username => env.lookup_home_dir(&self.username),
        }
    }
}

/////////////////////////////////////////////// expand /////////////////////////////////////////////

/// Expand the tilde prefix of every space-separated word in the input.  Prefixes that do not
/// resolve are left as written.
pub fn expand_tilde(env: &dyn Environment, input: &str) -> String {
    let bytes = input.as_bytes();
    let mut output = String::with_capacity(input.len());
    let mut copied = 0;
    let mut at_word_start = true;
    let mut idx = 0;
    while idx < bytes.len() {
        if at_word_start {
            at_word_start = false;
            if let Some((end, dir)) = rewrite_prefix(env, input, idx) {
                output.push_str(&input[copied..idx]);
                output.push_str(&dir);
                copied = end;
                idx = end;
                continue;
            }
        }
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
                at_word_start = true;
            }
            _ => {}
        }
        idx += 1;
    }
    output.push_str(&input[copied..]);
    output
}

/// Expand the tilde prefix at the very start of `word` only.
pub fn expand_tilde_prefix(env: &dyn Environment, word: &str) -> String {
    match rewrite_prefix(env, word, 0) {
        Some((end, dir)) => format!("{}{}", dir, &word[end..]),
        None => word.to_string(),
    }
}

// If a tilde prefix starts at `start`, return where the prefix ends and what replaces it.
fn rewrite_prefix(env: &dyn Environment, input: &str, start: usize) -> Option<(usize, String)> {
    let bytes = input.as_bytes();
    if bytes.get(start) != Some(&b'~') {
        return None;
    }
    let end = bytes[start + 1..]
        .iter()
        .position(|c| *c == b'/' || *c == b' ')
        .map(|len| start + 1 + len)
        .unwrap_or(bytes.len());
    let prefix = TildePrefix::parse(&input[start + 1..end])?;
    match prefix.resolve(env) {
        Some(dir) => {
            TILDE_EXPANDED.click();
            Some((end, dir))
        }
        None => {
            TILDE_UNRESOLVED.click();
            None
        }
    }
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{Environment, Error};

///////////////////////////////////////////// Variables ////////////////////////////////////////////

/// Variables is an in-memory [Environment].
///
/// It holds ordinary variables, the positional parameters, the program name (`$0`), a table of
/// home directories, and the set of names that refuse assignment.  Special parameters other than
/// `$0`, `$#`, `$*`, `$@`, and `$1`..`$N` are ordinary entries stored under their `$` name.
#[derive(Clone, Debug, Default)]
pub struct Variables {
    vars: BTreeMap<String, String>,
    positional: Vec<String>,
    program_name: Option<String>,
    home_dirs: HashMap<String, String>,
    readonly: HashSet<String>,
}

impl Variables {
    /// Create an empty set of variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the variables of this process.  Values that are not UTF-8 are skipped.  The home
    /// directory of `$USER` is `$HOME`.
    pub fn from_env() -> Self {
        let mut vars = Self::new();
        for (key, value) in std::env::vars_os() {
            if let (Some(key), Some(value)) = (key.to_str(), value.to_str()) {
                vars.set_var(key, value);
            }
        }
        if let (Some(user), Some(home)) = (vars.lookup_var("USER"), vars.lookup_var("HOME")) {
            vars.set_home_dir(user, home);
        }
        vars
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_var(name, value);
        self
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn unset_var(&mut self, name: &str) {
        self.vars.remove(name);
    }

    pub fn with_positional<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.set_positional(args);
        self
    }

    /// Replace the positional parameters `$1`..`$N`.
    pub fn set_positional<S: Into<String>>(&mut self, args: impl IntoIterator<Item = S>) {
        self.positional = args.into_iter().map(Into::into).collect();
    }

    /// Set `$0`.
    pub fn set_program_name(&mut self, name: impl Into<String>) {
        self.program_name = Some(name.into());
    }

    pub fn with_home_dir(mut self, username: impl Into<String>, dir: impl Into<String>) -> Self {
        self.set_home_dir(username, dir);
        self
    }

    pub fn set_home_dir(&mut self, username: impl Into<String>, dir: impl Into<String>) {
        self.home_dirs.insert(username.into(), dir.into());
    }

    /// Refuse any future assignment to `name`.
    pub fn set_readonly(&mut self, name: impl Into<String>) {
        self.readonly.insert(name.into());
    }
}

impl Environment for Variables {
    fn lookup_var(&self, name: &str) -> Option<String> {
        match name {
            "$#" => Some(self.positional.len().to_string()),
            "$*" | "$@" => Some(self.positional.join(" ")),
            "$0" => self.program_name.clone(),
            _ => {
                if let Some(idx) = name.strip_prefix('$').and_then(|n| n.parse::<usize>().ok()) {
                    idx.checked_sub(1)
                        .and_then(|idx| self.positional.get(idx))
                        .cloned()
                } else {
                    self.vars.get(name).cloned()
                }
            }
        }
    }

    fn assign_to_var(&mut self, name: &str, value: &str) -> Result<(), Error> {
        if name.starts_with('$') {
            return Err(Error::assignment_failed(name, "cannot assign in this way"));
        }
        if self.readonly.contains(name) {
            return Err(Error::assignment_failed(name, "readonly variable"));
        }
        self.set_var(name, value);
        Ok(())
    }

    fn lookup_home_dir(&self, username: &str) -> Option<String> {
        self.home_dirs.get(username).cloned()
    }

    fn match_var_names(&self, prefix: &str) -> Vec<String> {
        self.vars
            .keys()
            .filter(|k| !k.starts_with('$') && k.starts_with(prefix))
            .cloned()
            .collect()
    }
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary() {
        let mut vars = Variables::new().with_var("FOO", "foo");
        assert_eq!(Some("foo".to_string()), vars.lookup_var("FOO"));
        assert_eq!(None, vars.lookup_var("BAR"));
        vars.assign_to_var("BAR", "bar").unwrap();
        assert_eq!(Some("bar".to_string()), vars.lookup_var("BAR"));
        vars.unset_var("FOO");
        assert_eq!(None, vars.lookup_var("FOO"));
    }

    #[test]
    fn positional() {
        let mut vars = Variables::new().with_positional(["a", "b", "c"]);
        assert_eq!(Some("3".to_string()), vars.lookup_var("$#"));
        assert_eq!(Some("a b c".to_string()), vars.lookup_var("$*"));
        assert_eq!(Some("a b c".to_string()), vars.lookup_var("$@"));
        assert_eq!(Some("b".to_string()), vars.lookup_var("$2"));
        assert_eq!(None, vars.lookup_var("$4"));
        assert_eq!(None, vars.lookup_var("$0"));
        vars.set_program_name("prog");
        assert_eq!(Some("prog".to_string()), vars.lookup_var("$0"));
        assert_eq!(Some("0".to_string()), Variables::new().lookup_var("$#"));
    }

    #[test]
    fn special_parameters_are_plain_entries() {
        let vars = Variables::new().with_var("$?", "1").with_var("$$", "4242");
        assert_eq!(Some("1".to_string()), vars.lookup_var("$?"));
        assert_eq!(Some("4242".to_string()), vars.lookup_var("$$"));
        assert!(vars.match_var_names("").is_empty());
    }

    #[test]
    fn refused_assignments() {
        let mut vars = Variables::new().with_var("RO", "x");
        vars.set_readonly("RO");
        assert_eq!(
            Err(Error::assignment_failed("RO", "readonly variable")),
            vars.assign_to_var("RO", "y")
        );
        assert_eq!(
            Err(Error::assignment_failed("$1", "cannot assign in this way")),
            vars.assign_to_var("$1", "y")
        );
        assert_eq!(Some("x".to_string()), vars.lookup_var("RO"));
    }

    #[test]
    fn names_are_sorted() {
        let vars = Variables::new()
            .with_var("PATH", "")
            .with_var("PAGER", "")
            .with_var("HOME", "");
        assert_eq!(
            vec!["PAGER".to_string(), "PATH".to_string()],
            vars.match_var_names("PA")
        );
    }

    #[test]
    fn home_dirs() {
        let vars = Variables::new().with_home_dir("alice", "/home/alice");
        assert_eq!(Some("/home/alice".to_string()), vars.lookup_home_dir("alice"));
        assert_eq!(None, vars.lookup_home_dir("bob"));
    }
}

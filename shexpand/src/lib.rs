//! shexpand performs the expansions a bash-like shell applies to a string before word splitting:
//! brace expansion, tilde expansion, and parameter expansion, followed by removal of backslash
//! escapes.
//!
//! The library does no I/O of its own.  Variables, home directories, and glob matching are
//! provided by the caller through the [Environment] and [Glob] traits.
//!
//! ```
//! use shexpand::{expand, Variables};
//!
//! let mut vars = Variables::new().with_var("NAME", "world");
//! assert_eq!("hello-world.txt hello-world.bak", expand(&mut vars, "hello-${NAME}{.txt,.bak}").unwrap());
//! ```

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

pub mod brace;
pub mod descriptor;
pub mod dispatch;
mod env;
pub mod pattern;
pub mod tilde;
pub mod unescape;
pub mod variable;

pub use descriptor::{Kind, ParameterDescriptor};
pub use env::Variables;
pub use pattern::{Glob, Matcher, ShellGlob};

//////////////////////////////////////////// biometrics ////////////////////////////////////////////

static EXPAND: biometrics::Counter = biometrics::Counter::new("shexpand.expand");
static ASSIGNMENT_FAILED: biometrics::Counter =
    biometrics::Counter::new("shexpand.error.assignment_failed");
static INVALID_GLOB: biometrics::Counter = biometrics::Counter::new("shexpand.error.invalid_glob");
static MISMATCHED_BRACE: biometrics::Counter =
    biometrics::Counter::new("shexpand.error.mismatched_brace");

/// Registers this crate's biometrics with the provided Collector.
pub fn register_biometrics(collector: &biometrics::Collector) {
    collector.register_counter(&EXPAND);
    collector.register_counter(&ASSIGNMENT_FAILED);
    collector.register_counter(&INVALID_GLOB);
    collector.register_counter(&MISMATCHED_BRACE);
    brace::register_biometrics(collector);
    dispatch::register_biometrics(collector);
    tilde::register_biometrics(collector);
}

////////////////////////////////////////////// indicio /////////////////////////////////////////////

/// The collector for clues emitted while expanding.
pub static COLLECTOR: indicio::Collector = indicio::Collector::new();

/////////////////////////////////////////////// Error //////////////////////////////////////////////

/// An error occurred during expansion.
///
/// Malformed expansion syntax is never an error; it is left in the output untouched.  The only
/// errors that abort an expansion come from the caller's collaborators.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// An opening brace has no matching closing brace.
    MismatchedBrace {
        /// Byte offset of the unmatched `{`.
        offset: usize,
    },
    /// A closing brace has no matching opening brace.
    MismatchedClosingBrace {
        /// Byte offset of the unmatched `}`.
        offset: usize,
    },
    /// The environment refused to assign a variable.
    AssignmentFailed { name: String, what: String },
    /// The glob engine rejected a pattern.
    InvalidGlob { pattern: String, what: String },
    /// The user-requested ${FOO:?ERROR MESSAGE} form, for callers that want to abort rather than
    /// substitute the message.
    Requested(String),
}

impl Error {
    /// Construct a mismatched brace error.
    pub fn mismatched_brace(offset: usize) -> Self {
        MISMATCHED_BRACE.click();
        Self::MismatchedBrace { offset }
    }

    /// Construct a mismatched closing brace error.
    pub fn mismatched_closing_brace(offset: usize) -> Self {
        MISMATCHED_BRACE.click();
        Self::MismatchedClosingBrace { offset }
    }

    /// Construct an error for a failed assignment.
    pub fn assignment_failed(name: impl AsRef<str>, what: impl AsRef<str>) -> Self {
        ASSIGNMENT_FAILED.click();
        Self::AssignmentFailed {
            name: name.as_ref().to_string(),
            what: what.as_ref().to_string(),
        }
    }

    /// Construct an error for an invalid glob pattern.
    pub fn invalid_glob(pattern: impl AsRef<str>, what: impl AsRef<str>) -> Self {
        INVALID_GLOB.click();
        Self::InvalidGlob {
            pattern: pattern.as_ref().to_string(),
            what: what.as_ref().to_string(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::MismatchedBrace { offset } => {
                write!(f, "mismatched brace: '{{' at offset {} is never closed", offset)
            }
            Error::MismatchedClosingBrace { offset } => {
                write!(f, "mismatched closing brace: '}}' at offset {} is never opened", offset)
            }
            Error::AssignmentFailed { name, what } => {
                write!(f, "cannot assign to {}: {}", name, what)
            }
            Error::InvalidGlob { pattern, what } => {
                write!(f, "invalid glob pattern {:?}: {}", pattern, what)
            }
            Error::Requested(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for Error {}

//////////////////////////////////////////// Environment ///////////////////////////////////////////

/// An Environment provides the variables, home directories, and assignments an expansion needs.
///
/// Ordinary parameters are named without a leading `$`.  Positional and special parameters keep
/// it:  `$1`, `$#`, `$*`, `$@`, `$?`, `$$`, `$!`, `$0`, `$-`.
///
/// It is expected that the environment do no expansion of its own.
pub trait Environment {
    /// Lookup the value of a variable.  `None` means the variable is unset.
    fn lookup_var(&self, name: &str) -> Option<String>;
    /// Assign a value to a variable.  Any error aborts the expansion.
    fn assign_to_var(&mut self, name: &str, value: &str) -> Result<(), Error>;
    /// Lookup the home directory of the named user.
    fn lookup_home_dir(&self, username: &str) -> Option<String>;
    /// Return the names of all set variables that begin with `prefix`, in any order.
    fn match_var_names(&self, prefix: &str) -> Vec<String>;
}

impl Environment for () {
    fn lookup_var(&self, _: &str) -> Option<String> {
        None
    }

    fn assign_to_var(&mut self, name: &str, _: &str) -> Result<(), Error> {
        Err(Error::assignment_failed(name, "no variables may be assigned"))
    }

    fn lookup_home_dir(&self, _: &str) -> Option<String> {
        None
    }

    fn match_var_names(&self, _: &str) -> Vec<String> {
        vec![]
    }
}

impl<K: Borrow<str> + Eq + Hash, V: AsRef<str>> Environment for HashMap<K, V> {
    fn lookup_var(&self, name: &str) -> Option<String> {
        self.get(name).map(|s| s.as_ref().to_string())
    }

    fn assign_to_var(&mut self, name: &str, _: &str) -> Result<(), Error> {
        Err(Error::assignment_failed(name, "variables are read-only"))
    }

    fn lookup_home_dir(&self, _: &str) -> Option<String> {
        None
    }

    fn match_var_names(&self, prefix: &str) -> Vec<String> {
        self.keys()
            .map(|k| k.borrow())
            .filter(|k| !k.starts_with('$') && k.starts_with(prefix))
            .map(String::from)
            .collect()
    }
}

/////////////////////////////////////////// ExpandOptions //////////////////////////////////////////

/// Options that select the stages of the expansion pipeline.  The default runs every stage.
#[derive(Clone, Debug, Default, Eq, PartialEq, arrrg_derive::CommandLine)]
pub struct ExpandOptions {
    /// Skip brace expansion.
    #[arrrg(flag, "Do not perform brace expansion.")]
    pub no_braces: bool,
    /// Skip tilde expansion.
    #[arrrg(flag, "Do not perform tilde expansion.")]
    pub no_tilde: bool,
    /// Skip parameter expansion.
    #[arrrg(flag, "Do not perform parameter expansion.")]
    pub no_parameters: bool,
    /// Leave backslash escapes in the output.
    #[arrrg(flag, "Leave backslash escapes in the output.")]
    pub keep_escapes: bool,
    /// Fail with [Error::Requested] on `${name:?word}` instead of substituting the message.
    #[arrrg(flag, "Fail on ${VAR:?message} instead of substituting the message.")]
    pub abort_on_write_error: bool,
}

////////////////////////////////////////////// expand //////////////////////////////////////////////

/// Expand the input using the default glob engine.
pub fn expand(env: &mut dyn Environment, input: &str) -> Result<String, Error> {
    expand_with_options(env, &ShellGlob, &ExpandOptions::default(), input)
}

/// Expand the input using the provided glob engine.
pub fn expand_with_glob(
    env: &mut dyn Environment,
    glob: &dyn Glob,
    input: &str,
) -> Result<String, Error> {
    expand_with_options(env, glob, &ExpandOptions::default(), input)
}

/// Expand the input, running the stages `options` selects in the fixed order braces, tilde,
/// parameters, escapes.
pub fn expand_with_options(
    env: &mut dyn Environment,
    glob: &dyn Glob,
    options: &ExpandOptions,
    input: &str,
) -> Result<String, Error> {
    EXPAND.click();
    let mut output = if options.no_braces {
        input.to_string()
    } else {
        brace::expand_braces(input)
    };
    if !options.no_tilde {
        output = tilde::expand_tilde(&*env, &output);
    }
    if !options.no_parameters {
        output = dispatch::Dispatcher::new(env, glob)
            .abort_on_write_error(options.abort_on_write_error)
            .expand_parameters(&output)?;
    }
    if !options.keep_escapes {
        output = unescape::remove_escapes(&output);
    }
    Ok(output)
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

use shexpand::{expand, expand_with_glob, Error, Glob, Variables};

fn vars() -> Variables {
    Variables::new()
        .with_var("HOME", "/home/user")
        .with_var("PWD", "/work")
        .with_var("EXT", "txt")
        .with_home_dir("root", "/root")
}

#[test]
fn stages_run_in_order() {
    let mut vars = vars();
    assert_eq!(
        "/home/user/a.txt /home/user/b.txt",
        expand(&mut vars, "~/{a,b}.$EXT").unwrap()
    );
    assert_eq!(
        "/root/.profile /work/x",
        expand(&mut vars, "~root/.profile ~+/x").unwrap()
    );
}

#[test]
fn operand_words_are_not_brace_expanded() {
    let mut vars = vars();
    assert_eq!("{a,b}", expand(&mut vars, "${UNSET:-{a,b}}").unwrap());
    assert_eq!("/home/user/x", expand(&mut vars, "${UNSET:-~/x}").unwrap());
}

#[test]
fn values_are_not_rescanned() {
    let mut vars = vars().with_var("BRACES", "{a,b}").with_var("TILDE", "~");
    assert_eq!("{a,b} ~", expand(&mut vars, "$BRACES $TILDE").unwrap());
}

#[test]
fn escapes_are_removed_last() {
    let mut vars = vars();
    assert_eq!("$EXT txt", expand(&mut vars, "\\$EXT $EXT").unwrap());
    assert_eq!("~/x", expand(&mut vars, "\\~/x").unwrap());
    assert_eq!("}", expand(&mut vars, "${UNSET:-\\}}").unwrap());
}

#[test]
fn unknown_text_passes_through() {
    let mut vars = vars();
    for input in ["$", "${", "a}b", "{", "$(ls)", "x ${ y", "100%", "a~b"] {
        assert_eq!(input, expand(&mut vars, input).unwrap(), "input={input:?}");
    }
}

// A glob that only understands literal text.
struct Literal;

impl Glob for Literal {
    fn matches(&self, pattern: &str, text: &str) -> Result<bool, Error> {
        Ok(pattern == text)
    }
}

#[test]
fn custom_glob() {
    let mut vars = vars().with_var("FILE", "notes.*.txt");
    assert_eq!(
        "notes.*",
        expand_with_glob(&mut vars, &Literal, "${FILE%.txt}").unwrap()
    );
    assert_eq!(
        "notes.*.txt",
        expand_with_glob(&mut vars, &Literal, "${FILE%.*}").unwrap()
    );
    assert_eq!(
        "notes",
        expand_with_glob(&mut vars, &Literal, "${FILE%.*.txt}").unwrap()
    );
}

#[test]
fn biometrics_register() {
    let collector = biometrics::Collector::new();
    shexpand::register_biometrics(&collector);
}

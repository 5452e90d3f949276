//! The final pass:  remove the backslashes that escape characters.

/// Remove every escaping backslash, keeping the character it escapes.  A trailing backslash has
/// nothing to escape and is kept.
pub fn remove_escapes(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            output.push(chars.next().unwrap_or('\\'));
        } else {
            output.push(c);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes() {
        assert_eq!("{PARAM1}", remove_escapes("\\{PARAM1\\}"));
        assert_eq!("a\\b", remove_escapes("a\\\\b"));
        assert_eq!("$x", remove_escapes("\\$x"));
        assert_eq!("trailing\\", remove_escapes("trailing\\"));
        assert_eq!("é", remove_escapes("\\é"));
        assert_eq!("plain", remove_escapes("plain"));
    }
}

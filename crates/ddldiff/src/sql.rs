//! Quoting helpers for rendered DDL.

use std::fmt;

/// A PostgreSQL identifier, written double-quoted with embedded quotes doubled.
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.0.as_ref().chars() {
            if c == '"' {
                f.write_str("\"\"")?;
            } else {
                write!(f, "{c}")?;
            }
        }
        f.write_str("\"")
    }
}

/// A string literal, written single-quoted with embedded quotes doubled.
pub struct Lit<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Lit<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("'")?;
        for c in self.0.as_ref().chars() {
            if c == '\'' {
                f.write_str("''")?;
            } else {
                write!(f, "{c}")?;
            }
        }
        f.write_str("'")
    }
}

/// `"schema"."name"`
pub struct Qualified<'a>(pub &'a str, pub &'a str);

impl fmt::Display for Qualified<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", Ident(self.0), Ident(self.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_doubles_quotes() {
        assert_eq!(Ident("user").to_string(), "\"user\"");
        assert_eq!(Ident("bla\"h").to_string(), "\"bla\"\"h\"");
    }

    #[test]
    fn test_literal_doubles_quotes() {
        assert_eq!(Lit("it's").to_string(), "'it''s'");
    }

    #[test]
    fn test_qualified() {
        assert_eq!(Qualified("public", "users").to_string(), "\"public\".\"users\"");
    }
}

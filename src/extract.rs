//! Token extraction module
//!
//! Pulls the identifier (usually an email address) out of a combo line.
//! `:` is always tried before `|`, even when the pipe appears earlier.

use memchr::memchr;

/// Delimiter that split a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Colon,
    Pipe,
}

impl Delimiter {
    /// Delimiters in the order they are tried
    pub const PRECEDENCE: [Delimiter; 2] = [Delimiter::Colon, Delimiter::Pipe];

    #[inline]
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Colon => b':',
            Delimiter::Pipe => b'|',
        }
    }
}

/// Result of running the extractor on one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extracted<'a> {
    /// Identifier found before a delimiter
    Token(&'a str),
    /// No delimiter on the line
    Skip,
}

impl<'a> Extracted<'a> {
    pub fn token(self) -> Option<&'a str> {
        match self {
            Extracted::Token(token) => Some(token),
            Extracted::Skip => None,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Extracted::Skip)
    }
}

/// Extract the token from a raw line
#[inline]
pub fn extract(line: &str) -> Extracted<'_> {
    match extract_with_delimiter(line) {
        Some((token, _)) => Extracted::Token(token),
        None => Extracted::Skip,
    }
}

/// Extract the token and report which delimiter matched
pub fn extract_with_delimiter(line: &str) -> Option<(&str, Delimiter)> {
    let line = line.trim();
    let bytes = line.as_bytes();

    // Both delimiters are ASCII, so a byte index is always a char boundary
    Delimiter::PRECEDENCE.iter().find_map(|&delim| {
        memchr(delim.as_byte(), bytes).map(|idx| (&line[..idx], delim))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_colon_line() {
        assert_eq!(extract("a@x.com:pw1"), Extracted::Token("a@x.com"));
    }

    #[test]
    fn test_pipe_line() {
        assert_eq!(extract("b@x.com|pw3"), Extracted::Token("b@x.com"));
    }

    #[test]
    fn test_colon_preferred_over_earlier_pipe() {
        assert_eq!(
            extract_with_delimiter("user|name:secret"),
            Some(("user|name", Delimiter::Colon))
        );
    }

    #[test]
    fn test_no_delimiter_is_skip() {
        assert!(extract("garbage_no_sep").is_skip());
        assert!(extract("").is_skip());
        assert!(extract("   \t ").is_skip());
    }

    #[test]
    fn test_line_is_trimmed_once() {
        assert_eq!(extract("  a@x.com:pw \r\n"), Extracted::Token("a@x.com"));
        // Whitespace inside the token survives
        assert_eq!(extract(" a@x.com :pw"), Extracted::Token("a@x.com "));
    }

    #[test]
    fn test_first_colon_wins() {
        assert_eq!(extract("a@x.com:pw:with:colons"), Extracted::Token("a@x.com"));
    }

    #[test]
    fn test_leading_delimiter_gives_empty_token() {
        assert_eq!(extract(":password"), Extracted::Token(""));
    }

    #[test]
    fn test_unicode_token() {
        assert_eq!(extract("ümlaut@bücher.de:pw"), Extracted::Token("ümlaut@bücher.de"));
    }

    proptest! {
        #[test]
        fn prop_colon_token_is_prefix(head in "[^:|\\s]{0,20}", tail in "[ -~]{0,20}") {
            let line = format!("{}:{}", head, tail);
            prop_assert_eq!(extract(&line), Extracted::Token(head.as_str()));
        }

        #[test]
        fn prop_pipe_only_token(head in "[^:|\\s]{0,20}", tail in "[^:]{0,20}") {
            let line = format!("{}|{}", head, tail);
            prop_assert_eq!(extract(&line).token(), Some(head.as_str()));
        }

        #[test]
        fn prop_no_delimiter_skips(line in "[^:|]{0,40}") {
            prop_assert!(extract(&line).is_skip());
        }
    }
}

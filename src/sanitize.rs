//! Input sanitization for untrusted client text
//!
//! Every piece of user-supplied text passes through here before storage or
//! broadcast. This is the sole defense against markup injection into peers'
//! rendering and against command-argument smuggling, so it must never fail:
//! the worst outcome for any input is an empty string.

/// Character classes a caller may restrict sanitized output to.
/// Matching is case-insensitive where case applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// `A-Za-z0-9_-` — room ids, names, command tokens, video ids
    Identifier,
    /// `A-Za-z0-9_-.:/` — media URLs
    UrlSafe,
}

impl CharClass {
    fn allows(self, c: char) -> bool {
        let base = c.is_ascii_alphanumeric() || c == '_' || c == '-';
        match self {
            CharClass::Identifier => base,
            CharClass::UrlSafe => base || c == '.' || c == ':' || c == '/',
        }
    }
}

/// Strips HTML-tag-like substrings (`<...>`, including an unterminated
/// trailing `<...`) and quote characters unconditionally, then drops any
/// character outside `class` when one is supplied.
pub fn sanitize(input: &str, class: Option<CharClass>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;

    for c in input.chars() {
        if in_tag {
            if c == '>' {
                in_tag = false;
            }
            continue;
        }
        match c {
            '<' => in_tag = true,
            '"' | '\'' | '`' => {}
            _ => {
                if class.map_or(true, |cls| cls.allows(c)) {
                    out.push(c);
                }
            }
        }
    }

    out
}

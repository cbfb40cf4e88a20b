//! XSD 1.0 pattern translation
//!
//! Translates XML Schema regular expressions into the syntax of the
//! `regex` crate (an RE2-compatible engine). Translation is eager: it
//! happens when the pattern facet is built, and the compiled form is
//! wrapped in `^(?:…)$` because XSD patterns are implicitly anchored.
//!
//! Reference: https://www.w3.org/TR/xmlschema-2/#regexs

use crate::error::{Error, Result};
use regex::Regex;

/// Upper bound accepted for `{m,n}` repeat quantifiers, matching the
/// RE2 repeat limit.
pub const REPEAT_LIMIT: u32 = 1000;

/// XML 1.0 NameStartChar ranges, as `regex` class body text.
/// The literal `:` and `_` come first so `-` only ever appears as a
/// range operator.
const NAME_START_CHAR_RANGES: &str = ":_A-Za-z\\x{C0}-\\x{D6}\\x{D8}-\\x{F6}\\x{F8}-\\x{2FF}\
\\x{370}-\\x{37D}\\x{37F}-\\x{1FFF}\\x{200C}-\\x{200D}\\x{2070}-\\x{218F}\
\\x{2C00}-\\x{2FEF}\\x{3001}-\\x{D7FF}\\x{F900}-\\x{FDCF}\\x{FDF0}-\\x{FFFD}\
\\x{10000}-\\x{EFFFF}";

/// XML 1.0 NameChar ranges: NameStartChar plus `-`, `.`, digits,
/// middle dot and combining ranges.
const NAME_CHAR_RANGES: &str = ":_A-Za-z0-9\\-.\\x{B7}\\x{C0}-\\x{D6}\\x{D8}-\\x{F6}\
\\x{F8}-\\x{2FF}\\x{300}-\\x{36F}\\x{370}-\\x{37D}\\x{37F}-\\x{1FFF}\\x{200C}-\\x{200D}\
\\x{203F}-\\x{2040}\\x{2070}-\\x{218F}\\x{2C00}-\\x{2FEF}\\x{3001}-\\x{D7FF}\
\\x{F900}-\\x{FDCF}\\x{FDF0}-\\x{FFFD}\\x{10000}-\\x{EFFFF}";

/// XSD whitespace class body (`\s` in XSD is exactly these four).
const XML_SPACE_RANGES: &str = "\\x20\\t\\n\\r";

/// `\w` in XSD: everything that is not punctuation, separator or other.
const WORD_COMPLEMENT: &str = "\\p{P}\\p{Z}\\p{C}";

/// A compiled XSD pattern: the source form (kept for diagnostics), the
/// translated engine form, and the compiled matcher.
#[derive(Debug, Clone)]
pub struct XsdPattern {
    /// Original XSD pattern text
    pub source: String,
    /// Translated, anchored engine pattern
    pub translated: String,
    regex: Regex,
}

impl XsdPattern {
    /// Translate and compile an XSD pattern.
    pub fn compile(source: &str) -> Result<Self> {
        let body = translate(source)?;
        let translated = format!("^(?:{})$", body);
        let regex = Regex::new(&translated).map_err(|e| Error::PatternSyntax {
            pattern: source.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: source.to_string(),
            translated,
            regex,
        })
    }

    /// Match a whole value against the pattern (anchoring is built in).
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    /// The compiled matcher.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl PartialEq for XsdPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

fn syntax_err(pattern: &str, reason: impl Into<String>) -> Error {
    Error::PatternSyntax {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

fn unsupported_err(pattern: &str, reason: impl Into<String>) -> Error {
    Error::PatternUnsupported {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

/// Translate the body of an XSD pattern (unanchored).
fn translate(source: &str) -> Result<String> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' => {
                if chars.get(i + 1) == Some(&'?') {
                    return Err(syntax_err(source, "'(?' group prefixes are not XSD"));
                }
                out.push('(');
                i += 1;
            }
            '[' => {
                i = translate_class(source, &chars, i, &mut out)?;
            }
            ']' => {
                return Err(syntax_err(source, "unmatched ']'"));
            }
            '.' => {
                // XSD '.' excludes only line terminators.
                out.push_str("[^\\n\\r]");
                i += 1;
            }
            '^' => {
                // Literal in XSD; an anchor in the target engine.
                out.push_str("\\^");
                i += 1;
            }
            '$' => {
                out.push_str("\\$");
                i += 1;
            }
            '*' | '+' | '?' => {
                out.push(c);
                i += 1;
                if chars.get(i) == Some(&'?') {
                    return Err(unsupported_err(source, "lazy quantifier"));
                }
            }
            '{' => {
                i = translate_repeat(source, &chars, i, &mut out)?;
                if chars.get(i) == Some(&'?') {
                    return Err(unsupported_err(source, "lazy quantifier"));
                }
            }
            '}' => {
                return Err(syntax_err(source, "unmatched '}'"));
            }
            '\\' => {
                i = translate_escape(source, &chars, i, &mut out, ClassContext::Outside)?;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(out)
}

/// Where an escape occurs; class membership changes which expansions are
/// legal and how multi-character escapes are spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassContext {
    Outside,
    Positive,
    Negated,
}

/// Translate one `\x` escape starting at `chars[i] == '\\'`.
/// Returns the index just past the escape.
fn translate_escape(
    source: &str,
    chars: &[char],
    i: usize,
    out: &mut String,
    ctx: ClassContext,
) -> Result<usize> {
    let esc = *chars
        .get(i + 1)
        .ok_or_else(|| syntax_err(source, "dangling '\\' at end of pattern"))?;

    let in_class = ctx != ClassContext::Outside;
    match esc {
        'd' => out.push_str("\\p{Nd}"),
        'D' => out.push_str("\\P{Nd}"),
        's' => {
            if in_class {
                out.push_str(XML_SPACE_RANGES);
            } else {
                out.push('[');
                out.push_str(XML_SPACE_RANGES);
                out.push(']');
            }
        }
        'S' => {
            if ctx == ClassContext::Negated {
                return Err(unsupported_err(source, "'\\S' inside a negated class"));
            }
            out.push_str("[^");
            out.push_str(XML_SPACE_RANGES);
            out.push(']');
        }
        'w' => {
            if ctx == ClassContext::Negated {
                return Err(unsupported_err(source, "'\\w' inside a negated class"));
            }
            out.push_str("[^");
            out.push_str(WORD_COMPLEMENT);
            out.push(']');
        }
        'W' => {
            if in_class {
                out.push_str(WORD_COMPLEMENT);
            } else {
                out.push('[');
                out.push_str(WORD_COMPLEMENT);
                out.push(']');
            }
        }
        'i' => {
            if in_class {
                out.push_str(NAME_START_CHAR_RANGES);
            } else {
                out.push('[');
                out.push_str(NAME_START_CHAR_RANGES);
                out.push(']');
            }
        }
        'I' => {
            if ctx == ClassContext::Negated {
                return Err(unsupported_err(source, "'\\I' inside a negated class"));
            }
            out.push_str("[^");
            out.push_str(NAME_START_CHAR_RANGES);
            out.push(']');
        }
        'c' => {
            if in_class {
                out.push_str(NAME_CHAR_RANGES);
            } else {
                out.push('[');
                out.push_str(NAME_CHAR_RANGES);
                out.push(']');
            }
        }
        'C' => {
            if ctx == ClassContext::Negated {
                return Err(unsupported_err(source, "'\\C' inside a negated class"));
            }
            out.push_str("[^");
            out.push_str(NAME_CHAR_RANGES);
            out.push(']');
        }
        'p' | 'P' => {
            return translate_prop_escape(source, chars, i, out, esc);
        }
        'n' => out.push_str("\\n"),
        'r' => out.push_str("\\r"),
        't' => out.push_str("\\t"),
        '\\' | '|' | '.' | '-' | '^' | '?' | '*' | '+' | '{' | '}' | '(' | ')' | '[' | ']'
        | '$' => {
            out.push('\\');
            out.push(esc);
        }
        'b' | 'B' | 'A' | 'Z' | 'z' | 'u' => {
            return Err(syntax_err(
                source,
                format!("'\\{}' is not an XSD escape", esc),
            ));
        }
        other => {
            return Err(syntax_err(
                source,
                format!("unknown escape '\\{}'", other),
            ));
        }
    }
    Ok(i + 2)
}

/// Translate a `\p{…}` / `\P{…}` property escape, rejecting block
/// escapes. The property name is passed through; the final compile of
/// the whole pattern doubles as the probe that weeds out names the
/// target engine does not know.
fn translate_prop_escape(
    source: &str,
    chars: &[char],
    i: usize,
    out: &mut String,
    esc: char,
) -> Result<usize> {
    if chars.get(i + 2) != Some(&'{') {
        return Err(syntax_err(source, format!("'\\{}' requires '{{…}}'", esc)));
    }
    let mut j = i + 3;
    let mut prop = String::new();
    while j < chars.len() && chars[j] != '}' {
        prop.push(chars[j]);
        j += 1;
    }
    if j >= chars.len() {
        return Err(syntax_err(source, "unterminated property escape"));
    }
    if prop.is_empty() {
        return Err(syntax_err(source, "empty property escape"));
    }
    if prop.starts_with("Is") || prop.starts_with("In") {
        return Err(unsupported_err(
            source,
            format!("block escape '\\{}{{{}}}'", esc, prop),
        ));
    }
    out.push('\\');
    out.push(esc);
    out.push('{');
    out.push_str(&prop);
    out.push('}');
    Ok(j + 1)
}

/// Translate a character class starting at `chars[i] == '['`.
/// Returns the index just past the closing `]`.
fn translate_class(source: &str, chars: &[char], i: usize, out: &mut String) -> Result<usize> {
    out.push('[');
    let mut j = i + 1;

    let negated = chars.get(j) == Some(&'^');
    let ctx = if negated {
        out.push('^');
        j += 1;
        ClassContext::Negated
    } else {
        ClassContext::Positive
    };

    // Track the low end of a pending range for start<=end validation.
    let mut prev_single: Option<char> = None;
    let mut first = true;

    while j < chars.len() {
        let c = chars[j];
        match c {
            ']' if !first => {
                out.push(']');
                return Ok(j + 1);
            }
            ']' => {
                return Err(syntax_err(source, "empty character class"));
            }
            '[' => {
                return Err(syntax_err(source, "unescaped '[' inside character class"));
            }
            '-' => {
                if chars.get(j + 1) == Some(&'[') {
                    // Class subtraction: [base-[subtrahend]] maps to the
                    // engine's set difference.
                    out.push_str("--[");
                    j = translate_subtraction(source, chars, j + 2, out)?;
                    // Subtraction must close the class.
                    if chars.get(j) != Some(&']') {
                        return Err(syntax_err(
                            source,
                            "class subtraction must end the character class",
                        ));
                    }
                    out.push_str("]]");
                    return Ok(j + 1);
                }
                // Range operator when between two set members, literal
                // '-' otherwise. Ranges over plain characters validate
                // start <= end.
                match (prev_single, chars.get(j + 1)) {
                    (Some(lo), Some(&hi)) if hi != ']' => {
                        if hi != '\\' && lo > hi {
                            return Err(syntax_err(
                                source,
                                format!("invalid range '{}-{}' (start > end)", lo, hi),
                            ));
                        }
                        out.push('-');
                    }
                    _ => out.push_str("\\-"),
                }
                prev_single = None;
                j += 1;
            }
            '\\' => {
                j = translate_escape(source, chars, j, out, ctx)?;
                prev_single = None;
            }
            '^' => {
                out.push_str("\\^");
                prev_single = Some('^');
                j += 1;
            }
            _ => {
                out.push(c);
                prev_single = Some(c);
                j += 1;
            }
        }
        first = false;
    }
    Err(syntax_err(source, "unterminated character class"))
}

/// Translate the subtrahend class of a subtraction; `j` points just past
/// its opening `[`. Emits the body (without brackets) and returns the
/// index just past the subtrahend's closing `]`.
fn translate_subtraction(
    source: &str,
    chars: &[char],
    mut j: usize,
    out: &mut String,
) -> Result<usize> {
    let ctx = if chars.get(j) == Some(&'^') {
        out.push('^');
        j += 1;
        ClassContext::Negated
    } else {
        ClassContext::Positive
    };
    while j < chars.len() {
        match chars[j] {
            ']' => return Ok(j + 1),
            '\\' => {
                j = translate_escape(source, chars, j, out, ctx)?;
            }
            '-' => {
                out.push_str("\\-");
                j += 1;
            }
            c => {
                out.push(c);
                j += 1;
            }
        }
    }
    Err(syntax_err(source, "unterminated class subtraction"))
}

/// Validate and emit a `{m}` / `{m,}` / `{m,n}` repeat quantifier
/// starting at `chars[i] == '{'`. Returns the index just past `}`.
fn translate_repeat(source: &str, chars: &[char], i: usize, out: &mut String) -> Result<usize> {
    let mut j = i + 1;
    let mut min_text = String::new();
    while j < chars.len() && chars[j].is_ascii_digit() {
        min_text.push(chars[j]);
        j += 1;
    }
    if min_text.is_empty() {
        return Err(syntax_err(source, "repeat quantifier requires a minimum"));
    }
    let min: u32 = min_text
        .parse()
        .map_err(|_| unsupported_err(source, "repeat minimum exceeds the engine limit"))?;

    let max: Option<u32> = match chars.get(j) {
        Some('}') => {
            j += 1;
            Some(min)
        }
        Some(',') => {
            j += 1;
            let mut max_text = String::new();
            while j < chars.len() && chars[j].is_ascii_digit() {
                max_text.push(chars[j]);
                j += 1;
            }
            if chars.get(j) != Some(&'}') {
                return Err(syntax_err(source, "unterminated repeat quantifier"));
            }
            j += 1;
            if max_text.is_empty() {
                None
            } else {
                let max: u32 = max_text
                    .parse()
                    .map_err(|_| unsupported_err(source, "repeat maximum exceeds the engine limit"))?;
                if max < min {
                    return Err(syntax_err(
                        source,
                        format!("repeat maximum {} is below minimum {}", max, min),
                    ));
                }
                Some(max)
            }
        }
        _ => return Err(syntax_err(source, "unterminated repeat quantifier")),
    };

    if min > REPEAT_LIMIT || max.is_some_and(|m| m > REPEAT_LIMIT) {
        return Err(unsupported_err(
            source,
            format!("repeat count exceeds the engine limit of {}", REPEAT_LIMIT),
        ));
    }

    out.push('{');
    out.push_str(&min_text);
    match max {
        Some(m) if m == min => {}
        Some(m) => {
            out.push(',');
            out.push_str(&m.to_string());
        }
        None => out.push(','),
    }
    out.push('}');
    Ok(j)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(p: &str) -> XsdPattern {
        XsdPattern::compile(p).unwrap()
    }

    #[test]
    fn test_implicit_anchoring() {
        let p = ok("abc");
        assert!(p.is_match("abc"));
        assert!(!p.is_match("xabc"));
        assert!(!p.is_match("abcx"));
        assert_eq!(p.translated, "^(?:abc)$");
    }

    #[test]
    fn test_digit_escape_is_unicode() {
        let p = ok("\\d+");
        assert!(p.is_match("42"));
        assert!(p.is_match("٤٢")); // ARABIC-INDIC digits, category Nd
        assert!(!p.is_match("x"));

        let n = ok("\\D");
        assert!(n.is_match("x"));
        assert!(!n.is_match("4"));
    }

    #[test]
    fn test_space_escape() {
        let p = ok("a\\sb");
        assert!(p.is_match("a b"));
        assert!(p.is_match("a\tb"));
        assert!(!p.is_match("a\u{A0}b")); // NBSP is not XML whitespace

        let s = ok("\\S+");
        assert!(s.is_match("abc"));
        assert!(!s.is_match("a b"));
    }

    #[test]
    fn test_word_escape() {
        let p = ok("\\w+");
        assert!(p.is_match("abc42"));
        assert!(!p.is_match("a b"));
        assert!(!p.is_match("a,b"));

        let w = ok("\\W");
        assert!(w.is_match(","));
        assert!(!w.is_match("a"));
    }

    #[test]
    fn test_name_char_escapes() {
        let i = ok("\\i\\c*");
        assert!(i.is_match("valid-name"));
        assert!(i.is_match("_x"));
        assert!(i.is_match(":root"));
        assert!(!i.is_match("0start"));
        assert!(!i.is_match(""));
    }

    #[test]
    fn test_dot_excludes_line_terminators() {
        let p = ok("a.b");
        assert!(p.is_match("axb"));
        assert!(!p.is_match("a\nb"));
        assert!(!p.is_match("a\rb"));
    }

    #[test]
    fn test_caret_and_dollar_are_literals() {
        let p = ok("a\\^b");
        assert!(p.is_match("a^b"));
        let q = ok("a$b");
        assert!(q.is_match("a$b"));
        let r = ok("^");
        assert!(r.is_match("^"));
    }

    #[test]
    fn test_group_prefix_rejected() {
        assert!(matches!(
            XsdPattern::compile("(?:ab)"),
            Err(Error::PatternSyntax { .. })
        ));
    }

    #[test]
    fn test_lazy_quantifiers_rejected() {
        for p in ["a*?", "a+?", "a??", "a{1,3}?"] {
            assert!(
                matches!(XsdPattern::compile(p), Err(Error::PatternUnsupported { .. })),
                "{} should be rejected",
                p
            );
        }
    }

    #[test]
    fn test_non_xsd_escapes_rejected() {
        for p in ["\\A", "\\Z", "\\z", "\\B", "\\bx", "\\u0041"] {
            assert!(
                matches!(XsdPattern::compile(p), Err(Error::PatternSyntax { .. })),
                "{} should be rejected",
                p
            );
        }
    }

    #[test]
    fn test_repeat_quantifiers() {
        let p = ok("a{2,4}");
        assert!(p.is_match("aa"));
        assert!(p.is_match("aaaa"));
        assert!(!p.is_match("a"));
        assert!(!p.is_match("aaaaa"));

        let exact = ok("a{3}");
        assert!(exact.is_match("aaa"));
        assert!(!exact.is_match("aa"));

        let open = ok("a{2,}");
        assert!(open.is_match("aaaaaaa"));
        assert!(!open.is_match("a"));
    }

    #[test]
    fn test_repeat_validation() {
        assert!(matches!(
            XsdPattern::compile("a{3,2}"),
            Err(Error::PatternSyntax { .. })
        ));
        assert!(matches!(
            XsdPattern::compile("a{1001}"),
            Err(Error::PatternUnsupported { .. })
        ));
        assert!(matches!(
            XsdPattern::compile("a{0,1001}"),
            Err(Error::PatternUnsupported { .. })
        ));
        // At the limit is fine.
        assert!(XsdPattern::compile("a{0,1000}").is_ok());
    }

    #[test]
    fn test_character_class() {
        let p = ok("[a-f0-9]+");
        assert!(p.is_match("deadbeef42"));
        assert!(!p.is_match("xyz"));

        let n = ok("[^a-f]");
        assert!(n.is_match("z"));
        assert!(!n.is_match("a"));
    }

    #[test]
    fn test_class_range_validation() {
        assert!(matches!(
            XsdPattern::compile("[z-a]"),
            Err(Error::PatternSyntax { .. })
        ));
    }

    #[test]
    fn test_class_subtraction() {
        let p = ok("[a-z-[aeiou]]+");
        assert!(p.is_match("xyz"));
        assert!(!p.is_match("via"));
    }

    #[test]
    fn test_negated_class_with_s_or_w_rejected() {
        assert!(matches!(
            XsdPattern::compile("[^\\S]"),
            Err(Error::PatternUnsupported { .. })
        ));
        assert!(matches!(
            XsdPattern::compile("[^\\w]"),
            Err(Error::PatternUnsupported { .. })
        ));
        // Positive classes are fine.
        assert!(XsdPattern::compile("[\\S]").is_ok());
        assert!(XsdPattern::compile("[\\w]").is_ok());
    }

    #[test]
    fn test_property_escape_passthrough() {
        let p = ok("\\p{Lu}+");
        assert!(p.is_match("ABC"));
        assert!(!p.is_match("abc"));

        let n = ok("\\P{Lu}");
        assert!(n.is_match("a"));
        assert!(!n.is_match("A"));
    }

    #[test]
    fn test_block_escapes_rejected() {
        assert!(matches!(
            XsdPattern::compile("\\p{IsBasicLatin}"),
            Err(Error::PatternUnsupported { .. })
        ));
        assert!(matches!(
            XsdPattern::compile("\\p{InGreek}"),
            Err(Error::PatternUnsupported { .. })
        ));
    }

    #[test]
    fn test_unknown_property_fails_probe() {
        assert!(matches!(
            XsdPattern::compile("\\p{NoSuchProperty}"),
            Err(Error::PatternSyntax { .. })
        ));
    }

    #[test]
    fn test_escapes_inside_class() {
        let p = ok("[\\d\\-x]+");
        assert!(p.is_match("1-x2"));
        assert!(!p.is_match("y"));

        let s = ok("[\\s;]+");
        assert!(s.is_match(" ;\t"));
    }

    #[test]
    fn test_alternation_and_groups() {
        let p = ok("(red|green)(-(light|dark))?");
        assert!(p.is_match("red"));
        assert!(p.is_match("green-dark"));
        assert!(!p.is_match("blue"));
    }

    #[test]
    fn test_source_preserved() {
        let p = ok("\\d{3}");
        assert_eq!(p.source, "\\d{3}");
        assert!(p.translated.starts_with("^(?:"));
    }
}

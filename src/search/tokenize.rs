//! Markup stripping and tokenization for segment fields and queries.
//!
//! Queries and indexed text go through the exact same pipeline, so a term
//! always takes the same normalized form on both sides of the index. The
//! pipeline is pure and locale-independent: identical input yields an
//! identical token stream.

/// Minimum token length for indexing. Single characters are punctuation,
/// operators, or list markers in this corpus and are never searched for.
pub(crate) const MIN_TOKEN_LENGTH: usize = 2;

/// Longest entity body we attempt to decode (`&#x10FFFF;` is 9 chars).
const MAX_ENTITY_LENGTH: usize = 10;

/// A normalized token with its location in the plain-text projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lowercased token text.
    pub text: String,
    /// Ordinal within the stream. Dropped-as-too-short words still advance
    /// this counter, so two tokens with consecutive positions really were
    /// adjacent words in the source text.
    pub position: u32,
    /// Byte offset of the token start in the projection it was cut from.
    pub start: usize,
    /// Byte offset one past the token end.
    pub end: usize,
}

/// Produce the plain-text projection of a markup-bearing field.
///
/// Tags are dropped and replaced by a single space so adjacent words do not
/// fuse; entities are then decoded. Markup is not assumed well-formed: an
/// unterminated tag strips from its `<` to the end of the text rather than
/// erroring.
pub fn strip_markup(text: &str) -> String {
    let mut visible = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        match rest.find('<') {
            Some(open) => {
                visible.push_str(&rest[..open]);
                match rest[open..].find('>') {
                    Some(close) => {
                        visible.push(' ');
                        rest = &rest[open + close + 1..];
                    }
                    // Unterminated tag swallows the remainder.
                    None => break,
                }
            }
            None => {
                visible.push_str(rest);
                break;
            }
        }
    }
    decode_entities(&visible)
}

/// Decode HTML entities. Unknown entities pass through literally.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        match parse_entity(tail) {
            Some((decoded, consumed)) => {
                out.push(decoded);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parse one entity body (the text after `&`). Returns the decoded character
/// and the number of bytes consumed including the trailing `;`.
fn parse_entity(tail: &str) -> Option<(char, usize)> {
    let semi = tail.find(';')?;
    if semi == 0 || semi > MAX_ENTITY_LENGTH {
        return None;
    }
    let name = &tail[..semi];
    let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        char::from_u32(u32::from_str_radix(hex, 16).ok()?)?
    } else if let Some(dec) = name.strip_prefix('#') {
        char::from_u32(dec.parse().ok()?)?
    } else {
        match name {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => '\u{a0}',
            _ => return None,
        }
    };
    Some((decoded, semi + 1))
}

/// Tokenize a plain-text projection into an ordered token stream.
///
/// Splits on non-alphanumeric boundaries while keeping `_` and `-` inside
/// identifiers, since documentation is rich in `snake_case` and
/// `hyphen-ated` code terms. Connectors at a word edge are trimmed, so
/// `--flag` indexes as `flag`.
pub fn tokenize(plain: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut position = 0u32;
    let mut run_start: Option<usize> = None;

    for (i, c) in plain.char_indices() {
        if c.is_alphanumeric() || c == '_' || c == '-' {
            run_start.get_or_insert(i);
        } else if let Some(start) = run_start.take() {
            emit(plain, start, i, &mut position, &mut tokens);
        }
    }
    if let Some(start) = run_start {
        emit(plain, start, plain.len(), &mut position, &mut tokens);
    }

    tokens
}

/// Tokenize markup-bearing text directly. Query strings take this path so
/// that their terms match what the index builder saw for paragraph text.
pub fn tokenize_markup(text: &str) -> Vec<Token> {
    tokenize(&strip_markup(text))
}

fn emit(plain: &str, mut start: usize, mut end: usize, position: &mut u32, tokens: &mut Vec<Token>) {
    let bytes = plain.as_bytes();
    while start < end && matches!(bytes[start], b'-' | b'_') {
        start += 1;
    }
    while end > start && matches!(bytes[end - 1], b'-' | b'_') {
        end -= 1;
    }
    if start == end {
        // Pure connector run ("--", "__"): an operator, not a word.
        return;
    }
    let raw = &plain[start..end];
    if raw.chars().count() >= MIN_TOKEN_LENGTH {
        tokens.push(Token {
            text: raw.to_lowercase(),
            position: *position,
            start,
            end,
        });
    }
    // Too-short words still occupy a position so that phrase adjacency
    // reflects the source text.
    *position += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[rstest]
    #[case("<code>distinct</code> counts", " distinct  counts")]
    #[case("a <a href=\"/x.md\">link</a>.", "a  link .")]
    #[case("no markup here", "no markup here")]
    #[case("broken <span unterminated", "broken ")]
    #[case("&lt;pipeline&gt; &amp; stages", "<pipeline> & stages")]
    #[case("x &#38; y &#x26; z", "x & y & z")]
    #[case("AT&T &unknown; &;", "AT&T &unknown; &;")]
    fn strip_markup_cases(#[case] input: &str, #[case] expected: &str) {
        check!(strip_markup(input) == expected);
    }

    #[rstest]
    #[case("Distinct Counts", &["distinct", "counts"])]
    #[case("snake_case_name stays", &["snake_case_name", "stays"])]
    #[case("hyphen-ated too", &["hyphen-ated", "too"])]
    #[case("--flag __dunder", &["flag", "dunder"])]
    #[case("a + b == c", &[])]
    #[case("group_by(flight_count)", &["group_by", "flight_count"])]
    fn tokenize_cases(#[case] input: &str, #[case] expected: &[&str]) {
        check!(texts(&tokenize(input)) == expected);
    }

    #[test]
    fn short_words_hold_positions() {
        let tokens = tokenize("distinct 5 counts");
        check!(texts(&tokens) == ["distinct", "counts"]);
        check!(tokens[0].position == 0);
        // "5" sat between them, so the surviving tokens are not adjacent.
        check!(tokens[1].position == 2);
    }

    #[test]
    fn operator_runs_do_not_hold_positions() {
        let tokens = tokenize("distinct -- counts");
        check!(tokens[1].position - tokens[0].position == 1);
    }

    #[test]
    fn byte_spans_point_into_projection() {
        let plain = strip_markup("see <b>Aggregates</b> here");
        let tokens = tokenize(&plain);
        let spans: Vec<&str> = tokens.iter().map(|t| &plain[t.start..t.end]).collect();
        check!(spans == ["see", "Aggregates", "here"]);
    }

    #[test]
    fn query_and_paragraph_tokens_agree() {
        // Index/query term symmetry: the same text yields the same tokens
        // whether it arrives as a query or as paragraph markup.
        let paragraph = "Distinct counts may be used to count distinct values";
        let body = tokenize_markup(paragraph);
        let query = tokenize_markup(paragraph);
        check!(texts(&body) == texts(&query));
    }

    #[test]
    fn lowercasing_is_unconditional() {
        let tokens = tokenize("SELECT DISTINCT Counts");
        check!(texts(&tokens) == ["select", "distinct", "counts"]);
    }

    #[test]
    fn unicode_does_not_panic() {
        for input in ["Москва", "日本", "🦀🦀", "café"] {
            let _ = tokenize_markup(input);
        }
    }

    #[test]
    fn empty_and_whitespace() {
        check!(tokenize("").is_empty());
        check!(tokenize("   \n\t").is_empty());
    }
}

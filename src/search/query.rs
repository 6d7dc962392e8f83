//! Query parsing: raw user input to an ordered list of clauses.
//!
//! Query text is tokenized by the exact pipeline the index builder uses, so
//! a parsed term is always in the form the index stores. Parsing never
//! fails: malformed input degrades to whatever clauses can be salvaged, and
//! empty input is a valid query with zero clauses.

use super::tokenize::tokenize_markup;

/// One clause of a parsed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryClause {
    /// A single term that may match anywhere.
    Term(String),
    /// Two or more terms that must appear adjacent, in order, within one
    /// field of a segment.
    Phrase(Vec<String>),
}

/// Parse a raw query string.
///
/// Text inside matching double quotes becomes a phrase clause; an
/// unterminated quote turns the remainder into a phrase rather than an
/// error. A phrase that tokenizes to a single term degrades to a plain
/// term clause.
pub fn parse_query(query: &str) -> Vec<QueryClause> {
    let mut clauses = Vec::new();
    let mut rest = query;
    while let Some(open) = rest.find('"') {
        push_terms(&mut clauses, &rest[..open]);
        let after = &rest[open + 1..];
        match after.find('"') {
            Some(close) => {
                push_phrase(&mut clauses, &after[..close]);
                rest = &after[close + 1..];
            }
            None => {
                push_phrase(&mut clauses, after);
                rest = "";
            }
        }
    }
    push_terms(&mut clauses, rest);
    clauses
}

fn push_terms(clauses: &mut Vec<QueryClause>, text: &str) {
    for token in tokenize_markup(text) {
        clauses.push(QueryClause::Term(token.text));
    }
}

fn push_phrase(clauses: &mut Vec<QueryClause>, text: &str) {
    let mut terms: Vec<String> = tokenize_markup(text)
        .into_iter()
        .map(|token| token.text)
        .collect();
    match terms.len() {
        0 => {}
        1 => clauses.push(QueryClause::Term(terms.remove(0))),
        _ => clauses.push(QueryClause::Phrase(terms)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    fn term(text: &str) -> QueryClause {
        QueryClause::Term(text.to_string())
    }

    fn phrase(terms: &[&str]) -> QueryClause {
        QueryClause::Phrase(terms.iter().map(ToString::to_string).collect())
    }

    #[rstest]
    #[case("", vec![])]
    #[case("   \t ", vec![])]
    #[case("\"\"", vec![])]
    #[case("distinct counts", vec![term("distinct"), term("counts")])]
    #[case("\"distinct counts\"", vec![phrase(&["distinct", "counts"])])]
    #[case("\"distinct\"", vec![term("distinct")])]
    #[case(
        "aggregates \"distinct counts\" code",
        vec![term("aggregates"), phrase(&["distinct", "counts"]), term("code")]
    )]
    fn parse_cases(#[case] input: &str, #[case] expected: Vec<QueryClause>) {
        check!(parse_query(input) == expected);
    }

    #[test]
    fn unterminated_quote_becomes_phrase() {
        let clauses = parse_query("filters \"narrow the results");
        check!(clauses == vec![term("filters"), phrase(&["narrow", "the", "results"])]);
    }

    #[test]
    fn query_terms_are_normalized_like_indexed_text() {
        let clauses = parse_query("Group_By FLIGHT-count");
        check!(clauses == vec![term("group_by"), term("flight-count")]);
    }
}

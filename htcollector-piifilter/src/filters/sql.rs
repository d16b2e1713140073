use super::{Filter, FilterOutcome};
use crate::error::FilterError;
use crate::matcher::Matcher;
use htcollector::proto::{any_value::Value, AnyValue};
use std::ops::Range;
use std::sync::Arc;

/// Redacts the contents of string literals in SQL statements.
///
/// The statement is only tokenized, never parsed: everything outside of
/// quoted literals is kept byte for byte, including comments, identifiers and
/// whitespace. Literal contents are replaced using the global strategy.
#[derive(Clone, Debug)]
pub struct SqlFilter {
    matcher: Arc<Matcher>,
}

impl SqlFilter {
    /// Creates a filter using the global strategy of `matcher`.
    pub fn new(matcher: Arc<Matcher>) -> Self {
        SqlFilter { matcher }
    }
}

/// Byte ranges of the contents (without quotes) of every terminated string
/// literal in `sql`.
fn string_literals(sql: &str) -> Vec<Range<usize>> {
    let bytes = sql.as_bytes();
    let mut literals = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = skip_line(bytes, i);
            }
            b'#' => {
                i = skip_line(bytes, i);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = match find(bytes, i + 2, b"*/") {
                    Some(end) => end + 2,
                    None => bytes.len(),
                };
            }
            b'`' => {
                i = match bytes[i + 1..].iter().position(|b| *b == b'`') {
                    Some(offset) => i + 1 + offset + 1,
                    None => bytes.len(),
                };
            }
            quote @ (b'\'' | b'"') => match literal_end(bytes, i + 1, quote) {
                Some(end) => {
                    literals.push(i + 1..end);
                    i = end + 1;
                }
                // an unterminated quote is not a literal
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    literals
}

fn skip_line(bytes: &[u8], from: usize) -> usize {
    match bytes[from..].iter().position(|b| *b == b'\n') {
        Some(offset) => from + offset + 1,
        None => bytes.len(),
    }
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

/// Index of the closing quote of a literal whose contents start at `from`.
/// Doubled quotes and backslash escapes stay inside the literal.
fn literal_end(bytes: &[u8], from: usize, quote: u8) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => {
                if bytes.get(i + 1) == Some(&quote) {
                    i += 2;
                } else {
                    return Some(i);
                }
            }
            _ => i += 1,
        }
    }
    None
}

impl Filter for SqlFilter {
    fn name(&self) -> &'static str {
        "sql"
    }

    fn redact_attribute(&self, key: &str, value: &mut AnyValue) -> Result<FilterOutcome, FilterError> {
        let mut outcome = FilterOutcome::default();
        let Some(Value::StringValue(sql)) = &mut value.value else {
            return Ok(outcome);
        };
        if sql.is_empty() {
            return Ok(outcome);
        }
        outcome.parsed.record(key, sql.as_str());

        let strategy = self.matcher.strategy();
        let mut rewritten = String::with_capacity(sql.len());
        let mut last = 0;
        let mut redacted = false;
        for literal in string_literals(sql) {
            let contents = &sql[literal.clone()];
            if contents.is_empty() {
                continue;
            }
            let replaced = strategy.apply(contents);
            if replaced != contents {
                rewritten.push_str(&sql[last..literal.start]);
                rewritten.push_str(&replaced);
                last = literal.end;
                redacted = true;
            }
        }

        if redacted {
            rewritten.push_str(&sql[last..]);
            let original = std::mem::replace(sql, rewritten);
            outcome.parsed.record_redacted(key, original);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use htcollector::attributes::as_str;
    use htcollector::RedactionStrategy;
    use rstest::rstest;

    fn filter(strategy: RedactionStrategy) -> SqlFilter {
        let config = Config {
            redaction_strategy: strategy,
            ..Default::default()
        };
        SqlFilter::new(Arc::new(Matcher::new(&config).unwrap()))
    }

    fn string(value: &str) -> AnyValue {
        AnyValue {
            value: Some(Value::StringValue(value.to_string())),
        }
    }

    #[rstest]
    #[case(
        "select password from user where name = 'dave' or name =\"bob\";",
        "select password from user where name = '***' or name =\"***\";"
    )]
    #[case(
        "SELECT * FROM t WHERE a = 'it''s' AND b = 'x\\'y'",
        "SELECT * FROM t WHERE a = '***' AND b = '***'"
    )]
    #[case(
        "select 1 -- 'comment'\n/* 'block' */ from `odd'name` where c = 'v'",
        "select 1 -- 'comment'\n/* 'block' */ from `odd'name` where c = '***'"
    )]
    fn redacts_literal_contents(#[case] input: &str, #[case] expected: &str) {
        let mut value = string(input);
        let outcome = filter(RedactionStrategy::Redact)
            .redact_attribute("sql.query", &mut value)
            .unwrap();
        assert!(outcome.is_redacted());
        assert_eq!(as_str(&value), Some(expected));
        assert_eq!(outcome.parsed.redacted["sql.query"], input);
    }

    #[rstest]
    #[case("select count(*) from user where id = 7")]
    #[case("it's not sql")]
    #[case("select '' from t")]
    #[case("")]
    fn statements_without_literals_are_unchanged(#[case] input: &str) {
        let mut value = string(input);
        let outcome = filter(RedactionStrategy::Redact)
            .redact_attribute("db.statement", &mut value)
            .unwrap();
        assert!(!outcome.is_redacted());
        assert_eq!(as_str(&value), Some(input));
    }

    #[test]
    fn uses_global_hash_strategy() {
        let mut value = string("select * from t where n = 'abc'");
        filter(RedactionStrategy::Hash)
            .redact_attribute("db.statement", &mut value)
            .unwrap();
        assert_eq!(
            as_str(&value),
            Some("select * from t where n = 'a9993e364706816aba3e25717850c26c9cd0d89d'")
        );
    }
}

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```(?:sql)?").expect("valid regex"));

/// Normalizes raw model output into a query string.
///
/// Removes code fences, surrounding whitespace and one matching pair of
/// quotes, drops everything before the first `SELECT` (ASCII case-insensitive)
/// and strips trailing semicolons and whitespace. Output without any `SELECT`
/// passes through. The pass repeats until nothing changes, so the result is a
/// fixed point.
pub fn sanitize_sql(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = sanitize_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }

    debug!("Sanitized SQL: {}", current);
    current
}

// Every step only removes text, so repeated passes terminate.
fn sanitize_pass(input: &str) -> String {
    let unfenced = FENCE.replace_all(input, "");
    let trimmed = unquote(unfenced.trim());
    let from_select = match trimmed.to_ascii_uppercase().find("SELECT") {
        // ASCII uppercasing keeps byte offsets intact
        Some(idx) => &trimmed[idx..],
        None => trimmed,
    };

    from_select
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
        .trim_start()
        .to_string()
}

fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_sql_fence() {
        assert_eq!(
            sanitize_sql("```sql\nSELECT * FROM employees\n```"),
            "SELECT * FROM employees"
        );
    }

    #[test]
    fn strips_bare_fence_and_semicolon() {
        assert_eq!(sanitize_sql("```\nSELECT 1;\n```\n"), "SELECT 1");
    }

    #[test]
    fn drops_leading_commentary_and_keeps_case() {
        assert_eq!(
            sanitize_sql("Here is your query: select name FROM employees"),
            "select name FROM employees"
        );
    }

    #[test]
    fn strips_one_pair_of_quotes() {
        assert_eq!(sanitize_sql("\"SELECT * FROM t\""), "SELECT * FROM t");
        assert_eq!(sanitize_sql("'SELECT * FROM t'"), "SELECT * FROM t");
    }

    #[test]
    fn keeps_trailing_string_literal_quote() {
        assert_eq!(
            sanitize_sql("SELECT * FROM employees WHERE name = 'Bob';"),
            "SELECT * FROM employees WHERE name = 'Bob'"
        );
    }

    #[test]
    fn strips_interleaved_semicolons_and_whitespace() {
        assert_eq!(sanitize_sql("SELECT 1 ; ;\n"), "SELECT 1");
    }

    #[test]
    fn keeps_everything_after_first_select() {
        assert_eq!(
            sanitize_sql("Try: SELECT a FROM t; DROP TABLE t; SELECT b FROM u;"),
            "SELECT a FROM t; DROP TABLE t; SELECT b FROM u"
        );
    }

    #[test]
    fn passes_through_without_select() {
        assert_eq!(sanitize_sql("  I cannot answer that.  "), "I cannot answer that.");
        assert_eq!(sanitize_sql("DELETE FROM employees;"), "DELETE FROM employees");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize_sql(""), "");
        assert_eq!(sanitize_sql("```sql\n```"), "");
    }

    #[test]
    fn non_ascii_prefix_keeps_offsets_valid() {
        assert_eq!(sanitize_sql("Voilà la requête : SELECT 'é'"), "SELECT 'é'");
    }

    proptest! {
        #[test]
        fn output_is_idempotent(raw in ".{0,80}") {
            let once = sanitize_sql(&raw);
            prop_assert_eq!(sanitize_sql(&once), once);
        }

        #[test]
        fn output_has_no_fence_or_trailing_junk(
            prefix in "[a-zA-Z :]{0,20}",
            body in "[a-z0-9 *=,]{0,30}",
            tail in "[; \n]{0,5}"
        ) {
            let raw = format!("```sql\n{prefix}SELECT {body}{tail}\n```");
            let out = sanitize_sql(&raw);
            prop_assert!(!out.contains("```"));
            prop_assert!(!out.ends_with(';'));
            prop_assert!(!out.ends_with(char::is_whitespace));
            prop_assert!(out.to_ascii_uppercase().starts_with("SELECT"));
        }
    }
}

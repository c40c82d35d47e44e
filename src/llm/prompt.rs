/// Builds the instruction sent to the model for one question.
///
/// The rules here are guidance only; structure is enforced afterwards by
/// [`crate::llm::sanitize::sanitize_sql`].
pub fn build_prompt(schema: &str, question: &str, dialect: &str) -> String {
    format!(
        r#"You are a {dialect} query generator. Convert natural language questions into valid {dialect} queries.

Database Schema:
{schema}

CRITICAL RULES:
1. Generate ONLY the SQL query text, absolutely nothing else
2. Use proper {dialect} syntax
3. Return only SELECT statements for safety
4. Use proper table and column names from the schema above
5. Do NOT use markdown formatting, code blocks, or any special characters
6. Do NOT add explanations, comments, or any text before or after the query
7. Do NOT include semicolon at the end
8. Return ONLY the raw SQL query

User Question: {question}

Generate only the SQL query:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_schema_and_question() {
        let schema = "\nTable: employees\n  - id (INTEGER) PRIMARY KEY";
        let prompt = build_prompt(schema, "Show all employees", "MySQL");

        assert!(prompt.contains("Table: employees\n  - id (INTEGER) PRIMARY KEY"));
        assert!(prompt.contains("User Question: Show all employees"));
        assert!(prompt.ends_with("Generate only the SQL query:"));
    }

    #[test]
    fn carries_every_rule() {
        let prompt = build_prompt("", "q", "MySQL");

        for rule in [
            "ONLY the SQL query",
            "proper MySQL syntax",
            "only SELECT statements",
            "Do NOT use markdown",
            "Do NOT add explanations",
            "Do NOT include semicolon",
        ] {
            assert!(prompt.contains(rule), "missing rule: {rule}");
        }
    }

    #[test]
    fn dialect_is_configurable() {
        let prompt = build_prompt("", "q", "DuckDB");
        assert!(prompt.starts_with("You are a DuckDB query generator."));
        assert!(!prompt.contains("MySQL"));
    }

    #[test]
    fn default_dialect_names_the_query_engine() {
        let dialect = crate::config::AppConfig::default().llm.dialect;
        let prompt = build_prompt("", "q", &dialect);
        assert!(prompt.starts_with("You are a DuckDB query generator."));
        assert!(prompt.contains("proper DuckDB syntax"));
    }
}

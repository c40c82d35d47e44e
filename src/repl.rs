use crate::db::executor::QueryExecutor;
use crate::db::schema::SchemaDescription;
use crate::llm::SqlGenerator;
use crate::util::table::format_results;
use sqlformat::{FormatOptions, QueryParams};
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, warn};

const QUIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

const EXAMPLE_QUESTIONS: [&str; 6] = [
    "Show all employees",
    "Find employees earning more than 70000",
    "List employees hired after 2019",
    "Count employees in each department",
    "Show the highest paid employee",
    "Get average salary by department",
];

fn rule(ch: char) -> String {
    ch.to_string().repeat(70)
}

/// Reindents `sql` with upper-case keywords for display. The query that runs
/// is always the unformatted one.
fn display_sql(sql: &str) -> String {
    let options = FormatOptions {
        uppercase: true,
        ..FormatOptions::default()
    };
    sqlformat::format(sql, &QueryParams::None, options)
}

fn is_quit(input: &str) -> bool {
    QUIT_WORDS.iter().any(|w| input.eq_ignore_ascii_case(w))
}

/// Question/answer loop over any line source and output sink.
pub struct Session<'a, W: Write> {
    generator: &'a dyn SqlGenerator,
    executor: &'a QueryExecutor,
    schema: &'a SchemaDescription,
    out: W,
    auto_execute: bool,
}

impl<'a, W: Write> Session<'a, W> {
    pub fn new(
        generator: &'a dyn SqlGenerator,
        executor: &'a QueryExecutor,
        schema: &'a SchemaDescription,
        out: W,
        auto_execute: bool,
    ) -> Self {
        Self {
            generator,
            executor,
            schema,
            out,
            auto_execute,
        }
    }

    pub fn print_intro(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", rule('='))?;
        writeln!(self.out, "NATURAL LANGUAGE TO SQL")?;
        writeln!(self.out, "Model: {}", self.generator.model_name())?;
        writeln!(self.out, "{}", rule('='))?;
        writeln!(self.out, "\nDatabase Schema:")?;
        writeln!(self.out, "{}", self.schema)?;
        writeln!(self.out, "\n{}", rule('='))?;
        writeln!(self.out, "\nExample questions you can ask:")?;
        for example in EXAMPLE_QUESTIONS {
            writeln!(self.out, "  - {}", example)?;
        }
        writeln!(self.out, "{}", rule('='))
    }

    /// Runs until a quit word or end of input.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> io::Result<()> {
        let mut lines = input.lines();
        self.print_intro()?;

        loop {
            writeln!(self.out, "\nEnter your question (or 'quit' to exit):")?;
            write!(self.out, "> ")?;
            self.out.flush()?;

            let Some(line) = lines.next_line().await? else {
                writeln!(self.out, "\nGoodbye!")?;
                break;
            };

            let question = line.trim();
            if is_quit(question) {
                writeln!(self.out, "Goodbye!")?;
                break;
            }
            if question.is_empty() {
                continue;
            }

            if let Some(sql) = self.generate(question).await? {
                if self.auto_execute || self.confirm(&mut lines).await? {
                    self.execute(&sql).await?;
                }
            }

            writeln!(self.out, "\n{}", rule('='))?;
        }

        Ok(())
    }

    /// Answers one question without prompting. The query only runs when the
    /// session auto-executes. Returns whether every step succeeded.
    pub async fn answer_once(&mut self, question: &str) -> io::Result<bool> {
        let Some(sql) = self.generate(question.trim()).await? else {
            return Ok(false);
        };
        if !self.auto_execute {
            return Ok(true);
        }
        self.execute(&sql).await
    }

    async fn generate(&mut self, question: &str) -> io::Result<Option<String>> {
        writeln!(self.out, "\n[Generating SQL query...]")?;
        self.out.flush()?;

        let schema = self.schema.text();
        match self.generator.generate_sql(question, &schema).await {
            Ok(sql) => {
                writeln!(self.out, "\nGenerated SQL Query:")?;
                writeln!(self.out, "{}", rule('-'))?;
                writeln!(self.out, "{}", display_sql(&sql))?;
                writeln!(self.out, "{}", rule('-'))?;
                Ok(Some(sql))
            }
            Err(e) => {
                warn!("SQL generation failed: {}", e);
                writeln!(self.out, "\n{}", e)?;
                Ok(None)
            }
        }
    }

    async fn confirm<R: AsyncBufRead + Unpin>(&mut self, lines: &mut Lines<R>) -> io::Result<bool> {
        write!(self.out, "\nExecute this query? (y/n): ")?;
        self.out.flush()?;

        let answer = lines.next_line().await?.unwrap_or_default();
        debug!("Execution confirmation: {:?}", answer);
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }

    async fn execute(&mut self, sql: &str) -> io::Result<bool> {
        writeln!(self.out, "\n[Executing query...]")?;
        self.out.flush()?;

        match self.executor.execute(sql).await {
            Ok(result) => {
                writeln!(self.out, "\nQuery Results:")?;
                writeln!(self.out, "\n{}", format_results(&result.columns, &result.rows))?;
                writeln!(self.out, "\nTotal rows: {}", result.rows.len())?;
                Ok(true)
            }
            Err(e) => {
                warn!("Query execution failed: {}", e);
                writeln!(self.out, "\nError executing query: {}", e)?;
                Ok(false)
            }
        }
    }
}

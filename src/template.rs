//! Statement splitting and `:name` / `:result` directives for SQL template files.
//!
//! ```sql
//! -- :name get_user :one
//! SELECT id, name FROM users WHERE id = :id;
//!
//! -- :name touch_user :affected
//! UPDATE users SET seen = now() WHERE id = :id;
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{EmbraceError, Result};
use crate::query::{Query, ResultShape};
use crate::translation::{State, is_block_comment_start, is_line_comment_start, step};

/// One statement of a template and the comments directly preceding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitStatement {
    /// Statement text with comments removed, trimmed, without the terminating `;`.
    pub sql: String,
    /// Leading comments with their markers stripped, in source order.
    pub comments: Vec<String>,
    /// The statement as written, comments included.
    pub source: String,
}

/// Splits template text into statements.
pub trait StatementSplitter {
    fn split(&self, text: &str) -> Vec<SplitStatement>;
}

/// Splits on `;` outside string literals, quoted identifiers, comments and dollar quotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlSplitter;

#[derive(Default)]
struct Pending {
    sql: String,
    comments: Vec<String>,
    source_start: usize,
}

impl Pending {
    fn finish(&mut self, text: &str, end: usize, out: &mut Vec<SplitStatement>) {
        let sql = self.sql.trim();
        if !sql.is_empty() {
            out.push(SplitStatement {
                sql: sql.to_string(),
                comments: std::mem::take(&mut self.comments),
                source: text[self.source_start..end].trim().to_string(),
            });
            self.source_start = end;
        }
        // Comment-only fragments lend their comments to the next statement.
        self.sql.clear();
    }

    fn comment(&mut self, raw: &str) {
        if !self.sql.trim().is_empty() {
            return;
        }
        let body = if let Some(line) = raw.strip_prefix("--") {
            line
        } else {
            raw.strip_prefix("/*")
                .and_then(|inner| inner.strip_suffix("*/"))
                .unwrap_or(raw)
        };
        self.comments.push(body.trim().to_string());
    }
}

impl StatementSplitter for SqlSplitter {
    fn split(&self, text: &str) -> Vec<SplitStatement> {
        let bytes = text.as_bytes();
        let mut out = Vec::new();
        let mut pending = Pending::default();
        let mut state = State::Normal;
        let mut copied = 0;
        let mut comment_start = 0;
        let mut idx = 0;

        while idx < bytes.len() {
            let was_normal = state == State::Normal;
            let was_comment = matches!(state, State::LineComment | State::BlockComment(_));

            if was_normal && bytes[idx] == b';' {
                pending.sql.push_str(&text[copied..idx]);
                pending.finish(text, idx + 1, &mut out);
                copied = idx + 1;
                idx += 1;
                continue;
            }

            if was_normal && (is_line_comment_start(bytes, idx) || is_block_comment_start(bytes, idx)) {
                pending.sql.push_str(&text[copied..idx]);
                comment_start = idx;
            }

            let end = step(&mut state, bytes, idx);

            let is_comment = matches!(state, State::LineComment | State::BlockComment(_));
            if was_comment && !is_comment {
                pending.comment(&text[comment_start..=end]);
                pending.sql.push(if bytes[end] == b'\n' { '\n' } else { ' ' });
                copied = end + 1;
            }
            idx = end + 1;
        }

        if matches!(state, State::LineComment | State::BlockComment(_)) {
            pending.comment(&text[comment_start..]);
        } else {
            pending.sql.push_str(&text[copied..]);
        }
        pending.finish(text, text.len(), &mut out);
        out
    }
}

static NAME_DIRECTIVE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^:name\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s+:(\S+))?\s*$").ok()
});
static RESULT_DIRECTIVE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^:result\s+:(\S+)\s*$").ok());

#[derive(Debug, Default, PartialEq, Eq)]
struct Directives {
    name: Option<String>,
    result: Option<ResultShape>,
}

fn parse_directives(comments: &[String]) -> Result<Directives> {
    let mut directives = Directives::default();
    for line in comments.iter().flat_map(|comment| comment.lines()) {
        let line = line.trim();
        if let Some(caps) = NAME_DIRECTIVE.as_ref().and_then(|re| re.captures(line)) {
            directives.name = caps.get(1).map(|m| m.as_str().to_string());
            if let Some(alias) = caps.get(2) {
                directives.result = Some(alias.as_str().parse()?);
            }
        } else if let Some(caps) = RESULT_DIRECTIVE.as_ref().and_then(|re| re.captures(line)) {
            if let Some(alias) = caps.get(1) {
                directives.result = Some(alias.as_str().parse()?);
            }
        } else if line.starts_with(":name") || line.starts_with(":result") {
            return Err(EmbraceError::Template(format!("malformed directive: {line}")));
        }
    }
    Ok(directives)
}

#[derive(Default)]
struct Draft {
    name: Option<String>,
    result: Option<ResultShape>,
    statements: Vec<String>,
    sources: Vec<String>,
}

impl Draft {
    fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    fn build(self) -> Query {
        Query::from_parts(
            self.name,
            self.result.unwrap_or_default(),
            self.sources.join("\n"),
            self.statements,
        )
    }
}

/// Parse a template containing any number of queries. Each `:name` directive starts a new
/// query; statements without one extend the current query.
///
/// # Errors
/// Returns `EmbraceError::Template` for malformed directives and
/// `EmbraceError::UnsupportedResultShape` for unknown result aliases.
pub fn load_queries(text: &str) -> Result<Vec<Query>> {
    load_queries_with(&SqlSplitter, text)
}

/// [`load_queries`] with a caller-provided splitter.
///
/// # Errors
/// As for [`load_queries`].
pub fn load_queries_with(splitter: &dyn StatementSplitter, text: &str) -> Result<Vec<Query>> {
    let mut queries = Vec::new();
    let mut draft = Draft::default();

    for statement in splitter.split(text) {
        let directives = parse_directives(&statement.comments)?;
        if directives.name.is_some() {
            if !draft.is_empty() {
                queries.push(std::mem::take(&mut draft).build());
            }
            draft.name = directives.name;
        }
        if directives.result.is_some() {
            draft.result = directives.result;
        }
        draft.statements.push(statement.sql);
        draft.sources.push(statement.source);
    }
    if !draft.is_empty() {
        queries.push(draft.build());
    }
    Ok(queries)
}

/// Parse `text` as the statements of a single query.
pub(crate) fn parse_query(text: &str) -> Result<Query> {
    let mut draft = Draft::default();
    for statement in SqlSplitter.split(text) {
        let directives = parse_directives(&statement.comments)?;
        if directives.name.is_some() {
            draft.name = directives.name;
        }
        if directives.result.is_some() {
            draft.result = directives.result;
        }
        draft.statements.push(statement.sql);
        draft.sources.push(statement.source);
    }
    if draft.is_empty() {
        return Err(EmbraceError::Template("template contains no statements".into()));
    }
    Ok(draft.build())
}

/// Named queries loaded from one or more templates.
#[derive(Debug, Clone, Default)]
pub struct Queries {
    queries: Vec<Query>,
}

impl Queries {
    /// # Errors
    /// As for [`load_queries`].
    pub fn from_text(text: &str) -> Result<Self> {
        Ok(Queries {
            queries: load_queries(text)?,
        })
    }

    /// Add every query of another template.
    ///
    /// # Errors
    /// As for [`load_queries`].
    pub fn load(&mut self, text: &str) -> Result<()> {
        self.queries.extend(load_queries(text)?);
        Ok(())
    }

    /// The query called `name`; later definitions shadow earlier ones.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Query> {
        self.queries.iter().rev().find(|query| query.name() == Some(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Query> {
        self.queries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

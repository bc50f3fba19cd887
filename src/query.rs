use std::sync::Arc;

use tracing::{debug, info};

use crate::driver::{Connection, Cursor, get_param_style};
use crate::error::{EmbraceError, Result, rehome};
use crate::mapping::{MappedRows, Returning, RowSpec};
use crate::results::Fetched;
use crate::template;
use crate::translation::{CompiledStatement, PlaceholderStyle, compile_bind_parameters};
use crate::types::BindArgs;

mod dispatch;
mod options;

pub use dispatch::Outcome;
pub use options::{ExecOptions, ResultShape};

#[derive(Debug)]
struct QueryDef {
    name: Option<String>,
    result: ResultShape,
    source: String,
    statements: Vec<String>,
}

/// A SQL template with its declared result shape and optional row mapping.
///
/// Queries are immutable and cheap to clone; [`Query::returning`] and [`Query::bind`]
/// produce derived copies and never change the original.
///
/// ```rust
/// use sql_embrace::prelude::*;
///
/// let query = Query::from_sql("-- :name get_user :one\nSELECT id, name FROM users WHERE id = :id")?;
/// let compiled = query.prepare(PlaceholderStyle::Qmark, &bind_args! { "id" => 7 })?;
/// assert_eq!(compiled[0].sql, "SELECT id, name FROM users WHERE id = ?");
/// # Ok::<(), EmbraceError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    def: Arc<QueryDef>,
    mapping: Option<Arc<RowSpec>>,
}

impl Query {
    pub(crate) fn from_parts(
        name: Option<String>,
        result: ResultShape,
        source: String,
        statements: Vec<String>,
    ) -> Self {
        Query {
            def: Arc::new(QueryDef {
                name,
                result,
                source,
                statements,
            }),
            mapping: None,
        }
    }

    /// Build a query from template text; `:name` and `:result` directives are honoured and
    /// every statement belongs to this one query.
    ///
    /// # Errors
    /// Returns `EmbraceError::Template` if the text holds no statement or a malformed
    /// directive.
    pub fn from_sql(text: &str) -> Result<Self> {
        template::parse_query(text)
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.def.name.as_deref()
    }

    #[must_use]
    pub fn result_shape(&self) -> ResultShape {
        self.def.result
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.def.source
    }

    #[must_use]
    pub fn statements(&self) -> &[String] {
        &self.def.statements
    }

    /// Compile every statement for `style` without executing anything.
    ///
    /// # Errors
    /// Returns the compiler's template or missing-parameter errors.
    pub fn prepare(&self, style: PlaceholderStyle, args: &BindArgs) -> Result<Vec<CompiledStatement>> {
        self.def
            .statements
            .iter()
            .map(|statement| compile_bind_parameters(style, statement, args))
            .collect()
    }

    /// A copy of this query that maps rows through `returning`.
    ///
    /// # Errors
    /// Returns `EmbraceError::Config` for inconsistent declarations (no groups, `split_on`
    /// mixed with `MapObject`s, joins on a single group, unknown join groups).
    pub fn returning(&self, returning: Returning) -> Result<Self> {
        Ok(Query {
            def: Arc::clone(&self.def),
            mapping: Some(Arc::new(returning.normalize()?)),
        })
    }

    /// Bind this query to a connection.
    pub fn bind<'c, 'q, C: Connection>(&'q self, conn: &'c mut C) -> BoundQuery<'c, 'q, C> {
        BoundQuery {
            query: self,
            conn,
            args: None,
            options: ExecOptions::default(),
        }
    }

    /// Compile, execute every statement on one cursor, and consume the cursor according to
    /// the effective result shape.
    ///
    /// # Errors
    /// Returns `UnknownParamStyle` when the connection's style can't be resolved, compiler
    /// errors, re-homed driver errors, and the cardinality errors of the chosen shape.
    pub fn execute<'c, C: Connection>(
        &self,
        conn: &'c mut C,
        args: &BindArgs,
        options: ExecOptions,
    ) -> Result<Outcome<'c, C::Cursor<'c>>> {
        let shape = options.result.unwrap_or(self.def.result);
        let style = get_param_style(&*conn)?;
        let statements = self.prepare(style, args)?;
        let label = self.name().unwrap_or("<anonymous>");

        let mut cursor = conn.cursor().map_err(rehome)?;
        for statement in &statements {
            if options.debug {
                info!(
                    target: "sql_embrace::debug",
                    query = label,
                    "Executing\n    {}\nwith {:?}",
                    statement.sql.replace('\n', "\n    "),
                    statement.params
                );
            }
            debug!(query = label, %style, %shape, params = statement.params.len(), "executing statement");
            cursor
                .execute(&statement.sql, &statement.params)
                .map_err(rehome)?;
        }

        dispatch::consume(shape, cursor, self.mapping.as_ref())
    }
}

/// A query bound to a connection, with its bind values and options.
///
/// ```rust,no_run
/// use sql_embrace::prelude::*;
///
/// # fn demo(conn: &mut rusqlite::Connection) -> Result<(), EmbraceError> {
/// let query = Query::from_sql("SELECT name FROM users WHERE id = :id")?;
/// let args = bind_args! { "id" => 7 };
/// let name = query.bind(conn).args(&args).scalar()?;
/// # let _ = name;
/// # Ok(())
/// # }
/// ```
pub struct BoundQuery<'c, 'q, C> {
    query: &'q Query,
    conn: &'c mut C,
    args: Option<&'q BindArgs>,
    options: ExecOptions,
}

impl<'c, 'q, C: Connection> BoundQuery<'c, 'q, C> {
    #[must_use]
    pub fn args(mut self, args: &'q BindArgs) -> Self {
        self.args = Some(args);
        self
    }

    /// Log the rewritten SQL and parameters before execution.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.options.debug = debug;
        self
    }

    #[must_use]
    pub fn options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    /// Execute with the query's declared result shape, or the one set through
    /// [`BoundQuery::options`].
    ///
    /// # Errors
    /// As for [`Query::execute`].
    pub fn execute(self) -> Result<Outcome<'c, C::Cursor<'c>>> {
        let empty = BindArgs::new();
        let args = self.args.unwrap_or(&empty);
        self.query.execute(self.conn, args, self.options)
    }

    fn run(mut self, shape: ResultShape) -> Result<Outcome<'c, C::Cursor<'c>>> {
        self.options = self.options.with_result(shape);
        self.execute()
    }

    /// Exactly one row.
    ///
    /// # Errors
    /// `NoResultFound` for zero rows, `MultipleResultsFound` for more than one.
    pub fn one(self) -> Result<Fetched> {
        self.run(ResultShape::One)?
            .into_fetched()?
            .ok_or(EmbraceError::NoResultFound)
    }

    /// Same as [`BoundQuery::one`].
    ///
    /// # Errors
    /// As for [`BoundQuery::one`].
    pub fn exactly_one(self) -> Result<Fetched> {
        self.run(ResultShape::ExactlyOne)?
            .into_fetched()?
            .ok_or(EmbraceError::NoResultFound)
    }

    /// The first row, if any.
    ///
    /// # Errors
    /// Driver and mapping errors.
    pub fn first(self) -> Result<Option<Fetched>> {
        self.run(ResultShape::First)?.into_fetched()
    }

    /// # Errors
    /// `MultipleResultsFound` for more than one row.
    pub fn one_or_none(self) -> Result<Option<Fetched>> {
        self.run(ResultShape::OneOrNone)?.into_fetched()
    }

    /// Every row, fetched as the iterator is advanced.
    ///
    /// # Errors
    /// Execution errors; fetch and mapping errors surface as iterator items.
    pub fn many(self) -> Result<MappedRows<'c>> {
        self.run(ResultShape::Many)?.into_rows()
    }

    /// First column of the single row.
    ///
    /// # Errors
    /// `NoResultFound` when there is no row.
    pub fn scalar(self) -> Result<Fetched> {
        self.run(ResultShape::Scalar)?
            .into_fetched()?
            .ok_or(EmbraceError::NoResultFound)
    }

    /// First column of every row.
    ///
    /// # Errors
    /// As for [`BoundQuery::many`].
    pub fn column(self) -> Result<MappedRows<'c>> {
        self.run(ResultShape::Column)?.into_rows()
    }

    /// The driver's affected-row count.
    ///
    /// # Errors
    /// Execution errors.
    pub fn affected(self) -> Result<i64> {
        self.run(ResultShape::Affected)?.into_affected()
    }

    /// The executed cursor, unconsumed.
    ///
    /// # Errors
    /// Execution errors.
    pub fn cursor(self) -> Result<C::Cursor<'c>> {
        self.run(ResultShape::Cursor)?.into_cursor()
    }
}

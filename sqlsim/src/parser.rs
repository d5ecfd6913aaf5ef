//! SQL text to labeled tree.
//!
//! Parsing is delegated to `sqlparser`. Its AST is then lowered through the AST's
//! serde form into [`SqlNode`]s, which are what [`treedist::Tree::from_syntax`]
//! consumes. Walking the serialized form rather than matching on AST types keeps the
//! lowering independent of how many node kinds a given sqlparser release has.
//!
//! Lowering rules:
//!
//! - every file becomes one `Script` root with one child per statement
//! - enum variants become nodes labeled by the variant name (`Query`, `Select`,
//!   `BinaryOp`, `Identifier`, ...)
//! - struct fields become nodes labeled by the field name (`projection`, `from`, ...)
//! - strings, numbers and booleans become leaves carrying the literal as value, so
//!   `asc(false)` (DESC) and `negated(true)` (NOT IN) stay visible
//! - source spans, attached tokens, `null` and empty lists are dropped, so two
//!   statements that differ only in layout produce identical trees
//! - a struct whose only remaining field is `value` (identifiers) folds into a single
//!   leaf, as does a tuple variant holding a single literal (quoted strings)

use core::fmt;
use core::str::FromStr;

use serde_json::{Map, Value};
use sqlparser::ast::Statement;
use sqlparser::dialect::{
    AnsiDialect, BigQueryDialect, DuckDbDialect, GenericDialect, MsSqlDialect, MySqlDialect,
    PostgreSqlDialect, SQLiteDialect, SnowflakeDialect,
};
use sqlparser::parser::{Parser, ParserError};
use treedist::{SyntaxNode, Tree};

use crate::error::Error;
use crate::{debug, trace};

/// SQL dialect used to parse input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Permissive dialect accepting most common syntax.
    #[default]
    Generic,
    /// ANSI SQL.
    Ansi,
    /// Google BigQuery.
    BigQuery,
    /// DuckDB.
    DuckDb,
    /// Microsoft SQL Server.
    MsSql,
    /// MySQL.
    MySql,
    /// PostgreSQL.
    Postgres,
    /// SQLite.
    Sqlite,
    /// Snowflake.
    Snowflake,
}

impl Dialect {
    /// All dialects, in the order they are listed to users.
    pub const ALL: [Dialect; 9] = [
        Dialect::Generic,
        Dialect::Ansi,
        Dialect::BigQuery,
        Dialect::DuckDb,
        Dialect::MsSql,
        Dialect::MySql,
        Dialect::Postgres,
        Dialect::Sqlite,
        Dialect::Snowflake,
    ];

    /// Lowercase name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Generic => "generic",
            Dialect::Ansi => "ansi",
            Dialect::BigQuery => "bigquery",
            Dialect::DuckDb => "duckdb",
            Dialect::MsSql => "mssql",
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
            Dialect::Snowflake => "snowflake",
        }
    }

    fn parse_statements(self, sql: &str) -> Result<Vec<Statement>, ParserError> {
        match self {
            Dialect::Generic => Parser::parse_sql(&GenericDialect {}, sql),
            Dialect::Ansi => Parser::parse_sql(&AnsiDialect {}, sql),
            Dialect::BigQuery => Parser::parse_sql(&BigQueryDialect {}, sql),
            Dialect::DuckDb => Parser::parse_sql(&DuckDbDialect {}, sql),
            Dialect::MsSql => Parser::parse_sql(&MsSqlDialect {}, sql),
            Dialect::MySql => Parser::parse_sql(&MySqlDialect {}, sql),
            Dialect::Postgres => Parser::parse_sql(&PostgreSqlDialect {}, sql),
            Dialect::Sqlite => Parser::parse_sql(&SQLiteDialect {}, sql),
            Dialect::Snowflake => Parser::parse_sql(&SnowflakeDialect {}, sql),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase();
        let alias = match wanted.as_str() {
            "postgresql" => "postgres",
            "sqlserver" | "tsql" => "mssql",
            other => other,
        };
        Dialect::ALL
            .into_iter()
            .find(|d| d.name() == alias)
            .ok_or_else(|| {
                let known: Vec<&str> = Dialect::ALL.iter().map(|d| d.name()).collect();
                format!("unknown dialect `{s}` (expected one of: {})", known.join(", "))
            })
    }
}

/// One node of lowered SQL syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlNode {
    /// Variant or field name.
    pub label: String,
    /// Literal text, for leaves.
    pub value: Option<String>,
    /// Children in source order.
    pub children: Vec<SqlNode>,
}

impl SqlNode {
    fn branch(label: impl Into<String>, children: Vec<SqlNode>) -> Self {
        Self {
            label: label.into(),
            value: None,
            children,
        }
    }

    fn leaf(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: Some(value.into()),
            children: Vec::new(),
        }
    }

    fn is_literal(&self) -> bool {
        self.value.is_some() && self.children.is_empty()
    }
}

impl SyntaxNode for SqlNode {
    fn label(&self) -> &str {
        &self.label
    }

    fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn children(&self) -> impl Iterator<Item = &Self> + '_ {
        self.children.iter()
    }
}

/// Parse SQL text into its lowered syntax, or `None` when it holds no statement.
pub fn parse_syntax(sql: &str, dialect: Dialect) -> Result<Option<SqlNode>, Error> {
    let statements = dialect
        .parse_statements(sql)
        .map_err(|err| parse_error(&err))?;
    debug!(%dialect, statements = statements.len(), "parsed sql");

    if statements.is_empty() {
        return Ok(None);
    }

    let mut children = Vec::with_capacity(statements.len());
    for statement in &statements {
        let value = serde_json::to_value(statement).map_err(|err| Error::Lowering {
            message: err.to_string(),
        })?;
        if let Some(node) = lower_field("Statement", &value) {
            children.push(node);
        }
    }
    Ok(Some(SqlNode::branch("Script", children)))
}

/// Parse SQL text into a tree. Text without any statement yields an empty tree.
pub fn parse_sql(sql: &str, dialect: Dialect) -> Result<Tree, Error> {
    let tree = match parse_syntax(sql, dialect)? {
        Some(root) => Tree::from_syntax(&root),
        None => Tree::empty(),
    };
    trace!(nodes = tree.len(), "built tree");
    Ok(tree)
}

fn parse_error(err: &ParserError) -> Error {
    let message = match err {
        ParserError::TokenizerError(message) | ParserError::ParserError(message) => {
            message.clone()
        }
        other => other.to_string(),
    };
    let (line, column) = location_of(&message);
    Error::Parse {
        origin: "input".to_owned(),
        message,
        line,
        column,
    }
}

/// Extract `Line: X, Column: Y` from a sqlparser message.
fn location_of(message: &str) -> (Option<u64>, Option<u64>) {
    let number_after = |marker: &str| -> Option<u64> {
        let start = message.rfind(marker)? + marker.len();
        let digits: String = message[start..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    };
    (number_after("Line: "), number_after("Column: "))
}

fn is_noise(key: &str) -> bool {
    key == "span" || key.ends_with("_token")
}

/// Externally tagged enum variants serialize as a single CamelCase key.
fn variant_of(map: &Map<String, Value>) -> Option<(&str, &Value)> {
    if map.len() != 1 {
        return None;
    }
    let (key, inner) = map.iter().next()?;
    key.starts_with(|c: char| c.is_ascii_uppercase())
        .then_some((key.as_str(), inner))
}

/// Only `null` is dropped. `false` is kept: sqlparser encodes meaningful choices
/// such as `asc: Some(false)` (DESC) or `negated: false` that way.
fn lower_field(key: &str, value: &Value) -> Option<SqlNode> {
    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(SqlNode::leaf(key, flag.to_string())),
        Value::Number(n) => Some(SqlNode::leaf(key, n.to_string())),
        Value::String(s) => Some(SqlNode::leaf(key, s.as_str())),
        Value::Array(items) => {
            let children: Vec<SqlNode> =
                items.iter().filter_map(|item| lower_field(key, item)).collect();
            (!children.is_empty()).then(|| SqlNode::branch(key, children))
        }
        Value::Object(map) => Some(match variant_of(map) {
            Some((variant, inner)) => lower_variant(variant, inner),
            None => lower_struct(key, map),
        }),
    }
}

fn lower_variant(name: &str, inner: &Value) -> SqlNode {
    match inner {
        Value::Null => SqlNode::branch(name, Vec::new()),
        Value::Bool(flag) => SqlNode::leaf(name, flag.to_string()),
        Value::Number(n) => SqlNode::leaf(name, n.to_string()),
        Value::String(s) => SqlNode::leaf(name, s.as_str()),
        Value::Array(items) => {
            let children: Vec<SqlNode> = items
                .iter()
                .filter_map(|item| lower_field("item", item))
                .collect();
            fold_single_literal(name, children, "item")
        }
        Value::Object(map) => match variant_of(map) {
            Some((variant, nested)) => SqlNode::branch(name, vec![lower_variant(variant, nested)]),
            None => lower_struct(name, map),
        },
    }
}

fn lower_struct(label: &str, map: &Map<String, Value>) -> SqlNode {
    let children: Vec<SqlNode> = map
        .iter()
        .filter(|(key, _)| !is_noise(key))
        .filter_map(|(key, value)| lower_field(key, value))
        .collect();
    fold_single_literal(label, children, "value")
}

/// Collapse `label -> only_child(literal)` into `label(literal)` when the child is
/// labeled `child_label`.
fn fold_single_literal(label: &str, mut children: Vec<SqlNode>, child_label: &str) -> SqlNode {
    if children.len() == 1
        && children[0].is_literal()
        && children[0].label == child_label
        && let Some(only) = children.pop()
    {
        return SqlNode {
            label: label.to_owned(),
            value: only.value,
            children: Vec::new(),
        };
    }
    SqlNode::branch(label, children)
}

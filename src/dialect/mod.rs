mod postgres;
mod sqlite;

pub use postgres::PostgresRenderer;
pub use sqlite::SqliteRenderer;

use std::{fmt::Display, str::FromStr};

use thiserror::Error;

use crate::{
    diff::ChangeSet,
    schema::{quote_identifier, ColumnDefinition, TableSchema},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    Sqlite,
}
impl Dialect {
    pub const ALL: [Dialect; 2] = [Dialect::Postgres, Dialect::Sqlite];

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgresql",
            Dialect::Sqlite => "sqlite",
        }
    }

    pub fn renderer(&self) -> &'static dyn Renderer {
        match self {
            Dialect::Postgres => &PostgresRenderer,
            Dialect::Sqlite => &SqliteRenderer,
        }
    }
}
impl Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
impl FromStr for Dialect {
    type Err = UnsupportedDialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(UnsupportedDialectError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported dialect {0:?}; expected one of: postgresql, sqlite")]
pub struct UnsupportedDialectError(pub String);

/// How a dialect spells `ALTER TABLE ... DROP COLUMN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDrop {
    Plain,
    /// Supported, but only by engines newer than the given note says.
    Annotated(&'static str),
}

/// The rendering differences between dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub column_drop: ColumnDrop,
}

pub trait SqlStatement {
    fn write_to(&self, buffer: &mut String);
}

/// One DDL statement. Names are stored unquoted and quoted when written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<'a> {
    CreateTable(&'a TableSchema),
    DropTable(&'a TableSchema),
    /// `table` is already in its written form, see [`ColumnChange::table_sql`].
    ///
    /// [`ColumnChange::table_sql`]: crate::diff::ColumnChange::table_sql
    AddColumn {
        table: &'a str,
        column: &'a ColumnDefinition,
    },
    DropColumn {
        table: &'a str,
        column: &'a str,
        style: ColumnDrop,
    },
}
impl SqlStatement for Statement<'_> {
    fn write_to(&self, buffer: &mut String) {
        match self {
            Statement::CreateTable(table) => buffer.push_str(&table.create_statement()),
            Statement::DropTable(table) => {
                buffer.push_str(&format!("DROP TABLE {};", table.sql_name()));
            }
            Statement::AddColumn { table, column } => {
                buffer.push_str(&format!(
                    "ALTER TABLE {} ADD COLUMN {};",
                    table,
                    column.to_sql()
                ));
            }
            Statement::DropColumn {
                table,
                column,
                style,
            } => {
                if let ColumnDrop::Annotated(note) = style {
                    buffer.push_str(&format!("-- {}\n", note));
                }
                buffer.push_str(&format!(
                    "ALTER TABLE {} DROP COLUMN {};",
                    table,
                    quote_identifier(column)
                ));
            }
        }
    }
}

/// Writes statements one per line.
pub fn render_statements<Stmt: SqlStatement>(statements: &[Stmt]) -> String {
    let mut buffer = String::with_capacity(1024);
    for (idx, stmt) in statements.iter().enumerate() {
        if idx > 0 {
            buffer.push('\n');
        }
        stmt.write_to(&mut buffer);
    }
    buffer
}

/// Turns a [`ChangeSet`] into SQL for one dialect.
///
/// Both directions emit whole-table statements before column statements, in
/// the order the differ recorded them. Down undoes Up when run against the
/// new schema.
pub trait Renderer {
    fn dialect(&self) -> Dialect;
    fn capabilities(&self) -> Capabilities;

    fn up_statements<'c>(&self, changes: &'c ChangeSet) -> Vec<Statement<'c>> {
        let column_drop = self.capabilities().column_drop;
        let mut statements = Vec::new();
        statements.extend(changes.added_tables.iter().map(Statement::CreateTable));
        statements.extend(
            changes
                .removed_tables
                .iter()
                .map(Statement::DropTable),
        );
        statements.extend(changes.added_columns.iter().map(|c| Statement::AddColumn {
            table: &c.table_sql,
            column: &c.column,
        }));
        statements.extend(
            changes
                .removed_columns
                .iter()
                .map(|c| Statement::DropColumn {
                    table: &c.table_sql,
                    column: &c.column.name,
                    style: column_drop,
                }),
        );
        statements
    }

    fn down_statements<'c>(&self, changes: &'c ChangeSet) -> Vec<Statement<'c>> {
        let column_drop = self.capabilities().column_drop;
        let mut statements = Vec::new();
        statements.extend(
            changes
                .added_tables
                .iter()
                .map(Statement::DropTable),
        );
        statements.extend(changes.removed_tables.iter().map(Statement::CreateTable));
        statements.extend(changes.added_columns.iter().map(|c| Statement::DropColumn {
            table: &c.table_sql,
            column: &c.column.name,
            style: column_drop,
        }));
        statements.extend(
            changes
                .removed_columns
                .iter()
                .map(|c| Statement::AddColumn {
                    table: &c.table_sql,
                    column: &c.column,
                }),
        );
        statements
    }

    fn render_up(&self, changes: &ChangeSet) -> String {
        render_statements(&self.up_statements(changes))
    }

    fn render_down(&self, changes: &ChangeSet) -> String {
        render_statements(&self.down_statements(changes))
    }
}

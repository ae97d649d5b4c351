use log::debug;

use crate::{
    dialect::Dialect,
    diff::{diff, ChangeSet},
    parser::parse,
    Error,
};

/// Returned in place of a document when the schemas match.
pub const NO_CHANGES: &str = "-- No changes detected\n";

pub const UP_HEADER: &str = "-- Up";
pub const DOWN_HEADER: &str = "-- Down";

/// Formats rendered SQL into a migration document with `-- Up` and
/// `-- Down` sections.
pub fn assemble(changes: &ChangeSet, up_sql: &str, down_sql: &str) -> String {
    if changes.is_empty() {
        return NO_CHANGES.to_string();
    }
    format!("{UP_HEADER}\n{up_sql}\n\n{DOWN_HEADER}\n{down_sql}\n")
}

/// The outcome of comparing two schema texts.
#[derive(Debug, Clone)]
pub struct Migration {
    pub dialect: Dialect,
    pub changes: ChangeSet,
    pub up: String,
    pub down: String,
    pub document: String,
}
impl Migration {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Parses both schemas, diffs them and renders the migration for `dialect`.
///
/// `dialect` is validated before anything is parsed.
pub fn generate(old_sql: &str, new_sql: &str, dialect: &str) -> Result<Migration, Error> {
    let dialect: Dialect = dialect.parse()?;
    let renderer = dialect.renderer();

    debug!("Parsing old schema");
    let old = parse(old_sql).map_err(|e| Error::Parse {
        input: "old",
        source: e,
    })?;
    debug!("Parsing new schema");
    let new = parse(new_sql).map_err(|e| Error::Parse {
        input: "new",
        source: e,
    })?;

    let changes = diff(&old, &new);
    let up = renderer.render_up(&changes);
    let down = renderer.render_down(&changes);
    let document = assemble(&changes, &up, &down);
    debug!("Rendered {} migration ({} bytes)", dialect, document.len());

    Ok(Migration {
        dialect,
        changes,
        up,
        down,
        document,
    })
}

use super::{Capabilities, ColumnDrop, Dialect, Renderer};

// `ALTER TABLE ... DROP COLUMN` landed in SQLite 3.35.0.
const CAPABILITIES: Capabilities = Capabilities {
    column_drop: ColumnDrop::Annotated("requires SQLite 3.35.0 or later"),
};

pub struct SqliteRenderer;
impl Renderer for SqliteRenderer {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }
    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }
}

use log::{debug, info};

use crate::schema::{ColumnDefinition, SchemaModel, TableSchema};

/// A column belonging to a table which exists in both schemas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnChange {
    pub table: String,
    /// `table` quoted for use in a statement.
    pub table_sql: String,
    pub column: ColumnDefinition,
}

/// The structural delta between an old and a new schema snapshot.
///
/// Tables listed in `added_tables` or `removed_tables` never contribute to the
/// column lists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added_tables: Vec<TableSchema>,
    pub removed_tables: Vec<TableSchema>,
    pub added_columns: Vec<ColumnChange>,
    pub removed_columns: Vec<ColumnChange>,
}
impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added_tables.is_empty()
            && self.removed_tables.is_empty()
            && self.added_columns.is_empty()
            && self.removed_columns.is_empty()
    }

    /// One line per kind of change, with columns grouped by table.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.added_tables.is_empty() {
            lines.push(format!("Tables to add: {}", table_names(&self.added_tables)));
        }
        if !self.removed_tables.is_empty() {
            lines.push(format!(
                "Tables to remove: {}",
                table_names(&self.removed_tables)
            ));
        }
        for (table, columns) in group_by_table(&self.added_columns) {
            lines.push(format!("Columns to add in {}: {}", table, columns.join(", ")));
        }
        for (table, columns) in group_by_table(&self.removed_columns) {
            lines.push(format!(
                "Columns to remove from {}: {}",
                table,
                columns.join(", ")
            ));
        }
        lines
    }
}

fn table_names(tables: &[TableSchema]) -> String {
    tables
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Groups consecutive changes of the same table; the differ emits them that way.
fn group_by_table(changes: &[ColumnChange]) -> Vec<(&str, Vec<&str>)> {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for change in changes {
        match groups.last_mut() {
            Some((table, columns)) if *table == change.table.as_str() => {
                columns.push(change.column.name.as_str())
            }
            _ => groups.push((change.table.as_str(), vec![change.column.name.as_str()])),
        }
    }
    groups
}

/// Computes what changed between `old` and `new`.
///
/// Columns are compared by name only: a column whose type or constraints
/// changed is not reported.
pub fn diff(old: &SchemaModel, new: &SchemaModel) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for table in new.tables.values() {
        if !old.tables.contains_key(&table.name) {
            info!("Table {} was added", table.name);
            changes.added_tables.push(table.clone());
        }
    }
    for table in old.tables.values() {
        if !new.tables.contains_key(&table.name) {
            info!("Table {} was removed", table.name);
            changes.removed_tables.push(table.clone());
        }
    }

    for new_table in new.tables.values() {
        let Some(old_table) = old.table(&new_table.name) else {
            continue;
        };
        for column in new_table.columns.values() {
            if !old_table.columns.contains_key(&column.name) {
                debug!("Column {}.{} was added", new_table.name, column.name);
                changes.added_columns.push(ColumnChange {
                    table: new_table.name.clone(),
                    table_sql: new_table.sql_name(),
                    column: column.clone(),
                });
            }
        }
    }
    for old_table in old.tables.values() {
        let Some(new_table) = new.table(&old_table.name) else {
            continue;
        };
        for column in old_table.columns.values() {
            if !new_table.columns.contains_key(&column.name) {
                debug!("Column {}.{} was removed", old_table.name, column.name);
                changes.removed_columns.push(ColumnChange {
                    table: old_table.name.clone(),
                    table_sql: old_table.sql_name(),
                    column: column.clone(),
                });
            }
        }
    }

    changes
}

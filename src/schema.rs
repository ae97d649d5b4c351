use std::{borrow::Cow, collections::HashMap};

/// Words which PostgreSQL or SQLite refuse as bare identifiers.
const RESERVED_WORDS: &[&str] = &[
    "ABORT", "ADD", "ALL", "ALTER", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC",
    "ASYMMETRIC", "AUTOINCREMENT", "BETWEEN", "BOTH", "BY", "CASE", "CAST", "CHECK",
    "COLLATE", "COLUMN", "COMMIT", "CONSTRAINT", "CREATE", "CROSS", "CURRENT_CATALOG",
    "CURRENT_DATE", "CURRENT_ROLE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER",
    "DEFAULT", "DEFERRABLE", "DELETE", "DESC", "DISTINCT", "DO", "DROP", "ELSE", "END",
    "ESCAPE", "EXCEPT", "EXISTS", "FALSE", "FETCH", "FOR", "FOREIGN", "FROM", "FULL",
    "GRANT", "GROUP", "HAVING", "IN", "INDEX", "INITIALLY", "INNER", "INSERT",
    "INTERSECT", "INTO", "IS", "ISNULL", "JOIN", "LATERAL", "LEADING", "LEFT", "LIKE",
    "LIMIT", "LOCALTIME", "LOCALTIMESTAMP", "NATURAL", "NOT", "NOTNULL", "NULL",
    "OFFSET", "ON", "ONLY", "OR", "ORDER", "OUTER", "PLACING", "PRIMARY", "REFERENCES",
    "RETURNING", "RIGHT", "SELECT", "SESSION_USER", "SET", "SOME", "SYMMETRIC", "TABLE",
    "THEN", "TO", "TRAILING", "TRANSACTION", "TRUE", "UNION", "UNIQUE", "UPDATE", "USER",
    "USING", "VALUES", "VARIADIC", "WHEN", "WHERE", "WINDOW", "WITH",
];

/// Writes `name` so both dialects read it back unchanged.
///
/// Plain names (`[A-Za-z_][A-Za-z0-9_$]*`, not a reserved word) are left bare.
/// Anything else is wrapped in double quotes, with embedded `"` doubled.
pub fn quote_identifier(name: &str) -> Cow<'_, str> {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !RESERVED_WORDS
            .iter()
            .any(|word| word.eq_ignore_ascii_case(name));
    if plain {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}

/// A string-keyed map which remembers the order in which keys were first
/// inserted.
#[derive(Clone, Debug)]
pub struct OrderedMap<V> {
    keys: Vec<String>,
    entries: HashMap<String, V>,
}
impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            entries: HashMap::new(),
        }
    }

    /// Inserts `value` under `key` unless the key is already present. Returns
    /// `false` (and drops `value`) if the key was taken; the first value wins.
    pub fn insert(&mut self, key: String, value: V) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.keys.push(key.clone());
        self.entries.insert(key, value);
        true
    }
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
    pub fn len(&self) -> usize {
        self.keys.len()
    }
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.keys.iter().map(|k| &self.entries[k])
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.keys.iter().map(|k| (k.as_str(), &self.entries[k]))
    }
}
impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}
impl<V: PartialEq> PartialEq for OrderedMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys && self.entries == other.entries
    }
}
impl<V: Eq> Eq for OrderedMap<V> {}

/// A single column, as declared inside a `CREATE TABLE` body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    /// Everything after the column name: type, constraints, default.
    pub definition: String,
}
impl ColumnDefinition {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
        }
    }

    /// `name definition`, or just `name` for an untyped column.
    pub fn to_sql(&self) -> String {
        let name = quote_identifier(&self.name);
        if self.definition.is_empty() {
            name.into_owned()
        } else {
            format!("{} {}", name, self.definition)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSchema {
    /// The dotted, unquoted name used to match tables across schemas.
    pub name: String,
    /// `name` split into its schema and table parts.
    pub path: Vec<String>,
    pub columns: OrderedMap<ColumnDefinition>,
    /// Table-level constraints, verbatim. Only used to rebuild the table.
    pub constraints: Vec<String>,
}
impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self::qualified(vec![name.into()])
    }

    pub fn qualified(path: Vec<String>) -> Self {
        Self {
            name: path.join("."),
            path,
            columns: OrderedMap::new(),
            constraints: Vec::new(),
        }
    }

    /// The name as it should appear in a statement, each part quoted as needed.
    pub fn sql_name(&self) -> String {
        self.path
            .iter()
            .map(|part| quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Appends a column; returns `false` if the name was already declared.
    pub fn push_column(&mut self, column: ColumnDefinition) -> bool {
        self.columns.insert(column.name.clone(), column)
    }

    /// Rebuilds a `CREATE TABLE` statement, columns first and constraints
    /// after, each on its own line.
    pub fn create_statement(&self) -> String {
        let entries: Vec<String> = self
            .columns
            .values()
            .map(ColumnDefinition::to_sql)
            .chain(self.constraints.iter().cloned())
            .collect();
        format!(
            "CREATE TABLE {} (\n    {}\n);",
            self.sql_name(),
            entries.join(",\n    ")
        )
    }
}

/// Every table found in one schema snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchemaModel {
    pub tables: OrderedMap<TableSchema>,
}
impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }
    pub fn push_table(&mut self, table: TableSchema) -> bool {
        self.tables.insert(table.name.clone(), table)
    }
}

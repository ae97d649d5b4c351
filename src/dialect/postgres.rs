use super::{Capabilities, ColumnDrop, Dialect, Renderer};

const CAPABILITIES: Capabilities = Capabilities {
    column_drop: ColumnDrop::Plain,
};

pub struct PostgresRenderer;
impl Renderer for PostgresRenderer {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }
    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{diff::diff, parser::parse};
    use pretty_assertions::assert_eq;

    #[test]
    fn added_column_is_dropped_on_the_way_down() {
        let old = parse("CREATE TABLE users (id SERIAL PRIMARY KEY, name TEXT);").unwrap();
        let new = parse(
            "CREATE TABLE users (id SERIAL PRIMARY KEY, name TEXT, age INTEGER NOT NULL DEFAULT 0);",
        )
        .unwrap();
        let changes = diff(&old, &new);

        assert_eq!(
            PostgresRenderer.render_up(&changes),
            "ALTER TABLE users ADD COLUMN age INTEGER NOT NULL DEFAULT 0;"
        );
        assert_eq!(
            PostgresRenderer.render_down(&changes),
            "ALTER TABLE users DROP COLUMN age;"
        );
    }

    #[test]
    fn removed_table_is_rebuilt_with_its_constraints() {
        let old = parse(
            "CREATE TABLE tags (
                post_id INTEGER REFERENCES posts(id),
                label VARCHAR(32) NOT NULL,
                PRIMARY KEY (post_id, label)
            );",
        )
        .unwrap();
        let changes = diff(&old, &parse("").unwrap());

        assert_eq!(PostgresRenderer.render_up(&changes), "DROP TABLE tags;");
        assert_eq!(
            PostgresRenderer.render_down(&changes),
            "CREATE TABLE tags (\n    \
             post_id INTEGER REFERENCES posts(id),\n    \
             label VARCHAR(32) NOT NULL,\n    \
             PRIMARY KEY (post_id, label)\n);"
        );
    }
}

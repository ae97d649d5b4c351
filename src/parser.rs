//! Extracts table and column declarations from `CREATE TABLE` statements.
//!
//! This is not a SQL grammar. The text is tokenized once with `nom`, then
//! scanned for `CREATE TABLE <name> ( ... )` blocks whose bodies are split on
//! commas at parenthesis depth zero. Anything else in the file is ignored,
//! including literals outside a table which never close.

use log::{debug, trace, warn};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag, take_until, take_while, take_while1},
    character::complete::{anychar, char, multispace1, one_of},
    combinator::{cut, recognize, value},
    multi::many0_count,
};
use thiserror::Error;

use crate::schema::{ColumnDefinition, SchemaModel, TableSchema};

/// Body entries starting with one of these are table constraints, not columns.
const CONSTRAINT_KEYWORDS: [&str; 5] = ["PRIMARY", "FOREIGN", "CONSTRAINT", "UNIQUE", "CHECK"];

/// Modifiers which may sit between `CREATE` and `TABLE`.
const TABLE_MODIFIERS: [&str; 3] = ["TEMP", "TEMPORARY", "UNLOGGED"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("CREATE TABLE {table} (line {line}) has no closing parenthesis")]
    UnterminatedTable { table: String, line: usize },
    #[error("Unterminated string literal starting on line {line}")]
    UnterminatedString { line: usize },
    #[error("Unterminated quoted identifier starting on line {line}")]
    UnterminatedIdentifier { line: usize },
    #[error("Unterminated block comment starting on line {line}")]
    UnterminatedComment { line: usize },
}

/// The literal kinds which can run off the end of the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Unterminated {
    String,
    Identifier,
    Comment,
}
impl Unterminated {
    fn at(self, line: usize) -> ParseError {
        match self {
            Unterminated::String => ParseError::UnterminatedString { line },
            Unterminated::Identifier => ParseError::UnterminatedIdentifier { line },
            Unterminated::Comment => ParseError::UnterminatedComment { line },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TokenKind {
    Word,
    QuotedIdent,
    StringLit,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,
    Other,
    /// A literal or comment which never closed. Its text is the rest of the
    /// line it opened on.
    Broken(Unterminated),
}

#[derive(Clone, Copy, Debug)]
struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
    line: usize,
    /// Whitespace or a comment came directly before this token.
    spaced: bool,
}
impl Token<'_> {
    fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }
    fn is_ident(&self) -> bool {
        matches!(self.kind, TokenKind::Word | TokenKind::QuotedIdent)
    }
    fn error(&self) -> Option<ParseError> {
        match self.kind {
            TokenKind::Broken(kind) => Some(kind.at(self.line)),
            _ => None,
        }
    }

    /// The identifier with its quoting characters removed.
    fn unquoted(&self) -> String {
        if self.kind != TokenKind::QuotedIdent {
            return self.text.to_string();
        }
        let open = self.text.chars().next().unwrap_or('"');
        let inner = &self.text[1..self.text.len() - 1];
        match open {
            '"' => inner.replace("\"\"", "\""),
            '`' => inner.replace("``", "`"),
            _ => inner.to_string(),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// One run of whitespace, a `--` line comment or a `/* */` block comment.
fn trivia(input: &str) -> IResult<&str, &str> {
    alt((
        multispace1,
        recognize((tag("--"), take_while(|c: char| c != '\n'))),
        recognize((tag("/*"), cut((take_until("*/"), tag("*/"))))),
    ))
    .parse(input)
}

/// `'...'` with `''` standing for a quote.
fn string_literal(input: &str) -> IResult<&str, &str> {
    recognize((
        char('\''),
        cut((many0_count(alt((is_not("'"), tag("''")))), char('\''))),
    ))
    .parse(input)
}

/// PostgreSQL's `E'...'`, where a backslash escapes the next character.
fn escape_string_literal(input: &str) -> IResult<&str, &str> {
    recognize((
        one_of("eE"),
        char('\''),
        cut((
            many0_count(alt((
                is_not("'\\"),
                recognize((char('\\'), anychar)),
                tag("''"),
            ))),
            char('\''),
        )),
    ))
    .parse(input)
}

/// `"..."` and `` `...` `` with doubled closing quotes, or `[...]`.
fn quoted_identifier(input: &str) -> IResult<&str, &str> {
    alt((
        recognize((
            char('"'),
            cut((many0_count(alt((is_not("\""), tag("\"\"")))), char('"'))),
        )),
        recognize((
            char('`'),
            cut((many0_count(alt((is_not("`"), tag("``")))), char('`'))),
        )),
        recognize((char('['), cut((take_while(|c: char| c != ']'), char(']'))))),
    ))
    .parse(input)
}

fn token_kind(input: &str) -> IResult<&str, TokenKind> {
    alt((
        value(TokenKind::StringLit, escape_string_literal),
        value(TokenKind::StringLit, string_literal),
        value(TokenKind::QuotedIdent, quoted_identifier),
        value(TokenKind::LParen, char('(')),
        value(TokenKind::RParen, char(')')),
        value(TokenKind::Comma, char(',')),
        value(TokenKind::Semicolon, char(';')),
        value(TokenKind::Dot, char('.')),
        value(TokenKind::Word, take_while1(is_word_char)),
        value(TokenKind::Other, anychar),
    ))
    .parse(input)
}

/// Names the literal a failed token started, from its first characters.
fn unterminated_kind(input: &str) -> Unterminated {
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some('\''), _) | (Some('e' | 'E'), Some('\'')) => Unterminated::String,
        (Some('/'), Some('*')) => Unterminated::Comment,
        _ => Unterminated::Identifier,
    }
}

/// Splits `sql` into tokens, dropping whitespace and comments.
///
/// A literal or comment which never closes becomes a single
/// [`TokenKind::Broken`] token covering the rest of its line, and lexing
/// resumes on the next line. The scanner decides whether that is fatal.
fn tokenize(sql: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut input = sql;
    let mut line = 1;
    let mut counted = 0;

    loop {
        let mut spaced = false;
        let mut broken = None;
        loop {
            match trivia(input) {
                Ok((rest, _)) => {
                    input = rest;
                    spaced = true;
                }
                Err(nom::Err::Failure(_)) => {
                    broken = Some(Unterminated::Comment);
                    break;
                }
                Err(_) => break,
            }
        }
        if input.is_empty() {
            break;
        }

        let offset = sql.len() - input.len();
        line += sql[counted..offset].matches('\n').count();
        counted = offset;

        let lexed = match broken {
            Some(kind) => Err(kind),
            None => token_kind(input).map_err(|_| unterminated_kind(input)),
        };
        match lexed {
            Ok((rest, kind)) => {
                tokens.push(Token {
                    kind,
                    text: &input[..input.len() - rest.len()],
                    line,
                    spaced,
                });
                input = rest;
            }
            Err(kind) => {
                let end = input.find('\n').unwrap_or(input.len());
                tokens.push(Token {
                    kind: TokenKind::Broken(kind),
                    text: &input[..end],
                    line,
                    spaced,
                });
                input = &input[end..];
            }
        }
    }

    tokens
}

/// Rebuilds source text from tokens, with any gap collapsed to one space.
fn join_tokens(tokens: &[Token]) -> String {
    let mut output = String::new();
    for (idx, token) in tokens.iter().enumerate() {
        if idx > 0 && token.spaced {
            output.push(' ');
        }
        output.push_str(token.text);
    }
    output
}

/// Splits a table body on commas which are not nested in parentheses.
fn split_top_level<'t, 'a>(body: &'t [Token<'a>]) -> Vec<&'t [Token<'a>]> {
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, token) in body.iter().enumerate() {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                entries.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => (),
        }
    }
    entries.push(&body[start..]);
    entries
}

enum Scan {
    Table { table: TableSchema, next: usize },
    NotATable,
    Skipped { reason: &'static str, line: usize },
}

/// Scans the statement following a `CREATE` keyword at `tokens[pos - 1]`.
fn scan_create_table(tokens: &[Token], mut pos: usize) -> Result<Scan, ParseError> {
    let at = move |pos: usize| tokens.get(pos);

    while at(pos).is_some_and(|t| TABLE_MODIFIERS.iter().any(|m| t.is_keyword(m))) {
        pos += 1;
    }
    let Some(keyword) = at(pos).filter(|t| t.is_keyword("TABLE")) else {
        return Ok(Scan::NotATable);
    };
    let line = keyword.line;
    pos += 1;

    if at(pos).is_some_and(|t| t.is_keyword("IF")) {
        if at(pos + 1).is_some_and(|t| t.is_keyword("NOT"))
            && at(pos + 2).is_some_and(|t| t.is_keyword("EXISTS"))
        {
            pos += 3;
        } else {
            return Ok(Scan::Skipped {
                reason: "malformed IF NOT EXISTS",
                line,
            });
        }
    }

    if let Some(err) = at(pos).and_then(Token::error) {
        return Err(err);
    }
    let Some(first) = at(pos).filter(|t| t.is_ident()) else {
        return Ok(Scan::Skipped {
            reason: "missing table name",
            line,
        });
    };
    let mut path = vec![first.unquoted()];
    pos += 1;
    while at(pos).is_some_and(|t| t.kind == TokenKind::Dot) {
        if let Some(err) = at(pos + 1).and_then(Token::error) {
            return Err(err);
        }
        if !at(pos + 1).is_some_and(|t| t.is_ident()) {
            break;
        }
        path.push(tokens[pos + 1].unquoted());
        pos += 2;
    }

    if let Some(err) = at(pos).and_then(Token::error) {
        return Err(err);
    }
    if !at(pos).is_some_and(|t| t.kind == TokenKind::LParen) {
        return Ok(Scan::Skipped {
            reason: "no column list",
            line,
        });
    }
    let open = pos;
    let mut depth = 0usize;
    let mut close = None;
    for (idx, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    close = Some(idx);
                    break;
                }
            }
            TokenKind::Broken(kind) => return Err(kind.at(token.line)),
            _ => (),
        }
    }
    let Some(close) = close else {
        return Err(ParseError::UnterminatedTable {
            table: path.join("."),
            line,
        });
    };

    let mut table = TableSchema::qualified(path);
    for entry in split_top_level(&tokens[open + 1..close]) {
        let Some(head) = entry.first() else {
            continue;
        };
        if CONSTRAINT_KEYWORDS.iter().any(|k| head.is_keyword(k)) {
            table.constraints.push(join_tokens(entry));
        } else if head.is_ident() {
            let column = ColumnDefinition::new(head.unquoted(), join_tokens(&entry[1..]));
            if !table.push_column(column) {
                warn!(
                    "Column {}.{} is declared twice (line {}); keeping the first declaration",
                    table.name,
                    head.unquoted(),
                    head.line
                );
            }
        } else {
            warn!(
                "Ignoring unrecognized entry {:?} in table {} (line {})",
                join_tokens(entry),
                table.name,
                head.line
            );
        }
    }

    Ok(Scan::Table {
        table,
        next: close + 1,
    })
}

/// Parses every `CREATE TABLE` statement in `sql`, in order of appearance.
///
/// Statements which cannot be understood are skipped with a warning; a text
/// without any tables produces an empty model. A literal or comment left open
/// inside a `CREATE TABLE` statement is an error. Outside one, the rest of
/// its line is skipped with a warning.
pub fn parse(sql: &str) -> Result<SchemaModel, ParseError> {
    let tokens = tokenize(sql);
    trace!("Tokenized schema into {} tokens", tokens.len());

    let mut model = SchemaModel::new();
    let mut pos = 0;
    while pos < tokens.len() {
        if let Some(err) = tokens[pos].error() {
            warn!("Skipping {:?}: {}", tokens[pos].text, err);
            pos += 1;
            continue;
        }
        if !tokens[pos].is_keyword("CREATE") {
            pos += 1;
            continue;
        }
        match scan_create_table(&tokens, pos + 1)? {
            Scan::Table { table, next } => {
                trace!("Found table {} ({} columns)", table.name, table.columns.len());
                let name = table.name.clone();
                if !model.push_table(table) {
                    warn!(
                        "Table {} is declared twice (line {}); keeping the first declaration",
                        name, tokens[pos].line
                    );
                }
                pos = next;
            }
            Scan::Skipped { reason, line } => {
                warn!("Skipping CREATE TABLE on line {}: {}", line, reason);
                pos += 1;
            }
            Scan::NotATable => pos += 1,
        }
    }

    debug!("Parsed {} tables", model.tables.len());
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn column_names(model: &SchemaModel, table: &str) -> Vec<String> {
        model
            .table(table)
            .unwrap()
            .columns
            .keys()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn parses_tables_and_columns_in_order() {
        let model = parse(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT UNIQUE
            );
            create table posts (id integer, title text, user_id integer);",
        )
        .unwrap();

        assert_eq!(model.tables.keys().collect::<Vec<_>>(), vec!["users", "posts"]);
        assert_eq!(column_names(&model, "users"), vec!["id", "name", "email"]);
        assert_eq!(column_names(&model, "posts"), vec!["id", "title", "user_id"]);
        assert_eq!(
            model.table("users").unwrap().columns.get("name").unwrap().definition,
            "TEXT NOT NULL"
        );
    }

    #[test]
    fn nested_commas_do_not_split_columns() {
        let model = parse(
            "CREATE TABLE orders (
                id INTEGER,
                total NUMERIC(10, 2) CHECK (total >= 0),
                user_id INTEGER REFERENCES users(id) ON DELETE CASCADE
            );",
        )
        .unwrap();
        let table = model.table("orders").unwrap();

        assert_eq!(column_names(&model, "orders"), vec!["id", "total", "user_id"]);
        assert_eq!(
            table.columns.get("total").unwrap().definition,
            "NUMERIC(10, 2) CHECK (total >= 0)"
        );
        assert_eq!(
            table.columns.get("user_id").unwrap().definition,
            "INTEGER REFERENCES users(id) ON DELETE CASCADE"
        );
    }

    #[test]
    fn table_constraints_are_kept_apart_from_columns() {
        let model = parse(
            "CREATE TABLE memberships (
                user_id INTEGER,
                group_id INTEGER,
                PRIMARY KEY (user_id, group_id),
                constraint fk_user FOREIGN KEY (user_id) REFERENCES users(id),
                UNIQUE (group_id, user_id),
                CHECK (user_id > 0)
            );",
        )
        .unwrap();
        let table = model.table("memberships").unwrap();

        assert_eq!(column_names(&model, "memberships"), vec!["user_id", "group_id"]);
        assert_eq!(
            table.constraints,
            vec![
                "PRIMARY KEY (user_id, group_id)",
                "constraint fk_user FOREIGN KEY (user_id) REFERENCES users(id)",
                "UNIQUE (group_id, user_id)",
                "CHECK (user_id > 0)",
            ]
        );
    }

    #[test]
    fn quoted_identifiers_are_normalized() {
        let model = parse(
            r#"CREATE TABLE IF NOT EXISTS "app"."user accounts" (
                "id" INTEGER,
                `display name` TEXT,
                [created] TIMESTAMP
            );"#,
        )
        .unwrap();

        assert_eq!(
            model.tables.keys().collect::<Vec<_>>(),
            vec!["app.user accounts"]
        );
        assert_eq!(
            column_names(&model, "app.user accounts"),
            vec!["id", "display name", "created"]
        );
    }

    #[test]
    fn comments_and_whitespace_are_collapsed() {
        let model = parse(
            "-- leading comment mentioning CREATE TABLE ghosts (x int);
            CREATE TEMPORARY TABLE notes (
                body   TEXT    -- trailing comment, with a comma
                       DEFAULT 'a,  b',
                /* block */ tags TEXT[]
            );",
        )
        .unwrap();
        let table = model.table("notes").unwrap();

        assert!(model.table("ghosts").is_none());
        assert_eq!(
            table.columns.get("body").unwrap().definition,
            "TEXT DEFAULT 'a,  b'"
        );
        assert_eq!(table.columns.get("tags").unwrap().definition, "TEXT[]");
    }

    #[test]
    fn untyped_sqlite_columns_are_columns() {
        let model = parse("CREATE TABLE loose (a, b,);").unwrap();
        let table = model.table("loose").unwrap();

        assert_eq!(column_names(&model, "loose"), vec!["a", "b"]);
        assert_eq!(table.columns.get("a").unwrap().definition, "");
    }

    #[test]
    fn empty_input_is_an_empty_schema() {
        assert!(parse("").unwrap().tables.is_empty());
        assert!(parse("CREATE INDEX idx ON users(email);").unwrap().tables.is_empty());
    }

    #[test]
    fn unrecognized_blocks_are_skipped() {
        let model = parse(
            "CREATE TABLE archive AS SELECT * FROM users;
            CREATE TABLE;
            CREATE TABLE kept (id INTEGER);",
        )
        .unwrap();

        assert_eq!(model.tables.keys().collect::<Vec<_>>(), vec!["kept"]);
    }

    #[test]
    fn duplicate_declarations_keep_the_first() {
        let model = parse(
            "CREATE TABLE t (a INTEGER, a TEXT);
            CREATE TABLE t (b INTEGER);",
        )
        .unwrap();
        let table = model.table("t").unwrap();

        assert_eq!(model.tables.len(), 1);
        assert_eq!(column_names(&model, "t"), vec!["a"]);
        assert_eq!(table.columns.get("a").unwrap().definition, "INTEGER");
    }

    #[test]
    fn missing_semicolon_is_tolerated() {
        let model = parse("CREATE TABLE a (x INTEGER)\nCREATE TABLE b (y INTEGER)").unwrap();
        assert_eq!(model.tables.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn unterminated_table_is_an_error() {
        let err = parse("CREATE TABLE ok (id INTEGER);\n\nCREATE TABLE broken (\n  id INTEGER,\n")
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::UnterminatedTable {
                table: "broken".to_string(),
                line: 3
            }
        );
    }

    #[test]
    fn unterminated_literals_in_a_table_are_errors() {
        assert_eq!(
            parse("CREATE TABLE t (a TEXT DEFAULT 'oops);").unwrap_err(),
            ParseError::UnterminatedString { line: 1 }
        );
        assert_eq!(
            parse("CREATE TABLE \"t (a TEXT);").unwrap_err(),
            ParseError::UnterminatedIdentifier { line: 1 }
        );
        assert_eq!(
            parse("CREATE TABLE t (\n  a TEXT, /* b TEXT\n);").unwrap_err(),
            ParseError::UnterminatedComment { line: 2 }
        );
        assert_eq!(
            parse("CREATE TABLE t (\n  a TEXT DEFAULT 'x,\n  b INTEGER\n);").unwrap_err(),
            ParseError::UnterminatedString { line: 2 }
        );
    }

    #[test]
    fn unterminated_literals_outside_tables_are_skipped() {
        let model = parse(
            "CREATE TABLE first (id INTEGER);
            INSERT INTO first VALUES ('it\\'s');
            COMMENT ON TABLE first IS \"unclosed;
            /* dangling comment
            CREATE TABLE second (id INTEGER, note TEXT);",
        )
        .unwrap();

        assert_eq!(model.tables.keys().collect::<Vec<_>>(), vec!["first", "second"]);
        assert_eq!(column_names(&model, "second"), vec!["id", "note"]);
        assert!(parse("\n/* CREATE TABLE t (a TEXT);").unwrap().tables.is_empty());
    }

    #[test]
    fn escape_strings_allow_backslash_quotes() {
        let model = parse(r"CREATE TABLE t (a TEXT DEFAULT E'it\'s', b INTEGER);").unwrap();
        let table = model.table("t").unwrap();

        assert_eq!(column_names(&model, "t"), vec!["a", "b"]);
        assert_eq!(
            table.columns.get("a").unwrap().definition,
            r"TEXT DEFAULT E'it\'s'"
        );

        let model = parse(r"CREATE TABLE t (a TEXT DEFAULT e'\\', b TEXT DEFAULT 'c:\');").unwrap();
        assert_eq!(
            model.table("t").unwrap().columns.get("b").unwrap().definition,
            r"TEXT DEFAULT 'c:\'"
        );
    }

    #[test]
    fn words_starting_with_e_are_not_strings() {
        let model = parse("CREATE TABLE t (email TEXT, e INTEGER);").unwrap();
        assert_eq!(column_names(&model, "t"), vec!["email", "e"]);
    }

    #[test]
    fn qualified_names_keep_their_parts() {
        let model = parse(r#"CREATE TABLE "my.schema"."order" (id INTEGER);"#).unwrap();
        let table = model.table("my.schema.order").unwrap();
        assert_eq!(table.path, vec!["my.schema", "order"]);
    }
}

//! Recursive descent parser for DBML.
//!
//! Supports `Table` (with aliases, column settings, notes and inline refs),
//! `TableGroup` and `Ref` in both short and long form. `Project`, `Enum`,
//! `Note` and `TablePartial` blocks are skipped; `indexes` blocks inside tables
//! are skipped. After parsing, every table, group member and ref endpoint is
//! checked against the defined tables.

#[cfg(test)]
#[path = "parse_test.rs"]
mod parse_test;

use std::collections::{HashMap, HashSet};

use crate::FORMAT_DBML;
use crate::ast::{
    Database, Field, FieldSettings, GroupMember, Location, Ref, RefEndpoint, Relation, Schema, Span, Table, TableGroup,
};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{Token, TokenKind, tokenize};

const DEFAULT_SCHEMA: &str = "public";

/// Blocks that carry no diagram entities.
const SKIPPED_BLOCKS: &[&str] = &["project", "enum", "note", "tablepartial"];

/// Stateless DBML parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parser;

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse `text` written in `format` into a database object.
    ///
    /// The result is not normalized: call [`Database::normalize`] to assign
    /// entity ids and resolve table references.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] pointing at the first offending token.
    pub fn parse(&self, text: &str, format: &str) -> Result<Database, ParseError> {
        if !format.eq_ignore_ascii_case(FORMAT_DBML) {
            let origin = Location::new(1, 1);
            return Err(ParseError::new(
                ParseErrorKind::UnsupportedFormat,
                format!("unsupported source format '{format}'"),
                Span::new(origin, origin),
            ));
        }

        let tokens = tokenize(text)?;
        let mut cursor = Cursor { tokens: &tokens, pos: 0 };
        let mut schema = Schema { name: DEFAULT_SCHEMA.to_owned(), ..Schema::default() };

        while let Some(token) = cursor.peek() {
            if token.is_keyword("table") {
                let (table, inline_refs) = parse_table(&mut cursor)?;
                schema.tables.push(table);
                schema.refs.extend(inline_refs);
            } else if token.is_keyword("tablegroup") {
                schema.table_groups.push(parse_table_group(&mut cursor)?);
            } else if token.is_keyword("ref") {
                schema.refs.push(parse_ref(&mut cursor)?);
            } else if SKIPPED_BLOCKS.iter().any(|kw| token.is_keyword(kw)) {
                skip_top_level_block(&mut cursor)?;
            } else {
                return Err(ParseError::syntax(
                    format!("unexpected {}; expected Table, TableGroup, Ref, Enum or Project", describe(token)),
                    token.span,
                ));
            }
        }

        check_references(&schema)?;
        Ok(Database { schemas: vec![schema] })
    }
}

// =============================================================================
// CURSOR
// =============================================================================

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn previous_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or_else(|| Span::new(Location::new(1, 1), Location::new(1, 1)), |t| t.span)
    }

    /// Zero-width span just past the last token, used for end-of-input errors.
    fn eof_span(&self) -> Span {
        let end = self.tokens.last().map_or(Location::new(1, 1), |t| t.span.end);
        Span::new(end, end)
    }

    fn next_or_eof(&mut self, expected: &str) -> Result<&'a Token, ParseError> {
        self.next()
            .ok_or_else(|| ParseError::syntax(format!("unexpected end of input; expected {expected}"), self.eof_span()))
    }

    fn peek_is_punct(&self, c: char) -> bool {
        self.peek().is_some_and(|t| t.is_punct(c))
    }

    fn peek_on_line(&self, line: usize) -> Option<&'a Token> {
        self.peek().filter(|t| t.span.start.line == line)
    }

    fn expect_punct(&mut self, c: char, context: &str) -> Result<&'a Token, ParseError> {
        let token = self.next_or_eof(&format!("'{c}' {context}"))?;
        if token.is_punct(c) {
            Ok(token)
        } else {
            Err(ParseError::syntax(format!("expected '{c}' {context}, found {}", describe(token)), token.span))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        let token = self.next_or_eof(what)?;
        match token.ident() {
            Some(name) => Ok((name.to_owned(), token.span)),
            None => Err(ParseError::syntax(format!("expected {what}, found {}", describe(token)), token.span)),
        }
    }

    /// `name` or `schema.name`; the default schema prefix is dropped.
    fn expect_name(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        let (first, first_span) = self.expect_ident(what)?;
        if self.peek_is_punct('.') && self.peek_at(1).and_then(Token::ident).is_some() {
            self.next();
            let (second, second_span) = self.expect_ident(what)?;
            return Ok((qualify(&first, &second), first_span.to(second_span)));
        }
        Ok((first, first_span))
    }

    /// Skip a balanced `open ... close` run; the cursor must be on `open`.
    fn skip_balanced(&mut self, open: char, close: char) -> Result<Span, ParseError> {
        let start = self.expect_punct(open, "to open block")?.span;
        let mut depth = 1usize;
        while depth > 0 {
            let token = self.next_or_eof(&format!("'{close}'"))?;
            if token.is_punct(open) {
                depth += 1;
            } else if token.is_punct(close) {
                depth -= 1;
            }
        }
        Ok(start.to(self.previous_span()))
    }
}

fn qualify(schema: &str, name: &str) -> String {
    if schema == DEFAULT_SCHEMA { name.to_owned() } else { format!("{schema}.{name}") }
}

fn describe(token: &Token) -> String {
    match &token.kind {
        TokenKind::Ident(s) | TokenKind::QuotedIdent(s) => format!("'{s}'"),
        TokenKind::Str(_) => "string".to_owned(),
        TokenKind::Expr(_) => "expression".to_owned(),
        TokenKind::Number(n) => format!("number {n}"),
        TokenKind::Diamond => "'<>'".to_owned(),
        TokenKind::Punct(c) => format!("'{c}'"),
    }
}

fn token_text(token: &Token) -> String {
    match &token.kind {
        TokenKind::Ident(s) | TokenKind::Number(s) => s.clone(),
        TokenKind::QuotedIdent(s) => format!("\"{s}\""),
        TokenKind::Str(s) => format!("'{s}'"),
        TokenKind::Expr(s) => format!("`{s}`"),
        TokenKind::Diamond => "<>".to_owned(),
        TokenKind::Punct(c) => c.to_string(),
    }
}

// =============================================================================
// TOP-LEVEL BLOCKS
// =============================================================================

fn skip_top_level_block(cursor: &mut Cursor<'_>) -> Result<(), ParseError> {
    let keyword = cursor.next_or_eof("block keyword")?;
    while !cursor.peek_is_punct('{') {
        if cursor.next().is_none() {
            return Err(ParseError::syntax(
                format!("expected '{{' after {}", describe(keyword)),
                cursor.eof_span(),
            ));
        }
    }
    cursor.skip_balanced('{', '}')?;
    Ok(())
}

fn parse_table(cursor: &mut Cursor<'_>) -> Result<(Table, Vec<Ref>), ParseError> {
    let keyword = cursor.next_or_eof("'Table'")?;
    let (name, name_token) = cursor.expect_name("table name")?;

    let mut alias = None;
    if cursor.peek().is_some_and(|t| t.is_keyword("as")) {
        cursor.next();
        alias = Some(cursor.expect_ident("table alias")?.0);
    }
    if cursor.peek_is_punct('[') {
        cursor.skip_balanced('[', ']')?;
    }
    cursor.expect_punct('{', &format!("after table name '{name}'"))?;

    let mut fields = Vec::new();
    let mut inline_refs = Vec::new();
    let mut note = None;

    loop {
        let Some(token) = cursor.peek() else {
            return Err(ParseError::syntax(format!("unterminated table '{name}'; expected '}}'"), cursor.eof_span()));
        };
        if token.is_punct('}') {
            cursor.next();
            break;
        }

        let follower = cursor.peek_at(1);
        if token.is_keyword("note") && follower.is_some_and(|t| t.is_punct(':')) {
            cursor.next();
            cursor.next();
            note = Some(expect_string(cursor, "table note")?);
        } else if token.is_keyword("note") && follower.is_some_and(|t| t.is_punct('{')) {
            cursor.next();
            note = parse_note_block(cursor)?;
        } else if token.is_keyword("indexes") && follower.is_some_and(|t| t.is_punct('{')) {
            cursor.next();
            cursor.skip_balanced('{', '}')?;
        } else {
            let (field, inline_ref) = parse_field(cursor, &name)?;
            fields.push(field);
            inline_refs.extend(inline_ref);
        }
    }

    let table = Table {
        id: String::new(),
        name,
        alias,
        note,
        fields,
        token: keyword.span.to(cursor.previous_span()),
        name_token,
    };
    Ok((table, inline_refs))
}

fn parse_note_block(cursor: &mut Cursor<'_>) -> Result<Option<String>, ParseError> {
    cursor.expect_punct('{', "to open note")?;
    let mut note = None;
    loop {
        let token = cursor.next_or_eof("'}' to close note")?;
        match &token.kind {
            TokenKind::Punct('}') => return Ok(note),
            TokenKind::Str(s) => note = Some(s.clone()),
            _ => return Err(ParseError::syntax(format!("expected note string, found {}", describe(token)), token.span)),
        }
    }
}

fn expect_string(cursor: &mut Cursor<'_>, what: &str) -> Result<String, ParseError> {
    let token = cursor.next_or_eof(what)?;
    match &token.kind {
        TokenKind::Str(s) => Ok(s.clone()),
        _ => Err(ParseError::syntax(format!("expected string for {what}, found {}", describe(token)), token.span)),
    }
}

fn parse_field(cursor: &mut Cursor<'_>, table_name: &str) -> Result<(Field, Option<Ref>), ParseError> {
    let (name, name_span) = cursor.expect_ident("column name")?;
    let line = name_span.start.line;

    let Some(type_token) = cursor.peek_on_line(line) else {
        return Err(ParseError::syntax(format!("column '{name}' is missing a type"), name_span));
    };
    let Some(base_type) = type_token.ident() else {
        return Err(ParseError::syntax(
            format!("expected type for column '{name}', found {}", describe(type_token)),
            type_token.span,
        ));
    };
    cursor.next();
    let mut field_type = base_type.to_owned();

    if cursor.peek_on_line(line).is_some_and(|t| t.is_punct('.')) {
        cursor.next();
        let (suffix, _) = cursor.expect_ident("type name")?;
        field_type = qualify(&field_type, &suffix);
    }
    if cursor.peek_on_line(line).is_some_and(|t| t.is_punct('(')) {
        let start = cursor.pos;
        cursor.skip_balanced('(', ')')?;
        let args: String = cursor.tokens[start..cursor.pos].iter().map(token_text).collect();
        field_type.push_str(&args);
    }
    if cursor.peek_on_line(line).is_some_and(|t| t.is_punct('['))
        && cursor.peek_at(1).is_some_and(|t| t.is_punct(']'))
    {
        cursor.next();
        cursor.next();
        field_type.push_str("[]");
    }

    let mut settings = FieldSettings::default();
    let mut inline_ref = None;
    if cursor.peek_on_line(line).is_some_and(|t| t.is_punct('[')) {
        inline_ref = parse_field_settings(cursor, &mut settings, table_name, &name, name_span)?;
    }

    let field = Field { name, field_type, settings, token: name_span.to(cursor.previous_span()) };
    Ok((field, inline_ref))
}

/// Parse `[pk, not null, ref: > t.c, ...]`; returns the inline ref if present.
fn parse_field_settings(
    cursor: &mut Cursor<'_>,
    settings: &mut FieldSettings,
    table_name: &str,
    field_name: &str,
    field_span: Span,
) -> Result<Option<Ref>, ParseError> {
    cursor.expect_punct('[', "to open column settings")?;
    let mut inline_ref = None;

    loop {
        let token = cursor.next_or_eof("column setting")?;
        if token.is_punct(']') {
            break;
        }

        if token.is_keyword("pk") {
            settings.pk = true;
        } else if token.is_keyword("primary") && cursor.peek().is_some_and(|t| t.is_keyword("key")) {
            cursor.next();
            settings.pk = true;
        } else if token.is_keyword("not") && cursor.peek().is_some_and(|t| t.is_keyword("null")) {
            cursor.next();
            settings.not_null = true;
        } else if token.is_keyword("unique") {
            settings.unique = true;
        } else if token.is_keyword("increment") {
            settings.increment = true;
        } else if token.is_keyword("note") && cursor.peek_is_punct(':') {
            cursor.next();
            settings.note = Some(expect_string(cursor, "column note")?);
        } else if token.is_keyword("default") && cursor.peek_is_punct(':') {
            cursor.next();
            let mut value = String::new();
            while let Some(t) = cursor.peek().filter(|t| !t.is_punct(',') && !t.is_punct(']')) {
                value.push_str(&token_text(t));
                cursor.next();
            }
            settings.default = Some(value);
        } else if token.is_keyword("ref") && cursor.peek_is_punct(':') {
            cursor.next();
            let (left, right) = parse_relation(cursor)?;
            let target = parse_endpoint(cursor, right)?;
            let source = RefEndpoint {
                table_name: table_name.to_owned(),
                table_id: String::new(),
                fields: vec![field_name.to_owned()],
                relation: left,
                token: field_span,
            };
            inline_ref = Some(Ref {
                id: String::new(),
                name: None,
                token: token.span.to(target.token),
                endpoints: vec![source, target],
            });
        } else {
            while cursor.peek().is_some_and(|t| !t.is_punct(',') && !t.is_punct(']')) {
                cursor.next();
            }
        }

        let separator = cursor.next_or_eof("',' or ']'")?;
        if separator.is_punct(']') {
            break;
        }
        if !separator.is_punct(',') {
            return Err(ParseError::syntax(
                format!("expected ',' or ']' in column settings, found {}", describe(separator)),
                separator.span,
            ));
        }
    }

    Ok(inline_ref)
}

fn parse_table_group(cursor: &mut Cursor<'_>) -> Result<TableGroup, ParseError> {
    let keyword = cursor.next_or_eof("'TableGroup'")?;
    let (name, name_token) = cursor.expect_name("table group name")?;
    cursor.expect_punct('{', &format!("after table group name '{name}'"))?;

    let mut members = Vec::new();
    loop {
        let Some(token) = cursor.peek() else {
            return Err(ParseError::syntax(
                format!("unterminated table group '{name}'; expected '}}'"),
                cursor.eof_span(),
            ));
        };
        if token.is_punct('}') {
            cursor.next();
            break;
        }
        let (member, span) = cursor.expect_name("table name")?;
        members.push(GroupMember { name: member, token: span });
    }

    Ok(TableGroup {
        id: String::new(),
        name,
        members,
        table_ids: Vec::new(),
        token: keyword.span.to(cursor.previous_span()),
        name_token,
    })
}

fn parse_ref(cursor: &mut Cursor<'_>) -> Result<Ref, ParseError> {
    let keyword = cursor.next_or_eof("'Ref'")?;

    let mut name = None;
    if let Some(ident) = cursor.peek().and_then(Token::ident)
        && cursor.peek_at(1).is_some_and(|t| t.is_punct(':') || t.is_punct('{'))
    {
        name = Some(ident.to_owned());
        cursor.next();
    }

    let opener = cursor.next_or_eof("':' or '{' after Ref")?;
    let long_form = if opener.is_punct(':') {
        false
    } else if opener.is_punct('{') {
        true
    } else {
        return Err(ParseError::syntax(format!("expected ':' or '{{' after Ref, found {}", describe(opener)), opener.span));
    };

    let first = parse_endpoint(cursor, Relation::One)?;
    let (left, right) = parse_relation(cursor)?;
    let second = parse_endpoint(cursor, right)?;
    let first = RefEndpoint { relation: left, ..first };

    if cursor.peek_is_punct('[') {
        cursor.skip_balanced('[', ']')?;
    }
    if long_form {
        cursor.expect_punct('}', "to close Ref")?;
    }

    Ok(Ref {
        id: String::new(),
        name,
        endpoints: vec![first, second],
        token: keyword.span.to(cursor.previous_span()),
    })
}

/// Parse a relationship operator into (left, right) cardinalities.
fn parse_relation(cursor: &mut Cursor<'_>) -> Result<(Relation, Relation), ParseError> {
    let token = cursor.next_or_eof("relationship operator")?;
    match token.kind {
        TokenKind::Punct('<') => Ok((Relation::One, Relation::Many)),
        TokenKind::Punct('>') => Ok((Relation::Many, Relation::One)),
        TokenKind::Punct('-') => Ok((Relation::One, Relation::One)),
        TokenKind::Diamond => Ok((Relation::Many, Relation::Many)),
        _ => Err(ParseError::syntax(
            format!("expected one of '<', '>', '-', '<>', found {}", describe(token)),
            token.span,
        )),
    }
}

/// Parse `table.column`, `schema.table.column` or `table.(a, b)`.
fn parse_endpoint(cursor: &mut Cursor<'_>, relation: Relation) -> Result<RefEndpoint, ParseError> {
    let (first, start) = cursor.expect_ident("table name")?;
    let mut parts = vec![first];
    let mut composite = None;

    while cursor.peek_is_punct('.') {
        cursor.next();
        if cursor.peek_is_punct('(') {
            cursor.next();
            let mut columns = Vec::new();
            loop {
                columns.push(cursor.expect_ident("column name")?.0);
                let token = cursor.next_or_eof("',' or ')'")?;
                if token.is_punct(')') {
                    break;
                }
                if !token.is_punct(',') {
                    return Err(ParseError::syntax(format!("expected ',' or ')', found {}", describe(token)), token.span));
                }
            }
            composite = Some(columns);
            break;
        }
        parts.push(cursor.expect_ident("column name")?.0);
    }

    let token = start.to(cursor.previous_span());
    let (table_parts, fields) = match composite {
        Some(columns) => (parts.as_slice(), columns),
        None if parts.len() >= 2 => {
            let (table, column) = parts.split_at(parts.len() - 1);
            (table, column.to_vec())
        }
        None => return Err(ParseError::syntax("expected 'table.column' in reference", token)),
    };
    let table_name = match table_parts {
        [schema, table] => qualify(schema, table),
        _ => table_parts.join("."),
    };

    Ok(RefEndpoint { table_name, table_id: String::new(), fields, relation, token })
}

// =============================================================================
// REFERENCE CHECKS
// =============================================================================

fn check_references(schema: &Schema) -> Result<(), ParseError> {
    let mut names: HashMap<&str, &Table> = HashMap::new();
    for table in &schema.tables {
        if names.insert(table.name.as_str(), table).is_some() {
            return Err(ParseError::new(
                ParseErrorKind::DuplicateName,
                format!("table '{}' is already defined", table.name),
                table.name_token,
            ));
        }
    }
    for table in &schema.tables {
        if let Some(alias) = &table.alias
            && names.insert(alias.as_str(), table).is_some()
        {
            return Err(ParseError::new(
                ParseErrorKind::DuplicateName,
                format!("alias '{alias}' collides with another table or alias"),
                table.name_token,
            ));
        }
    }

    let mut group_names = HashSet::new();
    let mut grouped = HashSet::new();
    for group in &schema.table_groups {
        if !group_names.insert(group.name.as_str()) {
            return Err(ParseError::new(
                ParseErrorKind::DuplicateName,
                format!("table group '{}' is already defined", group.name),
                group.name_token,
            ));
        }
        for member in &group.members {
            let Some(table) = names.get(member.name.as_str()) else {
                return Err(ParseError::new(
                    ParseErrorKind::UnknownTable,
                    format!("table '{}' in group '{}' is not defined", member.name, group.name),
                    member.token,
                ));
            };
            if !grouped.insert(table.name.as_str()) {
                return Err(ParseError::new(
                    ParseErrorKind::AlreadyGrouped,
                    format!("table '{}' already belongs to a group", table.name),
                    member.token,
                ));
            }
        }
    }

    for reference in &schema.refs {
        for endpoint in &reference.endpoints {
            let Some(table) = names.get(endpoint.table_name.as_str()) else {
                return Err(ParseError::new(
                    ParseErrorKind::UnknownTable,
                    format!("table '{}' is not defined", endpoint.table_name),
                    endpoint.token,
                ));
            };
            if let Some(missing) = endpoint.fields.iter().find(|f| table.field(f).is_none()) {
                return Err(ParseError::new(
                    ParseErrorKind::UnknownField,
                    format!("column '{missing}' is not defined in table '{}'", table.name),
                    endpoint.token,
                ));
            }
        }
    }

    Ok(())
}

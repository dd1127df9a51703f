use crate::Parser;
use crate::ast::Database;

fn normalized(input: &str) -> Database {
    let mut db = Parser::new().parse(input, "dbml").unwrap();
    db.normalize();
    db
}

#[test]
fn table_ids_are_names() {
    let db = normalized("Table users { id int }\nTable audit.log { id int }");
    let ids: Vec<&str> = db.schemas[0].tables.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["users", "audit.log"]);
}

#[test]
fn group_members_resolve_through_aliases() {
    let db = normalized("Table users as U { id int }\nTableGroup g { U }");
    let group = &db.schemas[0].table_groups[0];
    assert_eq!(group.id, "g");
    assert_eq!(group.table_ids, ["users"]);
}

#[test]
fn anonymous_ref_ids_are_canonical() {
    let db = normalized("Table users as U { id int }\nTable posts { user_id int [ref: > U.id] }");
    let reference = &db.schemas[0].refs[0];
    assert_eq!(reference.endpoints[1].table_id, "users");
    assert_eq!(reference.id, "posts.user_id>users.id");
}

#[test]
fn named_ref_uses_its_name() {
    let db = normalized("Table a { id int }\nTable b { a_id int }\nRef fk_b_a: b.a_id > a.id");
    assert_eq!(db.schemas[0].refs[0].id, "fk_b_a");
}

#[test]
fn composite_ref_id_lists_columns() {
    let db = normalized("Table a { x int\n y int }\nTable b { x int\n y int }\nRef: a.(x, y) - b.(x, y)");
    assert_eq!(db.schemas[0].refs[0].id, "a.(x,y)-b.(x,y)");
}

#[test]
fn duplicate_ref_ids_get_suffixes() {
    let db = normalized("Table a { id int }\nTable b { id int }\nRef: a.id < b.id\nRef: a.id < b.id");
    let ids: Vec<&str> = db.schemas[0].refs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["a.id<b.id", "a.id<b.id#2"]);
}

#[test]
fn normalize_is_idempotent() {
    let once = normalized("Table a { id int }\nTable b { id int }\nRef: a.id < b.id\nRef: a.id < b.id\nTableGroup g { a }");
    let mut twice = once.clone();
    twice.normalize();
    assert_eq!(once, twice);
}

#[test]
fn ids_survive_unrelated_insertions() {
    let before = normalized("Table b { id int }\nTable c { b_id int [ref: > b.id] }");
    let after = normalized("Table a { id int }\nTable b { id int }\nTable c { b_id int [ref: > b.id] }");
    assert_eq!(before.schemas[0].tables[0].id, after.schemas[0].tables[1].id);
    assert_eq!(before.schemas[0].refs[0].id, after.schemas[0].refs[0].id);
}

#[test]
fn normalized_schema_serializes_camel_case() {
    let db = normalized("Table a { id int }\nTableGroup g { a }");
    let json = serde_json::to_value(&db).unwrap();
    assert_eq!(json["schemas"][0]["tableGroups"][0]["tableIds"][0], "a");
}

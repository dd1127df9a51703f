//! Id assignment and name resolution for parsed databases.
//!
//! Ids are derived from names rather than declaration order, so an entity
//! keeps its id when unrelated definitions are added or removed around it:
//! tables and groups use their (qualified) name, named refs their name, and
//! anonymous refs a canonical `a.col<b.col` rendering of their endpoints.
//! Duplicate ref ids get a `#n` suffix in declaration order.

#[cfg(test)]
#[path = "normalize_test.rs"]
mod normalize_test;

use std::collections::HashMap;

use crate::ast::{Database, Ref, RefEndpoint, Schema};

impl Database {
    /// Assign entity ids and resolve table names and aliases to table ids.
    ///
    /// Idempotent: every id is recomputed from names on each call.
    pub fn normalize(&mut self) {
        for schema in &mut self.schemas {
            normalize_schema(schema);
        }
    }
}

fn normalize_schema(schema: &mut Schema) {
    for table in &mut schema.tables {
        table.id.clone_from(&table.name);
    }

    let mut lookup: HashMap<String, String> = HashMap::new();
    for table in &schema.tables {
        lookup.insert(table.name.clone(), table.id.clone());
        if let Some(alias) = &table.alias {
            lookup.entry(alias.clone()).or_insert_with(|| table.id.clone());
        }
    }
    let resolve = |name: &str| lookup.get(name).cloned().unwrap_or_else(|| name.to_owned());

    for group in &mut schema.table_groups {
        group.id.clone_from(&group.name);
        group.table_ids = group.members.iter().map(|m| resolve(&m.name)).collect();
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    for reference in &mut schema.refs {
        for endpoint in &mut reference.endpoints {
            endpoint.table_id = resolve(&endpoint.table_name);
        }
        let base = reference.name.clone().unwrap_or_else(|| canonical_ref_id(reference));
        let count = seen.entry(base.clone()).or_insert(0);
        *count += 1;
        reference.id = if *count == 1 { base } else { format!("{base}#{count}") };
    }
}

fn endpoint_label(endpoint: &RefEndpoint) -> String {
    match endpoint.fields.as_slice() {
        [single] => format!("{}.{single}", endpoint.table_id),
        fields => format!("{}.({})", endpoint.table_id, fields.join(",")),
    }
}

fn canonical_ref_id(reference: &Ref) -> String {
    let labels: Vec<String> = reference.endpoints.iter().map(endpoint_label).collect();
    labels.join(reference.operator())
}

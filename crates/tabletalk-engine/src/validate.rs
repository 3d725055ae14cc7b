//! Pre-execution checks on generated SQL.
//!
//! The store would reject an unknown identifier on its own, but a table that
//! exists in the store while sitting outside the candidate set would sail
//! through. Parsing the statement and checking its table references here
//! fails fast in both cases.

use crate::{CandidateSchema, GenerationError};
use sqlparser::ast::{visit_relations, Statement};
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;
use std::collections::BTreeSet;
use std::ops::ControlFlow;

/// Parse one generated statement and collect every table it references,
/// lowercased, with CTE aliases excluded.
///
/// Only plain queries are accepted: the generation prompt asks for a single
/// SELECT, so DDL/DML or multiple statements are generation bugs.
pub fn referenced_tables(sql: &str) -> Result<BTreeSet<String>, GenerationError> {
    let statements = Parser::parse_sql(&DuckDbDialect {}, sql)
        .map_err(|e| GenerationError::Unparseable(e.to_string()))?;

    let statement = match statements.as_slice() {
        [statement] => statement,
        [] => return Err(GenerationError::Unparseable("no statement found".to_string())),
        _ => {
            return Err(GenerationError::Unparseable(format!(
                "expected one statement, got {}",
                statements.len()
            )))
        }
    };

    let Statement::Query(query) = statement else {
        return Err(GenerationError::NotAQuery);
    };

    let mut cte_aliases = BTreeSet::new();
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            cte_aliases.insert(cte.alias.name.value.to_lowercase());
        }
    }

    let mut tables = BTreeSet::new();
    let _ = visit_relations(statement, |relation| {
        if let Some(ident) = relation.0.last() {
            tables.insert(ident.value.to_lowercase());
        }
        ControlFlow::<()>::Continue(())
    });

    Ok(tables.difference(&cte_aliases).cloned().collect())
}

/// Fail with [`GenerationError::DisallowedTables`] when any referenced table
/// is not in the candidate set.
pub fn ensure_candidates(
    referenced: &BTreeSet<String>,
    candidates: &[CandidateSchema],
) -> Result<(), GenerationError> {
    let allowed: BTreeSet<String> = candidates
        .iter()
        .map(|schema| schema.name.to_lowercase())
        .collect();

    let disallowed: Vec<String> = referenced.difference(&allowed).cloned().collect();
    if disallowed.is_empty() {
        Ok(())
    } else {
        Err(GenerationError::DisallowedTables { tables: disallowed })
    }
}

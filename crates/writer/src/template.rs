//! Statement templates
//!
//! One parameterized statement per write job. Tables without counters get an
//! `INSERT`; tables with any counter column get an `UPDATE` whose counter
//! assignments are additive. The two forms are never mixed.

use colwrite_config::{WriteOptions, WriteValue};

use crate::batch::BatchType;
use crate::error::SchemaError;
use crate::schema::{ColumnDef, CqlType, TableTarget};

/// Which statement form a template uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    CounterUpdate,
}

impl StatementKind {
    /// Batch type every batch of this kind must use
    pub fn batch_type(&self) -> BatchType {
        match self {
            Self::Insert => BatchType::Unlogged,
            Self::CounterUpdate => BatchType::Counter,
        }
    }
}

/// What a bind variable feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// A table column
    Column,
    /// Per-row `USING TTL`
    Ttl,
    /// Per-row `USING TIMESTAMP`
    Timestamp,
}

/// One named placeholder of a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindVariable {
    pub name: String,
    pub cql_type: CqlType,
    pub kind: VariableKind,
}

impl BindVariable {
    fn column(column: &ColumnDef) -> Self {
        Self {
            name: column.name.clone(),
            cql_type: column.cql_type,
            kind: VariableKind::Column,
        }
    }
}

/// An immutable statement with named placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementTemplate {
    cql: String,
    kind: StatementKind,
    variables: Vec<BindVariable>,
}

impl StatementTemplate {
    /// Build the statement for `target` under `options`
    pub fn build(target: &TableTarget, options: &WriteOptions) -> Result<Self, SchemaError> {
        let ttl = options.ttl_value();
        let timestamp = options.timestamp_value();

        for value in [&ttl, &timestamp].into_iter().flatten() {
            if let WriteValue::PerRow(column) = value
                && target.column(column).is_some()
            {
                return Err(SchemaError::OptionColumnCollision {
                    table: target.qualified_name(),
                    column: column.clone(),
                });
            }
        }

        if target.has_counter() {
            let rejected = if ttl.is_some() {
                Some("TTL")
            } else if timestamp.is_some() {
                Some("write timestamp")
            } else if options.if_not_exists {
                Some("IF NOT EXISTS")
            } else {
                None
            };
            if let Some(option) = rejected {
                return Err(SchemaError::CounterOption {
                    table: target.qualified_name(),
                    option,
                });
            }
            return Ok(Self::counter_update(target));
        }

        Ok(Self::insert(target, options.if_not_exists, ttl, timestamp))
    }

    fn insert(
        target: &TableTarget,
        if_not_exists: bool,
        ttl: Option<WriteValue>,
        timestamp: Option<WriteValue>,
    ) -> Self {
        let mut variables: Vec<_> = target.columns().iter().map(BindVariable::column).collect();

        let columns = join(target.columns().iter().map(|c| quote(&c.name)), ", ");
        let markers = join(target.columns().iter().map(|c| bind_marker(&c.name)), ", ");

        let mut cql = format!(
            "INSERT INTO {} ({columns}) VALUES ({markers})",
            qualified(target)
        );
        if if_not_exists {
            cql.push_str(" IF NOT EXISTS");
        }

        let mut using = Vec::with_capacity(2);
        if let Some(ttl) = ttl {
            using.push(format!("TTL {}", option_clause(&ttl)));
            if let WriteValue::PerRow(name) = ttl {
                variables.push(BindVariable {
                    name,
                    cql_type: CqlType::Int,
                    kind: VariableKind::Ttl,
                });
            }
        }
        if let Some(timestamp) = timestamp {
            using.push(format!("TIMESTAMP {}", option_clause(&timestamp)));
            if let WriteValue::PerRow(name) = timestamp {
                variables.push(BindVariable {
                    name,
                    cql_type: CqlType::BigInt,
                    kind: VariableKind::Timestamp,
                });
            }
        }
        if !using.is_empty() {
            cql.push_str(" USING ");
            cql.push_str(&using.join(" AND "));
        }

        Self {
            cql,
            kind: StatementKind::Insert,
            variables,
        }
    }

    fn counter_update(target: &TableTarget) -> Self {
        let (primary_key, regular): (Vec<&ColumnDef>, Vec<&ColumnDef>) =
            target.columns().iter().partition(|c| c.is_primary_key());
        let (counters, plain): (Vec<&ColumnDef>, Vec<&ColumnDef>) =
            regular.into_iter().partition(|c| c.is_counter());

        let set = join(
            plain
                .iter()
                .map(|c| format!("{} = {}", quote(&c.name), bind_marker(&c.name)))
                .chain(counters.iter().map(|c| {
                    let col = quote(&c.name);
                    format!("{col} = {col} + {}", bind_marker(&c.name))
                })),
            ", ",
        );
        let filter = join(
            primary_key
                .iter()
                .map(|c| format!("{} = {}", quote(&c.name), bind_marker(&c.name))),
            " AND ",
        );

        let variables = plain
            .iter()
            .chain(&counters)
            .chain(&primary_key)
            .map(|c| BindVariable::column(c))
            .collect();

        Self {
            cql: format!("UPDATE {} SET {set} WHERE {filter}", qualified(target)),
            kind: StatementKind::CounterUpdate,
            variables,
        }
    }

    pub fn cql(&self) -> &str {
        &self.cql
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Placeholders in the order they appear in the statement
    pub fn variables(&self) -> &[BindVariable] {
        &self.variables
    }

    pub fn batch_type(&self) -> BatchType {
        self.kind.batch_type()
    }

    /// Position of the column variable named `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.variables
            .iter()
            .position(|v| v.kind == VariableKind::Column && v.name == name)
    }
}

/// Quote an identifier so the database keeps its case
pub fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn bind_marker(name: &str) -> String {
    if is_plain_identifier(name) {
        format!(":{name}")
    } else {
        format!(":{}", quote(name))
    }
}

fn option_clause(value: &WriteValue) -> String {
    match value {
        WriteValue::Static(v) => v.to_string(),
        WriteValue::PerRow(name) => bind_marker(name),
    }
}

fn qualified(target: &TableTarget) -> String {
    format!("{}.{}", quote(target.keyspace()), quote(target.table()))
}

fn join<I: Iterator<Item = String>>(parts: I, sep: &str) -> String {
    parts.collect::<Vec<_>>().join(sep)
}

#[cfg(test)]
#[path = "template_test.rs"]
mod template_test;

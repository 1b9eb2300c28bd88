//! Table metadata
//!
//! The schema is discovered by an external [`SchemaProvider`]; the writer
//! narrows it to a [`TableTarget`] holding only the selected columns.

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;

use crate::error::SchemaError;
use crate::session::DriverError;

/// Column data types the write path can bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CqlType {
    Boolean,
    Int,
    BigInt,
    Counter,
    Float,
    Double,
    Text,
    Blob,
    Uuid,
    Timestamp,
}

impl CqlType {
    /// CQL spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Counter => "counter",
            Self::Float => "float",
            Self::Double => "double",
            Self::Text => "text",
            Self::Blob => "blob",
            Self::Uuid => "uuid",
            Self::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for CqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a column in the table's primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    PartitionKey,
    ClusteringColumn,
    Regular,
}

/// One column of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub cql_type: CqlType,
    pub role: ColumnRole,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, cql_type: CqlType, role: ColumnRole) -> Self {
        Self {
            name: name.into(),
            cql_type,
            role,
        }
    }

    pub fn partition_key(name: impl Into<String>, cql_type: CqlType) -> Self {
        Self::new(name, cql_type, ColumnRole::PartitionKey)
    }

    pub fn clustering(name: impl Into<String>, cql_type: CqlType) -> Self {
        Self::new(name, cql_type, ColumnRole::ClusteringColumn)
    }

    pub fn regular(name: impl Into<String>, cql_type: CqlType) -> Self {
        Self::new(name, cql_type, ColumnRole::Regular)
    }

    /// Partition key or clustering column
    pub fn is_primary_key(&self) -> bool {
        !matches!(self.role, ColumnRole::Regular)
    }

    pub fn is_partition_key(&self) -> bool {
        matches!(self.role, ColumnRole::PartitionKey)
    }

    pub fn is_counter(&self) -> bool {
        self.cql_type == CqlType::Counter
    }
}

/// Full metadata of one table as reported by the cluster
///
/// Partition-key columns are listed in partition-key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub keyspace: String,
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(keyspace: impl Into<String>, name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            keyspace: keyspace.into(),
            name: name.into(),
            columns,
        }
    }

    /// Look up a column by exact (case-sensitive) name
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// `keyspace.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.keyspace, self.name)
    }
}

/// Which columns a write covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ColumnSelector {
    /// Every column of the table, in schema order
    #[default]
    All,
    /// Exactly these columns, in this order
    Some(Vec<String>),
}

impl ColumnSelector {
    pub fn some<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Some(names.into_iter().map(Into::into).collect())
    }
}

/// The resolved destination of a write job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTarget {
    keyspace: String,
    table: String,
    columns: Vec<ColumnDef>,
    partition_key: Vec<String>,
}

impl TableTarget {
    /// Narrow `schema` to the selected columns
    ///
    /// Every primary-key column must be selected; the database needs the
    /// full key to address a row.
    pub fn select(schema: &TableSchema, selector: &ColumnSelector) -> Result<Self, SchemaError> {
        let columns = match selector {
            ColumnSelector::All => schema.columns.clone(),
            ColumnSelector::Some(names) => {
                let mut seen = HashSet::with_capacity(names.len());
                let mut columns = Vec::with_capacity(names.len());
                for name in names {
                    if !seen.insert(name.as_str()) {
                        return Err(SchemaError::DuplicateColumn {
                            column: name.clone(),
                        });
                    }
                    let column = schema.column(name).ok_or_else(|| SchemaError::UnknownColumn {
                        table: schema.qualified_name(),
                        column: name.clone(),
                    })?;
                    columns.push(column.clone());
                }
                columns
            }
        };

        if let Some(missing) = schema
            .columns
            .iter()
            .filter(|c| c.is_primary_key())
            .find(|pk| !columns.iter().any(|c| c.name == pk.name))
        {
            return Err(SchemaError::MissingPrimaryKey {
                table: schema.qualified_name(),
                column: missing.name.clone(),
            });
        }

        let partition_key = schema
            .columns
            .iter()
            .filter(|c| c.is_partition_key())
            .map(|c| c.name.clone())
            .collect::<Vec<_>>();

        if partition_key.is_empty() {
            return Err(SchemaError::NoPartitionKey {
                table: schema.qualified_name(),
            });
        }

        Ok(Self {
            keyspace: schema.keyspace.clone(),
            table: schema.name.clone(),
            columns,
            partition_key,
        })
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Selected columns in selection order
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Partition-key column names in partition-key order
    pub fn partition_key(&self) -> &[String] {
        &self.partition_key
    }

    /// Whether writes must use counter updates
    pub fn has_counter(&self) -> bool {
        self.columns.iter().any(ColumnDef::is_counter)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// `keyspace.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.keyspace, self.table)
    }
}

/// Source of table metadata
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Metadata for `keyspace.table`, `None` if it does not exist
    async fn table(&self, keyspace: &str, table: &str) -> Result<Option<TableSchema>, DriverError>;
}

//! Binding records into the prepared statement

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;

use crate::error::BindError;
use crate::extractor::RowExtractor;
use crate::routing::MAX_KEY_COMPONENT_LEN;
use crate::session::PreparedStatement;
use crate::value::{CqlValue, MaybeUnset};

/// One record's values bound to the prepared statement
///
/// Values are in bind-variable order. The routing key is computed on demand
/// by [`RoutingKeyResolver`](crate::routing::RoutingKeyResolver) and cached
/// here.
#[derive(Debug)]
pub struct BoundStatement {
    prepared: Arc<PreparedStatement>,
    values: Vec<MaybeUnset<CqlValue>>,
    size: usize,
    routing_key: OnceLock<Bytes>,
}

impl BoundStatement {
    pub fn prepared(&self) -> &Arc<PreparedStatement> {
        &self.prepared
    }

    pub fn values(&self) -> &[MaybeUnset<CqlValue>] {
        &self.values
    }

    /// Estimated payload size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Non-null value bound at `index`
    pub fn value_at(&self, index: usize) -> Option<&CqlValue> {
        self.values.get(index).and_then(MaybeUnset::value)
    }

    /// Routing key, if it has been resolved
    pub fn routing_key(&self) -> Option<&Bytes> {
        self.routing_key.get()
    }

    pub(crate) fn routing_key_cell(&self) -> &OnceLock<Bytes> {
        &self.routing_key
    }
}

/// Turns records into [`BoundStatement`]s
pub struct RowBinder<R> {
    prepared: Arc<PreparedStatement>,
    extractor: Arc<dyn RowExtractor<R>>,
    names: Vec<String>,
    ignore_nulls: bool,
}

impl<R> RowBinder<R> {
    /// With `ignore_nulls`, absent values leave the column untouched instead
    /// of writing null
    pub fn new(
        prepared: Arc<PreparedStatement>,
        extractor: Arc<dyn RowExtractor<R>>,
        ignore_nulls: bool,
    ) -> Self {
        let names = prepared
            .template()
            .variables()
            .iter()
            .map(|v| v.name.clone())
            .collect();
        Self {
            prepared,
            extractor,
            names,
            ignore_nulls,
        }
    }

    /// Bind one record
    pub fn bind(&self, record: &R) -> Result<BoundStatement, BindError> {
        let extracted = self.extractor.extract(record, &self.names);

        // Extractors usually answer in the order asked; only fall back to a
        // lookup when they did not.
        let in_order = extracted.len() == self.names.len()
            && extracted.iter().zip(&self.names).all(|((n, _), name)| n == name);

        let raw: Vec<Option<CqlValue>> = if in_order {
            extracted.into_iter().map(|(_, v)| v).collect()
        } else {
            let mut by_name: HashMap<String, Option<CqlValue>> = extracted.into_iter().collect();
            self.names
                .iter()
                .map(|name| {
                    by_name
                        .remove(name)
                        .ok_or_else(|| BindError::missing_column(name.as_str()))
                })
                .collect::<Result<_, _>>()?
        };

        let variables = self.prepared.template().variables();
        let mut values = Vec::with_capacity(raw.len());
        let mut size = 0;
        for (value, variable) in raw.into_iter().zip(variables) {
            let slot = match value {
                Some(v) if !v.is_null() => {
                    if !v.fits(variable.cql_type) {
                        return Err(BindError::TypeMismatch {
                            column: variable.name.clone(),
                            expected: variable.cql_type,
                            actual: v.type_name(),
                        });
                    }
                    MaybeUnset::Set(v)
                }
                _ if self.ignore_nulls => MaybeUnset::Unset,
                _ => MaybeUnset::Set(CqlValue::Null),
            };
            size += slot.serialized_len();
            values.push(slot);
        }

        for &index in self.prepared.partition_key_indexes() {
            let Some(key) = values.get(index).and_then(MaybeUnset::value) else {
                return Err(BindError::NullPartitionKey {
                    column: variables[index].name.clone(),
                });
            };
            if key.serialized_len() > MAX_KEY_COMPONENT_LEN {
                return Err(BindError::PartitionKeyTooLarge {
                    column: variables[index].name.clone(),
                    len: key.serialized_len(),
                    limit: MAX_KEY_COMPONENT_LEN,
                });
            }
        }

        Ok(BoundStatement {
            prepared: Arc::clone(&self.prepared),
            values,
            size,
            routing_key: OnceLock::new(),
        })
    }
}

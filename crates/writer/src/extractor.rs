//! Record to column mapping
//!
//! A [`RowExtractor`] is resolved once per writer and asked for the values of
//! every bind variable of every record.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::marker::PhantomData;

use crate::value::CqlValue;

/// Maps records of type `R` onto named columns
pub trait RowExtractor<R>: Send + Sync {
    /// Values for `columns`, ideally in the same order
    ///
    /// A pair with `None` means the record has no value (bound as null).
    /// A column left out of the result entirely is unknown to the record,
    /// which rejects it.
    fn extract(&self, record: &R, columns: &[String]) -> Vec<(String, Option<CqlValue>)>;
}

/// Extractor for records that already are column maps
///
/// Keys absent from the map are unknown columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapExtractor;

impl<S> RowExtractor<HashMap<String, CqlValue, S>> for MapExtractor
where
    S: BuildHasher + Send + Sync,
{
    fn extract(
        &self,
        record: &HashMap<String, CqlValue, S>,
        columns: &[String],
    ) -> Vec<(String, Option<CqlValue>)> {
        columns
            .iter()
            .filter_map(|c| record.get(c).map(|v| (c.clone(), Some(v.clone()))))
            .collect()
    }
}

impl RowExtractor<BTreeMap<String, CqlValue>> for MapExtractor {
    fn extract(
        &self,
        record: &BTreeMap<String, CqlValue>,
        columns: &[String],
    ) -> Vec<(String, Option<CqlValue>)> {
        columns
            .iter()
            .filter_map(|c| record.get(c).map(|v| (c.clone(), Some(v.clone()))))
            .collect()
    }
}

/// Extractor backed by a per-column accessor
///
/// The accessor returns `None` for columns the record does not have and
/// `Some(None)` for columns it has without a value.
pub struct FnExtractor<R, F> {
    accessor: F,
    _record: PhantomData<fn(&R)>,
}

impl<R, F> FnExtractor<R, F>
where
    F: Fn(&R, &str) -> Option<Option<CqlValue>> + Send + Sync,
{
    pub fn new(accessor: F) -> Self {
        Self {
            accessor,
            _record: PhantomData,
        }
    }
}

impl<R, F> RowExtractor<R> for FnExtractor<R, F>
where
    F: Fn(&R, &str) -> Option<Option<CqlValue>> + Send + Sync,
{
    fn extract(&self, record: &R, columns: &[String]) -> Vec<(String, Option<CqlValue>)> {
        columns
            .iter()
            .filter_map(|c| (self.accessor)(record, c).map(|v| (c.clone(), v)))
            .collect()
    }
}

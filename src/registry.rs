//! Name-keyed registry of the filters linked into the binary.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::errors::{RegistryError, RegistryResult};
use crate::filter_metadata::FilterInfo;
use crate::filters::enumerate_registered_filters;

/// Read-only map from filter name to [`FilterInfo`], built once at startup.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    filters: BTreeMap<String, FilterInfo>,
}

impl FilterRegistry {
    /// Builds a registry from the given filters. A later filter replaces an
    /// earlier one with the same name.
    pub fn build(filters: impl IntoIterator<Item = FilterInfo>) -> Self {
        let mut registry = Self::default();
        for info in filters {
            if registry
                .filters
                .insert(info.name().to_string(), info)
                .is_some()
            {
                debug!("filter {} registered twice, keeping the last", info.name());
            }
        }
        registry
    }

    /// Builds a registry from a callback-style enumerator.
    ///
    /// The enumerator hands every filter to the callback and returns 0 on
    /// success. A nonzero status from the enumerator discards whatever was
    /// collected.
    pub fn from_enumerator<E>(enumerate: E) -> RegistryResult<Self>
    where
        E: FnOnce(&mut dyn FnMut(FilterInfo) -> i32) -> i32,
    {
        let mut collected = Vec::new();
        let status = enumerate(&mut |info: FilterInfo| {
            collected.push(info);
            0
        });
        if status != 0 {
            warn!("filter enumeration failed with status {status}");
            return Err(RegistryError::EnumerationFailed { status });
        }
        let registry = Self::build(collected);
        debug!("registered {} filters", registry.len());
        Ok(registry)
    }

    /// Builds a registry of every filter this crate provides.
    pub fn with_registered_filters() -> RegistryResult<Self> {
        Self::from_enumerator(enumerate_registered_filters)
    }

    /// Looks a filter up by name.
    ///
    /// An empty name resolves to the only registered filter; with zero or
    /// several filters it fails and the error lists every registered name.
    pub fn find(&self, name: &str) -> RegistryResult<&FilterInfo> {
        if name.is_empty() {
            let mut all = self.filters.values();
            return match (all.next(), all.next()) {
                (Some(only), None) => Ok(only),
                _ => Err(RegistryError::Ambiguous {
                    names: self.filters.keys().cloned().collect(),
                }),
            };
        }
        self.filters.get(name).ok_or_else(|| RegistryError::NotFound {
            name: name.to_string(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterInfo> {
        self.filters.values()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use indexmap::IndexMap;
use smol_str::SmolStr;

/// Lower-cased column name to result set index.
pub type ColumnMap = IndexMap<SmolStr, usize>;

/// Column maps keyed by the joined column list of a result set.
#[derive(Debug, Default)]
pub struct ColumnMapCache {
    maps: RwLock<HashMap<String, Arc<ColumnMap>>>,
}

impl ColumnMapCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<S: AsRef<str>>(&self, columns: &[S]) -> Arc<ColumnMap> {
        let key = signature(columns);
        {
            let maps = self.maps.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(map) = maps.get(&key) {
                return map.clone();
            }
        }

        tracing::debug!(columns = %key, "building column map");
        let map = Arc::new(build(columns));
        let mut maps = self.maps.write().unwrap_or_else(PoisonError::into_inner);
        maps.entry(key).or_insert(map).clone()
    }

    pub fn len(&self) -> usize {
        self.maps.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn signature<S: AsRef<str>>(columns: &[S]) -> String {
    let mut key = String::with_capacity(columns.len() * 8);
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        key.push_str(column.as_ref());
    }
    key
}

/// Builds the map. When a name repeats the last index wins.
pub fn build<S: AsRef<str>>(columns: &[S]) -> ColumnMap {
    let mut map = ColumnMap::with_capacity(columns.len());
    for (index, column) in columns.iter().enumerate() {
        map.insert(SmolStr::new(column.as_ref().to_lowercase()), index);
    }
    map
}

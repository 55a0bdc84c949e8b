use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use smol_str::SmolStr;

use crate::{
    error::{Error, Result},
    model::{FieldShape, Model, RecordShape, ScalarKind, Shape},
};

/// A persisted field of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMetadata {
    /// Name of the field in the record type.
    pub name: &'static str,
    /// Lower-cased column name.
    pub column: SmolStr,
    /// Declared index of the field, including unmapped fields.
    pub position: usize,
    pub optional: bool,
    pub kind: ScalarKind,
}

/// Table name and mapped fields of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMetadata {
    pub table_name: SmolStr,
    pub fields: Vec<FieldMetadata>,
}

impl RecordMetadata {
    pub fn field(&self, column: &str) -> Option<&FieldMetadata> {
        self.fields
            .iter()
            .find(|field| field.column.eq_ignore_ascii_case(column))
    }

    pub fn columns(&self) -> impl Iterator<Item = &SmolStr> {
        self.fields.iter().map(|field| &field.column)
    }
}

/// Derived table names keyed by fully qualified type name.
#[derive(Debug, Default)]
pub struct TableNameCache {
    names: RwLock<HashMap<&'static str, SmolStr>>,
}

impl TableNameCache {
    pub fn get(&self, type_name: &str) -> Option<SmolStr> {
        let names = self.names.read().unwrap_or_else(PoisonError::into_inner);
        names.get(type_name).cloned()
    }

    /// Returns the cached name, computing and storing it on a miss.
    pub fn get_or_insert_with<F>(&self, type_name: &'static str, derive: F) -> SmolStr
    where
        F: FnOnce() -> SmolStr,
    {
        if let Some(name) = self.get(type_name) {
            return name;
        }
        let name = derive();
        let mut names = self.names.write().unwrap_or_else(PoisonError::into_inner);
        names.entry(type_name).or_insert(name).clone()
    }

    pub fn len(&self) -> usize {
        self.names.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-type record metadata, derived once and shared afterwards.
///
/// Safe to share between threads. Two threads racing on the first lookup of a
/// type both derive the metadata; the first insert wins and both observe the
/// same value since derivation only depends on the type.
#[derive(Debug, Default)]
pub struct MetadataCache {
    records: RwLock<HashMap<TypeId, Arc<RecordMetadata>>>,
    table_names: TableNameCache,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the metadata of `T`, unwrapping one level of `Box`, `Arc` or `&`.
    pub fn resolve<T: Model>(&self) -> Result<Arc<RecordMetadata>> {
        let id = TypeId::of::<T>();
        if let Some(metadata) = self.cached(id) {
            return Ok(metadata);
        }

        let (target, shape) = match T::shape() {
            Shape::Indirect { target, shape } => (target, shape()),
            shape => (id, shape),
        };

        let record = match shape {
            Shape::Record(record) => record,
            Shape::Indirect { .. } => return Err(Error::InvalidModel(std::any::type_name::<T>())),
            Shape::Scalar(name) => return Err(Error::InvalidModel(name)),
        };

        if target != id {
            if let Some(metadata) = self.cached(target) {
                return Ok(metadata);
            }
        }

        tracing::debug!(model = record.type_name, "deriving record metadata");
        let derived = Arc::new(self.derive(&record));

        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let metadata = records.entry(target).or_insert(derived).clone();
        if target != id {
            records.entry(id).or_insert_with(|| metadata.clone());
        }
        Ok(metadata)
    }

    /// Table name of `T`, falling back to the snake-cased type name for non-records.
    pub fn table_name<T: Model>(&self) -> SmolStr {
        match self.resolve::<T>() {
            Ok(metadata) => metadata.table_name.clone(),
            Err(_) => {
                let type_name = std::any::type_name::<T>();
                self.table_names
                    .get_or_insert_with(type_name, || to_snake_case(bare_name(type_name)).into())
            }
        }
    }

    pub fn table_names(&self) -> &TableNameCache {
        &self.table_names
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, id: TypeId) -> Option<Arc<RecordMetadata>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(&id).cloned()
    }

    fn derive(&self, record: &RecordShape) -> RecordMetadata {
        let table_name = self
            .table_names
            .get_or_insert_with(record.type_name, || match record.table_name {
                Some(naming) => naming().into(),
                None => to_snake_case(record.name).into(),
            });

        let fields = record
            .fields
            .iter()
            .enumerate()
            .filter_map(|(position, field)| field_metadata(position, field))
            .collect();

        RecordMetadata { table_name, fields }
    }
}

fn field_metadata(position: usize, field: &FieldShape) -> Option<FieldMetadata> {
    if !field.visible {
        return None;
    }
    let tag = field.tag?;
    if tag.is_empty() || tag == "-" {
        return None;
    }
    // later segments are reserved for options
    let column = tag.split(',').next().unwrap_or_default().trim();
    if column.is_empty() || column == "-" {
        return None;
    }
    Some(FieldMetadata {
        name: field.name,
        column: SmolStr::new(column.to_lowercase()),
        position,
        optional: field.optional,
        kind: field.kind,
    })
}

/// Inserts an underscore before every interior uppercase letter and lower-cases the result.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// `crate::module::Name<Args>` -> `Name`
fn bare_name(type_name: &'static str) -> &'static str {
    let without_args = type_name.split('<').next().unwrap_or(type_name);
    without_args.rsplit("::").next().unwrap_or(without_args)
}

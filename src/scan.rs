use smol_str::SmolStr;

use crate::{
    coerce::Coercion,
    column::ColumnMapCache,
    driver::Rows,
    error::{Error, Result},
    metadata::{MetadataCache, RecordMetadata},
    model::Record,
    pool::ScanBufferPool,
    value::Value,
};

/// Where one mapped field reads its value from.
struct Slot<'m> {
    name: &'m str,
    position: usize,
    index: usize,
    optional: bool,
    /// Another field reads the same column.
    shared: bool,
}

/// Scans every row of `rows` into new records of `T`.
///
/// Columns are matched to fields case-insensitively. Fields without a column
/// keep their zero value. The scan buffer goes back to `pool` on every exit.
pub fn scan_rows<T, R>(
    rows: &mut R,
    metadata: &MetadataCache,
    columns: &ColumnMapCache,
    pool: &ScanBufferPool,
    mode: Coercion,
    capacity: usize,
) -> Result<Vec<T>>
where
    T: Record,
    R: Rows + ?Sized,
{
    let record = metadata.resolve::<T>()?;
    let names = rows.columns().map_err(|source| Error::scan(None, source))?;
    let map = columns.get(names.as_slice());
    let slots = plan(&record, |column| map.get(column).copied());

    let mut buffer = pool.acquire(names.len());
    let mut out = Vec::with_capacity(capacity);

    while rows.next() {
        rows.scan_into(&mut buffer)
            .map_err(|source| Error::scan(None, source))?;

        let mut item = T::default();
        for slot in &slots {
            let value = if slot.shared {
                buffer[slot.index].clone()
            } else {
                std::mem::take(&mut buffer[slot.index])
            };
            if value.is_null() && !slot.optional {
                continue;
            }
            item.assign(slot.position, value, mode)
                .map_err(|source| Error::scan(Some(SmolStr::new(slot.name)), source))?;
        }
        out.push(item);
    }

    if let Some(source) = rows.final_error() {
        return Err(Error::scan(None, source));
    }

    Ok(out)
}

fn plan<'m, F>(record: &'m RecordMetadata, lookup: F) -> Vec<Slot<'m>>
where
    F: Fn(&str) -> Option<usize>,
{
    let mut slots: Vec<Slot<'m>> = record
        .fields
        .iter()
        .filter_map(|field| {
            lookup(field.column.as_str()).map(|index| Slot {
                name: field.name,
                position: field.position,
                index,
                optional: field.optional,
                shared: false,
            })
        })
        .collect();

    for i in 0..slots.len() {
        let index = slots[i].index;
        slots[i].shared = slots.iter().filter(|slot| slot.index == index).count() > 1;
    }
    slots
}

/// Reads the first column of the first row, `None` when there are no rows.
pub(crate) fn scan_scalar<R: Rows + ?Sized>(rows: &mut R) -> Result<Option<Value>> {
    let names = rows.columns().map_err(|source| Error::scan(None, source))?;
    let mut slots = vec![Value::Null; names.len().max(1)];
    let found = if rows.next() {
        rows.scan_into(&mut slots)
            .map_err(|source| Error::scan(None, source))?;
        Some(std::mem::take(&mut slots[0]))
    } else {
        None
    };
    if let Some(source) = rows.final_error() {
        return Err(Error::scan(None, source));
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use std::thread;

    use crate::{Record, memory::MemoryRows};

    use super::*;

    #[derive(Debug, Default, Clone, PartialEq, Record)]
    pub struct Member {
        #[db(column = "id")]
        pub id: i64,
        #[db(column = "Name")]
        pub name: String,
        #[db(column = "nickname")]
        pub nickname: Option<String>,
        #[db(column = "score")]
        pub score: f32,
        #[db(skip)]
        pub cached: bool,
        hidden: i64,
    }

    struct Fixture {
        metadata: MetadataCache,
        columns: ColumnMapCache,
        pool: ScanBufferPool,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                metadata: MetadataCache::new(),
                columns: ColumnMapCache::new(),
                pool: ScanBufferPool::new(4),
            }
        }

        fn scan(&self, mut rows: MemoryRows, mode: Coercion) -> Result<Vec<Member>> {
            scan_rows(&mut rows, &self.metadata, &self.columns, &self.pool, mode, 10)
        }
    }

    #[test]
    fn test_scan_rows() {
        let fixture = Fixture::new();
        let rows = MemoryRows::new(["ID", "name", "nickname", "score", "hidden"])
            .row([
                Value::I64(1),
                Value::String("Ann".into()),
                Value::String("annie".into()),
                Value::F64(1.5),
                Value::I64(9),
            ])
            .row([
                Value::I64(2),
                Value::Bytes(b"Bob".to_vec()),
                Value::Null,
                Value::I64(3),
                Value::I64(9),
            ]);

        let members = fixture.scan(rows, Coercion::Lenient).unwrap();
        assert_eq!(2, members.len());
        assert_eq!(
            Member {
                id: 1,
                name: "Ann".into(),
                nickname: Some("annie".into()),
                score: 1.5,
                ..Member::default()
            },
            members[0]
        );
        assert_eq!("Bob", members[1].name);
        assert_eq!(None, members[1].nickname);
        assert_eq!(3.0, members[1].score);
        assert_eq!(0, members[1].hidden);
        assert_eq!(1, fixture.pool.idle());
    }

    #[test]
    fn test_scan_partial_columns() {
        let fixture = Fixture::new();
        let rows = MemoryRows::new(["name", "unknown"])
            .row([Value::String("Cy".into()), Value::Bool(true)]);
        let members = fixture.scan(rows, Coercion::Lenient).unwrap();
        assert_eq!(
            Member {
                name: "Cy".into(),
                ..Member::default()
            },
            members[0]
        );
    }

    #[test]
    fn test_scan_null_keeps_zero_value() {
        let fixture = Fixture::new();
        let rows = MemoryRows::new(["id", "name"]).row([Value::Null, Value::Null]);
        let members = fixture.scan(rows, Coercion::Strict).unwrap();
        assert_eq!(0, members[0].id);
        assert_eq!("", members[0].name);
    }

    #[test]
    fn test_scan_lenient_skips_unconvertible() {
        let fixture = Fixture::new();
        let rows = MemoryRows::new(["id", "name"])
            .row([Value::String("seven".into()), Value::String("Di".into())]);
        let members = fixture.scan(rows, Coercion::Lenient).unwrap();
        assert_eq!(0, members[0].id);
        assert_eq!("Di", members[0].name);
    }

    #[test]
    fn test_scan_strict_names_field() {
        let fixture = Fixture::new();
        let rows = MemoryRows::new(["id"]).row([Value::String("seven".into())]);
        let error = fixture.scan(rows, Coercion::Strict).unwrap_err();
        match error {
            Error::Scan { field, .. } => assert_eq!(Some(SmolStr::new("id")), field),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(1, fixture.pool.idle());
    }

    #[test]
    fn test_scan_propagates_driver_errors() {
        let fixture = Fixture::new();
        let rows = MemoryRows::new(["id"])
            .row([Value::I64(1)])
            .with_final_error("connection lost");
        let error = fixture.scan(rows, Coercion::Lenient).unwrap_err();
        assert!(matches!(error, Error::Scan { field: None, .. }));

        let rows = MemoryRows::new(["id"]).with_column_error("closed");
        assert!(fixture.scan(rows, Coercion::Lenient).is_err());
    }

    #[test]
    fn test_scan_empty() {
        let fixture = Fixture::new();
        let members = fixture
            .scan(MemoryRows::new(["id", "name"]), Coercion::Strict)
            .unwrap();
        assert!(members.is_empty());
        assert_eq!(1, fixture.columns.len());
    }

    #[test]
    fn test_scan_scalar() {
        let mut rows = MemoryRows::new(["count"]).row([Value::I64(5)]);
        assert_eq!(Some(Value::I64(5)), scan_scalar(&mut rows).unwrap());
        let mut rows = MemoryRows::new(["count"]);
        assert_eq!(None, scan_scalar(&mut rows).unwrap());
    }

    #[derive(Debug, Default, Record)]
    pub struct Account {
        #[db(column = "UserName")]
        pub user_name: String,
    }

    #[test]
    fn test_column_names_match_any_case() {
        let fixture = Fixture::new();
        for column in ["username", "USERNAME", "UserName"] {
            let mut rows = MemoryRows::new([column]).row([Value::String(column.into())]);
            let accounts: Vec<Account> = scan_rows(
                &mut rows,
                &fixture.metadata,
                &fixture.columns,
                &fixture.pool,
                Coercion::Strict,
                1,
            )
            .unwrap();
            assert_eq!(column, accounts[0].user_name, "column {column}");
        }
        assert_eq!(3, fixture.columns.len());
    }

    #[test]
    fn test_concurrent_scans_share_caches() {
        let fixture = Fixture::new();
        thread::scope(|scope| {
            for worker in 0..8i64 {
                let fixture = &fixture;
                scope.spawn(move || {
                    for round in 0..20i64 {
                        let id = worker * 100 + round;
                        let rows = MemoryRows::new(["id", "name"])
                            .row([Value::I64(id), Value::String(format!("m{id}"))])
                            .row([Value::I64(id + 1), Value::Null]);
                        let members = fixture.scan(rows, Coercion::Strict).unwrap();
                        assert_eq!(id, members[0].id);
                        assert_eq!(format!("m{id}"), members[0].name);
                        assert_eq!(id + 1, members[1].id);
                    }
                });
            }
        });
        assert_eq!(1, fixture.metadata.len());
        assert_eq!(1, fixture.columns.len());
        assert!(fixture.pool.idle() <= 4);
    }
}

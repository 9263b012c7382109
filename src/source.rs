/*
 * Copyright 2025 Oxide Computer Company
 */

use anyhow::Result;
use async_trait::async_trait;

/*
 * One row of a subtree walk: the OID suffix beyond the walked root, in dotted
 * decimal, and the scalar it points at.  Row order is the order the agent
 * returned them in, and callers depend on that.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkRow {
    pub suffix: String,
    pub value: WalkValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkValue {
    Int(i64),
    Bytes(Vec<u8>),
}

impl WalkValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            WalkValue::Int(i) => Some(*i),
            WalkValue::Bytes(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            WalkValue::Int(_) => None,
            WalkValue::Bytes(b) => {
                Some(String::from_utf8_lossy(b).to_string())
            }
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            WalkValue::Int(_) => None,
            WalkValue::Bytes(b) => Some(b),
        }
    }
}

pub type Rows = Vec<WalkRow>;

/*
 * A device to trawl.  walk() performs one subtree walk rooted at an OID;
 * suffix_depth is the number of leading OID components to strip from each
 * returned name to form the row suffix, and limit caps the number of rows
 * (-1 for unbounded).  Transport and protocol faults surface as Err from
 * walk(), but nothing above probe() ever sees them.
 *
 * vlan_scoped() yields a source addressing the per-VLAN bridge instance of
 * the same device.  For SNMPv1/v2c communities this is the "community@vlan"
 * convention; composing that string is owned here, by the source, and
 * nowhere else.
 */
#[async_trait]
pub trait SnmpSource: Send {
    fn host(&self) -> String;

    async fn walk(
        &mut self,
        root: &[u64],
        suffix_depth: usize,
        limit: i64,
    ) -> Result<Rows>;

    async fn vlan_scoped(&self, vlan: u16) -> Result<Box<dyn SnmpSource>>;
}

/*
 * The outcome of probing one subtree.  "The MIB is not there" and "the wire
 * blew up" both mean "try the next fallback", but we keep them apart long
 * enough to log the difference; a real network fault masquerading as an
 * unsupported MIB is otherwise invisible.
 */
#[derive(Debug)]
pub enum Walk {
    Rows(Rows),
    Empty,
    Fault,
}

impl Walk {
    pub fn rows(self) -> Option<Rows> {
        match self {
            Walk::Rows(r) => Some(r),
            Walk::Empty | Walk::Fault => None,
        }
    }
}

pub async fn probe(
    src: &mut dyn SnmpSource,
    name: &str,
    root: &[u64],
    limit: i64,
) -> Walk {
    match src.walk(root, root.len(), limit).await {
        Ok(rows) if rows.is_empty() => {
            log::debug!("{}: {name}: no rows", src.host());
            Walk::Empty
        }
        Ok(rows) => {
            log::debug!("{}: {name}: {} rows", src.host(), rows.len());
            Walk::Rows(rows)
        }
        Err(e) => {
            log::debug!("{}: {name}: walk fault (treated as absent): {e}", src.host());
            Walk::Fault
        }
    }
}

#[cfg(test)]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use super::{Rows, SnmpSource, WalkRow, WalkValue};

    /*
     * A scripted source: a set of subtrees keyed by root OID, plus a log of
     * which roots were walked so tests can assert that fallbacks short
     * circuit.  Roots scripted as Fault return a walk error; roots not
     * scripted at all return no rows.
     */
    #[derive(Default)]
    pub struct MockSource {
        tables: HashMap<Vec<u64>, Scripted>,
        pub calls: Arc<Mutex<Vec<Vec<u64>>>>,
        pub scoped_vlans: Arc<Mutex<Vec<u16>>>,
    }

    enum Scripted {
        Rows(Rows),
        Fault,
    }

    impl MockSource {
        pub fn new() -> MockSource {
            Default::default()
        }

        pub fn table(
            mut self,
            root: &[u64],
            rows: &[(&str, WalkValue)],
        ) -> MockSource {
            self.tables.insert(
                root.to_vec(),
                Scripted::Rows(
                    rows.iter()
                        .map(|(s, v)| WalkRow {
                            suffix: s.to_string(),
                            value: v.clone(),
                        })
                        .collect(),
                ),
            );
            self
        }

        pub fn text_table(
            self,
            root: &[u64],
            rows: &[(&str, &str)],
        ) -> MockSource {
            let rows = rows
                .iter()
                .map(|(s, v)| (*s, WalkValue::Bytes(v.as_bytes().to_vec())))
                .collect::<Vec<_>>();
            self.table(root, &rows)
        }

        pub fn int_table(
            self,
            root: &[u64],
            rows: &[(&str, i64)],
        ) -> MockSource {
            let rows = rows
                .iter()
                .map(|(s, v)| (*s, WalkValue::Int(*v)))
                .collect::<Vec<_>>();
            self.table(root, &rows)
        }

        pub fn fault(mut self, root: &[u64]) -> MockSource {
            self.tables.insert(root.to_vec(), Scripted::Fault);
            self
        }

        pub fn walk_count(&self, root: &[u64]) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| *c == root).count()
        }
    }

    #[async_trait]
    impl SnmpSource for MockSource {
        fn host(&self) -> String {
            "mock".to_string()
        }

        async fn walk(
            &mut self,
            root: &[u64],
            _suffix_depth: usize,
            limit: i64,
        ) -> Result<Rows> {
            self.calls.lock().unwrap().push(root.to_vec());

            match self.tables.get(root) {
                Some(Scripted::Fault) => bail!("scripted walk fault"),
                Some(Scripted::Rows(rows)) => {
                    let mut rows = rows.clone();
                    if limit >= 0 {
                        rows.truncate(limit as usize);
                    }
                    Ok(rows)
                }
                None => Ok(Vec::new()),
            }
        }

        async fn vlan_scoped(
            &self,
            vlan: u16,
        ) -> Result<Box<dyn SnmpSource>> {
            self.scoped_vlans.lock().unwrap().push(vlan);

            /*
             * The scoped view shares the script and the call log with the
             * parent, which lets tests script the per-VLAN tables up front
             * and still count every walk in one place.
             */
            let mut tables = HashMap::new();
            for (k, v) in self.tables.iter() {
                tables.insert(
                    k.clone(),
                    match v {
                        Scripted::Fault => Scripted::Fault,
                        Scripted::Rows(r) => Scripted::Rows(r.clone()),
                    },
                );
            }

            Ok(Box::new(MockSource {
                tables,
                calls: Arc::clone(&self.calls),
                scoped_vlans: Arc::clone(&self.scoped_vlans),
            }))
        }
    }
}

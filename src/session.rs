/*
 * Copyright 2025 Oxide Computer Company
 */

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use snmp2::{AsyncSession, Oid, Value};

use crate::source::{Rows, SnmpSource, WalkRow, WalkValue};

/*
 * How long we wait for any single response before declaring the request a
 * transport fault.  The trawl itself imposes no deadline; this just stops a
 * silent agent from wedging a walk forever.
 */
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const SNMP_PORT: u16 = 161;

pub struct Snmp2Source {
    name: String,
    addr: String,
    community: Vec<u8>,
    session: AsyncSession,
}

impl Snmp2Source {
    /*
     * host may carry an explicit port ("192.0.2.1:1161"); otherwise the
     * standard SNMP port is appended.
     */
    pub async fn connect(
        name: &str,
        host: &str,
        community: &str,
    ) -> Result<Snmp2Source> {
        Snmp2Source::open(
            name.to_string(),
            target_addr(host),
            community.as_bytes().to_vec(),
        )
        .await
    }

    async fn open(
        name: String,
        addr: String,
        community: Vec<u8>,
    ) -> Result<Snmp2Source> {
        let session = AsyncSession::new_v2c(&addr, &community, 0)
            .await
            .map_err(|e| anyhow!("{name}: session to {addr}: {e:?}"))?;

        Ok(Snmp2Source { name, addr, community, session })
    }
}

fn target_addr(host: &str) -> String {
    if host.contains(':') {
        host.to_string()
    } else {
        format!("{host}:{SNMP_PORT}")
    }
}

/*
 * The classic SNMPv1/v2c convention for addressing a per-VLAN bridge MIB
 * instance on Cisco IOS/NX-OS: "community@vlan".
 */
fn scoped_community(community: &[u8], vlan: u16) -> Vec<u8> {
    let mut out = community.to_vec();
    out.extend_from_slice(format!("@{vlan}").as_bytes());
    out
}

#[async_trait]
impl SnmpSource for Snmp2Source {
    fn host(&self) -> String {
        self.name.clone()
    }

    /*
     * One getnext-driven subtree walk.  The walk ends at the first returned
     * OID outside the root, at end-of-MIB, when the agent stops advancing
     * (some do, rather than ending the view), or at the row limit.
     */
    async fn walk(
        &mut self,
        root: &[u64],
        suffix_depth: usize,
        limit: i64,
    ) -> Result<Rows> {
        let root_oid = Oid::from(root)
            .map_err(|e| anyhow!("{}: invalid OID root: {e:?}", self.name))?;
        let root_str = root_oid.to_id_string();

        let mut cur: Oid<'static> = root_oid.to_owned();
        let mut last: Option<String> = None;
        let mut rows: Rows = Vec::new();

        loop {
            let pdu = tokio::time::timeout(
                REQUEST_TIMEOUT,
                self.session.getnext(&cur),
            )
            .await
            .map_err(|_| {
                anyhow!("{}: request to {} timed out", self.name, self.addr)
            })?
            .map_err(|e| anyhow!("{}: getnext: {e:?}", self.name))?;

            let mut varbinds = pdu.varbinds;
            let Some((oid, value)) = varbinds.next() else {
                break;
            };

            let id = oid.to_id_string();
            if !under_root(&id, &root_str) {
                break;
            }
            if last.as_deref() == Some(id.as_str()) {
                break;
            }

            let wv = match value {
                Value::EndOfMibView
                | Value::NoSuchObject
                | Value::NoSuchInstance => break,
                Value::Integer(i) => Some(WalkValue::Int(i)),
                Value::OctetString(b) => Some(WalkValue::Bytes(b.to_vec())),
                Value::Counter32(c) => Some(WalkValue::Int(i64::from(c))),
                Value::Unsigned32(u) => Some(WalkValue::Int(i64::from(u))),
                Value::Timeticks(t) => Some(WalkValue::Int(i64::from(t))),
                Value::Counter64(c) => Some(WalkValue::Int(c as i64)),
                _ => None,
            };

            if let Some(value) = wv {
                let suffix = id
                    .split('.')
                    .skip(suffix_depth)
                    .collect::<Vec<_>>()
                    .join(".");
                rows.push(WalkRow { suffix, value });

                if limit >= 0 && rows.len() as i64 >= limit {
                    break;
                }
            }

            last = Some(id);
            cur = oid.to_owned();
        }

        Ok(rows)
    }

    async fn vlan_scoped(&self, vlan: u16) -> Result<Box<dyn SnmpSource>> {
        Ok(Box::new(
            Snmp2Source::open(
                self.name.clone(),
                self.addr.clone(),
                scoped_community(&self.community, vlan),
            )
            .await?,
        ))
    }
}

fn under_root(id: &str, root: &str) -> bool {
    id.len() > root.len()
        && id.starts_with(root)
        && id.as_bytes()[root.len()] == b'.'
}

/*
 * Copyright 2025 Oxide Computer Company
 */

use std::collections::{BTreeMap, HashMap};

use crate::errors::TrawlError;
use crate::mib;
use crate::source::{probe, SnmpSource};
use crate::vendor;
use crate::vlan;

/*
 * The trawl result: interface descriptor to the MACs learned on it.  MACs are
 * kept in discovery order and deliberately not deduplicated; a MAC showing up
 * twice is something the operator should get to see.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FdbTable {
    by_interface: BTreeMap<String, Vec<String>>,
}

impl FdbTable {
    fn push(&mut self, interface: &str, mac: String) {
        self.by_interface.entry(interface.to_string()).or_default().push(mac);
    }

    pub fn is_empty(&self) -> bool {
        self.by_interface.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> + '_ {
        self.by_interface.iter().map(|(i, m)| (i.as_str(), m.as_slice()))
    }
}

/*
 * Trawl one switch and reconstruct its forwarding database, coping with the
 * many ways vendors fail to implement the relevant MIBs:
 *
 *  - Cisco IOS and NX-OS only expose bridge MIBs per VLAN, addressed through
 *    a vlan-scoped community; a target VLAN is therefore mandatory there.
 *  - Q-BRIDGE-MIB is tried first, scoped at the FDB sub-index for the
 *    requested VLAN; some firmware rejects the scoped walk but serves the
 *    full subtree, so an unscoped walk with local filtering is the fallback.
 *  - Juniper EX boxes with no VLAN specified publish forwarding data via
 *    Q-BRIDGE only, never the legacy table.
 *  - Everything else falls back to rfc1493 BRIDGE-MIB.
 *
 * Every row that survives is joined bridge port -> ifIndex -> ifDescr; rows
 * that cannot be resolved to an interface are dropped, not errored.
 */
pub async fn trawl(
    src: &mut dyn SnmpSource,
    vlan: Option<u16>,
) -> Result<FdbTable, TrawlError> {
    let host = src.host();

    log::debug!("{host}: started query process");

    let sysdescr = probe(src, "sysDescr", mib::SYS_DESCR, 1)
        .await
        .rows()
        .and_then(|rows| rows.into_iter().next())
        .and_then(|r| r.value.as_text());

    /*
     * The Cisco decision has to come first: on IOS/NX-OS every subsequent
     * walk must go through the vlan-scoped community, and without a VLAN to
     * scope to there is nothing we can do at all.
     */
    let mut scoped: Option<Box<dyn SnmpSource>> = None;
    if sysdescr.as_deref().map(vendor::is_cisco_ios_nxos).unwrap_or(false) {
        let Some(v) = vlan else {
            return Err(TrawlError::MustSpecifyVlan { host });
        };
        log::warn!(
            "{host}: using community@vlan to address the per-VLAN bridge \
            instance of this broken SNMP implementation"
        );
        scoped = Some(src.vlan_scoped(v).await.map_err(|e| {
            TrawlError::Session { host: host.clone(), detail: e.to_string() }
        })?);
    }
    let src: &mut dyn SnmpSource = match scoped.as_deref_mut() {
        Some(s) => s,
        None => src,
    };

    let Some(rows) = probe(src, "ifDescr", mib::IF_DESCR, -1).await.rows()
    else {
        return Err(TrawlError::NoRows { host, table: "ifDescr" });
    };
    let ifdescr = rows
        .iter()
        .filter_map(|r| {
            Some((r.suffix.parse::<i64>().ok()?, r.value.as_text()?))
        })
        .collect::<HashMap<_, _>>();

    let Some(rows) = probe(
        src,
        "dot1dBasePortIfIndex",
        mib::DOT1D_BASE_PORT_IF_INDEX,
        -1,
    )
    .await
    .rows() else {
        return Err(TrawlError::NoRows {
            host,
            table: "dot1dBasePortIfIndex",
        });
    };
    let baseport = rows
        .iter()
        .filter_map(|r| {
            Some((r.suffix.parse::<i64>().ok()?, r.value.as_int()?))
        })
        .collect::<HashMap<_, _>>();

    let mp = vlan::resolve(src, vlan).await?;
    let vendor = vendor::classify(sysdescr.as_deref(), mp.juniper_ex, mp.juniper_els);
    log::debug!("{host}: classified as {vendor:?}");

    /*
     * Forwarding rows as (MAC, bridge port), in the order the source
     * produced them.  None means no source has answered yet.
     */
    let mut entries: Option<Vec<(String, i64)>> = None;

    if let Some(tag) = vlan {
        /*
         * Resolve the sub-index that scopes Q-BRIDGE-MIB for this VLAN: the
         * FDB id if we have a mapping, the VLAN id itself if not (some
         * switches, e.g. Dell F10-S4810, support Q-BRIDGE but no mapping).
         */
        let sub = match &mp.mapping {
            Some(m) => match m.fdb_for_tag(tag) {
                Some(fdb) => {
                    log::debug!("{host}: got mapping index: {tag} maps to {fdb}");
                    fdb
                }
                None => {
                    log::warn!(
                        "{host}: VLAN {tag} absent from the FDB mapping; \
                        using the VLAN id directly"
                    );
                    u32::from(tag)
                }
            },
            None => u32::from(tag),
        };

        log::debug!("{host}: attempting Q-BRIDGE-MIB (dot1qTpFdbPort.{sub})");
        let mut root = mib::DOT1Q_TP_FDB_PORT.to_vec();
        root.push(u64::from(sub));

        if let Some(rows) = probe(src, "dot1qTpFdbPort.sub", &root, -1)
            .await
            .rows()
        {
            log::debug!("{host}: Q-BRIDGE-MIB query successful");
            entries = nonempty(
                rows.iter()
                    .filter_map(|r| {
                        Some((mib::oid2mac(&r.suffix)?, r.value.as_int()?))
                    })
                    .collect(),
            );
        } else {
            /*
             * Some stacks (e.g. Comware) refuse the scoped walk but serve
             * the whole subtree; filter locally on the sub-index prefix.
             * Inefficient and unusual, so it is the last Q-BRIDGE option.
             */
            log::debug!(
                "{host}: dot1qTpFdbPort.{sub} failed - attempting baseline \
                dot1qTpFdbPort subtree walk in desperation"
            );
            if let Some(rows) =
                probe(src, "dot1qTpFdbPort", mib::DOT1Q_TP_FDB_PORT, -1)
                    .await
                    .rows()
            {
                let want = sub.to_string();
                entries = nonempty(
                    rows.iter()
                        .filter(|r| {
                            r.suffix.split('.').next() == Some(want.as_str())
                        })
                        .filter_map(|r| {
                            Some((
                                mib::mac_from_oid_tail(&r.suffix)?,
                                r.value.as_int()?,
                            ))
                        })
                        .collect(),
                );
            }
            if entries.is_none() {
                log::debug!(
                    "{host}: failed to retrieve Q-BRIDGE-MIB. falling back \
                    to BRIDGE-MIB"
                );
            }
        }
    } else {
        log::debug!(
            "{host}: vlan not specified - falling back to BRIDGE-MIB for \
            compatibility"
        );
    }

    /*
     * Juniper EX boxes with no VLAN specified return data on Q-BRIDGE-MIB
     * rather than BRIDGE-MIB.
     */
    if vlan.is_none() && vendor.is_juniper_ex() {
        log::debug!(
            "{host}: attempting special Juniper EX Q-BRIDGE-MIB query for \
            unspecified vlan"
        );
        if let Some(rows) =
            probe(src, "dot1qTpFdbPort", mib::DOT1Q_TP_FDB_PORT, -1)
                .await
                .rows()
        {
            entries = nonempty(
                rows.iter()
                    .filter_map(|r| {
                        Some((
                            mib::mac_from_oid_tail(&r.suffix)?,
                            r.value.as_int()?,
                        ))
                    })
                    .collect(),
            );
        }
        if entries.is_none() {
            log::debug!("{host}: failed Juniper EX Q-BRIDGE-MIB retrieval");
        }
    }

    /*
     * Last resort: rfc1493 BRIDGE-MIB.  dot1dTpFdbPort carries the bridge
     * port per row; dot1dTpFdbAddress carries the MAC as a raw OCTET STRING,
     * joined on the same row index.
     */
    if entries.is_none() {
        log::debug!("{host}: attempting BRIDGE-MIB (dot1dTpFdbPort)");
        if let Some(ports) =
            probe(src, "dot1dTpFdbPort", mib::DOT1D_TP_FDB_PORT, -1)
                .await
                .rows()
        {
            log::debug!("{host}: BRIDGE-MIB query successful");

            let port_by_index = ports
                .iter()
                .filter_map(|r| Some((r.suffix.as_str(), r.value.as_int()?)))
                .collect::<HashMap<_, _>>();

            let addrs =
                probe(src, "dot1dTpFdbAddress", mib::DOT1D_TP_FDB_ADDRESS, -1)
                    .await
                    .rows()
                    .unwrap_or_default();

            entries = Some(
                addrs
                    .iter()
                    .filter_map(|r| {
                        let port = *port_by_index.get(r.suffix.as_str())?;
                        Some((mib::normalize_mac(r.value.as_bytes()?), port))
                    })
                    .collect(),
            );
        }
    }

    let Some(entries) = entries else {
        return Err(TrawlError::NoRows {
            host,
            table: "BRIDGE-MIB or Q-BRIDGE-MIB",
        });
    };

    let mut out = FdbTable::default();
    for (mac, port) in entries {
        let Some(ifindex) = baseport.get(&port) else {
            continue;
        };
        let Some(descr) = ifdescr.get(ifindex) else {
            continue;
        };

        let descr = if vendor.is_juniper_ex() {
            mib::strip_logical_unit(descr)
        } else {
            descr.as_str()
        };

        out.push(descr, mac);
    }

    Ok(out)
}

fn nonempty(v: Vec<(String, i64)>) -> Option<Vec<(String, i64)>> {
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

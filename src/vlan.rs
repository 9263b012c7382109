/*
 * Copyright 2025 Oxide Computer Company
 */

use std::collections::{BTreeMap, HashMap};

use crate::errors::TrawlError;
use crate::mib;
use crate::source::{probe, SnmpSource};

/*
 * An optional translation from the switch-internal FDB id to the 802.1Q VLAN
 * tag.  When absent, no translation is needed (or available) and VLAN ids are
 * used as-is.  When present it is a bijection: no two FDB ids map to the same
 * tag.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VlanMapping {
    fdb_to_tag: BTreeMap<u32, u16>,
}

impl VlanMapping {
    fn insert(&mut self, fdb: u32, tag: u16) {
        self.fdb_to_tag.insert(fdb, tag);
    }

    pub fn is_empty(&self) -> bool {
        self.fdb_to_tag.is_empty()
    }

    /*
     * Reverse lookup: which FDB id carries this VLAN tag?
     */
    pub fn fdb_for_tag(&self, tag: u16) -> Option<u32> {
        self.fdb_to_tag
            .iter()
            .find(|(_, t)| **t == tag)
            .map(|(fdb, _)| *fdb)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u16)> + '_ {
        self.fdb_to_tag.iter().map(|(f, t)| (*f, *t))
    }
}

pub struct MappingProbe {
    pub mapping: Option<VlanMapping>,
    pub juniper_ex: bool,
    pub juniper_els: bool,
}

/*
 * Build the FDB-id to VLAN-tag mapping from a strict priority chain of
 * candidate tables.  The first candidate that produces rows is final; later
 * candidates are never walked.  A walk fault anywhere in the chain is just
 * absence -- probing MIBs a device does not implement is the normal case.
 *
 * 1. jnxExVlanTag: suffix is the FDB id, value is the tag.  Any rows at all
 *    mean we are on a classic Juniper EX image.
 *
 * 2. jnxL2aldVlanTag + jnxL2aldVlanFdbId (Juniper KB32532): two parallel
 *    tables matched by row index, e.g.
 *        jnxL2aldVlanTag.3   = 1      jnxL2aldVlanFdbId.3 = 196608
 *        jnxL2aldVlanTag.4   = 10     jnxL2aldVlanFdbId.4 = 262144
 *    becomes { 196608 => 1, 262144 => 10 }.
 *
 * 3. dot1qVlanFdbId, walked under time mark 0, and only worth consulting if
 *    the caller named a VLAN: suffix is the tag, value is the FDB id.
 */
pub async fn resolve(
    src: &mut dyn SnmpSource,
    vlan: Option<u16>,
) -> Result<MappingProbe, TrawlError> {
    let host = src.host();

    log::debug!(
        "{host}: pre-emptively trying jnxExVlanTag to see if this is a J-EX box"
    );
    if let Some(rows) = probe(src, "jnxExVlanTag", mib::JNX_EX_VLAN_TAG, -1)
        .await
        .rows()
    {
        log::debug!("{host}: looks like this is a Juniper EX");

        let mut mapping = VlanMapping::default();
        for r in rows {
            let (Ok(fdb), Some(tag)) =
                (r.suffix.parse::<u32>(), int_tag(r.value.as_int()))
            else {
                log::debug!("{host}: odd jnxExVlanTag row {:?}", r.suffix);
                continue;
            };
            mapping.insert(fdb, tag);
        }

        return Ok(MappingProbe {
            mapping: Some(mapping),
            juniper_ex: true,
            juniper_els: false,
        });
    }
    log::debug!("{host}: this isn't a Juniper EX");

    if let Some(tags) =
        probe(src, "jnxL2aldVlanTag", mib::JNX_L2ALD_VLAN_TAG, -1)
            .await
            .rows()
    {
        log::debug!(
            "{host}: looks like this is a Juniper EX running an ELS image"
        );

        let fdbids =
            probe(src, "jnxL2aldVlanFdbId", mib::JNX_L2ALD_VLAN_FDB_ID, -1)
                .await
                .rows()
                .unwrap_or_default();

        let by_index = fdbids
            .iter()
            .filter_map(|r| Some((r.suffix.as_str(), r.value.as_int()?)))
            .collect::<HashMap<_, _>>();

        let mut mapping = VlanMapping::default();
        for r in &tags {
            let Some(tag) = int_tag(r.value.as_int()) else {
                continue;
            };
            match by_index.get(r.suffix.as_str()) {
                Some(fdb) if *fdb >= 0 => {
                    mapping.insert(*fdb as u32, tag);
                }
                _ => {
                    log::warn!(
                        "{host}: jnxL2aldVlanTag.{} has no matching FdbId row",
                        r.suffix
                    );
                }
            }
        }

        if mapping.is_empty() {
            /*
             * The tag table answered but we could not pair a single row.
             * Unlike an unsupported MIB, this is a device we ostensibly know
             * how to read and cannot; give up on it.
             */
            return Err(TrawlError::NoRows {
                host,
                table: "jnxL2aldVlanFdbId mapping",
            });
        }

        return Ok(MappingProbe {
            mapping: Some(mapping),
            juniper_ex: false,
            juniper_els: true,
        });
    }
    log::debug!("{host}: this isn't a Juniper running an ELS image");

    if vlan.is_some() {
        log::debug!("{host}: attempting to retrieve dot1qVlanFdbId mapping");

        /*
         * dot1qVlanCurrentTable is indexed by (TimeMark, VlanIndex); walking
         * under time mark zero leaves the VLAN index as the row suffix.
         */
        let mut root = mib::DOT1Q_VLAN_FDB_ID.to_vec();
        root.push(0);

        if let Some(rows) =
            probe(src, "dot1qVlanFdbId.0", &root, -1).await.rows()
        {
            let mut mapping = VlanMapping::default();
            for r in rows {
                let (Ok(tag), Some(fdb)) =
                    (r.suffix.parse::<u16>(), r.value.as_int())
                else {
                    continue;
                };
                if fdb >= 0 {
                    mapping.insert(fdb as u32, tag);
                }
            }

            return Ok(MappingProbe {
                mapping: Some(mapping),
                juniper_ex: false,
                juniper_els: false,
            });
        }

        log::debug!(
            "{host}: that didn't work either; will attempt Q-BRIDGE-MIB with \
            no fdb mapping"
        );
    }

    Ok(MappingProbe { mapping: None, juniper_ex: false, juniper_els: false })
}

fn int_tag(v: Option<i64>) -> Option<u16> {
    u16::try_from(v?).ok()
}

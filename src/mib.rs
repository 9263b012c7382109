/*
 * Copyright 2025 Oxide Computer Company
 */

/*
 * The OID roots we interrogate.  Beyond sysDescr and the two standard bridge
 * MIBs, there are two generations of Juniper enterprise VLAN tables; which of
 * these exist on a device tells us a lot about what else will work.
 */

/* sysDescr */
pub const SYS_DESCR: &[u64] = &[1, 3, 6, 1, 2, 1, 1, 1];

/* ifDescr */
pub const IF_DESCR: &[u64] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 2];

/* dot1dBasePortIfIndex */
pub const DOT1D_BASE_PORT_IF_INDEX: &[u64] = &[1, 3, 6, 1, 2, 1, 17, 1, 4, 1, 2];

/* dot1qVlanFdbId (walked with a 0 time mark appended) */
pub const DOT1Q_VLAN_FDB_ID: &[u64] = &[1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 2, 1, 3];

/* dot1qTpFdbPort */
pub const DOT1Q_TP_FDB_PORT: &[u64] = &[1, 3, 6, 1, 2, 1, 17, 7, 1, 2, 2, 1, 2];

/* dot1dTpFdbPort */
pub const DOT1D_TP_FDB_PORT: &[u64] = &[1, 3, 6, 1, 2, 1, 17, 4, 3, 1, 2];

/* dot1dTpFdbAddress */
pub const DOT1D_TP_FDB_ADDRESS: &[u64] = &[1, 3, 6, 1, 2, 1, 17, 4, 3, 1, 1];

/* jnxExVlanTag */
pub const JNX_EX_VLAN_TAG: &[u64] =
    &[1, 3, 6, 1, 4, 1, 2636, 3, 40, 1, 5, 1, 5, 1, 5];

/* jnxL2aldVlanTag */
pub const JNX_L2ALD_VLAN_TAG: &[u64] =
    &[1, 3, 6, 1, 4, 1, 2636, 3, 48, 1, 3, 1, 1, 3];

/* jnxL2aldVlanFdbId */
pub const JNX_L2ALD_VLAN_FDB_ID: &[u64] =
    &[1, 3, 6, 1, 4, 1, 2636, 3, 48, 1, 3, 1, 1, 5];

/*
 * Q-BRIDGE-MIB indexes forwarding rows by the MAC address itself, expressed
 * as six dotted-decimal OID components.  Convert such a suffix to the
 * canonical 12 character lowercase hex form.  Suffixes that are not exactly
 * six octets are not MAC addresses and yield None.
 */
pub fn oid2mac(suffix: &str) -> Option<String> {
    let octets = suffix
        .split('.')
        .map(|c| c.parse::<u8>().ok())
        .collect::<Option<Vec<_>>>()?;

    if octets.len() != 6 {
        return None;
    }

    let mut out = String::with_capacity(12);
    for o in octets {
        out.push_str(&format!("{o:02x}"));
    }
    Some(out)
}

/*
 * An unscoped dot1qTpFdbPort walk returns suffixes of the shape
 * "<fdbid>.<six MAC octets>"; the MAC is always the last six components.
 */
pub fn mac_from_oid_tail(suffix: &str) -> Option<String> {
    let comps = suffix.split('.').collect::<Vec<_>>();
    if comps.len() < 6 {
        return None;
    }

    oid2mac(&comps[comps.len() - 6..].join("."))
}

/*
 * dot1dTpFdbAddress values are OCTET STRINGs.  Most agents hand back the six
 * raw bytes, but some pre-render the hex text; a 12 byte value is taken to be
 * the latter and is only case folded.
 */
pub fn normalize_mac(raw: &[u8]) -> String {
    if raw.len() == 12 {
        String::from_utf8_lossy(raw).to_ascii_lowercase()
    } else {
        raw.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/*
 * Juniper EX boxes report logical units ("ge-0/0/1.0") in ifDescr where we
 * want the physical interface.  Strip one trailing ".<digits>" unit.
 */
pub fn strip_logical_unit(descr: &str) -> &str {
    match descr.rsplit_once('.') {
        Some((head, unit))
            if !head.is_empty()
                && !unit.is_empty()
                && unit.bytes().all(|b| b.is_ascii_digit()) =>
        {
            head
        }
        _ => descr,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn oid_suffix_to_mac() {
        assert_eq!(
            oid2mac("18.84.231.33.126.99").as_deref(),
            Some("1254e7217e63")
        );
        assert_eq!(oid2mac("0.0.0.0.0.1").as_deref(), Some("000000000001"));
        assert_eq!(
            oid2mac("255.255.255.255.255.255").as_deref(),
            Some("ffffffffffff")
        );
    }

    #[test]
    fn oid_suffix_rejects_non_macs() {
        assert_eq!(oid2mac(""), None);
        assert_eq!(oid2mac("1.2.3.4.5"), None);
        assert_eq!(oid2mac("1.2.3.4.5.6.7"), None);
        assert_eq!(oid2mac("1.2.3.4.5.256"), None);
        assert_eq!(oid2mac("1.2.3.4.5.x"), None);
    }

    #[test]
    fn mac_from_unscoped_suffix() {
        /*
         * FDB id prefix, then the MAC octets:
         */
        assert_eq!(
            mac_from_oid_tail("196608.18.84.231.33.126.99").as_deref(),
            Some("1254e7217e63")
        );
        assert_eq!(
            mac_from_oid_tail("18.84.231.33.126.99").as_deref(),
            Some("1254e7217e63")
        );
        assert_eq!(mac_from_oid_tail("1.2.3"), None);
    }

    #[test]
    fn normalize_raw_bytes() {
        assert_eq!(
            normalize_mac(&[0x12, 0x54, 0xe7, 0x21, 0x7e, 0x63]),
            "1254e7217e63"
        );
        assert_eq!(normalize_mac(&[0, 0x11, 0x22, 0x33, 0x44, 0x55]), "001122334455");
    }

    #[test]
    fn normalize_pre_rendered_hex_is_case_fold() {
        assert_eq!(normalize_mac(b"1254E7217E63"), "1254e7217e63");
        assert_eq!(normalize_mac(b"1254e7217e63"), "1254e7217e63");
    }

    #[test]
    fn both_encodings_agree() {
        let from_oid = oid2mac("18.84.231.33.126.99").unwrap();
        let from_raw = normalize_mac(&[18, 84, 231, 33, 126, 99]);
        assert_eq!(from_oid, from_raw);
    }

    #[test]
    fn strip_unit_suffix() {
        assert_eq!(strip_logical_unit("ge-0/0/1.0"), "ge-0/0/1");
        assert_eq!(strip_logical_unit("xe-0/1/0.123"), "xe-0/1/0");
        assert_eq!(strip_logical_unit("ge-0/0/1"), "ge-0/0/1");
        assert_eq!(strip_logical_unit("eth0"), "eth0");
        assert_eq!(strip_logical_unit(".0"), ".0");
        assert_eq!(strip_logical_unit("ge-0/0/1."), "ge-0/0/1.");
    }
}

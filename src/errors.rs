/*
 * Copyright 2025 Oxide Computer Company
 */

use thiserror::Error;

/*
 * Only two conditions abort the trawl of a device.  Individual walk failures
 * are not errors at all: most probed MIBs are unsupported on most devices,
 * and the probe layer folds those into absence (see source::probe).
 */
#[derive(Debug, Error)]
pub enum TrawlError {
    /*
     * Cisco IOS/NX-OS bridge MIBs are per-VLAN instances; without a target
     * VLAN there is nothing we can read.
     */
    #[error("{host}: must specify a VLAN for Cisco IOS/NX-OS switches")]
    MustSpecifyVlan { host: String },

    /*
     * A table we cannot proceed without produced no rows, after every
     * applicable fallback.
     */
    #[error("{host}: cannot read {table}; not processing {host} further")]
    NoRows { host: String, table: &'static str },

    #[error("{host}: could not establish VLAN-scoped session: {detail}")]
    Session { host: String, detail: String },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_matches_diagnostics() {
        let e = TrawlError::MustSpecifyVlan { host: "sw1".into() };
        assert_eq!(
            e.to_string(),
            "sw1: must specify a VLAN for Cisco IOS/NX-OS switches"
        );

        let e = TrawlError::NoRows { host: "sw1".into(), table: "ifDescr" };
        assert_eq!(
            e.to_string(),
            "sw1: cannot read ifDescr; not processing sw1 further"
        );
    }
}

/*
 * Copyright 2025 Oxide Computer Company
 */

/*
 * Which family of bridge MIB quirks we are dealing with.  Classified once per
 * trawl, then dispatched on; individual call sites never re-test sysDescr or
 * re-probe the Juniper subtrees.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    Standard,
    CiscoIosNxos,
    JuniperEx,
    JuniperEls,
}

impl Vendor {
    pub fn is_juniper_ex(&self) -> bool {
        matches!(self, Vendor::JuniperEx)
    }
}

/*
 * The Juniper flags are subtree presence: jnxExVlanTag answering marks a
 * classic EX image, jnxL2aldVlanTag an ELS image.  Those are definitive and
 * take precedence over whatever sysDescr claims.
 */
pub fn classify(
    sysdescr: Option<&str>,
    juniper_ex: bool,
    juniper_els: bool,
) -> Vendor {
    if juniper_ex {
        Vendor::JuniperEx
    } else if juniper_els {
        Vendor::JuniperEls
    } else if sysdescr.map(is_cisco_ios_nxos).unwrap_or(false) {
        Vendor::CiscoIosNxos
    } else {
        Vendor::Standard
    }
}

/*
 * Matches "Cisco IOS" or "Cisco NX-OS" with any run of whitespace between
 * the words, anywhere in sysDescr.
 */
pub fn is_cisco_ios_nxos(descr: &str) -> bool {
    let mut rest = descr;
    while let Some(at) = rest.find("Cisco") {
        let after = rest[at + "Cisco".len()..].trim_start();
        if after.starts_with("IOS") || after.starts_with("NX-OS") {
            return true;
        }
        rest = &rest[at + "Cisco".len()..];
    }
    false
}

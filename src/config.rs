/*
 * Copyright 2025 Oxide Computer Company
 */

use std::collections::HashMap;

use anyhow::{bail, Result};
use serde::Deserialize;

#[derive(Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    switch: HashMap<String, ConfigFileSwitch>,
}

impl ConfigFile {
    pub fn switch(&self, name: &str) -> Result<&ConfigFileSwitch> {
        if let Some(cfs) = self.switch.get(name) {
            Ok(cfs)
        } else {
            bail!(
                "could not find switch named {name:?} (use -c to address a \
                host directly)"
            );
        }
    }
}

#[derive(Deserialize)]
pub struct ConfigFileSwitch {
    ip: String,
    community: String,
    vlan: Option<u16>,
}

impl ConfigFileSwitch {
    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn community(&self) -> &str {
        &self.community
    }

    pub fn vlan(&self) -> Option<u16> {
        self.vlan
    }
}

/*
 * A missing file is an empty configuration; switches can still be named
 * directly on the command line with an explicit community.
 */
pub fn load() -> Result<ConfigFile> {
    let f = match std::fs::read_to_string("switch.toml") {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ConfigFile::default());
        }
        Err(e) => bail!("reading switch.toml: {e}"),
    };
    Ok(toml::from_str(&f)?)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_config() {
        let cf: ConfigFile = toml::from_str(
            r#"
            [switch.core1]
            ip = "192.0.2.10"
            community = "public"
            vlan = 10

            [switch.edge]
            ip = "192.0.2.20:1161"
            community = "s3cr3t"
            "#,
        )
        .unwrap();

        let s = cf.switch("core1").unwrap();
        assert_eq!(s.ip(), "192.0.2.10");
        assert_eq!(s.community(), "public");
        assert_eq!(s.vlan(), Some(10));

        let s = cf.switch("edge").unwrap();
        assert_eq!(s.ip(), "192.0.2.20:1161");
        assert_eq!(s.vlan(), None);

        assert!(cf.switch("nope").is_err());
    }

    #[test]
    fn empty_config() {
        let cf: ConfigFile = toml::from_str("").unwrap();
        assert!(cf.switch("core1").is_err());
    }
}

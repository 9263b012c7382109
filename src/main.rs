/*
 * Copyright 2025 Oxide Computer Company
 */

use anyhow::{anyhow, bail, Result};
use hiercmd::prelude::*;

mod config;
mod errors;
mod fdb;
mod mib;
mod session;
mod source;
mod vendor;
mod vlan;

#[derive(Default)]
struct Stuff {
    config: Option<config::ConfigFile>,
}

impl Stuff {
    fn config(&self) -> &config::ConfigFile {
        self.config.as_ref().unwrap()
    }
}

struct Target {
    host: String,
    community: String,
    vlan: Option<u16>,
}

/*
 * A switch argument is normally the name of a [switch.NAME] entry in
 * switch.toml; with -c it is taken as a host (or host:port) directly.  A -v
 * on the command line beats the configured default VLAN.
 */
fn resolve_target(
    s: &Stuff,
    name: &str,
    community: Option<&str>,
    vlan: Option<u16>,
) -> Result<Target> {
    if let Some(community) = community {
        return Ok(Target {
            host: name.to_string(),
            community: community.to_string(),
            vlan,
        });
    }

    let cfs = s.config().switch(name)?;
    Ok(Target {
        host: cfs.ip().to_string(),
        community: cfs.community().to_string(),
        vlan: vlan.or(cfs.vlan()),
    })
}

fn parse_vlan(opt: Option<String>) -> Result<Option<u16>> {
    let Some(v) = opt else {
        return Ok(None);
    };

    let vlan = v.parse::<u16>().map_err(|_| anyhow!("invalid VLAN {v:?}"))?;
    if !(1..=4094).contains(&vlan) {
        bail!("VLAN must be between 1 and 4094, not {vlan}");
    }
    Ok(Some(vlan))
}

async fn do_trawl(mut l: Level<Stuff>) -> Result<()> {
    l.usage_args(Some("SWITCH..."));
    l.optopt("c", "", "community string (bypass switch.toml lookup)", "COMMUNITY");
    l.optopt("v", "", "VLAN to trawl (1-4094)", "VLAN");

    let a = args!(l);
    if a.args().is_empty() {
        bad_args!(l, "specify a switch to trawl");
    }

    let community = a.opts().opt_str("c");
    let vlan = parse_vlan(a.opts().opt_str("v"))?;

    /*
     * A switch we cannot read is diagnosed and skipped, never fatal; the
     * exit status stays 0 either way.
     */
    for name in a.args() {
        let t = match resolve_target(
            l.context(),
            name,
            community.as_deref(),
            vlan,
        ) {
            Ok(t) => t,
            Err(e) => {
                println!("WARNING: {name}: {e}");
                continue;
            }
        };

        let mut src =
            match session::Snmp2Source::connect(name, &t.host, &t.community)
                .await
            {
                Ok(src) => src,
                Err(e) => {
                    println!("WARNING: {name}: {e}");
                    continue;
                }
            };

        match fdb::trawl(&mut src, t.vlan).await {
            Ok(table) => {
                println!("{name}:");
                if table.is_empty() {
                    println!("    (no forwarding entries)");
                }
                for (interface, macs) in table.iter() {
                    println!("    {interface:<24} {}", macs.join(" "));
                }
                println!();
            }
            Err(e) => {
                println!("WARNING: {e}");
            }
        }
    }

    Ok(())
}

async fn dump_int_table(
    s: &Stuff,
    name: &str,
    community: Option<&str>,
    label: &str,
    root: &[u64],
) {
    let t = match resolve_target(s, name, community, None) {
        Ok(t) => t,
        Err(e) => {
            println!("WARNING: {name}: {e}");
            return;
        }
    };

    let mut src =
        match session::Snmp2Source::connect(name, &t.host, &t.community).await
        {
            Ok(src) => src,
            Err(e) => {
                println!("WARNING: {name}: {e}");
                return;
            }
        };

    let Some(rows) = source::probe(&mut src, label, root, -1).await.rows()
    else {
        println!("WARNING: {name}: cannot read {label}");
        return;
    };

    println!("{name}:");
    for r in rows {
        match &r.value {
            source::WalkValue::Int(i) => {
                println!("    {:>8}  {i}", r.suffix);
            }
            source::WalkValue::Bytes(_) => {
                println!(
                    "    {:>8}  {}",
                    r.suffix,
                    r.value.as_text().unwrap_or_default()
                );
            }
        }
    }
    println!();
}

async fn do_interfaces(mut l: Level<Stuff>) -> Result<()> {
    l.usage_args(Some("SWITCH..."));
    l.optopt("c", "", "community string (bypass switch.toml lookup)", "COMMUNITY");

    let a = args!(l);
    if a.args().is_empty() {
        bad_args!(l, "specify a switch to dump");
    }

    let community = a.opts().opt_str("c");
    for name in a.args() {
        dump_int_table(
            l.context(),
            name,
            community.as_deref(),
            "ifDescr",
            mib::IF_DESCR,
        )
        .await;
    }

    Ok(())
}

async fn do_ports(mut l: Level<Stuff>) -> Result<()> {
    l.usage_args(Some("SWITCH..."));
    l.optopt("c", "", "community string (bypass switch.toml lookup)", "COMMUNITY");

    let a = args!(l);
    if a.args().is_empty() {
        bad_args!(l, "specify a switch to dump");
    }

    let community = a.opts().opt_str("c");
    for name in a.args() {
        dump_int_table(
            l.context(),
            name,
            community.as_deref(),
            "dot1dBasePortIfIndex",
            mib::DOT1D_BASE_PORT_IF_INDEX,
        )
        .await;
    }

    Ok(())
}

async fn do_vlans(mut l: Level<Stuff>) -> Result<()> {
    l.usage_args(Some("SWITCH..."));
    l.optopt("c", "", "community string (bypass switch.toml lookup)", "COMMUNITY");
    l.optopt("v", "", "VLAN of interest (1-4094)", "VLAN");

    let a = args!(l);
    if a.args().is_empty() {
        bad_args!(l, "specify a switch to dump");
    }

    let community = a.opts().opt_str("c");
    let vlan = parse_vlan(a.opts().opt_str("v"))?;

    for name in a.args() {
        let t = match resolve_target(
            l.context(),
            name,
            community.as_deref(),
            vlan,
        ) {
            Ok(t) => t,
            Err(e) => {
                println!("WARNING: {name}: {e}");
                continue;
            }
        };

        let mut src =
            match session::Snmp2Source::connect(name, &t.host, &t.community)
                .await
            {
                Ok(src) => src,
                Err(e) => {
                    println!("WARNING: {name}: {e}");
                    continue;
                }
            };

        match vlan::resolve(&mut src, t.vlan).await {
            Ok(p) => {
                println!("{name}:");
                match p.mapping {
                    Some(m) if !m.is_empty() => {
                        for (fdb, tag) in m.iter() {
                            println!("    fdb {fdb:>8} -> vlan {tag}");
                        }
                    }
                    _ => {
                        println!("    (no VLAN mapping on this device)");
                    }
                }
                println!();
            }
            Err(e) => {
                println!("WARNING: {e}");
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut l = Level::new("fdbtrawl", Stuff::default());

    l.cmd(
        "trawl",
        "reconstruct the forwarding database of switches",
        cmd!(do_trawl),
    )?;
    l.cmd("interfaces", "dump the ifIndex to ifDescr table", cmd!(do_interfaces))?;
    l.cmd("ports", "dump the bridge port to ifIndex table", cmd!(do_ports))?;
    l.cmd("vlans", "dump the FDB id to VLAN tag mapping", cmd!(do_vlans))?;

    l.context_mut().config = Some(config::load()?);

    env_logger::init();

    sel!(l).run().await
}

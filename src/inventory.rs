use crate::host::Host;
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::io::Read;

/// One group of an inventory file:
///
/// ```yaml
/// brokers:
///   hosts:
///     kafka-1.example.com: {}
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HostGroup {
    hosts: Option<HashMap<String, HostVars>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HostVars {}

impl HostGroup {
    fn host_names(&self) -> impl Iterator<Item = &String> {
        self.hosts.iter().flat_map(|hosts| hosts.keys())
    }
}

pub type Inventory = HashMap<String, HostGroup>;

pub fn load_inventory<R: Read>(reader: R) -> Result<Inventory> {
    let inventory: Inventory = serde_yaml::from_reader(reader)?;
    Ok(inventory)
}

/// Selects hosts matching `pattern`, sorted and without duplicates.
///
/// `all` selects every host. Otherwise the pattern is split on `:` or `,`
/// and each part names a group, a host, or with a leading `~` a regex
/// matched against host names.
pub fn filter_hosts(inventory: &Inventory, pattern: &str) -> Result<Vec<Host>> {
    let mut filtered_hosts: BTreeSet<String> = BTreeSet::new();

    if pattern == "all" {
        for group in inventory.values() {
            filtered_hosts.extend(group.host_names().cloned());
        }
    } else {
        let mut names: Vec<&str> = Vec::new();
        let mut regexes: Vec<Regex> = Vec::new();

        for part in pattern.split([':', ',']).filter(|part| !part.is_empty()) {
            match part.strip_prefix('~') {
                Some(expr) => regexes.push(Regex::new(expr)?),
                None => names.push(part),
            }
        }

        for (group_name, group) in inventory {
            if names.contains(&group_name.as_str()) {
                filtered_hosts.extend(group.host_names().cloned());
            } else {
                filtered_hosts.extend(
                    group
                        .host_names()
                        .filter(|host| {
                            names.contains(&host.as_str())
                                || regexes.iter().any(|re| re.is_match(host))
                        })
                        .cloned(),
                );
            }
        }
    }

    Ok(filtered_hosts.into_iter().map(Host::from).collect())
}

//! Per-trait counts and the traits-per-item histogram.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::index::TraitIndex;
use crate::traits::TraitsRegistry;

/// Items bucketed by how many enabled traits they carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    #[serde(rename = "0")]
    pub zero: usize,
    #[serde(rename = "1")]
    pub one: usize,
    #[serde(rename = "2")]
    pub two: usize,
    #[serde(rename = "3+")]
    pub three_plus: usize,
}

impl Distribution {
    const fn record(&mut self, enabled_traits: usize) {
        match enabled_traits {
            0 => self.zero += 1,
            1 => self.one += 1,
            2 => self.two += 1,
            _ => self.three_plus += 1,
        }
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.zero + self.one + self.two + self.three_plus
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitStatistics {
    /// Items per enabled trait. Every enabled trait is present, even at zero.
    pub counts_by_trait: BTreeMap<String, usize>,
    pub distribution: Distribution,
}

impl TraitStatistics {
    /// Share of `total_items` carrying each trait, as a percentage.
    /// All zero when `total_items` is zero.
    #[must_use]
    pub fn percentages(&self, total_items: usize) -> BTreeMap<String, f64> {
        self.counts_by_trait
            .iter()
            .map(|(name, count)| {
                let pct = if total_items == 0 {
                    0.0
                } else {
                    *count as f64 * 100.0 / total_items as f64
                };
                (name.clone(), pct)
            })
            .collect()
    }
}

/// Count enabled-trait membership across every indexed item.
#[must_use]
pub fn aggregate(index: &TraitIndex, registry: &TraitsRegistry) -> TraitStatistics {
    let mut counts_by_trait: BTreeMap<String, usize> = registry
        .enabled_names()
        .map(|name| (name.to_string(), 0))
        .collect();
    let mut distribution = Distribution::default();

    for (_, names) in index.iter() {
        let mut enabled = 0;
        for name in names {
            if let Some(count) = counts_by_trait.get_mut(name) {
                *count += 1;
                enabled += 1;
            }
        }
        distribution.record(enabled);
    }

    TraitStatistics {
        counts_by_trait,
        distribution,
    }
}

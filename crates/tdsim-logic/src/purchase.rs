//! Pre-wave tower buying policy.
//!
//! The policy is an ordered rule table. Each rule applies while the current
//! tower count is below its limit (or always, with no limit) and lists tower
//! types in order of preference. The first matching rule decides; its first
//! affordable preference is bought. Towers go to the next unused coverage
//! position, in order.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::catalog::TowerCatalog;
use crate::entity::Tower;
use crate::error::{Result, SimError};
use crate::kinds::towers;
use crate::path::Point;

/// One row of the purchase rule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRule {
    /// Rule applies while tower count < `below`; `None` matches any count.
    #[serde(default)]
    pub below: Option<usize>,
    /// Tower types, most preferred first.
    pub prefer: Vec<String>,
}

impl PurchaseRule {
    pub fn new(below: Option<usize>, prefer: &[&str]) -> Self {
        Self {
            below,
            prefer: prefer.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn matches(&self, tower_count: usize) -> bool {
        self.below.map_or(true, |limit| tower_count < limit)
    }
}

/// Two basics, then splash, then slow, then the strongest affordable.
pub fn default_rules() -> Vec<PurchaseRule> {
    vec![
        PurchaseRule::new(Some(2), &[towers::BASIC]),
        PurchaseRule::new(Some(3), &[towers::SPLASH, towers::BASIC]),
        PurchaseRule::new(Some(4), &[towers::SLOW, towers::BASIC]),
        PurchaseRule::new(None, &[towers::SNIPER, towers::SPLASH, towers::BASIC]),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct PurchasePolicy {
    rules: Vec<PurchaseRule>,
    tower_cap: usize,
    coverage: Vec<Point>,
}

impl PurchasePolicy {
    /// Coverage must hold at least `tower_cap` positions.
    pub fn new(
        rules: Vec<PurchaseRule>,
        tower_cap: usize,
        coverage: Vec<Point>,
    ) -> Result<Self> {
        if coverage.len() < tower_cap {
            return Err(SimError::InsufficientCoverage {
                cap: tower_cap,
                positions: coverage.len(),
            });
        }
        Ok(Self {
            rules,
            tower_cap,
            coverage,
        })
    }

    pub fn tower_cap(&self) -> usize {
        self.tower_cap
    }

    pub fn coverage(&self) -> &[Point] {
        &self.coverage
    }

    pub fn rules(&self) -> &[PurchaseRule] {
        &self.rules
    }

    /// Fail if any rule names a tower the catalog does not have.
    pub fn validate(&self, catalog: &TowerCatalog) -> Result<()> {
        for kind in self.rules.iter().flat_map(|r| r.prefer.iter()) {
            catalog.get(kind)?;
        }
        Ok(())
    }

    /// Tower type to buy next, or `None` when the cap is reached or nothing
    /// the matching rule prefers is affordable.
    pub fn choose<'a>(
        &'a self,
        gold: u32,
        tower_count: usize,
        catalog: &TowerCatalog,
    ) -> Result<Option<&'a str>> {
        if tower_count >= self.tower_cap {
            return Ok(None);
        }
        let Some(rule) = self.rules.iter().find(|r| r.matches(tower_count)) else {
            return Ok(None);
        };
        for kind in &rule.prefer {
            if catalog.get(kind)?.cost <= gold {
                return Ok(Some(kind.as_str()));
            }
        }
        Ok(None)
    }

    /// Spend gold on towers until the policy stops. Returns how many were
    /// bought.
    pub fn buy(
        &self,
        gold: &mut u32,
        towers: &mut Vec<Tower>,
        catalog: &TowerCatalog,
    ) -> Result<usize> {
        let mut bought = 0;
        while let Some(kind) = self.choose(*gold, towers.len(), catalog)? {
            let cost = catalog.get(kind)?.cost;
            if cost > *gold {
                break;
            }
            *gold -= cost;
            let position = self.coverage[towers.len()];
            trace!(
                kind,
                cost,
                gold = *gold,
                x = position.x,
                y = position.y,
                "tower bought"
            );
            towers.push(Tower::new(kind, position));
            bought += 1;
        }
        Ok(bought)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_towers;

    fn coverage(n: usize) -> Vec<Point> {
        (0..n).map(|i| Point::new(i as f64 * 10.0, 0.0)).collect()
    }

    fn policy(cap: usize) -> PurchasePolicy {
        PurchasePolicy::new(default_rules(), cap, coverage(8)).unwrap()
    }

    fn kinds(towers: &[Tower]) -> Vec<&str> {
        towers.iter().map(|t| t.kind.as_str()).collect()
    }

    #[test]
    fn test_rule_matching() {
        let rules = default_rules();
        assert!(rules[0].matches(0));
        assert!(rules[0].matches(1));
        assert!(!rules[0].matches(2));
        assert!(rules[3].matches(100));
    }

    #[test]
    fn test_choose_ladder() {
        let catalog = default_towers();
        let p = policy(8);
        assert_eq!(p.choose(1000, 0, &catalog).unwrap(), Some("basic"));
        assert_eq!(p.choose(1000, 1, &catalog).unwrap(), Some("basic"));
        assert_eq!(p.choose(1000, 2, &catalog).unwrap(), Some("splash"));
        assert_eq!(p.choose(99, 2, &catalog).unwrap(), Some("basic"));
        assert_eq!(p.choose(1000, 3, &catalog).unwrap(), Some("slow"));
        assert_eq!(p.choose(74, 3, &catalog).unwrap(), Some("basic"));
        assert_eq!(p.choose(1000, 4, &catalog).unwrap(), Some("sniper"));
        assert_eq!(p.choose(149, 5, &catalog).unwrap(), Some("splash"));
        assert_eq!(p.choose(99, 6, &catalog).unwrap(), Some("basic"));
        assert_eq!(p.choose(49, 6, &catalog).unwrap(), None);
        // First rule has no fallback
        assert_eq!(p.choose(49, 0, &catalog).unwrap(), None);
    }

    #[test]
    fn test_cap_stops_buying() {
        let catalog = default_towers();
        let p = policy(2);
        assert_eq!(p.choose(10_000, 2, &catalog).unwrap(), None);

        let mut gold = 10_000;
        let mut towers = Vec::new();
        assert_eq!(p.buy(&mut gold, &mut towers, &catalog).unwrap(), 2);
        assert_eq!(gold, 9_900);
    }

    #[test]
    fn test_buy_starting_gold() {
        let catalog = default_towers();
        let p = policy(6);
        let mut gold = 100;
        let mut towers = Vec::new();
        assert_eq!(p.buy(&mut gold, &mut towers, &catalog).unwrap(), 2);
        assert_eq!(gold, 0);
        assert_eq!(kinds(&towers), vec!["basic", "basic"]);
        assert_eq!(towers[0].position, p.coverage()[0]);
        assert_eq!(towers[1].position, p.coverage()[1]);
    }

    #[test]
    fn test_buy_continues_from_existing_towers() {
        let catalog = default_towers();
        let p = policy(6);
        let mut gold = 0;
        let mut towers = Vec::new();
        p.buy(&mut gold, &mut towers, &catalog).unwrap();
        assert!(towers.is_empty());

        gold = 60;
        p.buy(&mut gold, &mut towers, &catalog).unwrap();
        assert_eq!(kinds(&towers), vec!["basic"]);
        assert_eq!(gold, 10);

        gold += 400;
        p.buy(&mut gold, &mut towers, &catalog).unwrap();
        // basic, splash, slow, sniper = 50 + 100 + 75 + 150
        assert_eq!(kinds(&towers), vec!["basic", "basic", "splash", "slow", "sniper"]);
        assert_eq!(gold, 35);
        assert_eq!(towers[4].position, p.coverage()[4]);
    }

    #[test]
    fn test_insufficient_coverage() {
        let err = PurchasePolicy::new(default_rules(), 6, coverage(4)).unwrap_err();
        assert_eq!(
            err,
            SimError::InsufficientCoverage {
                cap: 6,
                positions: 4
            }
        );
    }

    #[test]
    fn test_unknown_tower_is_error() {
        let catalog = default_towers();
        let rules = vec![PurchaseRule::new(None, &["laser", "basic"])];
        let p = PurchasePolicy::new(rules, 4, coverage(4)).unwrap();
        assert_eq!(
            p.choose(100, 0, &catalog),
            Err(SimError::UnknownTowerType("laser".into()))
        );
        assert!(p.validate(&catalog).is_err());
        assert!(policy(6).validate(&catalog).is_ok());
    }
}

//! Hand-off table for the live game's enemy configuration.
//!
//! The tuned catalog is joined with per-kind display hints into a flat
//! table the game loader consumes, either as JSON or as a JavaScript
//! object literal pasted into the page.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::EnemyCatalog;
use crate::kinds::enemies;

/// Display hint for one enemy kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    pub color: String,
    pub size: u32,
}

impl Hint {
    pub fn new(color: &str, size: u32) -> Self {
        Self {
            color: color.to_string(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationHints {
    /// Used for kinds without their own hint.
    pub default_color: String,
    pub default_size: u32,
    pub kinds: BTreeMap<String, Hint>,
}

impl Default for PresentationHints {
    fn default() -> Self {
        Self {
            default_color: "#ef4444".to_string(),
            default_size: 12,
            kinds: BTreeMap::from([
                (enemies::BASIC.to_string(), Hint::new("#ef4444", 12)),
                (enemies::FAST.to_string(), Hint::new("#fbbf24", 10)),
                (enemies::TANK.to_string(), Hint::new("#7c3aed", 18)),
                (enemies::BOSS.to_string(), Hint::new("#dc2626", 24)),
            ]),
        }
    }
}

impl PresentationHints {
    pub fn hint(&self, kind: &str) -> Hint {
        self.kinds.get(kind).cloned().unwrap_or_else(|| Hint {
            color: self.default_color.clone(),
            size: self.default_size,
        })
    }
}

/// One enemy as the live game sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationRow {
    pub id: String,
    pub name: String,
    pub hp: u32,
    pub speed: f64,
    pub reward: u32,
    pub color: String,
    pub size: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresentationTable {
    rows: Vec<PresentationRow>,
}

impl PresentationTable {
    /// Stock kinds come first in wave order, anything else after by key.
    pub fn from_catalog(catalog: &EnemyCatalog, hints: &PresentationHints) -> Self {
        let mut entries: Vec<_> = catalog.iter().collect();
        entries.sort_by_key(|(kind, _)| {
            let rank = enemies::ALL
                .iter()
                .position(|k| k == kind)
                .unwrap_or(enemies::ALL.len());
            (rank, *kind)
        });
        let rows = entries
            .into_iter()
            .map(|(kind, spec)| {
                let hint = hints.hint(kind);
                PresentationRow {
                    id: kind.to_string(),
                    name: spec.name.clone(),
                    hp: spec.hp,
                    speed: spec.speed,
                    reward: spec.reward,
                    color: hint.color,
                    size: hint.size,
                    label: spec.name.clone(),
                }
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[PresentationRow] {
        &self.rows
    }

    /// Render as `var <name> = { kind: { ... }, ... };`.
    pub fn to_js(&self, var_name: &str) -> String {
        let entries: String = self
            .rows
            .iter()
            .map(|row| {
                format!(
                    "    {}: {{ id: {}, name: {}, hp: {}, speed: {:?}, reward: {}, color: {}, size: {}, label: {} }},\n",
                    js_key(&row.id),
                    js_str(&row.id),
                    js_str(&row.name),
                    row.hp,
                    row.speed,
                    row.reward,
                    js_str(&row.color),
                    row.size,
                    js_str(&row.label),
                )
            })
            .collect();
        format!("var {var_name} = {{\n{entries}}};\n")
    }
}

fn js_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn js_key(s: &str) -> String {
    let mut chars = s.chars();
    let ident = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if ident {
        s.to_string()
    } else {
        js_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{baseline_enemies, EnemySpec};

    #[test]
    fn test_rows_follow_wave_order() {
        let table = PresentationTable::from_catalog(&baseline_enemies(), &PresentationHints::default());
        let ids: Vec<&str> = table.rows().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["basic", "fast", "tank", "boss"]);
        let boss = &table.rows()[3];
        assert_eq!(boss.name, "Boss");
        assert_eq!(boss.label, "Boss");
        assert_eq!(boss.color, "#dc2626");
        assert_eq!(boss.size, 24);
    }

    #[test]
    fn test_js_literal() {
        let table = PresentationTable::from_catalog(&baseline_enemies(), &PresentationHints::default());
        let js = table.to_js("ENEMY_TYPES");
        assert!(js.starts_with("var ENEMY_TYPES = {\n"));
        assert!(js.ends_with("};\n"));
        assert!(js.contains(
            "    basic: { id: 'basic', name: 'Bug', hp: 30, speed: 1.0, reward: 10, color: '#ef4444', size: 12, label: 'Bug' },"
        ));
        assert!(js.contains("speed: 0.3, reward: 100"));
        assert_eq!(js.lines().count(), 6);

        let empty = PresentationTable::from_catalog(&EnemyCatalog::default(), &PresentationHints::default());
        assert_eq!(empty.to_js("NONE"), "var NONE = {\n};\n");
    }

    #[test]
    fn test_unknown_kind_uses_default_hint() {
        let mut entries: BTreeMap<String, EnemySpec> = baseline_enemies()
            .iter()
            .map(|(k, s)| (k.to_string(), s.clone()))
            .collect();
        entries.insert(
            "ghost-king".to_string(),
            EnemySpec {
                name: "O'Brien".to_string(),
                hp: 5,
                speed: 1.5,
                reward: 1,
            },
        );
        let table = PresentationTable::from_catalog(
            &EnemyCatalog::new(entries),
            &PresentationHints::default(),
        );
        let last = table.rows().last().unwrap();
        assert_eq!(last.id, "ghost-king");
        assert_eq!(last.color, "#ef4444");
        assert_eq!(last.size, 12);

        let js = table.to_js("ENEMY_TYPES");
        assert!(js.contains("'ghost-king': { id: 'ghost-king', name: 'O\\'Brien'"));
    }

    #[test]
    fn test_json_shape() {
        let table = PresentationTable::from_catalog(&baseline_enemies(), &PresentationHints::default());
        let value = serde_json::to_value(&table).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1]["id"], "fast");
        assert_eq!(rows[1]["speed"], 2.0);
        assert_eq!(rows[1]["size"], 10);
    }
}

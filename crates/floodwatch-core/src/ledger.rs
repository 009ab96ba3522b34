//! Resource ledger: category → item → quantity, over a closed schema.
//!
//! | Category | Items |
//! |----------|-------|
//! | Medical Resources | Ambulances, Doctors, Nurses, Medical Kits, Generators |
//! | Logistics & Support | Rescue Boats, Fuel Reserves, Comm Radios, Water Units, Shelter Tents |
//!
//! Every ledger value in this crate holds all ten items with non-negative quantities.
//! Oracle output is brought into that shape by [`ResourceLedger::from_value_lenient`].

use crate::error::LedgerError;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

pub const MEDICAL_RESOURCES: &str = "Medical Resources";
pub const LOGISTICS_SUPPORT: &str = "Logistics & Support";

/// Closed schema with the default starting quantities.
pub const LEDGER_SCHEMA: &[(&str, &[(&str, u32)])] = &[
    (
        MEDICAL_RESOURCES,
        &[
            ("Ambulances", 10),
            ("Doctors", 25),
            ("Nurses", 40),
            ("Medical Kits", 100),
            ("Generators", 15),
        ],
    ),
    (
        LOGISTICS_SUPPORT,
        &[
            ("Rescue Boats", 10),
            ("Fuel Reserves", 100),
            ("Comm Radios", 25),
            ("Water Units", 50),
            ("Shelter Tents", 20),
        ],
    ),
];

type RawLedger = BTreeMap<String, BTreeMap<String, i64>>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawLedger")]
pub struct ResourceLedger {
    categories: BTreeMap<String, BTreeMap<String, u32>>,
}

impl Default for ResourceLedger {
    /// The built-in starting inventory.
    fn default() -> Self {
        Self::from_schema(|default| default)
    }
}

impl ResourceLedger {
    fn from_schema(quantity: impl Fn(u32) -> u32) -> Self {
        let categories = LEDGER_SCHEMA
            .iter()
            .map(|(category, items)| {
                let items = items
                    .iter()
                    .map(|(item, default)| (item.to_string(), quantity(*default)))
                    .collect();
                (category.to_string(), items)
            })
            .collect();
        Self { categories }
    }

    /// Every item present with quantity 0.
    pub fn zeroed() -> Self {
        Self::from_schema(|_| 0)
    }

    pub fn get(&self, category: &str, item: &str) -> Option<u32> {
        self.categories.get(category)?.get(item).copied()
    }

    /// Overwrite one item. Unknown categories/items are rejected (closed schema).
    pub fn set(&mut self, category: &str, item: &str, quantity: u32) -> Result<(), LedgerError> {
        let items = self
            .categories
            .get_mut(category)
            .ok_or_else(|| LedgerError::UnknownCategory(category.to_string()))?;
        let slot = items.get_mut(item).ok_or_else(|| LedgerError::UnknownItem {
            category: category.to_string(),
            item: item.to_string(),
        })?;
        *slot = quantity;
        Ok(())
    }

    /// Overwrite-update: every item of `other` replaces the matching item here.
    pub fn merge(&mut self, other: &ResourceLedger) {
        for (category, items) in &other.categories {
            if let Some(mine) = self.categories.get_mut(category) {
                for (item, qty) in items {
                    if let Some(slot) = mine.get_mut(item) {
                        *slot = *qty;
                    }
                }
            }
        }
    }

    /// (category, item, quantity) triples, sorted by category then item.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, u32)> {
        self.categories.iter().flat_map(|(category, items)| {
            items
                .iter()
                .map(move |(item, qty)| (category.as_str(), item.as_str(), *qty))
        })
    }

    pub fn category_total(&self, category: &str) -> u64 {
        self.categories
            .get(category)
            .map(|items| items.values().map(|q| u64::from(*q)).sum())
            .unwrap_or(0)
    }

    /// Strict parse: every schema item present as a non-negative integer, nothing else.
    pub fn validate(value: &serde_json::Value) -> Result<Self, LedgerError> {
        let raw: RawLedger = serde_json::from_value(value.clone())
            .map_err(|e| LedgerError::Malformed(e.to_string()))?;
        Self::try_from(raw)
    }

    /// Strict check of a raw nested mapping against the closed schema.
    fn validate_raw(raw: &RawLedger) -> Result<(), LedgerError> {
        for (category, items) in raw {
            let Some((_, schema_items)) = LEDGER_SCHEMA.iter().find(|(c, _)| *c == category.as_str()) else {
                return Err(LedgerError::UnknownCategory(category.clone()));
            };
            for (item, qty) in items {
                if !schema_items.iter().any(|(i, _)| *i == item.as_str()) {
                    return Err(LedgerError::UnknownItem {
                        category: category.clone(),
                        item: item.clone(),
                    });
                }
                if *qty < 0 {
                    return Err(LedgerError::Negative {
                        category: category.clone(),
                        item: item.clone(),
                        quantity: *qty,
                    });
                }
            }
        }
        for (category, schema_items) in LEDGER_SCHEMA {
            for (item, _) in *schema_items {
                let present = raw
                    .get(*category)
                    .map(|items| items.contains_key(*item))
                    .unwrap_or(false);
                if !present {
                    return Err(LedgerError::MissingItem {
                        category: category.to_string(),
                        item: item.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Defaulting parse of oracle output.
    ///
    /// Items missing or malformed in `value` keep the quantity from `fallback`; unknown
    /// categories and items are dropped; negative numbers clamp to 0; fractional numbers
    /// round. Returns the ledger and the list of fields that had to be defaulted.
    pub fn from_value_lenient(
        value: &serde_json::Value,
        fallback: &ResourceLedger,
    ) -> (ResourceLedger, Vec<String>) {
        let mut ledger = fallback.clone();
        let mut defaulted = Vec::new();

        for (category, schema_items) in LEDGER_SCHEMA {
            let Some(section) = value.get(*category).and_then(|v| v.as_object()) else {
                defaulted.push(category.to_string());
                continue;
            };
            for (item, _) in *schema_items {
                match section.get(*item).and_then(quantity_of) {
                    Some(qty) => {
                        let _ = ledger.set(category, item, qty);
                    }
                    None => defaulted.push(format!("{category}/{item}")),
                }
            }
            for key in section.keys() {
                if !schema_items.iter().any(|(i, _)| *i == key.as_str()) {
                    tracing::debug!(category = %category, item = %key, "dropping item outside ledger schema");
                }
            }
        }

        (ledger, defaulted)
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(&self.categories).unwrap_or(serde_json::Value::Null)
    }

    /// Multi-line human-readable listing.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (category, items) in &self.categories {
            out.push_str(category);
            out.push('\n');
            for (item, qty) in items {
                out.push_str(&format!("  {item}: {qty}\n"));
            }
        }
        out
    }
}

impl TryFrom<RawLedger> for ResourceLedger {
    type Error = LedgerError;

    fn try_from(raw: RawLedger) -> Result<Self, Self::Error> {
        ResourceLedger::validate_raw(&raw)?;
        let categories = raw
            .into_iter()
            .map(|(category, items)| {
                let items = items
                    .into_iter()
                    .map(|(item, qty)| match u32::try_from(qty) {
                        Ok(qty) => Ok((item, qty)),
                        Err(_) => Err(LedgerError::Malformed(format!(
                            "quantity {qty} for '{item}' in '{category}' exceeds {}",
                            u32::MAX
                        ))),
                    })
                    .collect::<Result<BTreeMap<_, _>, _>>()?;
                Ok((category, items))
            })
            .collect::<Result<_, LedgerError>>()?;
        Ok(Self { categories })
    }
}

impl Serialize for ResourceLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.categories.serialize(serializer)
    }
}

fn quantity_of(v: &serde_json::Value) -> Option<u32> {
    let n = if let Some(i) = v.as_i64() {
        i
    } else if let Some(f) = v.as_f64() {
        f.round() as i64
    } else if let Some(s) = v.as_str() {
        let f = s.trim().parse::<f64>().ok().filter(|f| f.is_finite())?;
        f.round() as i64
    } else {
        return None;
    };
    Some(n.clamp(0, i64::from(u32::MAX)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_table_matches_schema() {
        let ledger = ResourceLedger::default();
        assert_eq!(ledger.entries().count(), 10);
        assert_eq!(ledger.get(MEDICAL_RESOURCES, "Nurses"), Some(40));
        assert_eq!(ledger.get(LOGISTICS_SUPPORT, "Fuel Reserves"), Some(100));
        assert_eq!(ledger.category_total(MEDICAL_RESOURCES), 190);
    }

    #[test]
    fn json_round_trip_preserves_triples() {
        let mut ledger = ResourceLedger::default();
        ledger.set(MEDICAL_RESOURCES, "Doctors", 7).unwrap();
        ledger.set(LOGISTICS_SUPPORT, "Water Units", 0).unwrap();
        let text = serde_json::to_string(&ledger).unwrap();
        let back: ResourceLedger = serde_json::from_str(&text).unwrap();
        assert_eq!(back, ledger);
        let a: Vec<_> = ledger.entries().collect();
        let b: Vec<_> = back.entries().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn strict_parse_rejects_open_schema() {
        let mut value = ResourceLedger::default().to_value();
        value[MEDICAL_RESOURCES]["Helicopters"] = json!(2);
        let err = serde_json::from_value::<ResourceLedger>(value).unwrap_err();
        assert!(err.to_string().contains("Helicopters"));

        let mut value = ResourceLedger::default().to_value();
        value[LOGISTICS_SUPPORT]
            .as_object_mut()
            .unwrap()
            .remove("Comm Radios");
        assert!(serde_json::from_value::<ResourceLedger>(value).is_err());

        let mut value = ResourceLedger::default().to_value();
        value[LOGISTICS_SUPPORT]["Comm Radios"] = json!(-3);
        assert!(serde_json::from_value::<ResourceLedger>(value.clone()).is_err());
        assert!(matches!(
            ResourceLedger::validate(&value),
            Err(LedgerError::Negative { quantity: -3, .. })
        ));

        assert!(matches!(
            ResourceLedger::validate(&json!({"Medical Resources": "lots"})),
            Err(LedgerError::Malformed(_))
        ));
        assert_eq!(
            ResourceLedger::validate(&ResourceLedger::default().to_value()),
            Ok(ResourceLedger::default())
        );
    }

    #[test]
    fn quantities_beyond_u32_are_malformed() {
        let mut value = ResourceLedger::default().to_value();
        value[MEDICAL_RESOURCES]["Ambulances"] = json!(5_000_000_000u64);
        assert!(matches!(
            ResourceLedger::validate(&value),
            Err(LedgerError::Malformed(msg)) if msg.contains("Ambulances")
        ));
        assert!(serde_json::from_value::<ResourceLedger>(value).is_err());

        let mut value = ResourceLedger::default().to_value();
        value[MEDICAL_RESOURCES]["Ambulances"] = json!(u32::MAX);
        let ledger = ResourceLedger::validate(&value).unwrap();
        assert_eq!(ledger.get(MEDICAL_RESOURCES, "Ambulances"), Some(u32::MAX));
    }

    #[test]
    fn set_rejects_unknown_item() {
        let mut ledger = ResourceLedger::default();
        assert_eq!(
            ledger.set(MEDICAL_RESOURCES, "Drones", 1),
            Err(LedgerError::UnknownItem {
                category: MEDICAL_RESOURCES.to_string(),
                item: "Drones".to_string(),
            })
        );
    }

    #[test]
    fn lenient_parse_defaults_clamps_and_drops() {
        let fallback = ResourceLedger::default();
        let value = json!({
            "Medical Resources": {
                "Ambulances": 4,
                "Doctors": -2,
                "Nurses": "12",
                "Medical Kits": 80.6,
                "Generators": "NaN",
                "Helicopters": 3
            }
        });
        let (ledger, defaulted) = ResourceLedger::from_value_lenient(&value, &fallback);
        assert_eq!(ledger.get(MEDICAL_RESOURCES, "Ambulances"), Some(4));
        assert_eq!(ledger.get(MEDICAL_RESOURCES, "Doctors"), Some(0));
        assert_eq!(ledger.get(MEDICAL_RESOURCES, "Nurses"), Some(12));
        assert_eq!(ledger.get(MEDICAL_RESOURCES, "Medical Kits"), Some(81));
        assert_eq!(ledger.get(MEDICAL_RESOURCES, "Generators"), Some(15));
        assert_eq!(ledger.get(LOGISTICS_SUPPORT, "Rescue Boats"), Some(10));
        assert_eq!(ledger.get(MEDICAL_RESOURCES, "Helicopters"), None);
        assert!(defaulted.contains(&"Medical Resources/Generators".to_string()));
        assert!(defaulted.contains(&LOGISTICS_SUPPORT.to_string()));
        assert_eq!(ledger.entries().count(), 10);
    }

    #[test]
    fn merge_overwrites_every_item() {
        let mut ledger = ResourceLedger::default();
        ledger.merge(&ResourceLedger::zeroed());
        assert!(ledger.entries().all(|(_, _, q)| q == 0));
    }
}

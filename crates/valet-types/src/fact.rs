//! Recalled-memory facts.
//!
//! Facts are durable snippets extracted from conversations in the background
//! and recalled by category-tagged relevance during context assembly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Category of a remembered fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactCategory {
    Preference,
    Biographical,
    Project,
    Instruction,
    General,
}

impl fmt::Display for FactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FactCategory::Preference => "preference",
            FactCategory::Biographical => "biographical",
            FactCategory::Project => "project",
            FactCategory::Instruction => "instruction",
            FactCategory::General => "general",
        };
        write!(f, "{s}")
    }
}

impl FromStr for FactCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "preference" => Ok(FactCategory::Preference),
            "biographical" => Ok(FactCategory::Biographical),
            "project" => Ok(FactCategory::Project),
            "instruction" => Ok(FactCategory::Instruction),
            "general" => Ok(FactCategory::General),
            other => Err(format!("invalid fact category: '{other}'")),
        }
    }
}

/// A durable remembered fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub id: Uuid,
    pub content: String,
    pub category: FactCategory,
    /// Where the fact came from, e.g. "auto-extracted".
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        for cat in [
            FactCategory::Preference,
            FactCategory::Biographical,
            FactCategory::Project,
            FactCategory::Instruction,
            FactCategory::General,
        ] {
            let parsed: FactCategory = cat.to_string().parse().unwrap();
            assert_eq!(cat, parsed);
        }
    }

    #[test]
    fn test_unknown_category_rejected() {
        assert!("gossip".parse::<FactCategory>().is_err());
    }
}

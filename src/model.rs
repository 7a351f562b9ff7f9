// 📇 Catalog Records - raw items from the static resource + display form
//
// The natural key is `pokemon_number`. The display `id` is DERIVED from it,
// never assigned: `id == pokemon_number.to_string()` for every record.

use serde::{Deserialize, Serialize};

// ============================================================================
// RAW RECORD
// ============================================================================

/// CatalogRecord - one item exactly as stored in `pokemons.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    pub pokemon_name: String,

    /// Unique natural key
    pub pokemon_number: i64,

    /// Image reference (URL or path)
    #[serde(default)]
    pub main_image: String,

    // ========================================================================
    // STATS
    // ========================================================================
    #[serde(default)]
    pub attack: i64,

    #[serde(default)]
    pub defense: i64,

    #[serde(default)]
    pub speed: i64,

    #[serde(default)]
    pub health: i64,

    /// Type tags ("Electric", "Grass", ...)
    #[serde(default)]
    pub types: Vec<String>,

    // ========================================================================
    // EVOLUTION CHAIN (plain text, never enforced as a foreign key)
    // ========================================================================
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evolution: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devolution: Option<String>,
}

impl CatalogRecord {
    /// Decimal string form of the natural key
    pub fn identifier(&self) -> String {
        self.pokemon_number.to_string()
    }

    /// Strict string comparison against a route identifier.
    /// "025" or " 25" never match 25.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.identifier() == identifier
    }
}

// ============================================================================
// DISPLAY RECORD
// ============================================================================

/// DisplayRecord - CatalogRecord plus the derived string `id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRecord {
    pub id: String,

    #[serde(flatten)]
    pub record: CatalogRecord,
}

impl From<CatalogRecord> for DisplayRecord {
    fn from(record: CatalogRecord) -> Self {
        DisplayRecord {
            id: record.identifier(),
            record,
        }
    }
}

impl DisplayRecord {
    pub fn name(&self) -> &str {
        &self.record.pokemon_name
    }

    /// Evolution reference, or None when absent/empty/"none"
    pub fn evolution(&self) -> Option<&str> {
        present_reference(self.record.evolution.as_deref())
    }

    pub fn devolution(&self) -> Option<&str> {
        present_reference(self.record.devolution.as_deref())
    }

    pub fn types_label(&self) -> String {
        if self.record.types.is_empty() {
            "—".to_string()
        } else {
            self.record.types.join(" / ")
        }
    }
}

fn present_reference(reference: Option<&str>) -> Option<&str> {
    match reference.map(str::trim) {
        None | Some("") => None,
        Some(r) if r.eq_ignore_ascii_case("none") || r.eq_ignore_ascii_case("null") => None,
        Some(r) => Some(r),
    }
}

/// Map a fetched catalog into display records, deriving every `id`
pub fn to_display_records(records: Vec<CatalogRecord>) -> Vec<DisplayRecord> {
    records.into_iter().map(DisplayRecord::from).collect()
}

/// Linear scan for the first record whose key stringifies to `identifier`
pub fn find_by_identifier(records: Vec<CatalogRecord>, identifier: &str) -> Option<DisplayRecord> {
    records
        .into_iter()
        .find(|r| r.matches_identifier(identifier))
        .map(DisplayRecord::from)
}

// ============================================================================
// TESTS
// ============================================================================

/// Roster data model and the flat `name,tier` file codec.
use serde::{Deserialize, Serialize};
use std::num::IntErrorKind;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("name {0:?} cannot be stored: it contains a comma or line break, or has surrounding whitespace")]
    UnstorableName(String),
}

/// Probability tier of a roster entry, always in `1..=5`.
///
/// Tier 5 is the "absolute" tier: when any entry carries it, every
/// lower-tier entry is vetoed from the draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct Tier(u8);

impl From<i64> for Tier {
    fn from(value: i64) -> Self {
        Tier::clamped(value)
    }
}

impl From<Tier> for i64 {
    fn from(tier: Tier) -> Self {
        i64::from(tier.0)
    }
}

impl Tier {
    pub const MIN: Tier = Tier(1);
    pub const MAX: Tier = Tier(5);
    pub const ABSOLUTE: Tier = Tier(5);

    /// Clamp any integer into the valid tier range.
    pub fn clamped(value: i64) -> Tier {
        Tier(value.clamp(1, 5) as u8)
    }

    /// Parse a numeric tier cell, clamping out-of-range values. Integers
    /// too large for `i64` clamp like any other. `None` if not a number.
    pub fn parse_numeric(text: &str) -> Option<Tier> {
        match text.trim().parse::<i64>() {
            Ok(value) => Some(Tier::clamped(value)),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow => Some(Tier::MAX),
                IntErrorKind::NegOverflow => Some(Tier::MIN),
                _ => None,
            },
        }
    }

    /// Parse a tier cell. Unparsable text yields the default tier,
    /// out-of-range numbers are clamped.
    pub fn parse_lenient(text: &str) -> Tier {
        Tier::parse_numeric(text).unwrap_or_default()
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Number of pool slots an entry of this tier receives.
    pub fn weight(self) -> u32 {
        match self.0 {
            1 => 0,
            2 => 10,
            3 => 30,
            4 => 60,
            _ => 100,
        }
    }

    pub fn is_absolute(self) -> bool {
        self == Tier::ABSOLUTE
    }

    /// Human-readable label for the tier.
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "never",
            2 => "unlikely",
            3 => "normal",
            4 => "likely",
            _ => "absolute",
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier(3)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single named entry in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub tier: Tier,
}

impl RosterEntry {
    pub fn new(name: impl Into<String>, tier: Tier) -> Self {
        Self {
            name: name.into(),
            tier,
        }
    }

    /// Whether the name survives a write and re-read of the line format.
    pub fn is_storable(&self) -> bool {
        !self.name.is_empty()
            && self.name.trim() == self.name
            && !self.name.contains([',', '\n', '\r'])
    }
}

/// Ordered list of entries. Duplicate names are legal and each copy
/// contributes its own weight to the pool.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Roster {
    pub entries: Vec<RosterEntry>,
}

/// Names written to a fresh roster file when none exists yet.
pub const DEFAULT_NAMES: [&str; 4] = ["小明", "李华", "张四", "小五"];

impl Roster {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    /// The four-name, all-normal roster used when no file exists.
    pub fn default_roster() -> Self {
        Self {
            entries: DEFAULT_NAMES
                .iter()
                .map(|name| RosterEntry::new(*name, Tier::default()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn has_absolute(&self) -> bool {
        self.entries.iter().any(|e| e.tier.is_absolute())
    }

    /// Parse roster text, one `name,tier` entry per line.
    ///
    /// Blank lines and lines with an empty name are skipped. A missing
    /// or unparsable tier becomes 3, out-of-range tiers are clamped.
    /// Anything after the second field is ignored.
    pub fn parse(input: &str) -> Roster {
        let mut entries = Vec::new();

        for (lineno, line) in input.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let mut fields = line.split(',');
            let name = fields.next().unwrap_or_default().trim();
            if name.is_empty() {
                log::debug!("roster line {}: empty name, skipped", lineno + 1);
                continue;
            }

            let tier = match fields.next() {
                Some(cell) => {
                    let tier = Tier::parse_lenient(cell);
                    if cell.trim().parse::<i64>().ok() != Some(i64::from(tier.value())) {
                        log::debug!(
                            "roster line {}: tier '{}' normalized to {}",
                            lineno + 1,
                            cell.trim(),
                            tier
                        );
                    }
                    tier
                }
                None => Tier::default(),
            };

            entries.push(RosterEntry::new(name, tier));
        }

        Roster { entries }
    }

    /// Serialize to the line format read by [`Roster::parse`]. Names that
    /// are not [storable](RosterEntry::is_storable) will not read back
    /// unchanged; [`Roster::save`] refuses them.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.name);
            out.push(',');
            out.push_str(&entry.tier.to_string());
            out.push('\n');
        }
        out
    }

    /// Read a roster file strictly, propagating IO errors.
    pub fn read_from(path: &Path) -> Result<Roster, RosterError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    /// Write the roster file, replacing any previous contents. Fails
    /// without touching the file if any name is not storable.
    pub fn save(&self, path: &Path) -> Result<(), RosterError> {
        if let Some(entry) = self.entries.iter().find(|e| !e.is_storable()) {
            return Err(RosterError::UnstorableName(entry.name.clone()));
        }
        std::fs::write(path, self.to_text())?;
        Ok(())
    }

    /// Load the roster at `path`, never failing.
    ///
    /// A missing file is created with the default roster. Any other read
    /// error degrades to the default roster.
    pub fn load_or_default(path: &Path) -> Roster {
        if !path.exists() {
            let roster = Self::default_roster();
            if let Err(e) = roster.save(path) {
                log::warn!("could not create roster file {:?}: {}", path, e);
            } else {
                log::info!("created default roster at {:?}", path);
            }
            return roster;
        }

        match Self::read_from(path) {
            Ok(roster) => roster,
            Err(e) => {
                log::warn!("failed to read roster {:?}, using default: {}", path, e);
                Self::default_roster()
            }
        }
    }
}

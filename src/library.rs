//! Read-only cross-section library.
//!
//! The library is the data contract at the boundary of the transport core: a
//! store keyed by material name yielding density, atomic weight and one
//! tabulated `(energy, cross-section)` series per interaction channel.
//! Energies are in eV, cross sections microscopic in barns/atom, density in
//! g/cm³. Where the tables come from (which database, which evaluation) is
//! an external collaborator's concern; this module only deserializes and
//! validates.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransportError};

/// One tabulated channel: parallel energy / cross-section arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelTable {
    /// Energy grid in eV, strictly increasing.
    pub energy: Vec<f64>,
    /// Microscopic cross sections in barns/atom, non-negative.
    pub cross_section: Vec<f64>,
}

impl ChannelTable {
    pub fn new(energy: Vec<f64>, cross_section: Vec<f64>) -> Self {
        Self {
            energy,
            cross_section,
        }
    }

    fn validate(&self, context: &str) -> Result<()> {
        if self.energy.is_empty() {
            return Err(TransportError::DataLoad(format!(
                "{context}: empty energy grid"
            )));
        }
        if self.energy.len() != self.cross_section.len() {
            return Err(TransportError::DataLoad(format!(
                "{context}: energy and cross-section lengths differ ({} vs {})",
                self.energy.len(),
                self.cross_section.len()
            )));
        }
        for pair in self.energy.windows(2) {
            if pair[1] <= pair[0] {
                return Err(TransportError::DataLoad(format!(
                    "{context}: energy grid not strictly increasing at {} eV",
                    pair[1]
                )));
            }
        }
        if self.energy[0] <= 0.0 {
            return Err(TransportError::DataLoad(format!(
                "{context}: non-positive energy node {} eV",
                self.energy[0]
            )));
        }
        if self.cross_section.iter().any(|&s| s < 0.0 || !s.is_finite()) {
            return Err(TransportError::DataLoad(format!(
                "{context}: negative or non-finite cross section"
            )));
        }
        Ok(())
    }
}

/// Everything the library knows about one material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialRecord {
    /// Numeric id referenced by voxel grids.
    pub id: u8,
    /// Mass density in g/cm³.
    pub density: f64,
    /// Mean atomic weight in g/mol, used to derive number density.
    pub atomic_weight: f64,
    pub photoelectric: ChannelTable,
    pub coherent: ChannelTable,
    pub incoherent: ChannelTable,
}

impl MaterialRecord {
    fn validate(&self, name: &str) -> Result<()> {
        if self.density <= 0.0 {
            return Err(TransportError::DataLoad(format!(
                "material '{name}': density must be positive, got {}",
                self.density
            )));
        }
        if self.atomic_weight <= 0.0 {
            return Err(TransportError::DataLoad(format!(
                "material '{name}': atomic weight must be positive, got {}",
                self.atomic_weight
            )));
        }
        self.photoelectric
            .validate(&format!("material '{name}', photoelectric"))?;
        self.coherent
            .validate(&format!("material '{name}', coherent"))?;
        self.incoherent
            .validate(&format!("material '{name}', incoherent"))?;
        Ok(())
    }
}

/// In-memory view of the cross-section store, keyed by material name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossSectionLibrary {
    pub materials: HashMap<String, MaterialRecord>,
}

impl CrossSectionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates a library from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Parses and validates a library from a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let library: CrossSectionLibrary = serde_json::from_str(text)?;
        library.validate()?;
        Ok(library)
    }

    /// Adds a record, validating it first. Mainly used to build small
    /// libraries in tests without a backing file.
    pub fn insert(&mut self, name: impl Into<String>, record: MaterialRecord) -> Result<()> {
        let name = name.into();
        record.validate(&name)?;
        self.materials.insert(name, record);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&MaterialRecord> {
        self.materials.get(name).ok_or_else(|| {
            TransportError::DataLoad(format!("material '{name}' not present in library"))
        })
    }

    fn validate(&self) -> Result<()> {
        for (name, record) in &self.materials {
            record.validate(name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_table() -> ChannelTable {
        ChannelTable::new(vec![1e3, 1e4, 1e5], vec![10.0, 1.0, 0.1])
    }

    fn simple_record() -> MaterialRecord {
        MaterialRecord {
            id: 1,
            density: 2.7,
            atomic_weight: 26.98,
            photoelectric: simple_table(),
            coherent: simple_table(),
            incoherent: simple_table(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let mut library = CrossSectionLibrary::new();
        library.insert("aluminum", simple_record()).unwrap();
        assert_eq!(library.get("aluminum").unwrap().id, 1);
        assert!(library.get("lead").is_err());
    }

    #[test]
    fn test_rejects_unsorted_energy_grid() {
        let mut record = simple_record();
        record.coherent.energy = vec![1e4, 1e3, 1e5];
        let mut library = CrossSectionLibrary::new();
        assert!(library.insert("bad", record).is_err());
    }

    #[test]
    fn test_rejects_negative_cross_section() {
        let mut record = simple_record();
        record.photoelectric.cross_section[1] = -0.5;
        let mut library = CrossSectionLibrary::new();
        assert!(library.insert("bad", record).is_err());
    }

    #[test]
    fn test_rejects_non_positive_density() {
        let mut record = simple_record();
        record.density = 0.0;
        let mut library = CrossSectionLibrary::new();
        assert!(library.insert("bad", record).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut library = CrossSectionLibrary::new();
        library.insert("aluminum", simple_record()).unwrap();
        let text = serde_json::to_string(&library).unwrap();
        let reloaded = CrossSectionLibrary::from_json_str(&text).unwrap();
        assert_eq!(
            reloaded.get("aluminum").unwrap().photoelectric.energy,
            library.get("aluminum").unwrap().photoelectric.energy
        );
    }

    #[test]
    fn test_malformed_json_is_data_error() {
        assert!(CrossSectionLibrary::from_json_str("{not json").is_err());
    }
}

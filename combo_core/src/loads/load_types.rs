//! Standard load cases per ASCE 7-22
//!
//! Any identifier may appear in a combination expression; these are the codes
//! the code-defined combinations use (`D`, `L`, `Lr`, ...). A [`LoadType`] is
//! also an algebra operand in its own right:
//!
//! ```
//! use combo_core::loads::{Combination, LoadType::*};
//!
//! let combo: Combination = 1.2 * Dead & 1.6 * (Snow | LiveRoof | Rain);
//! assert_eq!(combo.identifiers(), ["D", "S", "Lr", "R"]);
//! ```

use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Serialize};

use super::algebra::{ConjunctiveGroup, DisjunctiveGroup, ScaledTerm, Term};

/// The ASCE 7-22 load effects used by the preset combinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadType {
    /// `D`: self-weight and permanent attachments
    Dead,
    /// `L`: occupancy
    Live,
    /// `Lr`: roof maintenance and workers
    LiveRoof,
    /// `S`
    Snow,
    /// `R`: ponding rain
    Rain,
    /// `W`: signed, negative for suction or uplift
    Wind,
    /// `E`: signed
    Seismic,
    /// `H`: soil and groundwater pressure
    SoilLateral,
    /// `F`: fluids with well-defined pressures
    Fluid,
    /// `T`: temperature, shrinkage, creep and settlement effects
    SelfStraining,
}

/// (type, code, description) in standard order
const LOAD_TABLE: [(LoadType, &str, &str); 10] = [
    (LoadType::Dead, "D", "Dead load"),
    (LoadType::Live, "L", "Live load"),
    (LoadType::LiveRoof, "Lr", "Roof live load"),
    (LoadType::Snow, "S", "Snow load"),
    (LoadType::Rain, "R", "Rain load"),
    (LoadType::Wind, "W", "Wind load"),
    (LoadType::Seismic, "E", "Seismic load"),
    (LoadType::SoilLateral, "H", "Lateral earth pressure"),
    (LoadType::Fluid, "F", "Fluid pressure"),
    (LoadType::SelfStraining, "T", "Self-straining forces"),
];

impl LoadType {
    pub const ALL: [LoadType; 10] = [
        LoadType::Dead,
        LoadType::Live,
        LoadType::LiveRoof,
        LoadType::Snow,
        LoadType::Rain,
        LoadType::Wind,
        LoadType::Seismic,
        LoadType::SoilLateral,
        LoadType::Fluid,
        LoadType::SelfStraining,
    ];

    fn entry(&self) -> &'static (LoadType, &'static str, &'static str) {
        // LOAD_TABLE lists the variants in declaration order
        &LOAD_TABLE[*self as usize]
    }

    /// Identifier used in combination strings
    ///
    /// ```
    /// use combo_core::loads::LoadType;
    /// assert_eq!(LoadType::LiveRoof.code(), "Lr");
    /// ```
    pub fn code(&self) -> &'static str {
        self.entry().1
    }

    /// Look up a load type by its code (case sensitive: `L` and `Lr` differ)
    pub fn from_code(code: &str) -> Option<LoadType> {
        LOAD_TABLE
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(load_type, _, _)| *load_type)
    }

    pub fn description(&self) -> &'static str {
        self.entry().2
    }

    /// `D`, `L`, `Lr`, `S` and `R` act downward and are never negative
    pub fn is_gravity(&self) -> bool {
        matches!(
            self,
            LoadType::Dead | LoadType::Live | LoadType::LiveRoof | LoadType::Snow | LoadType::Rain
        )
    }
}

impl std::fmt::Display for LoadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl BitAnd for LoadType {
    type Output = ConjunctiveGroup;

    fn bitand(self, rhs: LoadType) -> ConjunctiveGroup {
        ScaledTerm::from(self) & ScaledTerm::from(rhs)
    }
}

impl BitOr for LoadType {
    type Output = DisjunctiveGroup;

    fn bitor(self, rhs: LoadType) -> DisjunctiveGroup {
        ScaledTerm::from(self) | ScaledTerm::from(rhs)
    }
}

impl BitOr<LoadType> for DisjunctiveGroup {
    type Output = DisjunctiveGroup;

    fn bitor(self, rhs: LoadType) -> DisjunctiveGroup {
        self | ScaledTerm::from(rhs)
    }
}

impl BitAnd<LoadType> for ConjunctiveGroup {
    type Output = ConjunctiveGroup;

    fn bitand(self, rhs: LoadType) -> ConjunctiveGroup {
        self & ScaledTerm::from(rhs)
    }
}

impl From<LoadType> for Term {
    fn from(load_type: LoadType) -> Self {
        Term::Scaled(load_type.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loads::Combination;

    #[test]
    fn test_table_matches_declaration_order() {
        for (i, load_type) in LoadType::ALL.iter().enumerate() {
            assert_eq!(LOAD_TABLE[i].0, *load_type);
        }
    }

    #[test]
    fn test_codes_in_standard_order() {
        let codes: Vec<&str> = LoadType::ALL.iter().map(LoadType::code).collect();
        assert_eq!(codes, ["D", "L", "Lr", "S", "R", "W", "E", "H", "F", "T"]);
    }

    #[test]
    fn test_from_code_roundtrip() {
        for lt in LoadType::ALL {
            assert_eq!(LoadType::from_code(lt.code()), Some(lt));
        }
        assert_eq!(LoadType::from_code("LR"), None);
        assert_eq!(LoadType::from_code("X"), None);
    }

    #[test]
    fn test_only_first_five_are_gravity() {
        let gravity: Vec<LoadType> = LoadType::ALL.into_iter().filter(LoadType::is_gravity).collect();
        assert_eq!(gravity, LoadType::ALL[..5]);
    }

    #[test]
    fn test_operands_match_parsed_string() {
        use LoadType::*;

        let built: Combination = Dead & Live & 0.5 * (LiveRoof | Snow | Rain);
        let parsed = Combination::parse("D & L & 0.5*(Lr | S | R)").unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn test_serde_uses_variant_names() {
        assert_eq!(serde_json::to_string(&LoadType::SoilLateral).unwrap(), "\"SoilLateral\"");
        let wind: LoadType = serde_json::from_str("\"Wind\"").unwrap();
        assert_eq!(wind.to_string(), "W");
    }
}

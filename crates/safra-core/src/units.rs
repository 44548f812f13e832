//! Quantity units and conversions
//!
//! Mass is canonicalised to milligrams and volume to millilitres. Factors
//! are exact integers, so conversions along the ladder never drift.

use serde::{Deserialize, Serialize};

/// Unit family; units of different families never convert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitFamily {
    Mass,
    Volume,
}

/// Convertible units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "mg")]
    Milligram,
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "ton")]
    Ton,
    /// 60 kg bag
    #[serde(rename = "saca")]
    Saca,
    #[serde(rename = "mL")]
    Millilitre,
    #[serde(rename = "L")]
    Litre,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Milligram => "mg",
            Self::Gram => "g",
            Self::Kilogram => "kg",
            Self::Ton => "ton",
            Self::Saca => "saca",
            Self::Millilitre => "mL",
            Self::Litre => "L",
        }
    }

    pub fn family(&self) -> UnitFamily {
        match self {
            Self::Milligram | Self::Gram | Self::Kilogram | Self::Ton | Self::Saca => {
                UnitFamily::Mass
            }
            Self::Millilitre | Self::Litre => UnitFamily::Volume,
        }
    }

    /// Base units (mg or mL) in one of this unit
    pub fn base_factor(&self) -> u64 {
        match self {
            Self::Milligram | Self::Millilitre => 1,
            Self::Gram | Self::Litre => 1_000,
            Self::Kilogram => 1_000_000,
            Self::Saca => 60_000_000,
            Self::Ton => 1_000_000_000,
        }
    }

    pub fn base(family: UnitFamily) -> Self {
        match family {
            UnitFamily::Mass => Self::Milligram,
            UnitFamily::Volume => Self::Millilitre,
        }
    }

    pub fn to_base(&self, quantity: f64) -> f64 {
        quantity * self.base_factor() as f64
    }

    pub fn from_base(&self, base_quantity: f64) -> f64 {
        base_quantity / self.base_factor() as f64
    }
}

impl std::str::FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let code = unit_abbreviation(s.trim());
        match code.to_lowercase().as_str() {
            "mg" | "miligrama" => Ok(Self::Milligram),
            "g" | "grama" => Ok(Self::Gram),
            "kg" | "quilo" | "quilograma" => Ok(Self::Kilogram),
            "ton" | "t" | "tonelada" => Ok(Self::Ton),
            "saca" | "sc" => Ok(Self::Saca),
            "ml" | "mililitro" => Ok(Self::Millilitre),
            "l" | "lt" | "litro" => Ok(Self::Litre),
            _ => Err(format!("Unknown unit: {}", s)),
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse a stored unit code; counted units (un, cx, galão) yield `None`
pub fn parse_unit(code: &str) -> Option<Unit> {
    code.parse().ok()
}

/// Quantity in the base unit of its family
pub fn to_base(quantity: f64, unit: &str) -> Option<(f64, UnitFamily)> {
    parse_unit(unit).map(|u| (u.to_base(quantity), u.family()))
}

/// Convert a quantity between two units of the same family
pub fn convert(quantity: f64, from: &str, to: &str) -> Option<f64> {
    let from = parse_unit(from)?;
    let to = parse_unit(to)?;
    if from.family() != to.family() {
        return None;
    }
    Some(to.from_base(from.to_base(quantity)))
}

/// Largest unit that keeps the displayed magnitude at or above one
pub fn best_display_unit(base_quantity: f64, family: UnitFamily) -> Unit {
    let magnitude = base_quantity.abs();
    let ladder: &[Unit] = match family {
        UnitFamily::Mass => &[Unit::Ton, Unit::Kilogram, Unit::Gram],
        UnitFamily::Volume => &[Unit::Litre],
    };

    ladder
        .iter()
        .copied()
        .find(|u| magnitude >= u.base_factor() as f64)
        .unwrap_or(Unit::base(family))
}

/// Base quantity expressed in its best display unit
pub fn display_quantity(base_quantity: f64, family: UnitFamily) -> (f64, Unit) {
    let unit = best_display_unit(base_quantity, family);
    (unit.from_base(base_quantity), unit)
}

/// Long form of a unit code for labels ("ton" -> "ton (tonelada)")
pub fn unit_full_name(code: &str) -> String {
    match code {
        "ton" | "ton (tonelada)" => "ton (tonelada)".to_string(),
        "saca" | "saca (60kg)" | "saca_(60kg)" => "saca (60kg)".to_string(),
        "cx" | "cx (caixa)" => "cx (caixa)".to_string(),
        "un" | "un (unidade)" => "un (unidade)".to_string(),
        other => other.to_string(),
    }
}

/// Short form of a unit label ("saca (60kg)" -> "saca")
pub fn unit_abbreviation(label: &str) -> String {
    match label {
        "ton (tonelada)" => "ton".to_string(),
        "saca (60kg)" | "saca_(60kg)" => "saca".to_string(),
        "cx (caixa)" => "cx".to_string(),
        "un (unidade)" => "un".to_string(),
        other => other.to_string(),
    }
}

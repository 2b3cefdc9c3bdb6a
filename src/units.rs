//! Attribute dimensions, unit strings and conversions between the deck unit systems.

use crate::error::UnitError;
use crate::property::PropertyBag;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The unit systems a method file can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitSystem {
    English,
    /// kPa based metric.
    Metric,
    /// kg/cm2 based metric.
    MetKgCm2,
    MetBar,
    Lab,
}

impl UnitSystem {
    pub const ALL: [UnitSystem; 5] = [
        UnitSystem::English,
        UnitSystem::Metric,
        UnitSystem::MetKgCm2,
        UnitSystem::MetBar,
        UnitSystem::Lab,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UnitSystem::English => "ENGLISH",
            UnitSystem::Metric => "METRIC",
            UnitSystem::MetKgCm2 => "METKG/CM2",
            UnitSystem::MetBar => "METBAR",
            UnitSystem::Lab => "LAB",
        }
    }

    /// The unit system flagged in a method's properties, if any.
    pub fn declared_in(properties: &PropertyBag) -> Option<UnitSystem> {
        UnitSystem::ALL
            .into_iter()
            .find(|system| properties.get(system.as_str()).is_some_and(|v| v.is_flag()))
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitSystem::ALL
            .into_iter()
            .find(|system| system.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown unit system '{s}'"))
    }
}

impl Serialize for UnitSystem {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Pressure,
    Length,
    Density,
    Compressibility,
    Viscosity,
    Temperature,
    Permeability,
    LiquidRate,
    GasRate,
    GasLiquidRatio,
    Dimensionless,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Pressure => "pressure",
            Dimension::Length => "length",
            Dimension::Density => "density",
            Dimension::Compressibility => "compressibility",
            Dimension::Viscosity => "viscosity",
            Dimension::Temperature => "temperature",
            Dimension::Permeability => "permeability",
            Dimension::LiquidRate => "liquid rate",
            Dimension::GasRate => "gas rate",
            Dimension::GasLiquidRatio => "gas-liquid ratio",
            Dimension::Dimensionless => "dimensionless",
        }
    }

    pub fn unit(self, system: UnitSystem) -> &'static str {
        use Dimension::*;
        use UnitSystem::*;
        match (self, system) {
            (Pressure, English | Lab) => "psia",
            (Pressure, Metric) => "kPa",
            (Pressure, MetKgCm2) => "kg/cm2",
            (Pressure, MetBar) => "bar",
            (Length, English) => "ft",
            (Length, Lab) => "cm",
            (Length, _) => "m",
            (Density, English) => "lb/ft3",
            (Density, Lab) => "g/cc",
            (Density, _) => "kg/m3",
            (Compressibility, English | Lab) => "1/psi",
            (Compressibility, Metric) => "1/kPa",
            (Compressibility, MetKgCm2) => "1/(kg/cm2)",
            (Compressibility, MetBar) => "1/bar",
            (Viscosity, _) => "cP",
            (Temperature, English | Lab) => "degF",
            (Temperature, _) => "degC",
            (Permeability, _) => "mD",
            (LiquidRate, English) => "STB/day",
            (LiquidRate, Lab) => "cc/hour",
            (LiquidRate, _) => "m3/day",
            (GasRate, English) => "MSCF/day",
            (GasRate, Lab) => "cc/hour",
            (GasRate, _) => "m3/day",
            (GasLiquidRatio, English) => "MSCF/STB",
            (GasLiquidRatio, Lab) => "cc/cc",
            (GasLiquidRatio, _) => "m3/m3",
            (Dimensionless, _) => "dimensionless",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The physical dimension of a deck attribute, by name.
pub fn dimension_of(attribute: &str) -> Option<Dimension> {
    let dimension = match attribute.to_ascii_uppercase().as_str() {
        "PREF" | "PINIT" | "PSAT" | "PDEW" | "PRES" | "PRESSURE" | "P" | "THP" | "BHP" | "PSTD"
        | "PAQI" | "PCGOC" | "PCWOC" | "PCWO" | "PCGO" => Dimension::Pressure,
        "CR" | "CW" | "CT" | "CVW" => Dimension::Compressibility,
        "DENW" | "DENOIL" | "DENGAS" => Dimension::Density,
        "VISW" | "VISC" | "VO" | "VG" => Dimension::Viscosity,
        "TEMP" | "TSTD" | "RES_TEMP" => Dimension::Temperature,
        "DEPTH" | "GOC" | "WOC" | "DINIT" | "DATUM" | "DAQI" | "H" | "RO" | "RE" | "RADW"
        | "RADB" => Dimension::Length,
        "PERM" | "K" => Dimension::Permeability,
        "QOIL" | "QLIQ" | "QWAT" => Dimension::LiquidRate,
        "QGAS" => Dimension::GasRate,
        "GOR" | "RS" => Dimension::GasLiquidRatio,
        "PORO" | "SW" | "SG" | "SO" | "SWL" | "SWR" | "SWU" | "SGL" | "SGR" | "SGU" | "SORW"
        | "SORG" | "KRW" | "KROW" | "KRG" | "KROG" | "WCUT" | "API" | "SPECG" | "KPMULT" => {
            Dimension::Dimensionless
        }
        _ => return None,
    };
    Some(dimension)
}

/// The unit `attribute` is expressed in under `system`.
pub fn unit_for(attribute: &str, system: UnitSystem) -> Result<&'static str, UnitError> {
    dimension_of(attribute)
        .map(|dimension| dimension.unit(system))
        .ok_or_else(|| UnitError::UnrecognizedAttribute {
            attribute: attribute.to_string(),
        })
}

/// `to = from * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub scale: f64,
    pub offset: f64,
}

impl Conversion {
    pub const fn scale(scale: f64) -> Self {
        Conversion { scale, offset: 0.0 }
    }

    pub const fn affine(scale: f64, offset: f64) -> Self {
        Conversion { scale, offset }
    }

    pub fn apply(self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    pub fn inverse(self) -> Self {
        Conversion {
            scale: 1.0 / self.scale,
            offset: -self.offset / self.scale,
        }
    }
}

const PSI_TO_KPA: f64 = 6.894757;
const PSI_TO_BAR: f64 = 0.06894757;
const PSI_TO_KG_CM2: f64 = 0.07030696;
const FT_TO_M: f64 = 0.3048;
const LB_FT3_TO_KG_M3: f64 = 16.01846;
const STB_TO_M3: f64 = 0.1589873;
const MSCF_TO_M3: f64 = 28.31685;
const MSCF_STB_TO_M3_M3: f64 = 178.1076;

/// Registry of conversions keyed by dimension and the pair of unit systems.
#[derive(Debug, Clone)]
pub struct UnitConverter {
    conversions: HashMap<(Dimension, UnitSystem, UnitSystem), Conversion>,
}

impl UnitConverter {
    /// A converter without any registered conversion.
    pub fn new() -> Self {
        UnitConverter {
            conversions: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        use Dimension::*;
        use UnitSystem::*;
        let mut converter = Self::new();
        let metric = [Metric, MetKgCm2, MetBar];

        converter.register(Pressure, English, Metric, Conversion::scale(PSI_TO_KPA));
        converter.register(Pressure, English, MetBar, Conversion::scale(PSI_TO_BAR));
        converter.register(Pressure, English, MetKgCm2, Conversion::scale(PSI_TO_KG_CM2));
        converter.register(Compressibility, English, Metric, Conversion::scale(1.0 / PSI_TO_KPA));
        converter.register(Compressibility, English, MetBar, Conversion::scale(1.0 / PSI_TO_BAR));
        converter.register(
            Compressibility,
            English,
            MetKgCm2,
            Conversion::scale(1.0 / PSI_TO_KG_CM2),
        );
        for system in metric {
            converter.register(Length, English, system, Conversion::scale(FT_TO_M));
            converter.register(Density, English, system, Conversion::scale(LB_FT3_TO_KG_M3));
            converter.register(
                Temperature,
                English,
                system,
                Conversion::affine(5.0 / 9.0, -32.0 * 5.0 / 9.0),
            );
            converter.register(LiquidRate, English, system, Conversion::scale(STB_TO_M3));
            converter.register(GasRate, English, system, Conversion::scale(MSCF_TO_M3));
            converter.register(
                GasLiquidRatio,
                English,
                system,
                Conversion::scale(MSCF_STB_TO_M3_M3),
            );
        }
        converter.register(Length, English, Lab, Conversion::scale(FT_TO_M * 100.0));
        converter.register(Density, English, Lab, Conversion::scale(LB_FT3_TO_KG_M3 / 1000.0));
        converter
    }

    /// Registers `conversion` and its inverse. An existing entry is replaced.
    pub fn register(
        &mut self,
        dimension: Dimension,
        from: UnitSystem,
        to: UnitSystem,
        conversion: Conversion,
    ) {
        self.conversions.insert((dimension, from, to), conversion);
        self.conversions.insert((dimension, to, from), conversion.inverse());
    }

    /// A registered conversion, direct or chained through English units.
    pub fn lookup(
        &self,
        dimension: Dimension,
        from: UnitSystem,
        to: UnitSystem,
    ) -> Option<Conversion> {
        if from == to || dimension.unit(from) == dimension.unit(to) {
            return Some(Conversion::scale(1.0));
        }
        if let Some(conversion) = self.conversions.get(&(dimension, from, to)) {
            return Some(*conversion);
        }
        let to_english = self.lookup_direct(dimension, from, UnitSystem::English)?;
        let from_english = self.lookup_direct(dimension, UnitSystem::English, to)?;
        Some(Conversion {
            scale: to_english.scale * from_english.scale,
            offset: to_english.offset * from_english.scale + from_english.offset,
        })
    }

    fn lookup_direct(
        &self,
        dimension: Dimension,
        from: UnitSystem,
        to: UnitSystem,
    ) -> Option<Conversion> {
        if dimension.unit(from) == dimension.unit(to) {
            return Some(Conversion::scale(1.0));
        }
        self.conversions.get(&(dimension, from, to)).copied()
    }

    /// Converts `value`, failing when no conversion is registered.
    pub fn convert_strict(
        &self,
        value: f64,
        dimension: Dimension,
        from: UnitSystem,
        to: UnitSystem,
    ) -> Result<f64, UnitError> {
        self.lookup(dimension, from, to)
            .map(|conversion| conversion.apply(value))
            .ok_or_else(|| UnitError::NoConversion {
                dimension: dimension.to_string(),
                from: from.to_string(),
                to: to.to_string(),
            })
    }

    /// Converts `value`. Without a registered conversion the units are taken as equal and the
    /// value comes back unchanged, with a logged warning.
    pub fn convert_dimension(
        &self,
        value: f64,
        dimension: Dimension,
        from: UnitSystem,
        to: UnitSystem,
    ) -> f64 {
        match self.lookup(dimension, from, to) {
            Some(conversion) => conversion.apply(value),
            None => {
                log::warn!(
                    "no {dimension} conversion from {from} to {to}; value {value} left unchanged"
                );
                value
            }
        }
    }

    /// Converts the value of `attribute`. Fails only when the attribute has no dimension.
    pub fn convert(
        &self,
        value: f64,
        attribute: &str,
        from: UnitSystem,
        to: UnitSystem,
    ) -> Result<f64, UnitError> {
        let dimension = dimension_of(attribute).ok_or_else(|| UnitError::UnrecognizedAttribute {
            attribute: attribute.to_string(),
        })?;
        Ok(self.convert_dimension(value, dimension, from, to))
    }
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

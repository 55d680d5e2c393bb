//! Physical units for the ERA5-Land variables the importer handles.
//!
//! Values are converted through `uom` quantities: lengths (precipitation,
//! evaporation, runoff, snow depth) and thermodynamic temperatures.

use std::fmt;
use std::str::FromStr;

use uom::si::f64::{Length, ThermodynamicTemperature};
use uom::si::length::{centimeter, foot, inch, kilometer, meter, millimeter};
use uom::si::thermodynamic_temperature::{degree_celsius, degree_fahrenheit, kelvin};

use crate::error::{CommonError, CommonResult};

/// Physical dimension of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Length,
    Temperature,
}

/// A supported unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Metre,
    Centimetre,
    Millimetre,
    Kilometre,
    Inch,
    Foot,
    Kelvin,
    Celsius,
    Fahrenheit,
}

impl Unit {
    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::Metre
            | Unit::Centimetre
            | Unit::Millimetre
            | Unit::Kilometre
            | Unit::Inch
            | Unit::Foot => Dimension::Length,
            Unit::Kelvin | Unit::Celsius | Unit::Fahrenheit => Dimension::Temperature,
        }
    }

    fn quantity(&self, value: f64) -> Quantity {
        match self {
            Unit::Metre => Quantity::Length(Length::new::<meter>(value)),
            Unit::Centimetre => Quantity::Length(Length::new::<centimeter>(value)),
            Unit::Millimetre => Quantity::Length(Length::new::<millimeter>(value)),
            Unit::Kilometre => Quantity::Length(Length::new::<kilometer>(value)),
            Unit::Inch => Quantity::Length(Length::new::<inch>(value)),
            Unit::Foot => Quantity::Length(Length::new::<foot>(value)),
            Unit::Kelvin => Quantity::Temperature(ThermodynamicTemperature::new::<kelvin>(value)),
            Unit::Celsius => {
                Quantity::Temperature(ThermodynamicTemperature::new::<degree_celsius>(value))
            }
            Unit::Fahrenheit => {
                Quantity::Temperature(ThermodynamicTemperature::new::<degree_fahrenheit>(value))
            }
        }
    }

    /// The quantity expressed in this unit, `None` for another dimension.
    fn value_of(&self, quantity: Quantity) -> Option<f64> {
        let value = match (self, quantity) {
            (Unit::Metre, Quantity::Length(q)) => q.get::<meter>(),
            (Unit::Centimetre, Quantity::Length(q)) => q.get::<centimeter>(),
            (Unit::Millimetre, Quantity::Length(q)) => q.get::<millimeter>(),
            (Unit::Kilometre, Quantity::Length(q)) => q.get::<kilometer>(),
            (Unit::Inch, Quantity::Length(q)) => q.get::<inch>(),
            (Unit::Foot, Quantity::Length(q)) => q.get::<foot>(),
            (Unit::Kelvin, Quantity::Temperature(q)) => q.get::<kelvin>(),
            (Unit::Celsius, Quantity::Temperature(q)) => q.get::<degree_celsius>(),
            (Unit::Fahrenheit, Quantity::Temperature(q)) => q.get::<degree_fahrenheit>(),
            _ => return None,
        };
        Some(value)
    }

    /// Canonical symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Metre => "m",
            Unit::Centimetre => "cm",
            Unit::Millimetre => "mm",
            Unit::Kilometre => "km",
            Unit::Inch => "in",
            Unit::Foot => "ft",
            Unit::Kelvin => "K",
            Unit::Celsius => "degC",
            Unit::Fahrenheit => "degF",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Quantity {
    Length(Length),
    Temperature(ThermodynamicTemperature),
}

impl FromStr for Unit {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim() {
            "m" | "meter" | "meters" | "metre" | "metres" => Unit::Metre,
            "cm" | "centimeter" | "centimeters" | "centimetre" | "centimetres" => Unit::Centimetre,
            "mm" | "millimeter" | "millimeters" | "millimetre" | "millimetres" => Unit::Millimetre,
            "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => Unit::Kilometre,
            "in" | "inch" | "inches" => Unit::Inch,
            "ft" | "foot" | "feet" => Unit::Foot,
            "K" | "kelvin" => Unit::Kelvin,
            "degC" | "°C" | "C" | "celsius" | "degree_Celsius" => Unit::Celsius,
            "degF" | "°F" | "F" | "fahrenheit" | "degree_Fahrenheit" => Unit::Fahrenheit,
            other => return Err(CommonError::UnknownUnit(other.to_string())),
        };
        Ok(unit)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A checked conversion between two units of the same dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub from: Unit,
    pub to: Unit,
}

impl Conversion {
    pub fn new(from: Unit, to: Unit) -> CommonResult<Self> {
        if from.dimension() != to.dimension() {
            return Err(CommonError::IncompatibleUnits {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(Self { from, to })
    }

    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    pub fn apply(&self, value: f64) -> f64 {
        if self.is_identity() {
            return value;
        }
        // Same dimension is checked in `new`
        self.to
            .value_of(self.from.quantity(value))
            .unwrap_or(f64::NAN)
    }

    /// The conversion in the opposite direction.
    pub fn inverse(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }
}

/// Convert a single value.
pub fn convert(value: f64, from: Unit, to: Unit) -> CommonResult<f64> {
    Ok(Conversion::new(from, to)?.apply(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metres_to_millimetres() {
        assert!((convert(0.0123, Unit::Metre, Unit::Millimetre).unwrap() - 12.3).abs() < 1e-9);
    }

    #[test]
    fn test_kelvin_to_celsius() {
        assert!((convert(273.15, Unit::Kelvin, Unit::Celsius).unwrap()).abs() < 1e-9);
        assert!((convert(100.0, Unit::Celsius, Unit::Fahrenheit).unwrap() - 212.0).abs() < 1e-9);
    }

    #[test]
    fn test_incompatible() {
        assert!(matches!(
            Conversion::new(Unit::Metre, Unit::Kelvin),
            Err(CommonError::IncompatibleUnits { .. })
        ));
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("metres".parse::<Unit>().unwrap(), Unit::Metre);
        assert_eq!(" mm ".parse::<Unit>().unwrap(), Unit::Millimetre);
        assert_eq!("°C".parse::<Unit>().unwrap(), Unit::Celsius);
        assert!("furlong".parse::<Unit>().is_err());
    }
}

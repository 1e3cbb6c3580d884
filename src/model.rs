//! Customer records and prediction results exchanged with the scoring service

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::Error;

/// The nine input columns, in the order the service and the spreadsheets use.
pub const INPUT_COLUMNS: [&str; 9] = [
    "total_spent",
    "avg_order_value",
    "avg_purchase_frequency",
    "days_since_last_purchase",
    "discount_behavior",
    "loyalty_program_member",
    "days_in_advance",
    "flight_type",
    "cabin_class",
];

/// Flight booked by the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FlightType {
    Domestic,
    International,
}

impl FlightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightType::Domestic => "domestic",
            FlightType::International => "international",
        }
    }
}

impl FromStr for FlightType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "domestic" => Ok(FlightType::Domestic),
            "international" => Ok(FlightType::International),
            other => Err(format!(
                "expected 'domestic' or 'international', got '{other}'"
            )),
        }
    }
}

/// Cabin class booked by the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CabinClass {
    Economy,
    Business,
}

impl CabinClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CabinClass::Economy => "economy",
            CabinClass::Business => "business",
        }
    }
}

impl FromStr for CabinClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "economy" => Ok(CabinClass::Economy),
            "business" => Ok(CabinClass::Business),
            other => Err(format!("expected 'economy' or 'business', got '{other}'")),
        }
    }
}

/// Raw customer attributes as entered in a form or read from one table row.
///
/// Nothing here is checked yet; converting into a [`CustomerRecord`] enforces the ranges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerAttributes {
    pub total_spent: f64,
    pub avg_order_value: f64,
    pub avg_purchase_frequency: f64,
    pub days_since_last_purchase: u32,
    pub discount_behavior: f64,
    #[serde(serialize_with = "serialize_flag")]
    pub loyalty_program_member: bool,
    pub days_in_advance: u32,
    pub flight_type: FlightType,
    pub cabin_class: CabinClass,
}

// The service expects the loyalty flag as 0/1.
fn serialize_flag<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*flag))
}

impl CustomerAttributes {
    /// Check the numeric constraints, reporting the first violated field.
    pub fn validate(&self) -> crate::Result<()> {
        let amounts = [
            ("total_spent", self.total_spent),
            ("avg_order_value", self.avg_order_value),
            ("avg_purchase_frequency", self.avg_purchase_frequency),
        ];
        for (field, value) in amounts {
            if !value.is_finite() {
                return Err(Error::validation(field, format!("{value} is not a finite number")));
            }
            if value < 0.0 {
                return Err(Error::validation(field, format!("{value} must not be negative")));
            }
        }

        let discount = self.discount_behavior;
        if !discount.is_finite() || !(0.0..=1.0).contains(&discount) {
            return Err(Error::validation(
                "discount_behavior",
                format!("{discount} must be within [0, 1]"),
            ));
        }

        Ok(())
    }
}

/// A validated customer record, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CustomerRecord {
    attributes: CustomerAttributes,
}

impl CustomerRecord {
    pub fn attributes(&self) -> &CustomerAttributes {
        &self.attributes
    }
}

impl TryFrom<CustomerAttributes> for CustomerRecord {
    type Error = Error;

    fn try_from(attributes: CustomerAttributes) -> crate::Result<Self> {
        attributes.validate()?;
        Ok(Self { attributes })
    }
}

/// Outcome grouping derived from a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Segment {
    Continue,
    Stop,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Continue => write!(f, "Continue"),
            Segment::Stop => write!(f, "Stop"),
        }
    }
}

/// Prediction returned by the scoring service for one record
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Whether the customer is expected to keep buying after the price increase
    pub will_continue: bool,
    /// Probability of continuing, in [0, 1]
    pub probability: f64,
}

impl PredictionResult {
    pub fn segment(&self) -> Segment {
        if self.will_continue {
            Segment::Continue
        } else {
            Segment::Stop
        }
    }
}

use serde::Serialize;
use std::sync::Arc;

use crate::prelude::RecordFields;
use crate::stream::{PointingContext, StreamContext, Timestamp};

/// Scalar columns a record may carry, in emission order.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum RecordField {
    CenterFrequency,
    Temperature,
    CurrentAzimuth,
    CurrentElevation,
    AzimuthError,
    ElevationError,
    CurrentRa,
    CurrentDec,
    SetpointRa,
    SetpointDec,
    RadecErrorAngle,
    RadecErrorBearing,
    Focusbox,
}

const POINTING_FIELDS: [RecordField; 11] = [
    RecordField::CurrentAzimuth,
    RecordField::CurrentElevation,
    RecordField::AzimuthError,
    RecordField::ElevationError,
    RecordField::CurrentRa,
    RecordField::CurrentDec,
    RecordField::SetpointRa,
    RecordField::SetpointDec,
    RecordField::RadecErrorAngle,
    RecordField::RadecErrorBearing,
    RecordField::Focusbox,
];

impl RecordField {
    pub fn name(&self) -> &'static str {
        match self {
            RecordField::CenterFrequency => "center_freq_hz",
            RecordField::Temperature => "temperature_deg_c",
            RecordField::CurrentAzimuth => "current_az_deg",
            RecordField::CurrentElevation => "current_el_deg",
            RecordField::AzimuthError => "current_az_error_deg",
            RecordField::ElevationError => "current_el_error_deg",
            RecordField::CurrentRa => "current_ra_h",
            RecordField::CurrentDec => "current_dec_deg",
            RecordField::SetpointRa => "setpoint_ra_h",
            RecordField::SetpointDec => "setpoint_dec_deg",
            RecordField::RadecErrorAngle => "radec_error_angle_deg",
            RecordField::RadecErrorBearing => "radec_error_bearing_deg",
            RecordField::Focusbox => "focusbox_mm",
        }
    }

    pub fn unit(&self) -> Option<&'static str> {
        match self {
            RecordField::CenterFrequency => Some("Hz"),
            RecordField::Temperature => None,
            RecordField::CurrentRa | RecordField::SetpointRa => Some("h"),
            RecordField::Focusbox => Some("mm"),
            _ => Some("deg"),
        }
    }

    /// Enabled fields in their fixed declared order.
    pub fn layout(fields: &RecordFields) -> Vec<RecordField> {
        let mut layout = Vec::new();
        if fields.center_frequency {
            layout.push(RecordField::CenterFrequency);
        }
        if fields.temperature {
            layout.push(RecordField::Temperature);
        }
        if fields.pointing {
            layout.extend_from_slice(&POINTING_FIELDS);
        }
        layout
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ScalarField {
    pub field: RecordField,
    pub value: f64,
}

/// One emitted spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    /// Time of the last sample of the integration window.
    pub timestamp: Timestamp,
    pub scalars: Vec<ScalarField>,
    /// Calibrated value per bin, ascending frequency.
    pub values: Vec<f64>,
    /// Absolute frequency of every bin in Hz.
    pub frequencies: Arc<[f64]>,
    /// Cumulative value range when min/max hold is active.
    pub bounds: Option<(f64, f64)>,
}

/// Running extremes of every finite value seen during the run. Never narrows.
#[derive(Debug, Clone, Copy)]
pub struct MinMaxHold {
    min: f64,
    max: f64,
}

impl MinMaxHold {
    pub fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn observe(&mut self, values: &[f64]) {
        for &value in values.iter().filter(|v| v.is_finite()) {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
    }

    /// Current range, once it spans a non-empty interval.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        (self.min < self.max).then_some((self.min, self.max))
    }
}

impl Default for MinMaxHold {
    fn default() -> Self {
        Self::new()
    }
}

/// Assembles records in column order and keeps the run-wide min/max hold.
pub struct RecordBuilder {
    layout: Vec<RecordField>,
    hold: Option<MinMaxHold>,
}

impl RecordBuilder {
    pub fn new(fields: &RecordFields, hold_min_max: bool) -> Self {
        Self {
            layout: RecordField::layout(fields),
            hold: hold_min_max.then(MinMaxHold::new),
        }
    }

    pub fn layout(&self) -> &[RecordField] {
        &self.layout
    }

    pub fn build(
        &mut self,
        timestamp: Timestamp,
        values: Vec<f64>,
        frequencies: Arc<[f64]>,
        context: &StreamContext,
        pointing: Option<&PointingContext>,
    ) -> OutputRecord {
        let pointing_values = pointing.copied().unwrap_or_default().record_values();
        let mut pointing_iter = pointing_values.iter();

        let scalars = self
            .layout
            .iter()
            .map(|&field| {
                let value = match field {
                    RecordField::CenterFrequency => context.center_frequency,
                    RecordField::Temperature => context.temperature,
                    _ => pointing_iter.next().copied().unwrap_or(0.0),
                };
                ScalarField { field, value }
            })
            .collect();

        let bounds = self.hold.as_mut().and_then(|hold| {
            hold.observe(&values);
            hold.bounds()
        });

        OutputRecord {
            timestamp,
            scalars,
            values,
            frequencies,
            bounds,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Acquisition metadata delivered by the decoder's context packets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamContext {
    pub sample_rate: f64,
    pub center_frequency: f64,
    pub bandwidth: f64,
    pub stream_id: u32,
    pub gain: f64,
    pub temperature: f64,
    pub reference_locked: bool,
    pub time_calibrated: bool,
}

impl Default for StreamContext {
    fn default() -> Self {
        Self {
            sample_rate: 0.0,
            center_frequency: 0.0,
            bandwidth: 0.0,
            stream_id: 1,
            gain: 0.0,
            temperature: 0.0,
            reference_locked: false,
            time_calibrated: false,
        }
    }
}

impl StreamContext {
    /// Whether `other` describes the same acquisition. Housekeeping values
    /// such as temperature and lock status may drift without a reset.
    pub fn same_acquisition(&self, other: &StreamContext) -> bool {
        self.sample_rate == other.sample_rate
            && self.center_frequency == other.center_frequency
            && self.bandwidth == other.bandwidth
            && self.stream_id == other.stream_id
            && self.gain == other.gain
    }

    /// Lowest channel selected by the stream id mask.
    pub fn channel(&self) -> Option<u32> {
        (self.stream_id != 0).then(|| self.stream_id.trailing_zeros())
    }
}

/// Telescope pointing state carried by extended context packets. Angles in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointingContext {
    pub azimuth: f64,
    pub elevation: f64,
    pub azimuth_error: f64,
    pub elevation_error: f64,
    pub ra_current: f64,
    pub dec_current: f64,
    pub ra_setpoint: f64,
    pub dec_setpoint: f64,
    /// Focus box position in millimetres.
    pub focusbox: f64,
}

pub const POINTING_FIELD_COUNT: usize = 11;

impl PointingContext {
    /// Great-circle angle between setpoint and current position.
    pub fn error_angle(&self) -> f64 {
        let dec_delta = self.dec_current - self.dec_setpoint;
        let ra_delta = self.ra_current - self.ra_setpoint;
        let a = (dec_delta / 2.0).sin().powi(2)
            + self.dec_setpoint.cos() * self.dec_current.cos() * (ra_delta / 2.0).sin().powi(2);
        2.0 * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Direction of the pointing error as seen from the setpoint.
    pub fn error_bearing(&self) -> f64 {
        let (dec1, dec2) = (self.dec_setpoint, self.dec_current);
        let ra_delta = self.ra_current - self.ra_setpoint;
        (dec1.cos() * dec2.sin() - dec1.sin() * dec2.cos() * ra_delta.cos())
            .atan2(ra_delta.sin() * dec2.cos())
    }

    /// Values in record column order: degrees, hours for RA, millimetres for focus.
    pub fn record_values(&self) -> [f64; POINTING_FIELD_COUNT] {
        let deg = 180.0 / PI;
        let hours = 12.0 / PI;
        [
            deg * self.azimuth,
            deg * self.elevation,
            deg * self.azimuth_error,
            deg * self.elevation_error,
            hours * self.ra_current,
            deg * self.dec_current,
            hours * self.ra_setpoint,
            deg * self.dec_setpoint,
            deg * self.error_angle(),
            deg * self.error_bearing(),
            self.focusbox,
        ]
    }
}

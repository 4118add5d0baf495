//! Subdevice options and their allowed ranges.

use std::fmt;

/// A configurable numeric option of a subdevice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Opt {
    BacklightCompensation,
    Brightness,
    Contrast,
    Exposure,
    Gain,
    Gamma,
    Hue,
    Saturation,
    Sharpness,
    WhiteBalance,
    EnableAutoExposure,
    EnableAutoWhiteBalance,
    LaserPower,
    Accuracy,
    MotionRange,
    FilterOption,
    ConfidenceThreshold,
    EmitterEnabled,
}

impl Opt {
    pub const ALL: [Opt; 18] = [
        Opt::BacklightCompensation,
        Opt::Brightness,
        Opt::Contrast,
        Opt::Exposure,
        Opt::Gain,
        Opt::Gamma,
        Opt::Hue,
        Opt::Saturation,
        Opt::Sharpness,
        Opt::WhiteBalance,
        Opt::EnableAutoExposure,
        Opt::EnableAutoWhiteBalance,
        Opt::LaserPower,
        Opt::Accuracy,
        Opt::MotionRange,
        Opt::FilterOption,
        Opt::ConfidenceThreshold,
        Opt::EmitterEnabled,
    ];
}

impl fmt::Display for Opt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Opt::BacklightCompensation => "backlight_compensation",
            Opt::Brightness => "brightness",
            Opt::Contrast => "contrast",
            Opt::Exposure => "exposure",
            Opt::Gain => "gain",
            Opt::Gamma => "gamma",
            Opt::Hue => "hue",
            Opt::Saturation => "saturation",
            Opt::Sharpness => "sharpness",
            Opt::WhiteBalance => "white_balance",
            Opt::EnableAutoExposure => "enable_auto_exposure",
            Opt::EnableAutoWhiteBalance => "enable_auto_white_balance",
            Opt::LaserPower => "laser_power",
            Opt::Accuracy => "accuracy",
            Opt::MotionRange => "motion_range",
            Opt::FilterOption => "filter_option",
            Opt::ConfidenceThreshold => "confidence_threshold",
            Opt::EmitterEnabled => "emitter_enabled",
        })
    }
}

/// The allowed range of an option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub def: f64,
}

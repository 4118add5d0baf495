//! The enumeration capability interface.
//!
//! Device discovery and introspection go through [`Backend`] and [`Device`], so the report
//! renderer runs unchanged against real hardware ([`crate::usb`]) or scripted devices
//! ([`crate::mock`]).

use std::fmt;

use crate::{
    option::{Opt, OptRange},
    stream::StreamProfile,
    Result,
};

/// An informational field a device may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Info {
    Name,
    SerialNumber,
    FirmwareVersion,
    PhysicalPort,
    ProductId,
}

impl Info {
    pub const ALL: [Info; 5] = [
        Info::Name,
        Info::SerialNumber,
        Info::FirmwareVersion,
        Info::PhysicalPort,
        Info::ProductId,
    ];
}

impl fmt::Display for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Info::Name => "name",
            Info::SerialNumber => "serial_number",
            Info::FirmwareVersion => "firmware_version",
            Info::PhysicalPort => "physical_port",
            Info::ProductId => "product_id",
        })
    }
}

/// A logical sensor component of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Subdevice {
    Depth,
    Color,
    Infrared,
    Fisheye,
    Motion,
}

impl Subdevice {
    pub const ALL: [Subdevice; 5] = [
        Subdevice::Depth,
        Subdevice::Color,
        Subdevice::Infrared,
        Subdevice::Fisheye,
        Subdevice::Motion,
    ];
}

impl fmt::Display for Subdevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Subdevice::Depth => "depth",
            Subdevice::Color => "color",
            Subdevice::Infrared => "infrared",
            Subdevice::Fisheye => "fisheye",
            Subdevice::Motion => "motion",
        })
    }
}

/// Produces the devices currently connected to the host.
pub trait Backend {
    type Device: Device;

    fn query_devices(&self) -> Result<Vec<Self::Device>>;
}

/// Introspection of a single connected device.
pub trait Device {
    fn supports_info(&self, field: Info) -> bool;

    /// Reads an informational field. Fails if the field is not supported.
    fn info(&self, field: Info) -> Result<String>;

    fn supports_subdevice(&self, sub: Subdevice) -> bool;

    fn supports_option(&self, sub: Subdevice, opt: Opt) -> bool;

    /// Reads the allowed range of an option. Fails if the option is not supported.
    fn option_range(&self, sub: Subdevice, opt: Opt) -> Result<OptRange>;

    /// Returns the stream profiles the subdevice can produce.
    fn stream_profiles(&self, sub: Subdevice) -> Result<Vec<StreamProfile>>;
}

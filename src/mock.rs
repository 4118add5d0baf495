//! In-memory implementation of the enumeration interface.
//!
//! Reports whatever it was scripted to report, without any hardware attached. The report
//! renderer is tested against this backend, and downstream tests can use it the same way.

use crate::{
    device::{Backend, Device, Info, Subdevice},
    error::{err, Call},
    option::{Opt, OptRange},
    stream::StreamProfile,
    Result,
};

/// Backend returning a scripted set of devices.
#[derive(Default)]
pub struct MockBackend {
    devices: Vec<MockDevice>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a device to the reported set.
    pub fn device(mut self, device: MockDevice) -> Self {
        self.devices.push(device);
        self
    }
}

impl Backend for MockBackend {
    type Device = MockDevice;

    fn query_devices(&self) -> Result<Vec<MockDevice>> {
        Ok(self.devices.clone())
    }
}

/// A scripted device.
#[derive(Clone, Default)]
pub struct MockDevice {
    info: Vec<(Info, String)>,
    subs: Vec<MockSubdevice>,
}

#[derive(Clone)]
struct MockSubdevice {
    subdevice: Subdevice,
    options: Vec<(Opt, OptRange)>,
    profiles: Vec<StreamProfile>,
}

impl MockDevice {
    /// Creates a device reporting the three identity fields every camera has.
    pub fn new(name: &str, serial: &str, firmware: &str) -> Self {
        Self {
            info: vec![
                (Info::Name, name.to_string()),
                (Info::SerialNumber, serial.to_string()),
                (Info::FirmwareVersion, firmware.to_string()),
            ],
            subs: Vec::new(),
        }
    }

    /// Adds or replaces an informational field.
    pub fn with_info(mut self, field: Info, value: &str) -> Self {
        self.info.retain(|(f, _)| *f != field);
        self.info.push((field, value.to_string()));
        self
    }

    /// Declares a supported subdevice.
    pub fn with_subdevice(mut self, sub: Subdevice) -> Self {
        self.ensure(sub);
        self
    }

    /// Declares a supported option and its range.
    pub fn with_option(mut self, sub: Subdevice, opt: Opt, range: OptRange) -> Self {
        self.ensure(sub).options.push((opt, range));
        self
    }

    /// Declares a stream profile.
    pub fn with_profile(mut self, sub: Subdevice, profile: StreamProfile) -> Self {
        self.ensure(sub).profiles.push(profile);
        self
    }

    fn ensure(&mut self, sub: Subdevice) -> &mut MockSubdevice {
        if let Some(i) = self.subs.iter().position(|s| s.subdevice == sub) {
            return &mut self.subs[i];
        }
        self.subs.push(MockSubdevice {
            subdevice: sub,
            options: Vec::new(),
            profiles: Vec::new(),
        });
        // unwrap: pushed right above
        self.subs.last_mut().unwrap()
    }

    fn sub(&self, sub: Subdevice) -> Option<&MockSubdevice> {
        self.subs.iter().find(|s| s.subdevice == sub)
    }
}

impl Device for MockDevice {
    fn supports_info(&self, field: Info) -> bool {
        self.info.iter().any(|(f, _)| *f == field)
    }

    fn info(&self, field: Info) -> Result<String> {
        match self.info.iter().find(|(f, _)| *f == field) {
            Some((_, value)) => Ok(value.clone()),
            None => err("info field not scripted", Call::DeviceInfo(field)),
        }
    }

    fn supports_subdevice(&self, sub: Subdevice) -> bool {
        self.sub(sub).is_some()
    }

    fn supports_option(&self, sub: Subdevice, opt: Opt) -> bool {
        self.sub(sub)
            .map_or(false, |s| s.options.iter().any(|(o, _)| *o == opt))
    }

    fn option_range(&self, sub: Subdevice, opt: Opt) -> Result<OptRange> {
        match self
            .sub(sub)
            .and_then(|s| s.options.iter().find(|(o, _)| *o == opt))
        {
            Some((_, range)) => Ok(*range),
            None => err("option not scripted", Call::OptionRange(sub, opt)),
        }
    }

    fn stream_profiles(&self, sub: Subdevice) -> Result<Vec<StreamProfile>> {
        match self.sub(sub) {
            Some(s) => Ok(s.profiles.clone()),
            None => err("subdevice not scripted", Call::StreamProfiles(sub)),
        }
    }
}

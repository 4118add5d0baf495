//! Host-side backend: answers enumeration queries from USB video-class descriptors and
//! control requests.
//!
//! This stays strictly at the descriptor/control level. It never negotiates or reads a video
//! stream, and options that live behind vendor extension protocols are reported as
//! unsupported.

use std::time::Duration;

use rusb::{Context, DeviceHandle, UsbContext};

use crate::{
    device::{Backend, Device, Info, Subdevice},
    error::{err, Call, ResultExt},
    option::{Opt, OptRange},
    probe::{self, ProbedDevice, ProductId},
    stream::{Format, Stream, StreamProfile},
    topo::{CameraControls, ProcessingUnitControls, StreamingDesc},
    Result,
};

const GET_ENTITY_REQ: u8 = 0b10100001;

/// `GET_*` requests on entity controls.
#[derive(Debug, Clone, Copy)]
enum Request {
    GetMin = 0x82,
    GetMax = 0x83,
    GetRes = 0x84,
    GetDef = 0x87,
}

pub struct UsbBackend {
    ctx: Context,
}

impl UsbBackend {
    /// Creates a backend on a fresh USB context.
    pub fn new() -> Result<Self> {
        let ctx = Context::new().calling(Call::QueryDevices)?;
        Ok(Self { ctx })
    }
}

impl Backend for UsbBackend {
    type Device = UsbDevice;

    fn query_devices(&self) -> Result<Vec<UsbDevice>> {
        let list = self.ctx.devices().calling(Call::QueryDevices)?;

        let mut devices = Vec::new();
        for dev in list.iter() {
            if let Some(probed) = probe::probe(&dev)? {
                devices.push(UsbDevice::open(&dev, probed)?);
            }
        }
        Ok(devices)
    }
}

/// An opened depth camera. The handle is held for the duration of one enumeration run.
pub struct UsbDevice {
    handle: DeviceHandle<Context>,
    product: ProductId,
    serial: Option<String>,
    firmware: String,
    port: String,
    subs: Vec<SubdeviceInfo>,
    timeout: Duration,
}

struct SubdeviceInfo {
    subdevice: Subdevice,
    control_interface: u8,
    processing_unit: Option<(u8, ProcessingUnitControls)>,
    camera_terminal: Option<(u8, CameraControls)>,
    profiles: Vec<StreamProfile>,
}

impl UsbDevice {
    fn open(dev: &rusb::Device<Context>, probed: ProbedDevice) -> Result<Self> {
        let desc = dev.device_descriptor().calling(Call::OpenDevice)?;
        let handle = dev.open().calling(Call::OpenDevice)?;
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            log::warn!("set_auto_detach_kernel_driver failed: {}", e);
        }
        for func in &probed.functions {
            handle
                .claim_interface(func.control_interface)
                .calling(Call::OpenDevice)?;
        }

        let serial = match handle.read_serial_number_string_ascii(&desc) {
            Ok(s) if !s.is_empty() => Some(s),
            Ok(_) => None,
            Err(e) => {
                log::debug!("device reports no serial number string: {}", e);
                None
            }
        };
        let version = desc.device_version();
        let firmware = format!(
            "{}.{}.{}",
            version.major(),
            version.minor(),
            version.sub_minor()
        );
        let port = format!("{}-{}", dev.bus_number(), dev.address());

        let expected = probed.product.subdevices();
        let mut subs = Vec::new();
        let mut next = 0;
        for func in &probed.functions {
            for vs in &func.streams {
                let subdevice = match expected.get(next) {
                    Some(sub) => *sub,
                    None => {
                        log::warn!(
                            "{:?} has more streaming interfaces than known subdevices",
                            probed.product
                        );
                        break;
                    }
                };
                next += 1;

                let chain = func.topology.chain_for(vs.terminal_link);
                subs.push(SubdeviceInfo {
                    subdevice,
                    control_interface: func.control_interface,
                    processing_unit: chain.processing_unit.map(|pu| (pu.id, pu.controls)),
                    camera_terminal: chain.camera.map(|cam| (cam.id, cam.controls)),
                    profiles: profiles_for(subdevice, vs),
                });
            }
        }

        Ok(UsbDevice {
            handle,
            product: probed.product,
            serial,
            firmware,
            port,
            subs,
            timeout: Duration::from_millis(1000),
        })
    }

    fn sub(&self, sub: Subdevice, call: Call) -> Result<&SubdeviceInfo> {
        match self.subs.iter().find(|s| s.subdevice == sub) {
            Some(info) => Ok(info),
            None => err("subdevice is not supported by this device", call),
        }
    }

    /// Performs a `GET_*` request on an entity control of the video control interface.
    fn read_entity(
        &self,
        interface: u8,
        entity: u8,
        request: Request,
        cs: u8,
        buf: &mut [u8],
        call: Call,
    ) -> Result<()> {
        let value = u16::from(cs) << 8;
        let index = u16::from(entity) << 8 | u16::from(interface);
        self.handle
            .read_control(GET_ENTITY_REQ, request as u8, value, index, buf, self.timeout)
            .calling(call)?;
        Ok(())
    }
}

impl Device for UsbDevice {
    fn supports_info(&self, field: Info) -> bool {
        match field {
            Info::SerialNumber => self.serial.is_some(),
            _ => true,
        }
    }

    fn info(&self, field: Info) -> Result<String> {
        match field {
            Info::Name => Ok(self.product.name().to_string()),
            Info::SerialNumber => match &self.serial {
                Some(serial) => Ok(serial.clone()),
                None => err(
                    "device does not report a serial number",
                    Call::DeviceInfo(field),
                ),
            },
            Info::FirmwareVersion => Ok(self.firmware.clone()),
            Info::PhysicalPort => Ok(self.port.clone()),
            Info::ProductId => Ok(format!("{:04x}", self.product as u16)),
        }
    }

    fn supports_subdevice(&self, sub: Subdevice) -> bool {
        self.subs.iter().any(|s| s.subdevice == sub)
    }

    fn supports_option(&self, sub: Subdevice, opt: Opt) -> bool {
        let info = match self.subs.iter().find(|s| s.subdevice == sub) {
            Some(info) => info,
            None => return false,
        };
        let ctrl = match uvc_control(opt) {
            Some(ctrl) => ctrl,
            None => return false,
        };
        match ctrl.target {
            Target::Processing => info
                .processing_unit
                .map_or(false, |(_, controls)| controls.bits() & ctrl.cap != 0),
            Target::Camera => info
                .camera_terminal
                .map_or(false, |(_, controls)| controls.bits() & ctrl.cap != 0),
        }
    }

    fn option_range(&self, sub: Subdevice, opt: Opt) -> Result<OptRange> {
        let call = Call::OptionRange(sub, opt);
        let info = self.sub(sub, call)?;
        let ctrl = match uvc_control(opt) {
            Some(ctrl) => ctrl,
            None => {
                return err(
                    "option is not exposed over the video-class interface",
                    call,
                )
            }
        };
        let entity = match ctrl.target {
            Target::Processing => info.processing_unit.map(|(id, _)| id),
            Target::Camera => info.camera_terminal.map(|(id, _)| id),
        };
        let entity = match entity {
            Some(id) => id,
            None => return err("subdevice has no unit carrying this option", call),
        };

        let read = |request: Request| -> Result<f64> {
            let mut buf = [0u8; 4];
            let buf = &mut buf[..ctrl.len];
            self.read_entity(info.control_interface, entity, request, ctrl.selector, buf, call)?;
            Ok(decode_le(buf, ctrl.signed))
        };

        Ok(OptRange {
            min: read(Request::GetMin)?,
            max: read(Request::GetMax)?,
            step: read(Request::GetRes)?,
            def: read(Request::GetDef)?,
        })
    }

    fn stream_profiles(&self, sub: Subdevice) -> Result<Vec<StreamProfile>> {
        Ok(self.sub(sub, Call::StreamProfiles(sub))?.profiles.clone())
    }
}

enum Target {
    Processing,
    Camera,
}

/// How an option maps onto a video-class entity control.
struct UvcControl {
    target: Target,
    selector: u8,
    len: usize,
    signed: bool,
    /// The option's bit in the owning entity's controls bitmap.
    cap: u32,
}

fn uvc_control(opt: Opt) -> Option<UvcControl> {
    use crate::topo::{CameraControls as CT, ProcessingUnitControls as PU};

    let pu = |selector, len, signed, cap: PU| UvcControl {
        target: Target::Processing,
        selector,
        len,
        signed,
        cap: cap.bits(),
    };
    let ct = |selector, len, signed, cap: CT| UvcControl {
        target: Target::Camera,
        selector,
        len,
        signed,
        cap: cap.bits(),
    };

    Some(match opt {
        Opt::BacklightCompensation => pu(0x01, 2, false, PU::BACKLIGHT_COMPENSATION),
        Opt::Brightness => pu(0x02, 2, true, PU::BRIGHTNESS),
        Opt::Contrast => pu(0x03, 2, false, PU::CONTRAST),
        Opt::Gain => pu(0x04, 2, false, PU::GAIN),
        Opt::Hue => pu(0x06, 2, true, PU::HUE),
        Opt::Saturation => pu(0x07, 2, false, PU::SATURATION),
        Opt::Sharpness => pu(0x08, 2, false, PU::SHARPNESS),
        Opt::Gamma => pu(0x09, 2, false, PU::GAMMA),
        Opt::WhiteBalance => pu(0x0A, 2, false, PU::WHITE_BALANCE_TEMPERATURE),
        Opt::EnableAutoWhiteBalance => pu(0x0B, 1, false, PU::WHITE_BALANCE_TEMPERATURE_AUTO),
        Opt::Exposure => ct(0x04, 4, false, CT::EXPOSURE_TIME_ABS),
        Opt::EnableAutoExposure => ct(0x02, 1, false, CT::AUTO_EXPOSURE_MODE),
        // The depth-specific options live behind vendor extension protocols.
        _ => return None,
    })
}

/// Decodes a little-endian control value of 1, 2 or 4 bytes.
fn decode_le(buf: &[u8], signed: bool) -> f64 {
    let mut raw = [0u8; 8];
    raw[..buf.len()].copy_from_slice(buf);
    let value = u64::from_le_bytes(raw);
    if signed {
        let shift = (64 - buf.len() * 8) as u32;
        (((value << shift) as i64) >> shift) as f64
    } else {
        value as f64
    }
}

fn profiles_for(sub: Subdevice, vs: &StreamingDesc) -> Vec<StreamProfile> {
    let mut profiles = Vec::new();
    for format in &vs.formats {
        let pixel = match format.format {
            Some(pixel) => pixel,
            None => {
                log::debug!(
                    "skipping format with unrecognized GUID on interface {}",
                    vs.interface_number
                );
                continue;
            }
        };
        let stream = stream_for(sub, pixel);

        for frame in &format.frames {
            for interval in &frame.intervals {
                let secs = interval.as_secs_f64();
                if secs <= 0.0 {
                    log::warn!("frame descriptor declares a zero interval");
                    continue;
                }
                profiles.push(StreamProfile {
                    stream,
                    width: frame.width.into(),
                    height: frame.height.into(),
                    fps: (1.0 / secs).round() as u32,
                    format: pixel,
                });
            }
        }
    }
    profiles
}

fn stream_for(sub: Subdevice, format: Format) -> Stream {
    match sub {
        // The depth interface also carries the infrared views.
        Subdevice::Depth => match format {
            Format::Y8 | Format::Y16 => Stream::Infrared,
            _ => Stream::Depth,
        },
        Subdevice::Color => Stream::Color,
        Subdevice::Infrared => Stream::Infrared,
        Subdevice::Fisheye => Stream::Fisheye,
        // Motion subdevices do not transport data over a streaming interface.
        Subdevice::Motion => Stream::Depth,
    }
}

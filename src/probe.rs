//! Depth-camera detection.
//!
//! Recognizes supported camera models on the USB bus and collects their video-class
//! descriptors: the control-interface topology and the per-interface stream formats.

use rusb::{ConfigDescriptor, Context, Device};
use zerocopy::FromBytes;

use crate::{
    device::Subdevice,
    error::{err, Call, ResultExt},
    topo::{self, StreamingDesc, Topology},
    util::split_descriptors,
    Result,
};

const IAD_DEVICE_CLASS: u8 = 0xEF;
const IAD_DEVICE_SUBCLASS: u8 = 0x02;
const IAD_DEVICE_PROTOCOL: u8 = 0x01;

const VIDEO_IAD_CLASS: u8 = 0x0E;
const VIDEO_IAD_SUBCLASS: u8 = 0x03;
const VIDEO_IAD_PROTOCOL: u8 = 0x00;

const VIDEO_INTERF_CLASS: u8 = 0x0E;
const VIDEO_INTERF_SUBCLASS_CONTROL: u8 = 1;
const VIDEO_INTERF_SUBCLASS_STREAMING: u8 = 2;

const DESC_TYPE_IAD: u8 = 11;

const VENDOR_INTEL: u16 = 0x8086;

primitive_enum! {
    pub(crate) enum ProductId: u16 {
        F200 = 0x0a66,
        R200 = 0x0a80,
        Sr300 = 0x0aa5,
        Lr200 = 0x0abf,
        Zr300 = 0x0acb,
    }
}

impl ProductId {
    pub(crate) fn name(self) -> &'static str {
        match self {
            ProductId::F200 => "Intel RealSense F200",
            ProductId::R200 => "Intel RealSense R200",
            ProductId::Sr300 => "Intel RealSense SR300",
            ProductId::Lr200 => "Intel RealSense LR200",
            ProductId::Zr300 => "Intel RealSense ZR300",
        }
    }

    /// Subdevices of this model, in video-streaming-interface order.
    ///
    /// Motion modules are not listed; they do not transport data over a video streaming
    /// interface.
    pub(crate) fn subdevices(self) -> &'static [Subdevice] {
        match self {
            ProductId::F200 | ProductId::Sr300 => &[Subdevice::Depth, Subdevice::Color],
            ProductId::R200 | ProductId::Lr200 => {
                &[Subdevice::Depth, Subdevice::Color, Subdevice::Infrared]
            }
            ProductId::Zr300 => &[
                Subdevice::Depth,
                Subdevice::Color,
                Subdevice::Infrared,
                Subdevice::Fisheye,
            ],
        }
    }
}

#[derive(Debug, FromBytes)]
#[repr(C)]
#[allow(non_snake_case)]
struct InterfaceAssociationDescriptor {
    bLength: u8,
    bDescriptorType: u8,
    bFirstInterface: u8,
    bInterfaceCount: u8,
    bFunctionClass: u8,
    bFunctionSubClass: u8,
    bFunctionProtocol: u8,
    iFunction: u8,
}

/// One video function: a control interface and the streaming interfaces grouped with it.
pub(crate) struct VideoFunction {
    pub(crate) control_interface: u8,
    pub(crate) topology: Topology,
    pub(crate) streams: Vec<StreamingDesc>,
}

pub(crate) struct ProbedDevice {
    pub(crate) product: ProductId,
    pub(crate) functions: Vec<VideoFunction>,
}

/// Checks whether `device` is a supported depth camera and reads its descriptors.
///
/// Devices that cannot even report a device descriptor are skipped rather than failing the
/// whole enumeration; errors on a recognized camera do fail it.
pub(crate) fn probe(device: &Device<Context>) -> Result<Option<ProbedDevice>> {
    let desc = match device.device_descriptor() {
        Ok(desc) => desc,
        Err(e) => {
            log::debug!("skipping unreadable device: {}", e);
            return Ok(None);
        }
    };

    if desc.vendor_id() != VENDOR_INTEL {
        return Ok(None);
    }
    let product = match ProductId::from_raw(desc.product_id()) {
        Some(product) => product,
        None => {
            log::trace!(
                "{:04x}:{:04x} is not a known depth camera",
                desc.vendor_id(),
                desc.product_id()
            );
            return Ok(None);
        }
    };

    log::debug!(
        "found {:?} at bus {:03} address {:03}",
        product,
        device.bus_number(),
        device.address()
    );

    if desc.class_code() != IAD_DEVICE_CLASS
        || desc.sub_class_code() != IAD_DEVICE_SUBCLASS
        || desc.protocol_code() != IAD_DEVICE_PROTOCOL
    {
        log::warn!(
            "{:?} does not use the interface association device class, skipping",
            product
        );
        return Ok(None);
    }

    if desc.num_configurations() != 1 {
        log::warn!(
            "{:?} has {} configurations, expected exactly 1, skipping",
            product,
            desc.num_configurations()
        );
        return Ok(None);
    }

    let config = device
        .config_descriptor(0)
        .calling(Call::AccessDescriptors)?;

    let mut functions = Vec::new();
    for (ty, data) in split_descriptors(config.extra()) {
        if ty != DESC_TYPE_IAD {
            continue;
        }
        let iad = match InterfaceAssociationDescriptor::read_from_prefix(data) {
            Some(iad) => iad,
            None => {
                log::warn!("failed to parse IAD from {:x?}", data);
                continue;
            }
        };
        if iad.bFunctionClass != VIDEO_IAD_CLASS
            || iad.bFunctionSubClass != VIDEO_IAD_SUBCLASS
            || iad.bFunctionProtocol != VIDEO_IAD_PROTOCOL
            || iad.bInterfaceCount == 0
        {
            continue;
        }

        if let Some(func) = scan_function(&config, iad.bFirstInterface, iad.bInterfaceCount)? {
            functions.push(func);
        }
    }

    if functions.is_empty() {
        return err("device has no video function", Call::AccessDescriptors);
    }

    Ok(Some(ProbedDevice { product, functions }))
}

fn scan_function(config: &ConfigDescriptor, first: u8, count: u8) -> Result<Option<VideoFunction>> {
    let last = u16::from(first) + u16::from(count) - 1;

    let mut control = None;
    let mut streams = Vec::new();
    for interface in config.interfaces() {
        if interface.number() < first || u16::from(interface.number()) > last {
            continue;
        }
        let desc = match interface.descriptors().next() {
            Some(desc) => desc,
            None => continue,
        };
        if desc.class_code() != VIDEO_INTERF_CLASS {
            continue;
        }

        match desc.sub_class_code() {
            VIDEO_INTERF_SUBCLASS_CONTROL => {
                if control.is_some() {
                    return err(
                        "video function lists more than one control interface",
                        Call::AccessDescriptors,
                    );
                }
                control = Some((desc.interface_number(), topo::parse::parse_control_desc(&desc)?));
            }
            VIDEO_INTERF_SUBCLASS_STREAMING => {
                streams.push(topo::parse::parse_streaming_desc(&desc)?);
            }
            other => {
                log::debug!(
                    "interface {} uses unexpected video subclass {}, ignoring it",
                    interface.number(),
                    other
                );
            }
        }
    }

    streams.sort_by_key(|s| s.interface_number);

    match control {
        Some((control_interface, topology)) => Ok(Some(VideoFunction {
            control_interface,
            topology,
            streams,
        })),
        None => {
            log::warn!("video function without a control interface, ignoring it");
            Ok(None)
        }
    }
}

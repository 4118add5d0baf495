//! Video-class interface topology.
//!
//! The video control interface declares a chain of entities:
//! - *Input Terminals* provide video data (a camera terminal carries the imaging controls).
//! - *Units* process or reroute data between entities (a processing unit carries the image
//!   controls).
//! - *Output Terminals* hand the data to a streaming interface.
//!
//! Each streaming interface links back to an output terminal; walking the chain from there
//! tells us which units serve which subdevice.

pub(crate) mod parse;

use std::time::Duration;

use bitflags::bitflags;

use crate::stream::Format;

/// The control-interface topology, as declared by its class-specific descriptors.
#[derive(Debug)]
pub(crate) struct Topology {
    pub(crate) inputs: Vec<InputTerminalDesc>,
    pub(crate) outputs: Vec<OutputTerminalDesc>,
    pub(crate) units: Vec<UnitDesc>,
}

impl Topology {
    /// Walks the entity chain feeding the output terminal `terminal_link` and returns the
    /// processing unit and camera terminal on it, if any.
    pub(crate) fn chain_for(&self, terminal_link: u8) -> Chain<'_> {
        let mut chain = Chain {
            processing_unit: None,
            camera: None,
        };

        let mut next = self
            .outputs
            .iter()
            .find(|out| out.id == terminal_link)
            .map(|out| out.source);

        // Hop limit in case a broken descriptor declares a cycle.
        for _ in 0..32 {
            let id = match next {
                Some(id) => id,
                None => break,
            };
            next = None;

            if let Some(unit) = self.units.iter().find(|unit| unit.id() == id) {
                match unit {
                    UnitDesc::Processing(pu) => {
                        if chain.processing_unit.is_none() {
                            chain.processing_unit = Some(pu);
                        }
                        next = Some(pu.source);
                    }
                    UnitDesc::Selector(sel) => next = sel.inputs.first().copied(),
                    UnitDesc::Extension(ext) => next = ext.inputs.first().copied(),
                }
                continue;
            }

            if let Some(input) = self.inputs.iter().find(|input| input.id == id) {
                if let InputTerminalKind::Camera(cam) = &input.kind {
                    chain.camera = Some(cam);
                }
                break;
            }

            log::warn!("entity chain references unknown entity {}", id);
            break;
        }

        chain
    }
}

/// The entities serving one streaming interface.
pub(crate) struct Chain<'a> {
    pub(crate) processing_unit: Option<&'a ProcessingUnitDesc>,
    pub(crate) camera: Option<&'a CameraTerminalDesc>,
}

#[derive(Debug)]
pub(crate) struct InputTerminalDesc {
    pub(crate) id: u8,
    pub(crate) kind: InputTerminalKind,
}

#[derive(Debug)]
pub(crate) enum InputTerminalKind {
    Camera(CameraTerminalDesc),
    /// Misc. terminal without extra functionality.
    Other,
}

#[derive(Debug)]
pub(crate) struct CameraTerminalDesc {
    pub(crate) id: u8,
    pub(crate) controls: CameraControls,
}

#[derive(Debug)]
pub(crate) struct OutputTerminalDesc {
    pub(crate) id: u8,
    pub(crate) source: u8,
}

#[derive(Debug)]
pub(crate) enum UnitDesc {
    Processing(ProcessingUnitDesc),
    Selector(SelectorUnitDesc),
    Extension(ExtensionUnitDesc),
}

impl UnitDesc {
    fn id(&self) -> u8 {
        match self {
            UnitDesc::Processing(pu) => pu.id,
            UnitDesc::Selector(sel) => sel.id,
            UnitDesc::Extension(ext) => ext.id,
        }
    }
}

#[derive(Debug)]
pub(crate) struct ProcessingUnitDesc {
    pub(crate) id: u8,
    pub(crate) source: u8,
    pub(crate) controls: ProcessingUnitControls,
}

#[derive(Debug)]
pub(crate) struct SelectorUnitDesc {
    pub(crate) id: u8,
    pub(crate) inputs: Vec<u8>,
}

#[derive(Debug)]
pub(crate) struct ExtensionUnitDesc {
    pub(crate) id: u8,
    pub(crate) inputs: Vec<u8>,
}

bitflags! {
    pub(crate) struct ProcessingUnitControls: u32 {
        const BRIGHTNESS                     = 1 << 0;
        const CONTRAST                       = 1 << 1;
        const HUE                            = 1 << 2;
        const SATURATION                     = 1 << 3;
        const SHARPNESS                      = 1 << 4;
        const GAMMA                          = 1 << 5;
        const WHITE_BALANCE_TEMPERATURE      = 1 << 6;
        const WHITE_BALANCE_COMPONENT        = 1 << 7;
        const BACKLIGHT_COMPENSATION         = 1 << 8;
        const GAIN                           = 1 << 9;
        const POWER_LINE_FREQUENCY           = 1 << 10;
        const HUE_AUTO                       = 1 << 11;
        const WHITE_BALANCE_TEMPERATURE_AUTO = 1 << 12;
        const WHITE_BALANCE_COMPONENT_AUTO   = 1 << 13;
        const DIGITAL_MULTIPLIER             = 1 << 14;
        const DIGITAL_MULTIPLIER_LIMIT       = 1 << 15;
        const ANALOG_VIDEO_STANDARD          = 1 << 16;
        const ANALOG_VIDEO_LOCK_STATUS       = 1 << 17;
        const CONTRAST_AUTO                  = 1 << 18;
    }
}

bitflags! {
    pub(crate) struct CameraControls: u32 {
        const SCANNING_MODE = 1 << 0;
        const AUTO_EXPOSURE_MODE = 1 << 1;
        const AUTO_EXPOSURE_PRIORITY = 1 << 2;
        const EXPOSURE_TIME_ABS = 1 << 3;
        const EXPOSURE_TIME_REL = 1 << 4;
        const FOCUS_ABS = 1 << 5;
        const FOCUS_REL = 1 << 6;
        const IRIS_ABS = 1 << 7;
        const IRIS_REL = 1 << 8;
        const ZOOM_ABS = 1 << 9;
        const ZOOM_REL = 1 << 10;
        const PAN_TILT_ABS = 1 << 11;
        const PAN_TILT_REL = 1 << 12;
        const ROLL_ABS = 1 << 13;
        const ROLL_REL = 1 << 14;

        const FOCUS_AUTO = 1 << 17;
        const PRIVACY = 1 << 18;
    }
}

/// A streaming interface: its terminal link and the formats it can carry.
#[derive(Debug)]
pub(crate) struct StreamingDesc {
    pub(crate) interface_number: u8,
    pub(crate) terminal_link: u8,
    pub(crate) formats: Vec<FormatDesc>,
}

/// One format descriptor with the frame descriptors that followed it.
#[derive(Debug)]
pub(crate) struct FormatDesc {
    /// `None` when the format GUID is not one we know how to name.
    pub(crate) format: Option<Format>,
    pub(crate) frames: Vec<FrameDesc>,
}

#[derive(Debug)]
pub(crate) struct FrameDesc {
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) intervals: Vec<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology() -> Topology {
        Topology {
            inputs: vec![InputTerminalDesc {
                id: 1,
                kind: InputTerminalKind::Camera(CameraTerminalDesc {
                    id: 1,
                    controls: CameraControls::EXPOSURE_TIME_ABS,
                }),
            }],
            outputs: vec![OutputTerminalDesc { id: 4, source: 3 }],
            units: vec![
                UnitDesc::Processing(ProcessingUnitDesc {
                    id: 3,
                    source: 2,
                    controls: ProcessingUnitControls::BRIGHTNESS,
                }),
                UnitDesc::Selector(SelectorUnitDesc {
                    id: 2,
                    inputs: vec![1],
                }),
            ],
        }
    }

    #[test]
    fn walks_chain_through_selector() {
        let topo = topology();
        let chain = topo.chain_for(4);
        assert_eq!(chain.processing_unit.map(|pu| pu.id), Some(3));
        assert_eq!(chain.camera.map(|cam| cam.id), Some(1));
    }

    #[test]
    fn unknown_terminal_link_yields_empty_chain() {
        let topo = topology();
        let chain = topo.chain_for(99);
        assert!(chain.processing_unit.is_none());
        assert!(chain.camera.is_none());
    }
}

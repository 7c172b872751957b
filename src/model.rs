use crate::tape::TapeGeometry;

/// USB vendor id of DYMO (Sanford L.P.).
pub const DYMO_VID: u16 = 0x0922;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    LabelManagerPnp,
}

impl Model {
    pub const ALL: [Model; 1] = [Self::LabelManagerPnp];

    /// Product id in printer mode. The PnP enumerates as 0x1001 (mass storage)
    /// until it is switched, which is a driver installation concern.
    pub fn pid(&self) -> u16 {
        match self {
            Self::LabelManagerPnp => 0x1002,
        }
    }

    pub fn from_pid(pid: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|model| model.pid() == pid)
    }

    /// Number of dots on the print head.
    pub fn head_dots(&self) -> u32 {
        match self {
            Self::LabelManagerPnp => 64,
        }
    }

    pub fn tape_geometry(&self) -> TapeGeometry {
        match self {
            Self::LabelManagerPnp => TapeGeometry::label_manager_pnp(),
        }
    }
}

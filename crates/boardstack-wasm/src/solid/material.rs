//! Named surface finishes and their assignment to layer roles.

use serde::Serialize;

use crate::layer::LayerRole;

/// Default substrate preset.
pub const DEFAULT_BOARD_FINISH: &str = "board_green";
/// Default copper preset.
pub const DEFAULT_COPPER_FINISH: &str = "copper";
/// Default silkscreen preset.
pub const DEFAULT_SILK_FINISH: &str = "silk_white2";

/// Which family of presets a finish belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FinishKind {
    /// Substrate / solder mask.
    Board,
    /// Exposed copper.
    Copper,
    /// Silkscreen ink.
    Silk,
}

impl FinishKind {
    /// Lower-case name used in messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::Copper => "copper",
            Self::Silk => "silk",
        }
    }

    /// Finish family for a layer role. Drill layers carry no finish.
    pub const fn for_role(role: LayerRole) -> Option<Self> {
        match role {
            LayerRole::Outline => Some(Self::Board),
            LayerRole::BottomCopper | LayerRole::TopCopper => Some(Self::Copper),
            LayerRole::BottomSilk | LayerRole::TopSilk => Some(Self::Silk),
            LayerRole::Drill => None,
        }
    }
}

/// A shading preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finish {
    /// Preset name.
    pub name: &'static str,
    /// Family.
    pub kind: FinishKind,
    /// Base colour, linear RGBA.
    pub color: [f32; 4],
    /// PBR metallic factor.
    pub metallic: f32,
    /// PBR roughness factor.
    pub roughness: f32,
}

const fn substrate(name: &'static str, color: [f32; 4]) -> Finish {
    Finish {
        name,
        kind: FinishKind::Board,
        color,
        metallic: 0.234,
        roughness: 0.202,
    }
}

const fn copper(name: &'static str, color: [f32; 4]) -> Finish {
    Finish {
        name,
        kind: FinishKind::Copper,
        color,
        metallic: 1.0,
        roughness: 0.2,
    }
}

const fn silk(name: &'static str, color: [f32; 4]) -> Finish {
    Finish {
        name,
        kind: FinishKind::Silk,
        color,
        metallic: 0.0,
        roughness: 0.2,
    }
}

/// Every preset, defaults first within each family.
pub const PRESETS: [Finish; 12] = [
    substrate("board_green", [0.062, 0.296, 0.020, 0.99]),
    substrate("board_red", [0.445, 0.020, 0.015, 0.99]),
    substrate("board_blue", [0.013, 0.063, 0.376, 0.99]),
    substrate("board_white", [0.855, 0.855, 0.855, 0.99]),
    substrate("board_black", [0.012, 0.012, 0.012, 0.99]),
    substrate("board_yellow", [0.799, 0.651, 0.022, 0.99]),
    substrate("board_purple", [0.216, 0.027, 0.332, 0.99]),
    copper("copper", [0.800, 0.457, 0.219, 1.0]),
    copper("copper2", [0.391, 0.521, 0.627, 1.0]),
    silk("silk_white2", [0.930, 0.930, 0.930, 1.0]),
    silk("silk_white", [0.513, 0.627, 0.552, 1.0]),
    silk("silk_black", [0.020, 0.020, 0.020, 1.0]),
];

/// Look up a preset by family and name.
pub fn finish_by_name(kind: FinishKind, name: &str) -> Option<Finish> {
    PRESETS
        .iter()
        .find(|finish| finish.kind == kind && finish.name == name)
        .copied()
}

/// Default preset of a family.
pub fn default_finish(kind: FinishKind) -> Finish {
    let name = match kind {
        FinishKind::Board => DEFAULT_BOARD_FINISH,
        FinishKind::Copper => DEFAULT_COPPER_FINISH,
        FinishKind::Silk => DEFAULT_SILK_FINISH,
    };
    finish_by_name(kind, name).unwrap_or(substrate(DEFAULT_BOARD_FINISH, [1.0; 4]))
}

/// Finishes chosen for one import.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinishSet {
    /// Substrate.
    pub board: Finish,
    /// Copper.
    pub copper: Finish,
    /// Silkscreen.
    pub silk: Finish,
}

impl FinishSet {
    /// Finish for a role, `None` for drills.
    pub const fn for_role(&self, role: LayerRole) -> Option<Finish> {
        match FinishKind::for_role(role) {
            Some(FinishKind::Board) => Some(self.board),
            Some(FinishKind::Copper) => Some(self.copper),
            Some(FinishKind::Silk) => Some(self.silk),
            None => None,
        }
    }
}

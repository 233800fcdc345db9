//! Layer roles and file-name discovery.

use serde::Serialize;

/// The fixed set of layers a board import understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerRole {
    /// Board outline (substrate footprint).
    Outline,
    /// Copper on the underside.
    BottomCopper,
    /// Copper on the top side.
    TopCopper,
    /// Silkscreen on the underside.
    BottomSilk,
    /// Silkscreen on the top side.
    TopSilk,
    /// Excellon drill file.
    Drill,
}

impl LayerRole {
    /// Non-drill roles in stack order, bottom of the list first.
    pub const STACK: [Self; 5] = [
        Self::Outline,
        Self::BottomCopper,
        Self::TopCopper,
        Self::BottomSilk,
        Self::TopSilk,
    ];

    /// Classify a file name by its suffix. Matching is case-sensitive.
    pub fn from_filename(name: &str) -> Option<Self> {
        const SUFFIXES: [(&str, LayerRole); 6] = [
            (".gm1", LayerRole::Outline),
            (".gbl", LayerRole::BottomCopper),
            (".gtl", LayerRole::TopCopper),
            (".gbo", LayerRole::BottomSilk),
            (".gto", LayerRole::TopSilk),
            ("_drill.txt", LayerRole::Drill),
        ];

        SUFFIXES
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map(|(_, role)| *role)
    }

    /// Short human-readable name used in progress text and logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Outline => "outline",
            Self::BottomCopper => "bottom copper",
            Self::TopCopper => "top copper",
            Self::BottomSilk => "bottom silkscreen",
            Self::TopSilk => "top silkscreen",
            Self::Drill => "drill",
        }
    }

    /// Whether this role is parsed as a vector plot rather than a drill list.
    pub const fn is_plot(self) -> bool {
        !matches!(self, Self::Drill)
    }
}

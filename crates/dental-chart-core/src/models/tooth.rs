//! Tooth catalog and surface-section models.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A tooth number that is not part of the chart catalog.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Unknown tooth number: {0}")]
pub struct UnknownTooth(pub u32);

/// FDI tooth number restricted to the chart catalog.
///
/// A `ToothId` can only be obtained from the catalog or through
/// [`ToothId::new`], so every value names a tooth drawn on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u8")]
pub struct ToothId(u8);

/// Upper primary teeth, patient right to left.
pub const TOP_PRIMARY: [ToothId; 10] = [
    ToothId(55), ToothId(54), ToothId(53), ToothId(52), ToothId(51),
    ToothId(61), ToothId(62), ToothId(63), ToothId(64), ToothId(65),
];

/// Upper permanent teeth, patient right to left.
pub const TOP_PERMANENT: [ToothId; 16] = [
    ToothId(18), ToothId(17), ToothId(16), ToothId(15), ToothId(14), ToothId(13), ToothId(12), ToothId(11),
    ToothId(21), ToothId(22), ToothId(23), ToothId(24), ToothId(25), ToothId(26), ToothId(27), ToothId(28),
];

/// Lower permanent teeth, patient right to left.
pub const BOTTOM_PERMANENT: [ToothId; 16] = [
    ToothId(48), ToothId(47), ToothId(46), ToothId(45), ToothId(44), ToothId(43), ToothId(42), ToothId(41),
    ToothId(31), ToothId(32), ToothId(33), ToothId(34), ToothId(35), ToothId(36), ToothId(37), ToothId(38),
];

/// Lower primary teeth, patient right to left.
pub const BOTTOM_PRIMARY: [ToothId; 10] = [
    ToothId(85), ToothId(84), ToothId(83), ToothId(82), ToothId(81),
    ToothId(71), ToothId(72), ToothId(73), ToothId(74), ToothId(75),
];

/// Number of teeth in the catalog.
pub const CATALOG_SIZE: usize =
    TOP_PRIMARY.len() + TOP_PERMANENT.len() + BOTTOM_PERMANENT.len() + BOTTOM_PRIMARY.len();

const ALL_TEETH: [ToothId; CATALOG_SIZE] = concat_catalog();

const fn concat_catalog() -> [ToothId; CATALOG_SIZE] {
    let mut out = [ToothId(0); CATALOG_SIZE];
    let mut i = 0;
    let mut j = 0;
    while j < TOP_PRIMARY.len() {
        out[i] = TOP_PRIMARY[j];
        i += 1;
        j += 1;
    }
    j = 0;
    while j < TOP_PERMANENT.len() {
        out[i] = TOP_PERMANENT[j];
        i += 1;
        j += 1;
    }
    j = 0;
    while j < BOTTOM_PERMANENT.len() {
        out[i] = BOTTOM_PERMANENT[j];
        i += 1;
        j += 1;
    }
    j = 0;
    while j < BOTTOM_PRIMARY.len() {
        out[i] = BOTTOM_PRIMARY[j];
        i += 1;
        j += 1;
    }
    out
}

/// All catalog teeth in canonical order:
/// top-primary, top-permanent, bottom-permanent, bottom-primary.
pub fn all_tooth_ids() -> &'static [ToothId] {
    &ALL_TEETH
}

/// One row of the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToothGroup {
    TopPrimary,
    TopPermanent,
    BottomPermanent,
    BottomPrimary,
}

impl ToothGroup {
    /// Chart rows in display order.
    pub const ALL: [ToothGroup; 4] = [
        ToothGroup::TopPrimary,
        ToothGroup::TopPermanent,
        ToothGroup::BottomPermanent,
        ToothGroup::BottomPrimary,
    ];

    /// Teeth in this row, in anatomical left-to-right order.
    pub fn teeth(self) -> &'static [ToothId] {
        match self {
            ToothGroup::TopPrimary => &TOP_PRIMARY,
            ToothGroup::TopPermanent => &TOP_PERMANENT,
            ToothGroup::BottomPermanent => &BOTTOM_PERMANENT,
            ToothGroup::BottomPrimary => &BOTTOM_PRIMARY,
        }
    }

    /// Whether this row holds deciduous teeth.
    pub fn is_primary(self) -> bool {
        matches!(self, ToothGroup::TopPrimary | ToothGroup::BottomPrimary)
    }
}

impl ToothId {
    /// Look up a tooth number in the catalog.
    pub fn new(number: u32) -> Option<Self> {
        ALL_TEETH.iter().copied().find(|t| u32::from(t.0) == number)
    }

    /// FDI number of this tooth.
    pub fn number(self) -> u8 {
        self.0
    }

    /// Position of this tooth in canonical catalog order.
    pub fn catalog_index(self) -> usize {
        ALL_TEETH
            .iter()
            .position(|t| *t == self)
            .unwrap_or(CATALOG_SIZE)
    }

    /// Chart row this tooth is drawn in (derived from the FDI quadrant digit).
    pub fn group(self) -> ToothGroup {
        match self.0 / 10 {
            5 | 6 => ToothGroup::TopPrimary,
            1 | 2 => ToothGroup::TopPermanent,
            4 | 3 => ToothGroup::BottomPermanent,
            _ => ToothGroup::BottomPrimary,
        }
    }

    /// Element id used by the chart renderer for this tooth's container.
    pub fn element_id(self) -> String {
        format!("tooth-{}", self.0)
    }
}

impl TryFrom<u32> for ToothId {
    type Error = UnknownTooth;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        ToothId::new(value).ok_or(UnknownTooth(value))
    }
}

impl From<ToothId> for u8 {
    fn from(id: ToothId) -> Self {
        id.0
    }
}

impl fmt::Display for ToothId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the five markable zones of a tooth diagram.
///
/// The diagram is a rotated quincunx: a central circle surrounded by four arcs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceSection {
    Center,
    Top,
    Right,
    Bottom,
    Left,
}

impl SurfaceSection {
    /// Canonical serialization order.
    pub const CANONICAL: [SurfaceSection; 5] = [
        SurfaceSection::Center,
        SurfaceSection::Right,
        SurfaceSection::Bottom,
        SurfaceSection::Left,
        SurfaceSection::Top,
    ];

    /// Lowercase name, also used as the diagram element id.
    pub fn as_str(self) -> &'static str {
        match self {
            SurfaceSection::Center => "center",
            SurfaceSection::Top => "top",
            SurfaceSection::Right => "right",
            SurfaceSection::Bottom => "bottom",
            SurfaceSection::Left => "left",
        }
    }

    /// Parse a section name (case-insensitive, surrounding whitespace ignored).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::CANONICAL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name))
    }

    fn bit(self) -> u8 {
        match self {
            SurfaceSection::Center => 1,
            SurfaceSection::Right => 1 << 1,
            SurfaceSection::Bottom => 1 << 2,
            SurfaceSection::Left => 1 << 3,
            SurfaceSection::Top => 1 << 4,
        }
    }
}

impl fmt::Display for SurfaceSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of active surface sections. Iterates in canonical order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SectionSet(u8);

impl SectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn contains(&self, section: SurfaceSection) -> bool {
        self.0 & section.bit() != 0
    }

    pub fn insert(&mut self, section: SurfaceSection) {
        self.0 |= section.bit();
    }

    pub fn remove(&mut self, section: SurfaceSection) {
        self.0 &= !section.bit();
    }

    /// Flip membership. Returns whether the section is now active.
    pub fn toggle(&mut self, section: SurfaceSection) -> bool {
        self.0 ^= section.bit();
        self.contains(section)
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Active sections in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = SurfaceSection> + '_ {
        SurfaceSection::CANONICAL
            .into_iter()
            .filter(move |s| self.contains(*s))
    }

    pub fn to_vec(&self) -> Vec<SurfaceSection> {
        self.iter().collect()
    }
}

impl FromIterator<SurfaceSection> for SectionSet {
    fn from_iter<I: IntoIterator<Item = SurfaceSection>>(iter: I) -> Self {
        let mut set = SectionSet::new();
        for section in iter {
            set.insert(section);
        }
        set
    }
}

/// Free-text field of a tooth record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToothTextField {
    /// Treatment performed in this procedure
    TreatmentDone,
    /// Condition found before treatment
    ExistingCondition,
}

use serde::Deserialize;

/// The three orthogonal planes a volume is cut along.
///
/// Volume axes are (x, y, z) in stored voxel order. Each orientation holds
/// one axis fixed and spans the other two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    Sagittal,
    Coronal,
    Axial,
}

impl Orientation {
    /// Column order used by every figure row.
    pub const COLUMNS: [Orientation; 3] = [
        Orientation::Sagittal,
        Orientation::Coronal,
        Orientation::Axial,
    ];

    /// Axis held constant by this plane
    pub fn fixed_axis(self) -> usize {
        match self {
            Orientation::Sagittal => 0,
            Orientation::Coronal => 1,
            Orientation::Axial => 2,
        }
    }

    /// Axes spanning the plane, lowest first. The first becomes the
    /// displayed columns, the second the displayed rows.
    pub fn spanned_axes(self) -> (usize, usize) {
        match self {
            Orientation::Sagittal => (1, 2),
            Orientation::Coronal => (0, 2),
            Orientation::Axial => (0, 1),
        }
    }

    /// Value passed to `mrview -plane` to look at this plane.
    pub fn camera_plane(self) -> u8 {
        self.fixed_axis() as u8
    }

    pub fn from_camera_plane(plane: u8) -> Option<Self> {
        match plane {
            0 => Some(Orientation::Sagittal),
            1 => Some(Orientation::Coronal),
            2 => Some(Orientation::Axial),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    #[default]
    Bilinear,
    // Nearest neighbour
    None,
}

/// Order in which the slices of a DICOM series are stacked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}

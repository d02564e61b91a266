use std::ops::BitOr;

use crate::geometry::{Point, Rectangle};

use super::{DeviceId, SurfaceId};

/// Edge set of an interactive resize, using the xdg-shell bit values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ResizeEdges(u32);

impl ResizeEdges {
    pub const NONE: ResizeEdges = ResizeEdges(0);
    pub const TOP: ResizeEdges = ResizeEdges(1);
    pub const BOTTOM: ResizeEdges = ResizeEdges(2);
    pub const LEFT: ResizeEdges = ResizeEdges(4);
    pub const RIGHT: ResizeEdges = ResizeEdges(8);
    pub const TOP_LEFT: ResizeEdges = ResizeEdges(5);
    pub const BOTTOM_LEFT: ResizeEdges = ResizeEdges(6);
    pub const TOP_RIGHT: ResizeEdges = ResizeEdges(9);
    pub const BOTTOM_RIGHT: ResizeEdges = ResizeEdges(10);

    const ALL: u32 = 0xf;

    pub fn from_bits(bits: u32) -> Self {
        ResizeEdges(bits & Self::ALL)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: ResizeEdges) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Dragging the top or left edge keeps the opposite side fixed, which
    /// shifts the surface origin.
    pub fn moves_origin(self) -> bool {
        self.contains(Self::TOP) || self.contains(Self::LEFT)
    }
}

impl BitOr for ResizeEdges {
    type Output = ResizeEdges;

    fn bitor(self, other: ResizeEdges) -> ResizeEdges {
        ResizeEdges(self.0 | other.0)
    }
}

/// Interactive move. Positions are applied directly, without a configure
/// round-trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveGrab {
    pub owner: SurfaceId,
    pub device: DeviceId,
    pub offset: Point,
}

impl MoveGrab {
    pub fn new(owner: SurfaceId, device: DeviceId, offset: Point) -> Self {
        Self { owner, device, offset }
    }

    pub fn position_for(&self, pointer: Point) -> Point {
        pointer - self.offset
    }
}

/// Interactive resize. Every motion turns into a configure request the
/// client has to acknowledge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResizeGrab {
    pub owner: SurfaceId,
    pub device: DeviceId,
    pub start: Point,
    pub edges: ResizeEdges,
    pub origin: Rectangle,
}

impl ResizeGrab {
    pub fn new(
        owner: SurfaceId,
        device: DeviceId,
        start: Point,
        edges: ResizeEdges,
        origin: Rectangle,
    ) -> Self {
        Self {
            owner,
            device,
            start,
            edges,
            origin,
        }
    }

    pub fn geometry_for(&self, pointer: Point) -> Rectangle {
        let delta = pointer - self.start;
        let origin = self.origin;
        let mut geometry = origin;

        if self.edges.contains(ResizeEdges::TOP) {
            geometry.height = (origin.height - delta.y).max(1);
            geometry.y = origin.bottom() - geometry.height;
        } else if self.edges.contains(ResizeEdges::BOTTOM) {
            geometry.height = (origin.height + delta.y).max(1);
        }

        if self.edges.contains(ResizeEdges::LEFT) {
            geometry.width = (origin.width - delta.x).max(1);
            geometry.x = origin.right() - geometry.width;
        } else if self.edges.contains(ResizeEdges::RIGHT) {
            geometry.width = (origin.width + delta.x).max(1);
        }

        geometry
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grab {
    Move(MoveGrab),
    Resize(ResizeGrab),
}

impl Grab {
    pub fn owner(&self) -> SurfaceId {
        match self {
            Grab::Move(grab) => grab.owner,
            Grab::Resize(grab) => grab.owner,
        }
    }

    pub fn device(&self) -> DeviceId {
        match self {
            Grab::Move(grab) => grab.device,
            Grab::Resize(grab) => grab.device,
        }
    }
}

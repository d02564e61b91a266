use crate::geometry::Point;

use super::host::ShellHost;
use super::{OutputId, SurfaceId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PanelRole {
    Normal,
    Desktop,
    Panel,
    OnScreenDisplay,
    Notification,
    Tooltip,
    Lock,
}

impl PanelRole {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(PanelRole::Normal),
            1 => Some(PanelRole::Desktop),
            2 => Some(PanelRole::Panel),
            3 => Some(PanelRole::OnScreenDisplay),
            4 => Some(PanelRole::Notification),
            5 => Some(PanelRole::Tooltip),
            6 => Some(PanelRole::Lock),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PanelRole::Normal => "normal",
            PanelRole::Desktop => "desktop",
            PanelRole::Panel => "panel",
            PanelRole::OnScreenDisplay => "osd",
            PanelRole::Notification => "notification",
            PanelRole::Tooltip => "tooltip",
            PanelRole::Lock => "lock",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PanelFlags(u32);

impl PanelFlags {
    pub const AUTO_HIDE: PanelFlags = PanelFlags(0x1);
    pub const STAYS_ON_TOP: PanelFlags = PanelFlags(0x2);
    pub const WINDOWS_CAN_COVER: PanelFlags = PanelFlags(0x4);
    pub const WINDOWS_GO_BELOW: PanelFlags = PanelFlags(0x8);

    const KNOWN: [PanelFlags; 4] = [
        Self::AUTO_HIDE,
        Self::STAYS_ON_TOP,
        Self::WINDOWS_CAN_COVER,
        Self::WINDOWS_GO_BELOW,
    ];

    pub fn empty() -> Self {
        PanelFlags(0)
    }

    /// Wire bits are taken one by one; bits without a meaning are dropped.
    pub fn from_wire(bits: u32) -> Self {
        let mut flags = PanelFlags::empty();
        for flag in Self::KNOWN {
            if bits & flag.0 != 0 {
                flags.0 |= flag.0;
            }
        }
        flags
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: PanelFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScreenEdge {
    #[default]
    None,
    Top,
    Bottom,
    Left,
    Right,
}

impl ScreenEdge {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(ScreenEdge::None),
            1 => Some(ScreenEdge::Top),
            2 => Some(ScreenEdge::Bottom),
            3 => Some(ScreenEdge::Left),
            4 => Some(ScreenEdge::Right),
            _ => None,
        }
    }
}

/// What the layout collaborator gets to see of a panel surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PanelPlacement {
    pub role: Option<PanelRole>,
    pub flags: PanelFlags,
    pub screen_edge: ScreenEdge,
    pub position: Option<Point>,
    pub output: Option<OutputId>,
}

/// Already-decoded panel surface requests, carrying raw wire codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelRequest {
    SetOutput(Option<OutputId>),
    SetPosition(Point),
    SetRole(u32),
    SetFlags(u32),
    SetScreenEdge(u32),
}

#[derive(Debug)]
pub struct PanelSurface {
    surface: SurfaceId,
    placement: PanelPlacement,
    deleting: bool,
}

impl PanelSurface {
    pub fn new(surface: SurfaceId) -> Self {
        Self {
            surface,
            placement: PanelPlacement::default(),
            deleting: false,
        }
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn role(&self) -> Option<PanelRole> {
        self.placement.role
    }

    pub fn flags(&self) -> PanelFlags {
        self.placement.flags
    }

    pub fn screen_edge(&self) -> ScreenEdge {
        self.placement.screen_edge
    }

    pub fn position(&self) -> Option<Point> {
        self.placement.position
    }

    pub fn output(&self) -> Option<OutputId> {
        self.placement.output
    }

    pub fn placement(&self) -> &PanelPlacement {
        &self.placement
    }

    pub fn is_deleting(&self) -> bool {
        self.deleting
    }

    pub(crate) fn mark_deleting(&mut self) {
        self.deleting = true;
    }

    /// Applies one request. Returns false when the request was ignored.
    pub fn handle(&mut self, request: PanelRequest, host: &mut dyn ShellHost) -> bool {
        if self.deleting {
            log::debug!("[panel] Ignoring {:?} on surface {} pending deletion", request, self.surface);
            return false;
        }

        match request {
            PanelRequest::SetOutput(output) => self.placement.output = output,
            PanelRequest::SetPosition(position) => self.placement.position = Some(position),
            PanelRequest::SetRole(code) => match PanelRole::from_code(code) {
                Some(role) => {
                    log::debug!("[panel] Surface {} role {}", self.surface, role.as_str());
                    self.placement.role = Some(role);
                }
                None => {
                    log::warn!("[panel] Unknown role {} for surface {}", code, self.surface);
                    return false;
                }
            },
            PanelRequest::SetFlags(bits) => self.placement.flags = PanelFlags::from_wire(bits),
            PanelRequest::SetScreenEdge(code) => match ScreenEdge::from_code(code) {
                Some(edge) => self.placement.screen_edge = edge,
                None => {
                    log::warn!("[panel] Unknown screen edge {} for surface {}", code, self.surface);
                    return false;
                }
            },
        }

        host.place_panel(self.surface, &self.placement);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::testing::TestHost;

    #[test]
    fn test_role_codes() {
        assert_eq!(PanelRole::from_code(2), Some(PanelRole::Panel));
        assert_eq!(PanelRole::from_code(6), Some(PanelRole::Lock));
        assert_eq!(PanelRole::from_code(7), None);
    }

    #[test]
    fn test_flags_parsed_bit_by_bit() {
        let flags = PanelFlags::from_wire(0x1 | 0x8 | 0x100);
        assert!(flags.contains(PanelFlags::AUTO_HIDE));
        assert!(flags.contains(PanelFlags::WINDOWS_GO_BELOW));
        assert!(!flags.contains(PanelFlags::STAYS_ON_TOP));
        assert_eq!(flags.bits(), 0x9);
    }

    #[test]
    fn test_unknown_role_is_ignored() {
        let mut host = TestHost::new();
        let mut panel = PanelSurface::new(4);

        assert!(!panel.handle(PanelRequest::SetRole(42), &mut host));
        assert_eq!(panel.role(), None);
        assert!(host.panels.is_empty());
    }

    #[test]
    fn test_accepted_changes_reach_layout() {
        let mut host = TestHost::new();
        let mut panel = PanelSurface::new(4);

        assert!(panel.handle(PanelRequest::SetRole(2), &mut host));
        assert!(panel.handle(PanelRequest::SetScreenEdge(2), &mut host));
        assert!(panel.handle(PanelRequest::SetPosition(Point::new(0, 1050)), &mut host));

        let (surface, placement) = host.panels.last().copied().unwrap();
        assert_eq!(surface, 4);
        assert_eq!(placement.role, Some(PanelRole::Panel));
        assert_eq!(placement.screen_edge, ScreenEdge::Bottom);
        assert_eq!(placement.position, Some(Point::new(0, 1050)));
    }

    #[test]
    fn test_requests_ignored_while_deleting() {
        let mut host = TestHost::new();
        let mut panel = PanelSurface::new(4);
        panel.mark_deleting();

        assert!(!panel.handle(PanelRequest::SetFlags(1), &mut host));
        assert!(panel.flags().is_empty());
    }
}

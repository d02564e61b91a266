//! Window-management core of the shell protocols.
//!
//! Everything in here is transport agnostic: requests arrive as already
//! decoded calls, and every effect on the outside world (configure events,
//! pointer grabs, view placement) goes through [`host::ShellHost`].

pub mod grab;
pub mod host;
pub mod panel;
pub mod popup;
pub mod registry;
pub mod surface;

#[cfg(test)]
pub(crate) mod testing;

pub type SurfaceId = u64;
pub type ViewId = u64;
pub type OutputId = u64;
pub type DeviceId = u32;
pub type Serial = u32;

pub use grab::{Grab, MoveGrab, ResizeEdges, ResizeGrab};
pub use host::{Configure, ConfigureState, ShellHost};
pub use panel::{PanelFlags, PanelPlacement, PanelRequest, PanelRole, PanelSurface, ScreenEdge};
pub use popup::{PopupGrabCoordinator, PopupParams};
pub use registry::{Shell, SurfaceOp, XDG_SHELL_VERSION};
pub use surface::{Changes, ShellSurface, SurfaceRole, WindowState};

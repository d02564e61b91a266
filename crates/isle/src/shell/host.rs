//! Collaborators the shell core consumes from the surrounding compositor.

use crate::geometry::{Point, Rectangle, Size};

use super::panel::PanelPlacement;
use super::surface::WindowState;
use super::{DeviceId, OutputId, Serial, SurfaceId, ViewId};

/// Toplevel state flags in the order they are sent to clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigureState {
    Maximized,
    Fullscreen,
    Resizing,
    Activated,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Configure {
    pub size: Size,
    pub states: Vec<ConfigureState>,
    pub serial: Serial,
}

pub trait Outputs {
    fn primary_output(&self) -> Option<OutputId>;
    /// Usable area of the output, with panel reservations already removed.
    fn available_geometry(&self, output: OutputId) -> Option<Rectangle>;
    fn full_geometry(&self, output: OutputId) -> Option<Rectangle>;
}

pub trait Views {
    fn create_view(&mut self, surface: SurfaceId, output: Option<OutputId>) -> ViewId;
    fn destroy_view(&mut self, view: ViewId);
    fn views_of(&self, surface: SurfaceId) -> Vec<ViewId>;
    fn view_output(&self, view: ViewId) -> Option<OutputId>;
    /// The output holding the biggest part of the view.
    fn main_output(&self, view: ViewId) -> Option<OutputId>;
    fn view_has_focus(&self, view: ViewId) -> bool;
    fn set_view_visible(&mut self, view: ViewId, visible: bool);
    fn place_panel(&mut self, surface: SurfaceId, placement: &PanelPlacement);
    fn forget_panel(&mut self, surface: SurfaceId);
}

pub trait SurfaceTree {
    fn surface_exists(&self, surface: SurfaceId) -> bool;
    fn global_geometry(&self, surface: SurfaceId) -> Rectangle;
    fn set_global_position(&mut self, surface: SurfaceId, position: Point);
    fn set_visual_state(&mut self, surface: SurfaceId, state: WindowState);
    fn transient_parent(&self, surface: SurfaceId) -> Option<SurfaceId>;
    fn set_transient_parent(&mut self, surface: SurfaceId, parent: Option<SurfaceId>);
    fn transient_offset(&self, surface: SurfaceId) -> Point;
    fn set_transient_offset(&mut self, surface: SurfaceId, offset: Point);
}

pub trait Pointers {
    fn default_device(&self) -> Option<DeviceId>;
    fn pointer_position(&self, device: DeviceId) -> Option<Point>;
    /// Redirect the device's pointer events to the shell until `end_grab`.
    fn start_grab(&mut self, device: DeviceId);
    fn end_grab(&mut self, device: DeviceId);
}

pub trait Transport {
    fn next_serial(&mut self) -> Serial;
    fn send_configure(&mut self, surface: SurfaceId, configure: &Configure);
    fn send_popup_configure(&mut self, surface: SurfaceId, geometry: Rectangle, serial: Serial);
    fn send_popup_done(&mut self, surface: SurfaceId);
    fn send_close(&mut self, surface: SurfaceId);
    fn send_ping(&mut self, surface: SurfaceId, serial: Serial);
}

pub trait ShellHost: Outputs + Views + SurfaceTree + Pointers + Transport {}

impl<T: Outputs + Views + SurfaceTree + Pointers + Transport> ShellHost for T {}

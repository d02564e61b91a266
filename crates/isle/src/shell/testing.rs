//! Recording host used by the shell unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::geometry::{Point, Rectangle, Size};

use super::host::{Configure, Outputs, Pointers, SurfaceTree, Transport, Views};
use super::panel::PanelPlacement;
use super::surface::WindowState;
use super::{DeviceId, OutputId, Serial, SurfaceId, ViewId};

#[derive(Clone, Copy, Debug)]
pub(crate) struct TestOutput {
    pub full: Rectangle,
    pub available: Rectangle,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct TestSurface {
    pub geometry: Rectangle,
    pub visual: WindowState,
    pub parent: Option<SurfaceId>,
    pub offset: Point,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct TestView {
    pub surface: SurfaceId,
    pub output: Option<OutputId>,
    pub visible: bool,
}

#[derive(Debug, Default)]
pub(crate) struct TestHost {
    serial: Serial,
    next_view: ViewId,
    pub outputs: BTreeMap<OutputId, TestOutput>,
    pub surfaces: HashMap<SurfaceId, TestSurface>,
    pub views: BTreeMap<ViewId, TestView>,
    pub focused: Option<SurfaceId>,
    pub pointers: BTreeMap<DeviceId, Point>,
    pub grabbed: HashSet<DeviceId>,
    pub grab_starts: usize,
    pub configures: Vec<(SurfaceId, Configure)>,
    pub popup_configures: Vec<(SurfaceId, Rectangle, Serial)>,
    pub closed: Vec<SurfaceId>,
    pub pings: Vec<(SurfaceId, Serial)>,
    pub popup_done: Vec<SurfaceId>,
    pub panels: Vec<(SurfaceId, PanelPlacement)>,
    pub forgotten_panels: Vec<SurfaceId>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_output(&mut self, id: OutputId, full: Rectangle, available: Rectangle) {
        self.outputs.insert(id, TestOutput { full, available });
    }

    pub fn add_surface(&mut self, id: SurfaceId, geometry: Rectangle) {
        self.surfaces.insert(
            id,
            TestSurface {
                geometry,
                ..TestSurface::default()
            },
        );
    }

    pub fn remove_surface(&mut self, id: SurfaceId) {
        self.surfaces.remove(&id);
    }

    pub fn focus(&mut self, surface: SurfaceId) {
        self.focused = Some(surface);
    }

    pub fn move_pointer(&mut self, device: DeviceId, position: Point) {
        self.pointers.insert(device, position);
    }

    pub fn set_position(&mut self, surface: SurfaceId, position: Point) {
        self.set_global_position(surface, position);
    }

    /// Stands in for the client attaching a buffer of the configured size.
    pub fn commit_size(&mut self, surface: SurfaceId, size: Size) {
        if let Some(s) = self.surfaces.get_mut(&surface) {
            s.geometry = s.geometry.with_size(size);
        }
    }

    pub fn geometry(&self, surface: SurfaceId) -> Rectangle {
        self.global_geometry(surface)
    }

    pub fn visual_state(&self, surface: SurfaceId) -> WindowState {
        self.surfaces
            .get(&surface)
            .map(|s| s.visual)
            .unwrap_or_default()
    }

    pub fn transient_parent_of(&self, surface: SurfaceId) -> Option<SurfaceId> {
        self.transient_parent(surface)
    }

    pub fn set_view_output(&mut self, view: ViewId, output: Option<OutputId>) {
        if let Some(v) = self.views.get_mut(&view) {
            v.output = output;
        }
    }

    pub fn view_visible(&self, view: ViewId) -> bool {
        self.views.get(&view).is_some_and(|v| v.visible)
    }

    pub fn last_configure(&self, surface: SurfaceId) -> Option<&Configure> {
        self.configures
            .iter()
            .rev()
            .find(|(s, _)| *s == surface)
            .map(|(_, c)| c)
    }
}

impl Outputs for TestHost {
    fn primary_output(&self) -> Option<OutputId> {
        self.outputs.keys().next().copied()
    }

    fn available_geometry(&self, output: OutputId) -> Option<Rectangle> {
        self.outputs.get(&output).map(|o| o.available)
    }

    fn full_geometry(&self, output: OutputId) -> Option<Rectangle> {
        self.outputs.get(&output).map(|o| o.full)
    }
}

impl Views for TestHost {
    fn create_view(&mut self, surface: SurfaceId, output: Option<OutputId>) -> ViewId {
        self.next_view += 1;
        self.views.insert(
            self.next_view,
            TestView {
                surface,
                output,
                visible: true,
            },
        );
        self.next_view
    }

    fn destroy_view(&mut self, view: ViewId) {
        self.views.remove(&view);
    }

    fn views_of(&self, surface: SurfaceId) -> Vec<ViewId> {
        self.views
            .iter()
            .filter(|(_, v)| v.surface == surface)
            .map(|(id, _)| *id)
            .collect()
    }

    fn view_output(&self, view: ViewId) -> Option<OutputId> {
        self.views.get(&view).and_then(|v| v.output)
    }

    fn main_output(&self, view: ViewId) -> Option<OutputId> {
        self.view_output(view)
    }

    fn view_has_focus(&self, view: ViewId) -> bool {
        self.views
            .get(&view)
            .is_some_and(|v| Some(v.surface) == self.focused)
    }

    fn set_view_visible(&mut self, view: ViewId, visible: bool) {
        if let Some(v) = self.views.get_mut(&view) {
            v.visible = visible;
        }
    }

    fn place_panel(&mut self, surface: SurfaceId, placement: &PanelPlacement) {
        self.panels.push((surface, *placement));
    }

    fn forget_panel(&mut self, surface: SurfaceId) {
        self.forgotten_panels.push(surface);
    }
}

impl SurfaceTree for TestHost {
    fn surface_exists(&self, surface: SurfaceId) -> bool {
        self.surfaces.contains_key(&surface)
    }

    fn global_geometry(&self, surface: SurfaceId) -> Rectangle {
        self.surfaces
            .get(&surface)
            .map(|s| s.geometry)
            .unwrap_or_default()
    }

    fn set_global_position(&mut self, surface: SurfaceId, position: Point) {
        if let Some(s) = self.surfaces.get_mut(&surface) {
            s.geometry = s.geometry.with_top_left(position);
        }
    }

    fn set_visual_state(&mut self, surface: SurfaceId, state: WindowState) {
        if let Some(s) = self.surfaces.get_mut(&surface) {
            s.visual = state;
        }
    }

    fn transient_parent(&self, surface: SurfaceId) -> Option<SurfaceId> {
        self.surfaces.get(&surface).and_then(|s| s.parent)
    }

    fn set_transient_parent(&mut self, surface: SurfaceId, parent: Option<SurfaceId>) {
        if let Some(s) = self.surfaces.get_mut(&surface) {
            s.parent = parent;
        }
    }

    fn transient_offset(&self, surface: SurfaceId) -> Point {
        self.surfaces
            .get(&surface)
            .map(|s| s.offset)
            .unwrap_or_default()
    }

    fn set_transient_offset(&mut self, surface: SurfaceId, offset: Point) {
        if let Some(s) = self.surfaces.get_mut(&surface) {
            s.offset = offset;
        }
    }
}

impl Pointers for TestHost {
    fn default_device(&self) -> Option<DeviceId> {
        self.pointers.keys().next().copied()
    }

    fn pointer_position(&self, device: DeviceId) -> Option<Point> {
        self.pointers.get(&device).copied()
    }

    fn start_grab(&mut self, device: DeviceId) {
        self.grabbed.insert(device);
        self.grab_starts += 1;
    }

    fn end_grab(&mut self, device: DeviceId) {
        self.grabbed.remove(&device);
    }
}

impl Transport for TestHost {
    fn next_serial(&mut self) -> Serial {
        self.serial += 1;
        self.serial
    }

    fn send_configure(&mut self, surface: SurfaceId, configure: &Configure) {
        self.configures.push((surface, configure.clone()));
    }

    fn send_popup_configure(&mut self, surface: SurfaceId, geometry: Rectangle, serial: Serial) {
        self.popup_configures.push((surface, geometry, serial));
    }

    fn send_popup_done(&mut self, surface: SurfaceId) {
        self.popup_done.push(surface);
    }

    fn send_close(&mut self, surface: SurfaceId) {
        self.closed.push(surface);
    }

    fn send_ping(&mut self, surface: SurfaceId, serial: Serial) {
        self.pings.push((surface, serial));
    }
}

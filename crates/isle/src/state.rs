use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

use wayland_protocols::xdg::shell::server::{
    xdg_popup::XdgPopup,
    xdg_surface::XdgSurface,
    xdg_toplevel::{State as ToplevelState, XdgToplevel},
    xdg_wm_base::XdgWmBase,
};
use wayland_server::protocol::{
    wl_buffer::WlBuffer, wl_callback::WlCallback, wl_output::WlOutput, wl_surface::WlSurface,
};
use wayland_server::Resource;

use crate::config::{Config, OutputConfig};
use crate::error::ShellError;
use crate::geometry::{Point, Rectangle, Size};
use crate::shell::host::{Outputs, Pointers, SurfaceTree, Transport, Views};
use crate::shell::{
    Configure, ConfigureState, DeviceId, OutputId, PanelFlags, PanelPlacement, PanelRole,
    PopupParams, ScreenEdge, Serial, Shell, SurfaceId, SurfaceOp, SurfaceRole, ViewId,
    WindowState,
};

pub const DEFAULT_SEAT: DeviceId = 0;

#[derive(Clone, Debug)]
pub struct Output {
    pub id: OutputId,
    pub name: String,
    pub make: String,
    pub model: String,
    pub geometry: Rectangle,
    pub refresh: i32,
    pub wl_outputs: Vec<WlOutput>,
}

impl Output {
    pub fn from_config(id: OutputId, config: &OutputConfig) -> Self {
        Self {
            id,
            name: config.name.clone(),
            make: config.make.clone(),
            model: config.model.clone(),
            geometry: config.geometry(),
            refresh: config.refresh,
            wl_outputs: Vec::new(),
        }
    }
}

/// Compositor-side record of a wl_surface and the xdg objects bound to it.
pub struct HostSurface {
    pub wl_surface: WlSurface,
    pub geometry: Rectangle,
    pub visual: WindowState,
    pub parent: Option<SurfaceId>,
    pub offset: Point,
    pub mapped: bool,
    pub buffer: Option<WlBuffer>,
    pub pending_buffer: Option<WlBuffer>,
    pub pending_buffer_set: bool,
    pub wm_base: Option<XdgWmBase>,
    pub xdg_surface: Option<XdgSurface>,
    pub toplevel: Option<XdgToplevel>,
    pub popup: Option<XdgPopup>,
}

impl HostSurface {
    pub fn new(wl_surface: WlSurface) -> Self {
        Self {
            wl_surface,
            geometry: Rectangle::default(),
            visual: WindowState::Normal,
            parent: None,
            offset: Point::default(),
            mapped: false,
            buffer: None,
            pending_buffer: None,
            pending_buffer_set: false,
            wm_base: None,
            xdg_surface: None,
            toplevel: None,
            popup: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct View {
    pub surface: SurfaceId,
    pub output: Option<OutputId>,
    pub visible: bool,
}

/// Size of a wl_shm buffer, kept as its user data.
#[derive(Clone, Copy, Debug, Default)]
pub struct BufferSize {
    pub width: i32,
    pub height: i32,
}

/// Everything outside the shell core: outputs, surfaces, views, the seat
/// and the wire objects configure events go out on.
pub struct Host {
    pub outputs: Vec<Output>,
    pub surfaces: HashMap<SurfaceId, HostSurface>,
    pub views: BTreeMap<ViewId, View>,
    pub panels: HashMap<SurfaceId, PanelPlacement>,
    pub focused: Option<SurfaceId>,
    /// Unknown until an input source reports the pointer; until then the
    /// seat cannot start interactive grabs.
    pub pointer: Option<Point>,
    pub grabbed: HashSet<DeviceId>,
    pub frame_callbacks: Vec<WlCallback>,
    serial: Serial,
    next_surface_id: SurfaceId,
    next_view_id: ViewId,
}

impl Host {
    pub fn new(outputs: &[OutputConfig]) -> Self {
        let outputs: Vec<Output> = outputs
            .iter()
            .enumerate()
            .map(|(i, config)| Output::from_config(i as OutputId + 1, config))
            .collect();
        Self {
            outputs,
            surfaces: HashMap::new(),
            views: BTreeMap::new(),
            panels: HashMap::new(),
            focused: None,
            pointer: None,
            grabbed: HashSet::new(),
            frame_callbacks: Vec::new(),
            serial: 0,
            next_surface_id: 1,
            next_view_id: 1,
        }
    }

    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.iter().find(|o| o.id == id)
    }

    pub fn output_mut(&mut self, id: OutputId) -> Option<&mut Output> {
        self.outputs.iter_mut().find(|o| o.id == id)
    }

    pub fn output_for_resource(&self, wl_output: &WlOutput) -> Option<OutputId> {
        wl_output.data::<OutputId>().copied()
    }

    pub fn allocate_surface_id(&mut self) -> SurfaceId {
        let id = self.next_surface_id;
        self.next_surface_id += 1;
        id
    }

    pub fn add_surface(&mut self, id: SurfaceId, wl_surface: WlSurface) {
        self.surfaces.insert(id, HostSurface::new(wl_surface));
    }

    pub fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut HostSurface> {
        self.surfaces.get_mut(&id)
    }

    pub fn remove_surface(&mut self, id: SurfaceId) {
        self.surfaces.remove(&id);
        self.views.retain(|_, view| view.surface != id);
        self.panels.remove(&id);
        if self.focused == Some(id) {
            self.focused = None;
        }
    }

    /// Applies the pending buffer. Returns the new mapped state when it
    /// changed.
    pub fn commit(&mut self, id: SurfaceId) -> Option<bool> {
        let surface = self.surfaces.get_mut(&id)?;
        if surface.pending_buffer_set {
            surface.buffer = surface.pending_buffer.take();
            surface.pending_buffer_set = false;
            if let Some(buffer) = &surface.buffer {
                if let Some(size) = buffer.data::<BufferSize>() {
                    surface.geometry = surface.geometry.with_size(Size::new(size.width, size.height));
                }
                buffer.release();
            }
        }

        let was_mapped = surface.mapped;
        surface.mapped = surface.buffer.is_some();
        (was_mapped != surface.mapped).then_some(surface.mapped)
    }

    pub fn send_frame_callbacks(&mut self, time_ms: u32) {
        for callback in self.frame_callbacks.drain(..) {
            if callback.is_alive() {
                callback.done(time_ms);
            }
        }
    }

    /// Topmost mapped surface under `point`.
    pub fn surface_at(&self, point: Point) -> Option<SurfaceId> {
        self.views
            .values()
            .rev()
            .filter(|v| v.visible)
            .map(|v| v.surface)
            .find(|id| {
                self.surfaces
                    .get(id)
                    .is_some_and(|s| s.mapped && s.geometry.contains(point))
            })
    }

    fn xdg_objects(&self, surface: SurfaceId) -> Option<&HostSurface> {
        self.surfaces.get(&surface).filter(|s| s.xdg_surface.is_some())
    }
}

/// Shrinks `full` by the thickest reservation on each edge.
pub fn available_area(full: Rectangle, struts: &[(ScreenEdge, i32)]) -> Rectangle {
    let (mut top, mut bottom, mut left, mut right) = (0, 0, 0, 0);
    for &(edge, thickness) in struts {
        let thickness = thickness.max(0);
        match edge {
            ScreenEdge::Top => top = top.max(thickness),
            ScreenEdge::Bottom => bottom = bottom.max(thickness),
            ScreenEdge::Left => left = left.max(thickness),
            ScreenEdge::Right => right = right.max(thickness),
            ScreenEdge::None => {}
        }
    }
    Rectangle::new(
        full.x + left,
        full.y + top,
        (full.width - left - right).max(1),
        (full.height - top - bottom).max(1),
    )
}

/// Whether a panel keeps windows out of its strip.
pub fn reserves_space(placement: &PanelPlacement) -> bool {
    placement.role == Some(PanelRole::Panel)
        && placement.screen_edge != ScreenEdge::None
        && !placement.flags.contains(PanelFlags::AUTO_HIDE)
        && !placement.flags.contains(PanelFlags::WINDOWS_CAN_COVER)
}

/// The output sharing the largest area with `geometry`.
pub fn largest_overlap<I>(geometry: Rectangle, outputs: I) -> Option<OutputId>
where
    I: IntoIterator<Item = (OutputId, Rectangle)>,
{
    outputs
        .into_iter()
        .filter_map(|(id, area)| {
            let overlap = geometry.intersection(&area)?;
            Some((id, overlap.width as i64 * overlap.height as i64))
        })
        .max_by_key(|(_, area)| *area)
        .map(|(id, _)| id)
}

fn toplevel_state(state: ConfigureState) -> ToplevelState {
    match state {
        ConfigureState::Maximized => ToplevelState::Maximized,
        ConfigureState::Fullscreen => ToplevelState::Fullscreen,
        ConfigureState::Resizing => ToplevelState::Resizing,
        ConfigureState::Activated => ToplevelState::Activated,
    }
}

impl Outputs for Host {
    fn primary_output(&self) -> Option<OutputId> {
        self.outputs.first().map(|o| o.id)
    }

    fn available_geometry(&self, output: OutputId) -> Option<Rectangle> {
        let full = self.output(output)?.geometry;
        let primary = self.primary_output();
        let struts: Vec<(ScreenEdge, i32)> = self
            .panels
            .iter()
            .filter(|(_, p)| reserves_space(p) && p.output.or(primary) == Some(output))
            .filter_map(|(surface, p)| {
                let g = self.surfaces.get(surface)?.geometry;
                let thickness = match p.screen_edge {
                    ScreenEdge::Top | ScreenEdge::Bottom => g.height,
                    ScreenEdge::Left | ScreenEdge::Right => g.width,
                    ScreenEdge::None => return None,
                };
                Some((p.screen_edge, thickness))
            })
            .collect();
        Some(available_area(full, &struts))
    }

    fn full_geometry(&self, output: OutputId) -> Option<Rectangle> {
        self.output(output).map(|o| o.geometry)
    }
}

impl Views for Host {
    fn create_view(&mut self, surface: SurfaceId, output: Option<OutputId>) -> ViewId {
        let id = self.next_view_id;
        self.next_view_id += 1;
        self.views.insert(
            id,
            View {
                surface,
                output,
                visible: true,
            },
        );
        id
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
        let v = self.views.get(&view)?;
        let geometry = self.global_geometry(v.surface);
        largest_overlap(geometry, self.outputs.iter().map(|o| (o.id, o.geometry)))
            .or(v.output)
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
        if let Some(position) = placement.position {
            self.set_global_position(surface, position);
        }
        self.panels.insert(surface, *placement);
    }

    fn forget_panel(&mut self, surface: SurfaceId) {
        self.panels.remove(&surface);
    }
}

impl SurfaceTree for Host {
    fn surface_exists(&self, surface: SurfaceId) -> bool {
        self.surfaces
            .get(&surface)
            .is_some_and(|s| s.wl_surface.is_alive())
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
        let origin = self
            .transient_parent(surface)
            .map(|parent| self.global_geometry(parent).top_left())
            .unwrap_or_default();
        if let Some(s) = self.surfaces.get_mut(&surface) {
            s.offset = offset;
            s.geometry = s.geometry.with_top_left(origin + offset);
        }
    }
}

impl Pointers for Host {
    fn default_device(&self) -> Option<DeviceId> {
        self.pointer.map(|_| DEFAULT_SEAT)
    }

    fn pointer_position(&self, device: DeviceId) -> Option<Point> {
        self.pointer.filter(|_| device == DEFAULT_SEAT)
    }

    fn start_grab(&mut self, device: DeviceId) {
        if self.grabbed.insert(device) {
            log::debug!("[seat] Pointer grab started on device {}", device);
        }
    }

    fn end_grab(&mut self, device: DeviceId) {
        if self.grabbed.remove(&device) {
            log::debug!("[seat] Pointer grab ended on device {}", device);
        }
    }
}

impl Transport for Host {
    fn next_serial(&mut self) -> Serial {
        self.serial = self.serial.wrapping_add(1);
        self.serial
    }

    fn send_configure(&mut self, surface: SurfaceId, configure: &Configure) {
        let Some(s) = self.xdg_objects(surface) else {
            return;
        };
        if let Some(toplevel) = &s.toplevel {
            let states: Vec<u8> = configure
                .states
                .iter()
                .flat_map(|state| (toplevel_state(*state) as u32).to_ne_bytes())
                .collect();
            toplevel.configure(configure.size.width, configure.size.height, states);
        }
        if let Some(xdg_surface) = &s.xdg_surface {
            xdg_surface.configure(configure.serial);
        }
    }

    fn send_popup_configure(&mut self, surface: SurfaceId, geometry: Rectangle, serial: Serial) {
        let Some(s) = self.xdg_objects(surface) else {
            return;
        };
        if let Some(popup) = &s.popup {
            popup.configure(geometry.x, geometry.y, geometry.width, geometry.height);
        }
        if let Some(xdg_surface) = &s.xdg_surface {
            xdg_surface.configure(serial);
        }
    }

    fn send_popup_done(&mut self, surface: SurfaceId) {
        if let Some(popup) = self.surfaces.get(&surface).and_then(|s| s.popup.as_ref()) {
            popup.popup_done();
        }
    }

    fn send_close(&mut self, surface: SurfaceId) {
        if let Some(toplevel) = self.surfaces.get(&surface).and_then(|s| s.toplevel.as_ref()) {
            toplevel.close();
        }
    }

    fn send_ping(&mut self, surface: SurfaceId, serial: Serial) {
        if let Some(wm_base) = self.surfaces.get(&surface).and_then(|s| s.wm_base.as_ref()) {
            wm_base.ping(serial);
        }
    }
}

pub struct State {
    pub config: Config,
    pub shell: Shell,
    pub host: Host,
    pub start_time: Instant,
    last_ping: Instant,
}

impl State {
    pub fn new(config: Config) -> Self {
        let shell = Shell::new(config.xdg_wm_base_version());
        let host = Host::new(&config.outputs);
        Self {
            config,
            shell,
            host,
            start_time: Instant::now(),
            last_ping: Instant::now(),
        }
    }

    pub fn focus_surface(&mut self, target: Option<SurfaceId>) {
        let previous = self.host.focused;
        if previous == target {
            return;
        }
        self.host.focused = target;
        if let Some(previous) = previous {
            self.shell.focus_changed(previous, false, &mut self.host);
        }
        if let Some(target) = target {
            self.shell.focus_changed(target, true, &mut self.host);
            log::debug!("[focus] Surface {} focused", target);
        }
    }

    /// Hands focus to the newest remaining window, if any.
    fn refocus(&mut self) {
        let next = self
            .shell
            .surfaces()
            .filter(|s| matches!(s.role(), SurfaceRole::Toplevel | SurfaceRole::Transient))
            .filter(|s| !s.is_minimized())
            .map(|s| s.id())
            .max();
        self.focus_surface(next);
    }

    /// Gives `surface` the toplevel role. The resource is only kept when the
    /// role is granted, so a refused request leaves the window untouched.
    pub fn assign_toplevel(
        &mut self,
        surface: SurfaceId,
        toplevel: XdgToplevel,
    ) -> Result<Serial, ShellError> {
        self.shell.check_new_role(surface, &self.host)?;
        let host_surface = self
            .host
            .surface_mut(surface)
            .ok_or(ShellError::NotASurface(surface))?;
        host_surface.toplevel = Some(toplevel);

        match self.shell.get_surface(surface, &mut self.host) {
            Ok(serial) => {
                self.focus_surface(Some(surface));
                Ok(serial)
            }
            Err(e) => {
                if let Some(s) = self.host.surface_mut(surface) {
                    s.toplevel = None;
                }
                Err(e)
            }
        }
    }

    pub fn assign_popup(
        &mut self,
        surface: SurfaceId,
        popup: XdgPopup,
        params: PopupParams,
    ) -> Result<Serial, ShellError> {
        self.shell.check_new_role(surface, &self.host)?;
        let host_surface = self
            .host
            .surface_mut(surface)
            .ok_or(ShellError::NotASurface(surface))?;
        host_surface.popup = Some(popup);

        let result = self.shell.get_popup(surface, params, &mut self.host);
        if result.is_err() {
            if let Some(s) = self.host.surface_mut(surface) {
                s.popup = None;
            }
        }
        result
    }

    /// Tears the window down only if `toplevel` is the object it was
    /// created with.
    pub fn toplevel_destroyed(&mut self, surface: SurfaceId, toplevel: &XdgToplevel) {
        let current = self
            .host
            .surfaces
            .get(&surface)
            .and_then(|s| s.toplevel.as_ref())
            .is_some_and(|t| t.id() == toplevel.id());
        if current {
            self.destroy_shell_surface(surface);
        }
    }

    pub fn popup_destroyed(&mut self, surface: SurfaceId, popup: &XdgPopup) {
        let current = self
            .host
            .surfaces
            .get(&surface)
            .and_then(|s| s.popup.as_ref())
            .is_some_and(|p| p.id() == popup.id());
        if current {
            self.destroy_shell_surface(surface);
        }
    }

    pub fn destroy_shell_surface(&mut self, surface: SurfaceId) {
        if !self.shell.destroy_shell_surface(surface, &mut self.host) {
            return;
        }
        if let Some(s) = self.host.surface_mut(surface) {
            s.toplevel = None;
            s.popup = None;
        }
        if self.host.focused == Some(surface) {
            self.host.focused = None;
            self.refocus();
        }
    }

    pub fn surface_destroyed(&mut self, surface: SurfaceId) {
        self.shell.surface_destroyed(surface, &mut self.host);
        let was_focused = self.host.focused == Some(surface);
        self.host.remove_surface(surface);
        if was_focused {
            self.refocus();
        }
        log::debug!("[surface] Surface {} destroyed", surface);
    }

    /// Pointer motion from the input source driving the default seat. The
    /// first report makes the seat available for move and resize.
    pub fn pointer_motion(&mut self, position: Point) -> bool {
        self.host.pointer = Some(position);
        self.shell.pointer_motion(DEFAULT_SEAT, position, &mut self.host)
    }

    /// Button event on the default seat. Presses the shell does not consume
    /// focus the window under the pointer.
    pub fn pointer_button(&mut self, pressed: bool) -> bool {
        let target = self.host.pointer.and_then(|p| self.host.surface_at(p));
        let consumed = self
            .shell
            .pointer_button(DEFAULT_SEAT, pressed, target, &mut self.host);
        if pressed && !consumed {
            let window = target.filter(|t| {
                self.shell
                    .surface(*t)
                    .is_some_and(|s| matches!(s.role(), SurfaceRole::Toplevel | SurfaceRole::Transient))
            });
            if window.is_some() {
                self.focus_surface(window);
            }
        }
        consumed
    }

    pub fn run_operation(&mut self, surface: SurfaceId, op: SurfaceOp) -> bool {
        self.shell.run_operation(surface, op, &mut self.host)
    }

    fn ping_windows(&mut self) {
        let interval = self.config.shell.ping_interval_ms;
        if interval == 0 || self.last_ping.elapsed() < Duration::from_millis(interval) {
            return;
        }
        self.last_ping = Instant::now();
        for surface in self.shell.ping_windows(&mut self.host) {
            log::warn!("[shell] Surface {} is not answering pings", surface);
        }
    }

    /// Work done once per frame interval.
    pub fn tick(&mut self) {
        let time_ms = self.start_time.elapsed().as_millis() as u32;
        self.host.send_frame_callbacks(time_ms);
        self.shell.flush_deferred(&mut self.host);
        self.ping_windows();
    }
}

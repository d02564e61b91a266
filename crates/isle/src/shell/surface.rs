//! Per-surface window-management state machine.
//!
//! Every state or geometry change is proposed to the client in a configure
//! event tagged with a fresh serial and only committed once the client
//! acknowledges that exact serial. Interactive moves are the exception:
//! they are compositor driven and applied immediately.

use std::collections::BTreeMap;

use crate::error::ShellError;
use crate::geometry::{Point, Rectangle, Size};

use super::grab::{Grab, MoveGrab, ResizeEdges, ResizeGrab};
use super::host::{Configure, ConfigureState, ShellHost};
use super::popup::PopupParams;
use super::{DeviceId, OutputId, Serial, SurfaceId, ViewId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WindowState {
    #[default]
    Normal,
    Maximized,
    FullScreen,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SurfaceRole {
    #[default]
    Unassigned,
    Toplevel,
    Transient,
    Popup,
}

/// A proposed change, recorded under the serial of the configure event
/// that carried it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Changes {
    pub new_state: bool,
    pub state: WindowState,
    pub active: bool,
    pub moving: bool,
    pub resizing: bool,
    /// Set when returning to the saved state, which then is forgotten.
    pub restoring: bool,
    pub position: Point,
    pub size: Size,
}

#[derive(Debug)]
pub struct ShellSurface {
    id: SurfaceId,
    view: ViewId,
    role: SurfaceRole,
    state: WindowState,
    saved_state: WindowState,
    saved_geometry: Rectangle,
    minimized: bool,
    pending: BTreeMap<Serial, Changes>,
    grab: Option<Grab>,
    title: String,
    app_id: String,
    window_geometry: Option<Rectangle>,
    popup: Option<PopupParams>,
}

impl ShellSurface {
    pub fn new(id: SurfaceId, role: SurfaceRole, host: &mut dyn ShellHost) -> Self {
        let output = host.primary_output();
        let view = host.create_view(id, output);
        let saved_geometry = host.global_geometry(id);

        log::debug!("[shell] Surface {} created as {:?} with view {}", id, role, view);

        Self {
            id,
            view,
            role,
            state: WindowState::Normal,
            saved_state: WindowState::Normal,
            saved_geometry,
            minimized: false,
            pending: BTreeMap::new(),
            grab: None,
            title: String::new(),
            app_id: String::new(),
            window_geometry: None,
            popup: None,
        }
    }

    pub fn new_popup(id: SurfaceId, params: PopupParams, host: &mut dyn ShellHost) -> Self {
        host.set_transient_parent(id, Some(params.parent));
        host.set_transient_offset(id, params.position);

        let mut surface = Self::new(id, SurfaceRole::Popup, host);
        surface.popup = Some(params);
        surface
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn view(&self) -> ViewId {
        self.view
    }

    pub fn role(&self) -> SurfaceRole {
        self.role
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn saved_state(&self) -> WindowState {
        self.saved_state
    }

    pub fn saved_geometry(&self) -> Rectangle {
        self.saved_geometry
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn active_grab(&self) -> Option<&Grab> {
        self.grab.as_ref()
    }

    pub fn pending(&self, serial: Serial) -> Option<&Changes> {
        self.pending.get(&serial)
    }

    pub fn pending_serials(&self) -> impl Iterator<Item = Serial> + '_ {
        self.pending.keys().copied()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn window_geometry(&self) -> Option<Rectangle> {
        self.window_geometry
    }

    pub fn popup_params(&self) -> Option<&PopupParams> {
        self.popup.as_ref()
    }

    fn is_window(&self) -> bool {
        matches!(self.role, SurfaceRole::Toplevel | SurfaceRole::Transient)
    }

    /// Sends a configure event for `changes` and remembers it under a new
    /// serial until the client acknowledges it.
    pub fn request_configure(&mut self, changes: Changes, host: &mut dyn ShellHost) -> Serial {
        let serial = host.next_serial();

        let target = if changes.new_state { changes.state } else { self.state };
        let mut states = Vec::with_capacity(3);
        match target {
            WindowState::Maximized => states.push(ConfigureState::Maximized),
            WindowState::FullScreen => states.push(ConfigureState::Fullscreen),
            WindowState::Normal => {}
        }
        if changes.resizing && !changes.new_state {
            states.push(ConfigureState::Resizing);
        }
        if changes.active {
            states.push(ConfigureState::Activated);
        }

        let size = if changes.new_state || changes.resizing {
            changes.size
        } else {
            Size::default()
        };

        self.pending.insert(serial, changes);
        log::trace!(
            "[shell] Configure surface {} serial {} size {}x{} states {:?}",
            self.id,
            serial,
            size.width,
            size.height,
            states
        );
        host.send_configure(self.id, &Configure { size, states, serial });
        serial
    }

    /// Commits the change recorded under `serial`. Unknown serials are
    /// ignored and reported as `false`.
    pub fn ack_configure(&mut self, serial: Serial, host: &mut dyn ShellHost) -> bool {
        let Some(changes) = self.pending.remove(&serial) else {
            log::debug!("[shell] Surface {} acked unknown serial {}", self.id, serial);
            return false;
        };

        let previous = self.state;

        if (changes.moving || changes.resizing) && previous == WindowState::Normal {
            self.saved_geometry = host.global_geometry(self.id);
        }
        if changes.moving {
            host.set_global_position(self.id, changes.position);
        }

        if changes.new_state {
            self.saved_state = if previous != WindowState::Normal && !changes.restoring {
                previous
            } else {
                WindowState::Normal
            };
            self.state = changes.state;
            host.set_visual_state(self.id, self.state);
            log::debug!(
                "[shell] Surface {} state {:?} -> {:?}",
                self.id,
                previous,
                self.state
            );
        }

        true
    }

    pub fn set_maximized(&mut self, host: &mut dyn ShellHost) -> Option<Serial> {
        if self.role != SurfaceRole::Toplevel || self.state == WindowState::Maximized {
            return None;
        }
        let output = self.target_output(None, host)?;
        let geometry = host.available_geometry(output)?;
        Some(self.request_state(WindowState::Maximized, geometry, false, host))
    }

    pub fn unset_maximized(&mut self, host: &mut dyn ShellHost) -> Serial {
        let geometry = self.restore_target(host);
        self.request_state(self.saved_state, geometry, true, host)
    }

    pub fn set_fullscreen(
        &mut self,
        output: Option<OutputId>,
        host: &mut dyn ShellHost,
    ) -> Option<Serial> {
        if self.role != SurfaceRole::Toplevel || self.state == WindowState::FullScreen {
            return None;
        }
        let output = self.target_output(output, host)?;
        let geometry = host.full_geometry(output)?;
        Some(self.request_state(WindowState::FullScreen, geometry, false, host))
    }

    pub fn unset_fullscreen(&mut self, host: &mut dyn ShellHost) -> Serial {
        let geometry = self.restore_target(host);
        self.request_state(self.saved_state, geometry, true, host)
    }

    /// Hides the view. There is no way back from here short of the client
    /// remapping the surface.
    pub fn set_minimized(&mut self, host: &mut dyn ShellHost) {
        if self.minimized {
            return;
        }
        self.minimized = true;
        host.set_view_visible(self.view, false);
        log::debug!("[shell] Surface {} minimized", self.id);
    }

    pub fn close(&self, host: &mut dyn ShellHost) {
        host.send_close(self.id);
    }

    pub fn restore(&mut self, host: &mut dyn ShellHost) -> Option<Serial> {
        self.restore_at(self.saved_geometry.top_left(), host)
    }

    pub fn restore_at(&mut self, position: Point, host: &mut dyn ShellHost) -> Option<Serial> {
        if self.state == WindowState::Normal {
            return None;
        }
        let geometry = self.saved_geometry.with_top_left(position);
        Some(self.request_state(WindowState::Normal, geometry, true, host))
    }

    /// Compositor-initiated resize, negotiated like any other.
    pub fn resize_to(&mut self, size: Size, host: &mut dyn ShellHost) -> Option<Serial> {
        if !self.is_window() || !size.is_valid() {
            return None;
        }
        let changes = Changes {
            state: self.state,
            active: host.view_has_focus(self.view),
            resizing: true,
            size,
            ..Changes::default()
        };
        Some(self.request_configure(changes, host))
    }

    pub fn focus_changed(&mut self, focus: bool, host: &mut dyn ShellHost) -> Option<Serial> {
        if !self.is_window() {
            return None;
        }
        let changes = Changes {
            state: self.state,
            active: focus,
            ..Changes::default()
        };
        Some(self.request_configure(changes, host))
    }

    pub fn request_move(&mut self, device: DeviceId, host: &mut dyn ShellHost) -> Result<(), ShellError> {
        self.check_grab_allowed()?;
        let pointer = host
            .pointer_position(device)
            .ok_or(ShellError::UnknownDevice(device))?;
        let geometry = host.global_geometry(self.id);

        let grab = MoveGrab::new(self.id, device, pointer - geometry.top_left());
        self.grab = Some(Grab::Move(grab));
        host.start_grab(device);
        log::debug!("[grab] Move started on surface {} by device {}", self.id, device);
        Ok(())
    }

    pub fn request_resize(
        &mut self,
        device: DeviceId,
        edges: ResizeEdges,
        host: &mut dyn ShellHost,
    ) -> Result<(), ShellError> {
        self.check_grab_allowed()?;
        let pointer = host
            .pointer_position(device)
            .ok_or(ShellError::UnknownDevice(device))?;
        let geometry = host.global_geometry(self.id);

        let grab = ResizeGrab::new(self.id, device, pointer, edges, geometry);
        self.grab = Some(Grab::Resize(grab));
        host.start_grab(device);
        log::debug!(
            "[grab] Resize started on surface {} by device {} edges {:#x}",
            self.id,
            device,
            edges.bits()
        );
        Ok(())
    }

    fn check_grab_allowed(&self) -> Result<(), ShellError> {
        if self.grab.is_some() {
            return Err(ShellError::GrabActive(self.id));
        }
        if matches!(self.state, WindowState::Maximized | WindowState::FullScreen) {
            return Err(ShellError::InvalidWindowState {
                surface: self.id,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Feeds a pointer motion into the active grab. Returns false when idle.
    pub fn grab_motion(&mut self, pointer: Point, host: &mut dyn ShellHost) -> bool {
        match self.grab {
            None => false,
            Some(Grab::Move(grab)) => {
                host.set_global_position(self.id, grab.position_for(pointer));
                true
            }
            Some(Grab::Resize(grab)) => {
                let geometry = grab.geometry_for(pointer);
                let changes = Changes {
                    state: self.state,
                    active: host.view_has_focus(self.view),
                    moving: grab.edges.moves_origin(),
                    resizing: true,
                    position: geometry.top_left(),
                    size: geometry.size(),
                    ..Changes::default()
                };
                self.request_configure(changes, host);
                true
            }
        }
    }

    /// Clears the grab slot. The caller releases the device.
    pub fn end_grab(&mut self) -> Option<Grab> {
        let grab = self.grab.take();
        if let Some(grab) = &grab {
            log::debug!("[grab] Grab on surface {} ended", grab.owner());
        }
        grab
    }

    /// View of the transient parent on the output this surface is shown on.
    pub fn parent_view(&self, host: &dyn ShellHost) -> Option<ViewId> {
        let parent = host.transient_parent(self.id)?;
        let output = host.view_output(self.view)?;
        host.views_of(parent)
            .into_iter()
            .find(|view| host.view_output(*view) == Some(output))
    }

    pub fn set_parent(&mut self, parent: Option<SurfaceId>, host: &mut dyn ShellHost) {
        if !self.is_window() {
            return;
        }
        self.role = if parent.is_some() {
            SurfaceRole::Transient
        } else {
            SurfaceRole::Toplevel
        };
        host.set_transient_parent(self.id, parent);
    }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub fn set_app_id(&mut self, app_id: String) {
        self.app_id = app_id;
    }

    pub fn set_window_geometry(&mut self, geometry: Rectangle) {
        if geometry.is_empty() {
            log::warn!("[shell] Surface {} sent empty window geometry", self.id);
            return;
        }
        self.window_geometry = Some(geometry);
    }

    /// Sends the popup rectangle, relative to its parent.
    pub fn configure_popup(&mut self, host: &mut dyn ShellHost) -> Option<Serial> {
        let params = self.popup?;
        let serial = host.next_serial();
        let changes = Changes {
            position: params.position,
            size: params.size,
            ..Changes::default()
        };
        self.pending.insert(serial, changes);
        host.send_popup_configure(self.id, params.geometry(), serial);
        Some(serial)
    }

    /// Drops everything the surface holds on the host. The grab, if any, is
    /// returned so the caller can release the device.
    pub fn teardown(&mut self, host: &mut dyn ShellHost) -> Option<Grab> {
        let grab = self.end_grab();
        self.pending.clear();
        host.destroy_view(self.view);
        grab
    }

    fn target_output(&self, output: Option<OutputId>, host: &dyn ShellHost) -> Option<OutputId> {
        output
            .or_else(|| host.main_output(self.view))
            .or_else(|| host.primary_output())
    }

    fn restore_target(&self, host: &dyn ShellHost) -> Rectangle {
        let output = self.target_output(None, host);
        let geometry = match self.saved_state {
            WindowState::Normal => None,
            WindowState::Maximized => output.and_then(|o| host.available_geometry(o)),
            WindowState::FullScreen => output.and_then(|o| host.full_geometry(o)),
        };
        geometry.unwrap_or(self.saved_geometry)
    }

    fn request_state(
        &mut self,
        state: WindowState,
        geometry: Rectangle,
        restoring: bool,
        host: &mut dyn ShellHost,
    ) -> Serial {
        let changes = Changes {
            new_state: true,
            state,
            active: host.view_has_focus(self.view),
            moving: true,
            resizing: true,
            restoring,
            position: geometry.top_left(),
            size: geometry.size(),
        };
        self.request_configure(changes, host)
    }
}

use std::collections::{BTreeMap, HashMap};

use crate::error::ShellError;
use crate::geometry::{Point, Size};

use super::grab::ResizeEdges;
use super::host::ShellHost;
use super::panel::{PanelRequest, PanelSurface};
use super::popup::{PopupGrabCoordinator, PopupParams};
use super::surface::{Changes, ShellSurface, SurfaceRole};
use super::{DeviceId, Serial, SurfaceId};

pub const XDG_SHELL_VERSION: u32 = 5;

/// Operations the compositor itself can run on a managed surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceOp {
    Close,
    Resize(Size),
    Ping,
    Move,
}

/// Process-wide shell state: every managed surface, outstanding pings,
/// per-device grab owners and popup coordinators, and panel surfaces.
#[derive(Debug)]
pub struct Shell {
    version: u32,
    surfaces: HashMap<SurfaceId, ShellSurface>,
    pings: BTreeMap<Serial, SurfaceId>,
    popup_grabbers: HashMap<DeviceId, PopupGrabCoordinator>,
    pointer_grabs: HashMap<DeviceId, SurfaceId>,
    panels: HashMap<SurfaceId, PanelSurface>,
    doomed_panels: Vec<SurfaceId>,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new(XDG_SHELL_VERSION)
    }
}

impl Shell {
    pub fn new(version: u32) -> Self {
        Self {
            version: version.clamp(1, XDG_SHELL_VERSION),
            surfaces: HashMap::new(),
            pings: BTreeMap::new(),
            popup_grabbers: HashMap::new(),
            pointer_grabs: HashMap::new(),
            panels: HashMap::new(),
            doomed_panels: Vec::new(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn check_version(&self, requested: u32) -> Result<(), ShellError> {
        if requested == 0 || requested > self.version {
            return Err(ShellError::UnsupportedVersion {
                requested,
                supported: self.version,
            });
        }
        Ok(())
    }

    pub fn surface(&self, surface: SurfaceId) -> Option<&ShellSurface> {
        self.surfaces.get(&surface)
    }

    pub fn surface_mut(&mut self, surface: SurfaceId) -> Option<&mut ShellSurface> {
        self.surfaces.get_mut(&surface)
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &ShellSurface> {
        self.surfaces.values()
    }

    fn known_mut(&mut self, surface: SurfaceId) -> Result<&mut ShellSurface, ShellError> {
        self.surfaces
            .get_mut(&surface)
            .ok_or(ShellError::UnknownSurface(surface))
    }

    /// Whether `surface` may still be given a role.
    pub fn check_new_role(&self, surface: SurfaceId, host: &dyn ShellHost) -> Result<(), ShellError> {
        if !host.surface_exists(surface) {
            return Err(ShellError::NotASurface(surface));
        }
        if self.surfaces.contains_key(&surface) {
            return Err(ShellError::RoleAlreadyAssigned(surface));
        }
        Ok(())
    }

    /// Gives `surface` the toplevel role and sends its initial configure.
    pub fn get_surface(
        &mut self,
        surface: SurfaceId,
        host: &mut dyn ShellHost,
    ) -> Result<Serial, ShellError> {
        self.check_new_role(surface, host)?;

        let mut shell_surface = ShellSurface::new(surface, SurfaceRole::Toplevel, host);
        let serial = shell_surface.request_configure(Changes::default(), host);
        self.surfaces.insert(surface, shell_surface);

        log::info!("[shell] New toplevel surface {}", surface);
        Ok(serial)
    }

    pub fn get_popup(
        &mut self,
        surface: SurfaceId,
        params: PopupParams,
        host: &mut dyn ShellHost,
    ) -> Result<Serial, ShellError> {
        self.check_new_role(surface, host)?;
        if !self.surfaces.contains_key(&params.parent) {
            return Err(ShellError::InvalidPopupParent { popup: surface });
        }

        let mut popup = ShellSurface::new_popup(surface, params, host);
        let serial = popup
            .configure_popup(host)
            .ok_or(ShellError::InvalidPopupParent { popup: surface })?;
        self.surfaces.insert(surface, popup);

        if let Some(device) = params.device {
            if self.pointer_grabs.contains_key(&device) {
                log::debug!("[grab] Device {} busy, popup {} created without grab", device, surface);
            } else {
                self.popup_grabber_for_device(device).add_popup(surface, host);
            }
        }

        log::debug!("[shell] New popup {} on parent {}", surface, params.parent);
        Ok(serial)
    }

    /// Explicit popup grab request, arriving after the popup was created.
    pub fn popup_grab(
        &mut self,
        popup: SurfaceId,
        device: DeviceId,
        host: &mut dyn ShellHost,
    ) -> Result<(), ShellError> {
        match self.surfaces.get(&popup) {
            Some(s) if s.role() == SurfaceRole::Popup => {}
            _ => return Err(ShellError::UnknownSurface(popup)),
        }
        if let Some(owner) = self.pointer_grabs.get(&device) {
            log::debug!(
                "[grab] Device {} moving or resizing surface {}, refusing popup grab",
                device,
                owner
            );
            return Err(ShellError::GrabActive(popup));
        }
        self.popup_grabber_for_device(device).add_popup(popup, host);
        Ok(())
    }

    /// Coordinators are created on first use and kept for the lifetime of
    /// the shell.
    pub fn popup_grabber_for_device(&mut self, device: DeviceId) -> &mut PopupGrabCoordinator {
        self.popup_grabbers
            .entry(device)
            .or_insert_with(|| PopupGrabCoordinator::new(device))
    }

    pub fn popup_grabber(&self, device: DeviceId) -> Option<&PopupGrabCoordinator> {
        self.popup_grabbers.get(&device)
    }

    pub fn ack_configure(
        &mut self,
        surface: SurfaceId,
        serial: Serial,
        host: &mut dyn ShellHost,
    ) -> bool {
        self.surfaces
            .get_mut(&surface)
            .is_some_and(|s| s.ack_configure(serial, host))
    }

    pub fn request_move(
        &mut self,
        surface: SurfaceId,
        device: DeviceId,
        host: &mut dyn ShellHost,
    ) -> Result<(), ShellError> {
        self.check_device_free(surface, device)?;
        self.known_mut(surface)?.request_move(device, host)?;
        self.pointer_grabs.insert(device, surface);
        Ok(())
    }

    pub fn request_resize(
        &mut self,
        surface: SurfaceId,
        device: DeviceId,
        edges: ResizeEdges,
        host: &mut dyn ShellHost,
    ) -> Result<(), ShellError> {
        self.check_device_free(surface, device)?;
        self.known_mut(surface)?.request_resize(device, edges, host)?;
        self.pointer_grabs.insert(device, surface);
        Ok(())
    }

    fn check_device_free(&self, surface: SurfaceId, device: DeviceId) -> Result<(), ShellError> {
        if let Some(owner) = self.pointer_grabs.get(&device) {
            log::debug!(
                "[grab] Device {} already grabbed by surface {}, refusing surface {}",
                device,
                owner,
                surface
            );
            return Err(ShellError::GrabActive(surface));
        }
        if self.popup_grabber(device).is_some_and(|c| c.is_grabbing()) {
            log::debug!(
                "[grab] Device {} held by a popup grab, refusing surface {}",
                device,
                surface
            );
            return Err(ShellError::GrabActive(surface));
        }
        Ok(())
    }

    pub fn grab_owner(&self, device: DeviceId) -> Option<SurfaceId> {
        self.pointer_grabs.get(&device).copied()
    }

    /// Returns true when the motion was consumed by a move or resize.
    pub fn pointer_motion(
        &mut self,
        device: DeviceId,
        position: Point,
        host: &mut dyn ShellHost,
    ) -> bool {
        let Some(owner) = self.pointer_grabs.get(&device).copied() else {
            return false;
        };
        self.surfaces
            .get_mut(&owner)
            .is_some_and(|s| s.grab_motion(position, host))
    }

    /// Returns true when the button event was consumed by the shell.
    pub fn pointer_button(
        &mut self,
        device: DeviceId,
        pressed: bool,
        target: Option<SurfaceId>,
        host: &mut dyn ShellHost,
    ) -> bool {
        if !pressed {
            let Some(owner) = self.pointer_grabs.remove(&device) else {
                return false;
            };
            if let Some(surface) = self.surfaces.get_mut(&owner) {
                surface.end_grab();
            }
            host.end_grab(device);
            return true;
        }

        match self.popup_grabbers.get_mut(&device) {
            Some(coordinator) => coordinator.button_pressed(target, host),
            None => false,
        }
    }

    pub fn ping_surface(&mut self, surface: SurfaceId, host: &mut dyn ShellHost) -> Option<Serial> {
        if !self.surfaces.contains_key(&surface) {
            return None;
        }
        let serial = host.next_serial();
        self.pings.insert(serial, surface);
        host.send_ping(surface, serial);
        log::trace!("[shell] Ping {} sent to surface {}", serial, surface);
        Some(serial)
    }

    /// Unmatched pongs are ignored.
    pub fn pong(&mut self, serial: Serial) -> Option<SurfaceId> {
        let surface = self.pings.remove(&serial);
        if surface.is_none() {
            log::debug!("[shell] Ignoring pong for unknown serial {}", serial);
        }
        surface
    }

    pub fn outstanding_pings(&self) -> &BTreeMap<Serial, SurfaceId> {
        &self.pings
    }

    /// Pings every window that has answered its last ping. Returns the
    /// windows still owing a pong.
    pub fn ping_windows(&mut self, host: &mut dyn ShellHost) -> Vec<SurfaceId> {
        let mut windows: Vec<SurfaceId> = self
            .surfaces
            .values()
            .filter(|s| matches!(s.role(), SurfaceRole::Toplevel | SurfaceRole::Transient))
            .map(|s| s.id())
            .collect();
        windows.sort_unstable();

        let mut unresponsive = Vec::new();
        for surface in windows {
            if self.pings.values().any(|pinged| *pinged == surface) {
                unresponsive.push(surface);
            } else {
                self.ping_surface(surface, host);
            }
        }
        unresponsive
    }

    /// Returns false when the surface is unknown or the operation was refused.
    pub fn run_operation(
        &mut self,
        surface: SurfaceId,
        op: SurfaceOp,
        host: &mut dyn ShellHost,
    ) -> bool {
        if !self.surfaces.contains_key(&surface) {
            return false;
        }
        match op {
            SurfaceOp::Close => {
                if let Some(s) = self.surfaces.get(&surface) {
                    s.close(host);
                }
                true
            }
            SurfaceOp::Resize(size) => self
                .surfaces
                .get_mut(&surface)
                .and_then(|s| s.resize_to(size, host))
                .is_some(),
            SurfaceOp::Ping => self.ping_surface(surface, host).is_some(),
            SurfaceOp::Move => match host.default_device() {
                Some(device) => match self.request_move(surface, device, host) {
                    Ok(()) => true,
                    Err(e) => {
                        log::debug!("[shell] Move operation refused: {}", e);
                        false
                    }
                },
                None => false,
            },
        }
    }

    pub fn focus_changed(
        &mut self,
        surface: SurfaceId,
        focus: bool,
        host: &mut dyn ShellHost,
    ) -> Option<Serial> {
        self.surfaces
            .get_mut(&surface)
            .and_then(|s| s.focus_changed(focus, host))
    }

    /// Tears down the shell state of `surface`. The grab is released before
    /// the surface is dropped.
    pub fn destroy_shell_surface(&mut self, surface: SurfaceId, host: &mut dyn ShellHost) -> bool {
        let Some(mut shell_surface) = self.surfaces.remove(&surface) else {
            return false;
        };

        if let Some(grab) = shell_surface.teardown(host) {
            self.pointer_grabs.remove(&grab.device());
            host.end_grab(grab.device());
        }
        self.pointer_grabs.retain(|_, owner| *owner != surface);

        for coordinator in self.popup_grabbers.values_mut() {
            coordinator.remove_popup(surface, host);
        }

        let children: Vec<SurfaceId> = self
            .surfaces
            .values()
            .filter(|s| s.popup_params().is_some_and(|p| p.parent == surface))
            .map(|s| s.id())
            .collect();
        for child in children {
            host.send_popup_done(child);
            for coordinator in self.popup_grabbers.values_mut() {
                coordinator.remove_popup(child, host);
            }
        }

        self.pings.retain(|_, pinged| *pinged != surface);

        log::debug!("[shell] Shell surface {} destroyed", surface);
        true
    }

    /// The underlying surface is gone. Panel removal waits for the next
    /// `flush_deferred` so nothing observes a half torn-down surface.
    pub fn surface_destroyed(&mut self, surface: SurfaceId, host: &mut dyn ShellHost) {
        self.destroy_shell_surface(surface, host);

        if let Some(panel) = self.panels.get_mut(&surface) {
            if !panel.is_deleting() {
                panel.mark_deleting();
                self.doomed_panels.push(surface);
            }
        }
    }

    pub fn get_panel_surface(
        &mut self,
        surface: SurfaceId,
        host: &dyn ShellHost,
    ) -> Result<(), ShellError> {
        if !host.surface_exists(surface) {
            return Err(ShellError::NotASurface(surface));
        }
        if self.panels.contains_key(&surface) {
            return Err(ShellError::RoleAlreadyAssigned(surface));
        }
        self.panels.insert(surface, PanelSurface::new(surface));
        log::debug!("[panel] New panel surface {}", surface);
        Ok(())
    }

    pub fn panel(&self, surface: SurfaceId) -> Option<&PanelSurface> {
        self.panels.get(&surface)
    }

    pub fn panel_request(
        &mut self,
        surface: SurfaceId,
        request: PanelRequest,
        host: &mut dyn ShellHost,
    ) -> bool {
        self.panels
            .get_mut(&surface)
            .is_some_and(|panel| panel.handle(request, host))
    }

    /// The panel resource went away; removal is immediate.
    pub fn panel_destroyed(&mut self, surface: SurfaceId, host: &mut dyn ShellHost) -> bool {
        self.doomed_panels.retain(|s| *s != surface);
        let removed = self.panels.remove(&surface).is_some();
        if removed {
            host.forget_panel(surface);
        }
        removed
    }

    /// Drops panels whose surface went away since the last tick.
    pub fn flush_deferred(&mut self, host: &mut dyn ShellHost) -> usize {
        let doomed = std::mem::take(&mut self.doomed_panels);
        let mut removed = 0;
        for surface in doomed {
            if self.panels.remove(&surface).is_some() {
                host.forget_panel(surface);
                removed += 1;
            }
        }
        if removed > 0 {
            log::debug!("[panel] Removed {} panel(s) after surface teardown", removed);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rectangle;
    use crate::shell::host::ConfigureState;
    use crate::shell::surface::WindowState;
    use crate::shell::testing::TestHost;

    fn setup() -> (Shell, TestHost) {
        let mut host = TestHost::new();
        host.add_output(1, Rectangle::new(0, 0, 1920, 1080), Rectangle::new(0, 0, 1920, 1050));
        host.add_surface(1, Rectangle::new(0, 0, 800, 600));
        host.add_surface(2, Rectangle::new(50, 50, 640, 480));
        host.move_pointer(0, Point::new(400, 300));
        (Shell::default(), host)
    }

    #[test]
    fn test_version_check() {
        let shell = Shell::new(3);
        assert!(shell.check_version(1).is_ok());
        assert!(shell.check_version(3).is_ok());
        assert_eq!(
            shell.check_version(4),
            Err(ShellError::UnsupportedVersion { requested: 4, supported: 3 })
        );
        assert!(shell.check_version(0).is_err());
        assert_eq!(Shell::new(99).version(), XDG_SHELL_VERSION);
    }

    #[test]
    fn test_get_surface_sends_initial_configure() {
        let (mut shell, mut host) = setup();

        let serial = shell.get_surface(1, &mut host).unwrap();
        let configure = host.last_configure(1).unwrap();
        assert_eq!(configure.serial, serial);
        assert_eq!(configure.size, Size::default());
        assert!(configure.states.is_empty());
        assert_eq!(shell.surface(1).unwrap().role(), SurfaceRole::Toplevel);
    }

    #[test]
    fn test_get_surface_rejects_bad_requests() {
        let (mut shell, mut host) = setup();

        assert_eq!(shell.get_surface(9, &mut host), Err(ShellError::NotASurface(9)));
        shell.get_surface(1, &mut host).unwrap();
        let err = shell.get_surface(1, &mut host).unwrap_err();
        assert_eq!(err, ShellError::RoleAlreadyAssigned(1));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_ping_pong_is_idempotent() {
        let (mut shell, mut host) = setup();
        shell.get_surface(1, &mut host).unwrap();

        let serial = shell.ping_surface(1, &mut host).unwrap();
        assert_eq!(host.pings, vec![(1, serial)]);
        assert_eq!(shell.outstanding_pings().get(&serial), Some(&1));

        assert_eq!(shell.pong(serial), Some(1));
        assert!(shell.outstanding_pings().is_empty());
        assert_eq!(shell.pong(serial), None);
        assert!(shell.ping_surface(42, &mut host).is_none());
    }

    #[test]
    fn test_unanswered_pings_stay_outstanding() {
        let (mut shell, mut host) = setup();
        shell.get_surface(1, &mut host).unwrap();

        let first = shell.ping_surface(1, &mut host).unwrap();
        let second = shell.ping_surface(1, &mut host).unwrap();
        shell.pong(second);
        assert_eq!(shell.outstanding_pings().keys().copied().collect::<Vec<_>>(), vec![first]);
    }

    #[test]
    fn test_ping_windows_reports_silent_ones() {
        let (mut shell, mut host) = setup();
        shell.get_surface(1, &mut host).unwrap();
        shell.get_surface(2, &mut host).unwrap();

        assert!(shell.ping_windows(&mut host).is_empty());
        assert_eq!(host.pings.len(), 2);
        let (_, answered) = host.pings[0];
        assert_eq!(shell.pong(answered), Some(1));

        assert_eq!(shell.ping_windows(&mut host), vec![2]);
        assert_eq!(host.pings.len(), 3);
        assert_eq!(host.pings[2].0, 1);
        assert_eq!(shell.outstanding_pings().len(), 2);
    }

    #[test]
    fn test_device_grab_is_exclusive_across_surfaces() {
        let (mut shell, mut host) = setup();
        shell.get_surface(1, &mut host).unwrap();
        shell.get_surface(2, &mut host).unwrap();

        shell.request_move(1, 0, &mut host).unwrap();
        assert_eq!(shell.grab_owner(0), Some(1));
        assert_eq!(
            shell.request_resize(2, 0, ResizeEdges::RIGHT, &mut host),
            Err(ShellError::GrabActive(2))
        );
        assert!(shell.surface(2).unwrap().active_grab().is_none());
    }

    #[test]
    fn test_release_ends_grab_and_allows_a_new_one() {
        let (mut shell, mut host) = setup();
        shell.get_surface(1, &mut host).unwrap();
        shell.request_move(1, 0, &mut host).unwrap();

        assert!(shell.pointer_motion(0, Point::new(500, 350), &mut host));
        assert_eq!(host.geometry(1).top_left(), Point::new(100, 50));

        assert!(shell.pointer_button(0, false, Some(1), &mut host));
        assert!(shell.surface(1).unwrap().active_grab().is_none());
        assert!(!host.grabbed.contains(&0));
        assert!(!shell.pointer_motion(0, Point::new(0, 0), &mut host));

        assert!(shell.request_resize(1, 0, ResizeEdges::BOTTOM, &mut host).is_ok());
    }

    #[test]
    fn test_resize_motion_through_registry() {
        let (mut shell, mut host) = setup();
        shell.get_surface(1, &mut host).unwrap();
        host.move_pointer(0, Point::new(800, 300));
        shell.request_resize(1, 0, ResizeEdges::RIGHT, &mut host).unwrap();

        shell.pointer_motion(0, Point::new(850, 300), &mut host);
        let configure = host.last_configure(1).unwrap();
        assert_eq!(configure.size, Size::new(850, 600));
        assert_eq!(configure.states, vec![ConfigureState::Resizing]);

        let serial = configure.serial;
        assert!(shell.ack_configure(1, serial, &mut host));
        assert_eq!(shell.surface(1).unwrap().state(), WindowState::Normal);
    }

    #[test]
    fn test_destroy_during_grab_releases_device() {
        let (mut shell, mut host) = setup();
        shell.get_surface(1, &mut host).unwrap();
        shell.request_move(1, 0, &mut host).unwrap();
        shell.ping_surface(1, &mut host).unwrap();

        assert!(shell.destroy_shell_surface(1, &mut host));
        assert_eq!(shell.grab_owner(0), None);
        assert!(!host.grabbed.contains(&0));
        assert!(shell.outstanding_pings().is_empty());
        assert!(!shell.pointer_motion(0, Point::new(10, 10), &mut host));
        assert!(!shell.pointer_button(0, false, None, &mut host));
        assert!(!shell.destroy_shell_surface(1, &mut host));
    }

    #[test]
    fn test_popup_lifecycle() {
        let (mut shell, mut host) = setup();
        host.add_surface(3, Rectangle::new(0, 0, 200, 100));
        shell.get_surface(1, &mut host).unwrap();

        let params = PopupParams {
            parent: 1,
            device: Some(0),
            serial: 1,
            position: Point::new(20, 30),
            size: Size::new(200, 100),
            flags: 0,
        };
        let serial = shell.get_popup(3, params, &mut host).unwrap();
        assert_eq!(host.popup_configures, vec![(3, Rectangle::new(20, 30, 200, 100), serial)]);
        assert_eq!(shell.popup_grabber(0).unwrap().popups(), &[3]);
        assert!(host.grabbed.contains(&0));

        assert!(!shell.pointer_button(0, true, Some(3), &mut host));
        assert!(shell.pointer_button(0, true, Some(1), &mut host));
        assert_eq!(host.popup_done, vec![3]);
        assert!(!host.grabbed.contains(&0));
    }

    #[test]
    fn test_popup_needs_known_parent() {
        let (mut shell, mut host) = setup();
        let params = PopupParams {
            parent: 1,
            ..PopupParams::default()
        };
        let err = shell.get_popup(2, params, &mut host).unwrap_err();
        assert_eq!(err, ShellError::InvalidPopupParent { popup: 2 });
        assert!(err.is_fatal());
    }

    #[test]
    fn test_destroying_parent_dismisses_child_popups() {
        let (mut shell, mut host) = setup();
        host.add_surface(3, Rectangle::new(0, 0, 200, 100));
        shell.get_surface(1, &mut host).unwrap();
        let params = PopupParams {
            parent: 1,
            size: Size::new(200, 100),
            ..PopupParams::default()
        };
        shell.get_popup(3, params, &mut host).unwrap();
        shell.popup_grab(3, 0, &mut host).unwrap();

        shell.destroy_shell_surface(1, &mut host);
        assert_eq!(host.popup_done, vec![3]);
        assert!(shell.popup_grabber(0).unwrap().popups().is_empty());
        assert!(!host.grabbed.contains(&0));
    }

    #[test]
    fn test_popup_grab_and_window_grab_exclude_each_other() {
        let (mut shell, mut host) = setup();
        host.add_surface(3, Rectangle::new(0, 0, 200, 100));
        shell.get_surface(1, &mut host).unwrap();
        let params = PopupParams {
            parent: 1,
            size: Size::new(200, 100),
            ..PopupParams::default()
        };
        shell.get_popup(3, params, &mut host).unwrap();
        shell.popup_grab(3, 0, &mut host).unwrap();

        assert_eq!(shell.request_move(1, 0, &mut host), Err(ShellError::GrabActive(1)));
        assert_eq!(
            shell.request_resize(1, 0, ResizeEdges::RIGHT, &mut host),
            Err(ShellError::GrabActive(1))
        );
        assert!(!shell.pointer_button(0, false, None, &mut host));
        assert!(shell.popup_grabber(0).unwrap().is_grabbing());
        assert!(host.grabbed.contains(&0));

        shell.pointer_button(0, true, Some(2), &mut host);
        assert!(!host.grabbed.contains(&0));
        shell.request_move(1, 0, &mut host).unwrap();

        host.add_surface(4, Rectangle::new(0, 0, 100, 50));
        let params = PopupParams {
            parent: 1,
            device: Some(0),
            size: Size::new(100, 50),
            ..PopupParams::default()
        };
        shell.get_popup(4, params, &mut host).unwrap();
        assert_eq!(shell.popup_grab(4, 0, &mut host), Err(ShellError::GrabActive(4)));
        assert!(!shell.popup_grabber(0).unwrap().is_grabbing());

        assert!(shell.pointer_button(0, false, None, &mut host));
        assert!(!host.grabbed.contains(&0));
    }

    #[test]
    fn test_popup_grab_requires_popup() {
        let (mut shell, mut host) = setup();
        shell.get_surface(1, &mut host).unwrap();
        assert_eq!(
            shell.popup_grab(1, 0, &mut host),
            Err(ShellError::UnknownSurface(1))
        );
    }

    #[test]
    fn test_coordinator_is_created_once_per_device() {
        let mut shell = Shell::default();
        assert!(shell.popup_grabber(4).is_none());
        shell.popup_grabber_for_device(4);
        shell.popup_grabber_for_device(4);
        assert_eq!(shell.popup_grabber(4).map(|c| c.device()), Some(4));
    }

    #[test]
    fn test_run_operation() {
        let (mut shell, mut host) = setup();
        shell.get_surface(1, &mut host).unwrap();

        assert!(shell.run_operation(1, SurfaceOp::Close, &mut host));
        assert_eq!(host.closed, vec![1]);

        assert!(shell.run_operation(1, SurfaceOp::Resize(Size::new(1024, 768)), &mut host));
        assert_eq!(host.last_configure(1).unwrap().size, Size::new(1024, 768));

        assert!(shell.run_operation(1, SurfaceOp::Ping, &mut host));
        assert_eq!(shell.outstanding_pings().len(), 1);

        assert!(shell.run_operation(1, SurfaceOp::Move, &mut host));
        assert_eq!(shell.grab_owner(0), Some(1));
        assert!(!shell.run_operation(1, SurfaceOp::Move, &mut host));

        assert!(!shell.run_operation(77, SurfaceOp::Close, &mut host));
    }

    #[test]
    fn test_maximize_scenario_through_registry() {
        let (mut shell, mut host) = setup();
        shell.get_surface(1, &mut host).unwrap();
        host.focus(1);
        shell.focus_changed(1, true, &mut host);

        let serial = shell
            .surface_mut(1)
            .and_then(|s| s.set_maximized(&mut host))
            .unwrap();
        let configure = host.last_configure(1).unwrap();
        assert_eq!(configure.size, Size::new(1920, 1050));
        assert_eq!(
            configure.states,
            vec![ConfigureState::Maximized, ConfigureState::Activated]
        );

        assert!(shell.ack_configure(1, serial, &mut host));
        assert_eq!(shell.surface(1).unwrap().state(), WindowState::Maximized);
        assert_eq!(host.geometry(1).top_left(), Point::new(0, 0));
        assert!(!shell.ack_configure(1, serial, &mut host));
    }

    #[test]
    fn test_panel_deletion_is_deferred() {
        let (mut shell, mut host) = setup();
        shell.get_panel_surface(2, &host).unwrap();
        assert_eq!(
            shell.get_panel_surface(2, &host),
            Err(ShellError::RoleAlreadyAssigned(2))
        );
        assert!(shell.panel_request(2, PanelRequest::SetRole(2), &mut host));

        shell.surface_destroyed(2, &mut host);
        assert!(shell.panel(2).is_some_and(|p| p.is_deleting()));
        assert!(!shell.panel_request(2, PanelRequest::SetScreenEdge(1), &mut host));

        assert_eq!(shell.flush_deferred(&mut host), 1);
        assert!(shell.panel(2).is_none());
        assert_eq!(host.forgotten_panels, vec![2]);
        assert_eq!(shell.flush_deferred(&mut host), 0);
    }

    #[test]
    fn test_panel_resource_destroy_is_immediate() {
        let (mut shell, mut host) = setup();
        shell.get_panel_surface(2, &host).unwrap();
        shell.surface_destroyed(2, &mut host);

        assert!(shell.panel_destroyed(2, &mut host));
        assert_eq!(shell.flush_deferred(&mut host), 0);
        assert!(!shell.panel_destroyed(2, &mut host));
    }
}

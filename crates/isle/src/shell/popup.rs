use crate::geometry::{Point, Rectangle, Size};

use super::host::ShellHost;
use super::{DeviceId, Serial, SurfaceId};

/// Creation parameters of a popup. `position` is relative to the parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PopupParams {
    pub parent: SurfaceId,
    pub device: Option<DeviceId>,
    pub serial: Serial,
    pub position: Point,
    pub size: Size,
    pub flags: u32,
}

impl PopupParams {
    pub fn geometry(&self) -> Rectangle {
        Rectangle::from_parts(self.position, self.size)
    }
}

/// Stack of grabbing popups for one input device.
///
/// The first popup takes an exclusive pointer grab on the device; a click
/// outside the stack dismisses every popup, topmost first.
#[derive(Debug)]
pub struct PopupGrabCoordinator {
    device: DeviceId,
    stack: Vec<SurfaceId>,
    grabbing: bool,
}

impl PopupGrabCoordinator {
    pub fn new(device: DeviceId) -> Self {
        Self {
            device,
            stack: Vec::new(),
            grabbing: false,
        }
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn popups(&self) -> &[SurfaceId] {
        &self.stack
    }

    pub fn topmost(&self) -> Option<SurfaceId> {
        self.stack.last().copied()
    }

    pub fn is_grabbing(&self) -> bool {
        self.grabbing
    }

    pub fn contains(&self, popup: SurfaceId) -> bool {
        self.stack.contains(&popup)
    }

    pub fn add_popup(&mut self, popup: SurfaceId, host: &mut dyn ShellHost) {
        if self.contains(popup) {
            return;
        }
        if self.stack.is_empty() {
            host.start_grab(self.device);
            self.grabbing = true;
            log::debug!("[popup] Device {} grabbed for popup {}", self.device, popup);
        }
        self.stack.push(popup);
    }

    /// Returns whether the popup was part of this stack.
    pub fn remove_popup(&mut self, popup: SurfaceId, host: &mut dyn ShellHost) -> bool {
        let Some(pos) = self.stack.iter().position(|p| *p == popup) else {
            return false;
        };
        if pos + 1 != self.stack.len() {
            log::warn!(
                "[popup] Popup {} removed while not topmost on device {}",
                popup,
                self.device
            );
        }
        self.stack.remove(pos);
        if self.stack.is_empty() {
            self.release(host);
        }
        true
    }

    /// Returns true when the press was consumed by dismissing the stack.
    pub fn button_pressed(&mut self, target: Option<SurfaceId>, host: &mut dyn ShellHost) -> bool {
        if self.stack.is_empty() {
            return false;
        }
        if target.is_some_and(|t| self.contains(t)) {
            return false;
        }
        self.dismiss_all(host);
        true
    }

    pub fn dismiss_all(&mut self, host: &mut dyn ShellHost) -> Vec<SurfaceId> {
        let dismissed: Vec<SurfaceId> = self.stack.drain(..).rev().collect();
        for popup in &dismissed {
            host.send_popup_done(*popup);
        }
        self.release(host);
        if !dismissed.is_empty() {
            log::debug!("[popup] Dismissed {} popup(s) on device {}", dismissed.len(), self.device);
        }
        dismissed
    }

    fn release(&mut self, host: &mut dyn ShellHost) {
        if self.grabbing {
            host.end_grab(self.device);
            self.grabbing = false;
        }
    }
}

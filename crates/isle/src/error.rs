use thiserror::Error;

use crate::shell::{DeviceId, SurfaceId};
use crate::shell::surface::WindowState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShellError {
    #[error("surface {0} is not known to the shell")]
    UnknownSurface(SurfaceId),
    #[error("object {0} is not a wl_surface")]
    NotASurface(SurfaceId),
    #[error("surface {0} already has a shell role")]
    RoleAlreadyAssigned(SurfaceId),
    #[error("surface {0} already has a move or resize operation in progress")]
    GrabActive(SurfaceId),
    #[error("surface {surface} cannot start an interactive operation while {state:?}")]
    InvalidWindowState { surface: SurfaceId, state: WindowState },
    #[error("unsupported shell version {requested}, the compositor supports up to {supported}")]
    UnsupportedVersion { requested: u32, supported: u32 },
    #[error("popup {popup} has no usable parent")]
    InvalidPopupParent { popup: SurfaceId },
    #[error("input device {0} is not known")]
    UnknownDevice(DeviceId),
}

impl ShellError {
    /// Structural errors terminate the client connection, everything else
    /// degrades to "request had no effect".
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShellError::NotASurface(_)
                | ShellError::UnsupportedVersion { .. }
                | ShellError::InvalidPopupParent { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ShellError::NotASurface(3).is_fatal());
        assert!(ShellError::UnsupportedVersion { requested: 9, supported: 5 }.is_fatal());
        assert!(!ShellError::GrabActive(3).is_fatal());
        assert!(!ShellError::RoleAlreadyAssigned(3).is_fatal());
        assert!(!ShellError::InvalidWindowState { surface: 3, state: WindowState::Maximized }
            .is_fatal());
    }

    #[test]
    fn test_messages_name_the_surface() {
        let msg = ShellError::GrabActive(42).to_string();
        assert!(msg.contains("42"));
    }
}

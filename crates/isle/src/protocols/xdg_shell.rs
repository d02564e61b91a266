use std::sync::Mutex;

use wayland_protocols::xdg::shell::server::{
    xdg_popup::{self, XdgPopup},
    xdg_positioner::{self, Anchor, Gravity, XdgPositioner},
    xdg_surface::{self, XdgSurface},
    xdg_toplevel::{self, XdgToplevel},
    xdg_wm_base::{self, XdgWmBase},
};
use wayland_server::{Dispatch, GlobalDispatch, Resource, WEnum};

use crate::error::ShellError;
use crate::geometry::{Point, Rectangle, Size};
use crate::protocols::seat::device_of;
use crate::shell::{PopupParams, ResizeEdges, SurfaceId};
use crate::state::State;

pub struct XdgSurfaceData {
    pub surface: SurfaceId,
}

pub struct ToplevelData {
    pub surface: SurfaceId,
}

pub struct PopupData {
    pub surface: SurfaceId,
}

#[derive(Debug, Clone, Copy)]
pub struct PositionerState {
    pub size: Size,
    pub anchor_rect: Rectangle,
    pub anchor: Anchor,
    pub gravity: Gravity,
    pub offset: Point,
}

impl Default for PositionerState {
    fn default() -> Self {
        Self {
            size: Size::default(),
            anchor_rect: Rectangle::default(),
            anchor: Anchor::None,
            gravity: Gravity::None,
            offset: Point::default(),
        }
    }
}

impl PositionerState {
    /// Popup rectangle relative to the parent's window geometry.
    pub fn geometry(&self) -> Rectangle {
        let mut geometry = Rectangle::from_parts(self.offset, self.size);
        let anchor_rect = self.anchor_rect;

        geometry.x += match self.anchor {
            Anchor::Left | Anchor::BottomLeft | Anchor::TopLeft => anchor_rect.x,
            Anchor::Right | Anchor::BottomRight | Anchor::TopRight => anchor_rect.right(),
            _ => anchor_rect.x + anchor_rect.width / 2,
        };
        geometry.y += match self.anchor {
            Anchor::Top | Anchor::TopLeft | Anchor::TopRight => anchor_rect.y,
            Anchor::Bottom | Anchor::BottomLeft | Anchor::BottomRight => anchor_rect.bottom(),
            _ => anchor_rect.y + anchor_rect.height / 2,
        };

        geometry.x -= match self.gravity {
            Gravity::Left | Gravity::BottomLeft | Gravity::TopLeft => geometry.width,
            Gravity::Right | Gravity::BottomRight | Gravity::TopRight => 0,
            _ => geometry.width / 2,
        };
        geometry.y -= match self.gravity {
            Gravity::Top | Gravity::TopLeft | Gravity::TopRight => geometry.height,
            Gravity::Bottom | Gravity::BottomLeft | Gravity::BottomRight => 0,
            _ => geometry.height / 2,
        };

        geometry
    }
}

/// Structural errors end the client, everything else only gets logged.
fn report<R: Resource>(resource: &R, code: u32, err: &ShellError) {
    if err.is_fatal() {
        log::warn!("[xdg_shell] Protocol error on {}: {}", resource.id(), err);
        resource.post_error(code, err.to_string());
    } else {
        log::debug!("[xdg_shell] Request ignored: {}", err);
    }
}

impl GlobalDispatch<XdgWmBase, ()> for State {
    fn bind(
        state: &mut Self,
        _handle: &wayland_server::DisplayHandle,
        _client: &wayland_server::Client,
        resource: wayland_server::New<XdgWmBase>,
        _global_data: &(),
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        let wm_base = data_init.init(resource, ());
        if let Err(e) = state.shell.check_version(wm_base.version()) {
            report(&wm_base, xdg_wm_base::Error::Role as u32, &e);
        }
    }
}

impl Dispatch<XdgWmBase, ()> for State {
    fn request(
        state: &mut Self,
        _client: &wayland_server::Client,
        resource: &XdgWmBase,
        request: xdg_wm_base::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        match request {
            xdg_wm_base::Request::CreatePositioner { id } => {
                data_init.init(id, Mutex::new(PositionerState::default()));
            }
            xdg_wm_base::Request::GetXdgSurface { id, surface } => {
                let Some(surface_id) = surface.data::<SurfaceId>().copied() else {
                    let xdg_surface = data_init.init(id, XdgSurfaceData { surface: 0 });
                    report(
                        &xdg_surface,
                        xdg_wm_base::Error::Role as u32,
                        &ShellError::NotASurface(0),
                    );
                    return;
                };
                let xdg_surface = data_init.init(id, XdgSurfaceData { surface: surface_id });

                let Some(host_surface) = state.host.surface_mut(surface_id) else {
                    report(
                        resource,
                        xdg_wm_base::Error::Role as u32,
                        &ShellError::NotASurface(surface_id),
                    );
                    return;
                };
                if host_surface.xdg_surface.is_some() {
                    resource.post_error(
                        xdg_wm_base::Error::Role,
                        format!("surface {} already has an xdg_surface", surface_id),
                    );
                    return;
                }
                host_surface.xdg_surface = Some(xdg_surface);
                host_surface.wm_base = Some(resource.clone());
            }
            xdg_wm_base::Request::Pong { serial } => {
                if let Some(surface) = state.shell.pong(serial) {
                    log::trace!("[xdg_shell] Pong {} from surface {}", serial, surface);
                }
            }
            xdg_wm_base::Request::Destroy => {}
            _ => {}
        }
    }
}

impl Dispatch<XdgPositioner, Mutex<PositionerState>> for State {
    fn request(
        _state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &XdgPositioner,
        request: xdg_positioner::Request,
        data: &Mutex<PositionerState>,
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        let Ok(mut positioner) = data.lock() else {
            return;
        };
        match request {
            xdg_positioner::Request::SetSize { width, height } => {
                positioner.size = Size::new(width, height);
            }
            xdg_positioner::Request::SetAnchorRect {
                x,
                y,
                width,
                height,
            } => {
                positioner.anchor_rect = Rectangle::new(x, y, width, height);
            }
            xdg_positioner::Request::SetAnchor { anchor } => {
                if let WEnum::Value(anchor) = anchor {
                    positioner.anchor = anchor;
                }
            }
            xdg_positioner::Request::SetGravity { gravity } => {
                if let WEnum::Value(gravity) = gravity {
                    positioner.gravity = gravity;
                }
            }
            xdg_positioner::Request::SetOffset { x, y } => {
                positioner.offset = Point::new(x, y);
            }
            _ => {}
        }
    }
}

impl Dispatch<XdgSurface, XdgSurfaceData> for State {
    fn request(
        state: &mut Self,
        _client: &wayland_server::Client,
        resource: &XdgSurface,
        request: xdg_surface::Request,
        data: &XdgSurfaceData,
        _dhandle: &wayland_server::DisplayHandle,
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        let surface_id = data.surface;
        match request {
            xdg_surface::Request::GetToplevel { id } => {
                let toplevel = data_init.init(id, ToplevelData { surface: surface_id });
                match state.assign_toplevel(surface_id, toplevel) {
                    Ok(_) => log::info!("[xdg_shell] Toplevel {} created", surface_id),
                    Err(e) => report(resource, xdg_surface::Error::AlreadyConstructed as u32, &e),
                }
            }
            xdg_surface::Request::GetPopup {
                id,
                parent,
                positioner,
            } => {
                let popup = data_init.init(id, PopupData { surface: surface_id });
                let parent = parent
                    .as_ref()
                    .and_then(|p| p.data::<XdgSurfaceData>())
                    .map(|d| d.surface);
                let Some(parent) = parent else {
                    report(
                        resource,
                        xdg_wm_base::Error::InvalidPopupParent as u32,
                        &ShellError::InvalidPopupParent { popup: surface_id },
                    );
                    return;
                };

                let geometry = positioner
                    .data::<Mutex<PositionerState>>()
                    .and_then(|p| p.lock().ok().map(|p| p.geometry()))
                    .unwrap_or_default();
                let params = PopupParams {
                    parent,
                    device: None,
                    serial: 0,
                    position: geometry.top_left(),
                    size: geometry.size(),
                    flags: 0,
                };

                if let Err(e) = state.assign_popup(surface_id, popup, params) {
                    report(resource, xdg_wm_base::Error::InvalidPopupParent as u32, &e);
                }
            }
            xdg_surface::Request::AckConfigure { serial } => {
                state.shell.ack_configure(surface_id, serial, &mut state.host);
            }
            xdg_surface::Request::SetWindowGeometry {
                x,
                y,
                width,
                height,
            } => {
                if let Some(surface) = state.shell.surface_mut(surface_id) {
                    surface.set_window_geometry(Rectangle::new(x, y, width, height));
                }
            }
            xdg_surface::Request::Destroy => {}
            _ => {}
        }
    }

    fn destroyed(
        state: &mut Self,
        _client: wayland_server::backend::ClientId,
        _resource: &XdgSurface,
        data: &XdgSurfaceData,
    ) {
        if let Some(host_surface) = state.host.surface_mut(data.surface) {
            host_surface.xdg_surface = None;
        }
    }
}

fn resize_edges(edges: WEnum<xdg_toplevel::ResizeEdge>) -> ResizeEdges {
    match edges {
        WEnum::Value(edge) => ResizeEdges::from_bits(edge as u32),
        WEnum::Unknown(bits) => ResizeEdges::from_bits(bits),
    }
}

impl Dispatch<XdgToplevel, ToplevelData> for State {
    fn request(
        state: &mut Self,
        _client: &wayland_server::Client,
        resource: &XdgToplevel,
        request: xdg_toplevel::Request,
        data: &ToplevelData,
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        let surface_id = data.surface;
        if let xdg_toplevel::Request::Destroy = request {
            state.toplevel_destroyed(surface_id, resource);
            return;
        }

        let host = &mut state.host;
        let Some(surface) = state.shell.surface_mut(surface_id) else {
            log::debug!("[xdg_shell] Request for unmanaged toplevel {}", surface_id);
            return;
        };

        match request {
            xdg_toplevel::Request::SetTitle { title } => {
                log::debug!("[xdg_shell] Surface {} title {:?}", surface_id, title);
                surface.set_title(title);
            }
            xdg_toplevel::Request::SetAppId { app_id } => surface.set_app_id(app_id),
            xdg_toplevel::Request::SetParent { parent } => {
                let parent = parent
                    .as_ref()
                    .and_then(|p| p.data::<ToplevelData>())
                    .map(|d| d.surface);
                surface.set_parent(parent, host);
            }
            xdg_toplevel::Request::ShowWindowMenu { .. } => {}
            xdg_toplevel::Request::Move { seat, .. } => {
                let device = device_of(&seat);
                if let Err(e) = state.shell.request_move(surface_id, device, host) {
                    report(resource, 0, &e);
                }
            }
            xdg_toplevel::Request::Resize { seat, edges, .. } => {
                let device = device_of(&seat);
                let edges = resize_edges(edges);
                if let Err(e) = state.shell.request_resize(surface_id, device, edges, host) {
                    report(resource, 0, &e);
                }
            }
            xdg_toplevel::Request::SetMaxSize { .. } => {}
            xdg_toplevel::Request::SetMinSize { .. } => {}
            xdg_toplevel::Request::SetMaximized => {
                surface.set_maximized(host);
            }
            xdg_toplevel::Request::UnsetMaximized => {
                surface.unset_maximized(host);
            }
            xdg_toplevel::Request::SetFullscreen { output } => {
                let output = output.as_ref().and_then(|o| host.output_for_resource(o));
                surface.set_fullscreen(output, host);
            }
            xdg_toplevel::Request::UnsetFullscreen => {
                surface.unset_fullscreen(host);
            }
            xdg_toplevel::Request::SetMinimized => {
                surface.set_minimized(host);
            }
            _ => {}
        }
    }

    fn destroyed(
        state: &mut Self,
        _client: wayland_server::backend::ClientId,
        resource: &XdgToplevel,
        data: &ToplevelData,
    ) {
        state.toplevel_destroyed(data.surface, resource);
    }
}

impl Dispatch<XdgPopup, PopupData> for State {
    fn request(
        state: &mut Self,
        _client: &wayland_server::Client,
        resource: &XdgPopup,
        request: xdg_popup::Request,
        data: &PopupData,
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        match request {
            xdg_popup::Request::Grab { seat, .. } => {
                let device = device_of(&seat);
                if let Err(e) = state.shell.popup_grab(data.surface, device, &mut state.host) {
                    report(resource, xdg_popup::Error::InvalidGrab as u32, &e);
                }
            }
            xdg_popup::Request::Destroy => {
                state.popup_destroyed(data.surface, resource);
            }
            _ => {}
        }
    }

    fn destroyed(
        state: &mut Self,
        _client: wayland_server::backend::ClientId,
        resource: &XdgPopup,
        data: &PopupData,
    ) {
        state.popup_destroyed(data.surface, resource);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positioner_below_anchor() {
        let positioner = PositionerState {
            size: Size::new(200, 150),
            anchor_rect: Rectangle::new(486, 0, 44, 28),
            anchor: Anchor::BottomLeft,
            gravity: Gravity::BottomRight,
            offset: Point::default(),
        };
        assert_eq!(positioner.geometry(), Rectangle::new(486, 28, 200, 150));
    }

    #[test]
    fn test_positioner_centers_by_default() {
        let positioner = PositionerState {
            size: Size::new(100, 50),
            anchor_rect: Rectangle::new(0, 0, 400, 200),
            offset: Point::new(5, -5),
            ..PositionerState::default()
        };
        assert_eq!(positioner.geometry(), Rectangle::new(155, 70, 100, 50));
    }

    #[test]
    fn test_resize_edges_from_wire() {
        assert_eq!(
            resize_edges(WEnum::Value(xdg_toplevel::ResizeEdge::BottomRight)),
            ResizeEdges::BOTTOM_RIGHT
        );
        assert_eq!(resize_edges(WEnum::Unknown(0x28)), ResizeEdges::RIGHT);
    }
}

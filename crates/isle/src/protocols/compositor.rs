use wayland_server::protocol::{
    wl_callback::WlCallback,
    wl_compositor::{self, WlCompositor},
    wl_region::{self, WlRegion},
    wl_surface::{self, WlSurface},
};
use wayland_server::{Dispatch, GlobalDispatch};

use crate::shell::SurfaceId;
use crate::state::State;

impl GlobalDispatch<WlCompositor, ()> for State {
    fn bind(
        _state: &mut Self,
        _handle: &wayland_server::DisplayHandle,
        _client: &wayland_server::Client,
        resource: wayland_server::New<WlCompositor>,
        _global_data: &(),
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        data_init.init(resource, ());
    }
}

impl Dispatch<WlCompositor, ()> for State {
    fn request(
        state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &WlCompositor,
        request: wl_compositor::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        match request {
            wl_compositor::Request::CreateSurface { id } => {
                let surface_id = state.host.allocate_surface_id();
                let wl_surface = data_init.init(id, surface_id);
                state.host.add_surface(surface_id, wl_surface);
                log::debug!("[surface] Surface {} created", surface_id);
            }
            wl_compositor::Request::CreateRegion { id } => {
                data_init.init(id, ());
            }
            _ => {}
        }
    }
}

impl Dispatch<WlSurface, SurfaceId> for State {
    fn request(
        state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &WlSurface,
        request: wl_surface::Request,
        data: &SurfaceId,
        _dhandle: &wayland_server::DisplayHandle,
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        let surface_id = *data;
        match request {
            wl_surface::Request::Attach { buffer, .. } => {
                if let Some(surface) = state.host.surface_mut(surface_id) {
                    surface.pending_buffer = buffer;
                    surface.pending_buffer_set = true;
                }
            }
            wl_surface::Request::Commit => {
                if let Some(mapped) = state.host.commit(surface_id) {
                    if mapped {
                        log::info!("[surface] Surface {} mapped", surface_id);
                    } else {
                        log::info!("[surface] Surface {} unmapped", surface_id);
                    }
                }
            }
            wl_surface::Request::Frame { callback } => {
                let cb = data_init.init(callback, ());
                state.host.frame_callbacks.push(cb);
            }
            wl_surface::Request::Destroy => {
                log::debug!("[surface] Destroy request for surface {}", surface_id);
            }
            _ => {}
        }
    }

    fn destroyed(
        state: &mut Self,
        _client: wayland_server::backend::ClientId,
        _resource: &WlSurface,
        data: &SurfaceId,
    ) {
        state.surface_destroyed(*data);
    }
}

impl Dispatch<WlCallback, ()> for State {
    fn request(
        _state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &WlCallback,
        _request: wayland_server::protocol::wl_callback::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
    }
}

impl Dispatch<WlRegion, ()> for State {
    fn request(
        _state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &WlRegion,
        _request: wl_region::Request,
        _data: &(),
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
    }
}

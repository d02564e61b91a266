use wayland_server::protocol::wl_output::{self, WlOutput};
use wayland_server::{Dispatch, GlobalDispatch, Resource};

use crate::shell::OutputId;
use crate::state::State;

impl GlobalDispatch<WlOutput, OutputId> for State {
    fn bind(
        state: &mut Self,
        _handle: &wayland_server::DisplayHandle,
        _client: &wayland_server::Client,
        resource: wayland_server::New<WlOutput>,
        global_data: &OutputId,
        data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
        let wl_output = data_init.init(resource, *global_data);
        let Some(output) = state.host.output_mut(*global_data) else {
            log::warn!("[output] Bind for unknown output {}", global_data);
            return;
        };

        let g = output.geometry;
        wl_output.geometry(
            g.x,
            g.y,
            0,
            0,
            wl_output::Subpixel::Unknown,
            output.make.clone(),
            output.model.clone(),
            wl_output::Transform::Normal,
        );
        wl_output.mode(
            wl_output::Mode::Current | wl_output::Mode::Preferred,
            g.width,
            g.height,
            output.refresh,
        );
        if wl_output.version() >= 2 {
            wl_output.scale(1);
        }
        if wl_output.version() >= 4 {
            wl_output.name(output.name.clone());
        }
        if wl_output.version() >= 2 {
            wl_output.done();
        }
        output.wl_outputs.push(wl_output);
    }
}

impl Dispatch<WlOutput, OutputId> for State {
    fn request(
        _state: &mut Self,
        _client: &wayland_server::Client,
        _resource: &WlOutput,
        _request: wl_output::Request,
        _data: &OutputId,
        _dhandle: &wayland_server::DisplayHandle,
        _data_init: &mut wayland_server::DataInit<'_, Self>,
    ) {
    }

    fn destroyed(
        state: &mut Self,
        _client: wayland_server::backend::ClientId,
        resource: &WlOutput,
        data: &OutputId,
    ) {
        if let Some(output) = state.host.output_mut(*data) {
            output.wl_outputs.retain(|o| o.id() != resource.id());
        }
    }
}

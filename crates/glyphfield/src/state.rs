//! Restoring default bindings after a pass.

use tracing::warn;

use crate::backend::Backend;

/// Unbinds everything a pass may have bound and restores the viewport when
/// dropped, including on early returns.
pub(crate) struct BindingGuard<'a, B: Backend> {
    backend: &'a B,
    viewport: [i32; 4],
    texture_units: u32,
}

impl<'a, B: Backend> BindingGuard<'a, B> {
    pub(crate) fn new(backend: &'a B, texture_units: u32) -> Self {
        Self {
            backend,
            viewport: backend.viewport(),
            texture_units,
        }
    }
}

impl<B: Backend> Drop for BindingGuard<'_, B> {
    fn drop(&mut self) {
        let b = self.backend;
        b.use_program(None);
        b.bind_vertex_array(None);
        // Highest unit first so unit 0 ends up active.
        for unit in (0..self.texture_units).rev() {
            b.bind_texture(unit, None);
        }
        b.bind_framebuffer(None);
        b.set_viewport(self.viewport);
    }
}

/// Upper bound on queued error codes drained after a pass. A lost context can
/// report errors forever.
const MAX_DRAINED_ERRORS: usize = 32;

/// Log and discard pending backend errors. Returns how many were seen.
pub(crate) fn drain_errors<B: Backend>(backend: &B, pass: &str) -> usize {
    let mut seen = 0;
    while seen < MAX_DRAINED_ERRORS {
        let Some(code) = backend.take_error() else {
            break;
        };
        warn!("GL error 0x{:04x} during {}", code, pass);
        seen += 1;
    }
    seen
}

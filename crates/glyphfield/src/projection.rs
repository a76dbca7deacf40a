//! Projection matrices for the generator and renderer passes.

pub use glam::Mat4;

/// Orthographic projection of the box `[left, right] x [bottom, top]` onto
/// clip space, depth range `[-1, 1]`.
pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32) -> Mat4 {
    Mat4::orthographic_rh_gl(left, right, bottom, top, -1.0, 1.0)
}

/// Pixel coordinates with the origin at the top-left corner, y down.
pub fn screen(width: f32, height: f32) -> Mat4 {
    orthographic(0.0, width, height, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn apply(m: &Mat4, x: f32, y: f32) -> Vec3 {
        m.transform_point3(Vec3::new(x, y, 0.0))
    }

    #[test]
    fn screen_maps_corners_to_clip_space() {
        let m = screen(800.0, 600.0);
        let tl = apply(&m, 0.0, 0.0);
        let br = apply(&m, 800.0, 600.0);
        assert!((tl.x + 1.0).abs() < 1e-6 && (tl.y - 1.0).abs() < 1e-6);
        assert!((br.x - 1.0).abs() < 1e-6 && (br.y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn symmetric_atlas_projection_divides_by_size() {
        let m = orthographic(-512.0, 512.0, -512.0, 512.0);
        let uv = apply(&m, 128.0, 256.0);
        assert!((uv.x - 0.25).abs() < 1e-6);
        assert!((uv.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn matrices_upload_column_major() {
        let cols = orthographic(0.0, 4.0, 0.0, 2.0).to_cols_array();
        assert!((cols[0] - 0.5).abs() < 1e-6);
        assert!((cols[5] - 1.0).abs() < 1e-6);
        // Translation lives in the last column.
        assert!((cols[12] + 1.0).abs() < 1e-6);
        assert!((cols[13] + 1.0).abs() < 1e-6);
    }
}

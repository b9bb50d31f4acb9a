//! Display-transform engine
//!
//! Pure 2D affine math mapping a raw sensor buffer onto an on-screen
//! viewport. Covers rotation, crop/fit policy, zoom, mirroring, independent
//! horizontal stretch, and vertical anchor alignment.
//!
//! The composition order is fixed and load-bearing: translate the source
//! center to the origin, rotate, scale X/Y independently, translate to the
//! viewport center, then apply the vertical alignment offset. Reordering
//! changes visual output.

use serde::{Deserialize, Serialize};

/// How the source is scaled into the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropPolicy {
    /// Letterbox: the whole source stays visible (min scale)
    Fit,
    /// Center-crop: the viewport is fully covered (max scale)
    Fill,
}

/// Vertical anchor of the rendered image inside the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    Top,
    Bottom,
    Center,
}

/// Immutable input bundle for one transform computation
///
/// Recomputed from scratch on every relevant change, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSpec {
    /// Raw source buffer size, pre-rotation
    pub buffer_width: u32,
    pub buffer_height: u32,
    /// Rotation in degrees, any value; normalized to [0,360)
    pub rotation_deg: f32,
    pub crop: CropPolicy,
    /// Uniform zoom multiplier, must be > 0
    pub zoom: f32,
    /// Horizontal flip
    pub mirror: bool,
    pub vertical_align: VerticalAlign,
    /// Post-multiplier on the X scale only, must be > 0
    pub horizontal_stretch: f32,
    /// Destination viewport size
    pub viewport_width: u32,
    pub viewport_height: u32,
}

/// 2D affine matrix with post-concatenation semantics
///
/// Maps points as `(x', y') = (a*x + c*y + tx, b*x + d*y + ty)`. The
/// `post_*` methods concatenate a new operation after everything applied so
/// far, matching the view layer's matrix convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Matrix {
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    pub fn post_translate(&mut self, dx: f32, dy: f32) {
        self.tx += dx;
        self.ty += dy;
    }

    pub fn post_scale(&mut self, sx: f32, sy: f32) {
        self.a *= sx;
        self.c *= sx;
        self.tx *= sx;
        self.b *= sy;
        self.d *= sy;
        self.ty *= sy;
    }

    pub fn post_rotate(&mut self, degrees: f32) {
        let rad = degrees.to_radians();
        let (sin, cos) = rad.sin_cos();
        let (a, b, c, d, tx, ty) = (self.a, self.b, self.c, self.d, self.tx, self.ty);
        self.a = cos * a - sin * b;
        self.c = cos * c - sin * d;
        self.tx = cos * tx - sin * ty;
        self.b = sin * a + cos * b;
        self.d = sin * c + cos * d;
        self.ty = sin * tx + cos * ty;
    }

    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Effective scale magnitudes on the X and Y axes
    pub fn scale_factors(&self) -> (f32, f32) {
        (
            (self.a * self.a + self.b * self.b).sqrt(),
            (self.c * self.c + self.d * self.d).sqrt(),
        )
    }

    pub fn approx_eq(&self, other: &Matrix, epsilon: f32) -> bool {
        (self.a - other.a).abs() <= epsilon
            && (self.b - other.b).abs() <= epsilon
            && (self.c - other.c).abs() <= epsilon
            && (self.d - other.d).abs() <= epsilon
            && (self.tx - other.tx).abs() <= epsilon
            && (self.ty - other.ty).abs() <= epsilon
    }
}

/// Normalize degrees into [0,360)
pub fn normalize_degrees(deg: f32) -> f32 {
    ((deg % 360.0) + 360.0) % 360.0
}

/// Rotation to apply to the internal sensor stream, derived from display
/// rotation and the sensor's mounting orientation
pub fn rotation_from_orientation(display_deg: i32, sensor_deg: i32) -> f32 {
    (((display_deg - sensor_deg) % 360 + 360) % 360) as f32
}

/// Compute the buffer-to-viewport transform for `spec`.
///
/// Returns `None` on degenerate input (non-positive buffer or viewport
/// dimensions, zoom or stretch not above zero); callers must keep applying
/// the previous matrix instead.
pub fn compute_transform(spec: &TransformSpec) -> Option<Matrix> {
    if spec.buffer_width == 0 || spec.buffer_height == 0 {
        return None;
    }
    if spec.viewport_width == 0 || spec.viewport_height == 0 {
        return None;
    }
    if spec.zoom <= 0.0 || spec.horizontal_stretch <= 0.0 {
        return None;
    }

    let src_w = spec.buffer_width as f32;
    let src_h = spec.buffer_height as f32;
    let vw = spec.viewport_width as f32;
    let vh = spec.viewport_height as f32;

    let rot = normalize_degrees(spec.rotation_deg);
    let quarter_turn = rot == 90.0 || rot == 270.0;

    // A quarter turn swaps the dimensions that matter for aspect math.
    let (eff_w, eff_h) = if quarter_turn {
        (src_h, src_w)
    } else {
        (src_w, src_h)
    };

    let base = match spec.crop {
        CropPolicy::Fit => (vw / eff_w).min(vh / eff_h),
        CropPolicy::Fill => (vw / eff_w).max(vh / eff_h),
    };
    let scale = base * spec.zoom;

    let mut sx = scale * spec.horizontal_stretch;
    let sy = scale;
    if spec.mirror {
        sx = -sx;
    }

    let mut m = Matrix::identity();
    m.post_translate(-src_w / 2.0, -src_h / 2.0);
    if rot != 0.0 {
        m.post_rotate(rot);
    }
    m.post_scale(sx, sy);
    m.post_translate(vw / 2.0, vh / 2.0);

    let rendered_h = eff_h * sy;
    match spec.vertical_align {
        VerticalAlign::Top => m.post_translate(0.0, -(rendered_h - vh) / 2.0),
        VerticalAlign::Bottom => m.post_translate(0.0, (rendered_h - vh) / 2.0),
        VerticalAlign::Center => {}
    }

    Some(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(buf: (u32, u32), view: (u32, u32)) -> TransformSpec {
        TransformSpec {
            buffer_width: buf.0,
            buffer_height: buf.1,
            rotation_deg: 0.0,
            crop: CropPolicy::Fit,
            zoom: 1.0,
            mirror: false,
            vertical_align: VerticalAlign::Center,
            horizontal_stretch: 1.0,
            viewport_width: view.0,
            viewport_height: view.1,
        }
    }

    #[test]
    fn test_identity_when_sizes_match() {
        let m = compute_transform(&spec((1280, 720), (1280, 720))).unwrap();
        assert!(m.approx_eq(&Matrix::identity(), 1e-4));
        let (sx, sy) = m.scale_factors();
        assert!((sx - 1.0).abs() < 1e-5);
        assert!((sy - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_rotated_fit_scale() {
        // 1280x720 into 800x600 at 90 degrees: effective source is 720x1280,
        // so the fit scale is min(800/720, 600/1280) = 0.46875.
        let mut s = spec((1280, 720), (800, 600));
        s.rotation_deg = 90.0;
        let m = compute_transform(&s).unwrap();
        let (sx, sy) = m.scale_factors();
        assert!((sx - 0.46875).abs() < 1e-5);
        assert!((sy - 0.46875).abs() < 1e-5);
    }

    #[test]
    fn test_fill_uses_max_axis() {
        let mut s = spec((1280, 720), (800, 600));
        s.crop = CropPolicy::Fill;
        let m = compute_transform(&s).unwrap();
        let (_, sy) = m.scale_factors();
        // 800/1280 = 0.625, 600/720 = 0.8333; fill takes the larger.
        assert!((sy - 600.0 / 720.0).abs() < 1e-5);
    }

    #[test]
    fn test_center_maps_to_center() {
        let m = compute_transform(&spec((1280, 720), (800, 600))).unwrap();
        let (cx, cy) = m.map_point(640.0, 360.0);
        assert!((cx - 400.0).abs() < 1e-3);
        assert!((cy - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_negative_rotation_normalizes() {
        let mut a = spec((1280, 720), (800, 600));
        a.rotation_deg = -90.0;
        let mut b = a.clone();
        b.rotation_deg = 270.0;
        let ma = compute_transform(&a).unwrap();
        let mb = compute_transform(&b).unwrap();
        assert!(ma.approx_eq(&mb, 1e-4));
    }

    #[test]
    fn test_zoom_multiplies_scale() {
        let mut s = spec((1280, 720), (1280, 720));
        s.zoom = 2.0;
        let m = compute_transform(&s).unwrap();
        let (sx, sy) = m.scale_factors();
        assert!((sx - 2.0).abs() < 1e-5);
        assert!((sy - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_stretch_affects_x_only() {
        let mut s = spec((1280, 720), (1280, 720));
        s.horizontal_stretch = 0.5;
        let m = compute_transform(&s).unwrap();
        let (sx, sy) = m.scale_factors();
        assert!((sx - 0.5).abs() < 1e-5);
        assert!((sy - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_mirror_flips_x() {
        let mut s = spec((1280, 720), (1280, 720));
        s.mirror = true;
        let m = compute_transform(&s).unwrap();
        // Left edge lands on the right edge and vice versa.
        let (x, _) = m.map_point(0.0, 360.0);
        assert!((x - 1280.0).abs() < 1e-3);
        let (x, _) = m.map_point(1280.0, 360.0);
        assert!(x.abs() < 1e-3);
    }

    #[test]
    fn test_top_alignment_shifts_up_by_half_overhang() {
        // Render taller than the viewport: 720x1280 filled into 600x600
        // scales by 600/720, rendering 1066.67px of height.
        let mut centered = spec((720, 1280), (600, 600));
        centered.crop = CropPolicy::Fill;
        let mut top = centered.clone();
        top.vertical_align = VerticalAlign::Top;

        let mc = compute_transform(&centered).unwrap();
        let mt = compute_transform(&top).unwrap();

        let rendered_h = 1280.0 * (600.0 / 720.0);
        let overhang_half = (rendered_h - 600.0) / 2.0;
        assert!((mt.ty - (mc.ty - overhang_half)).abs() < 1e-3);
        assert!((mt.tx - mc.tx).abs() < 1e-5);
        // The shifted render's bottom edge lands on the viewport bottom.
        let (_, y) = mt.map_point(360.0, 1280.0);
        assert!((y - 600.0).abs() < 1e-3);
    }

    #[test]
    fn test_bottom_alignment_mirrors_top_offset() {
        let mut s = spec((720, 1280), (600, 600));
        s.crop = CropPolicy::Fill;
        let mc = compute_transform(&s).unwrap();
        s.vertical_align = VerticalAlign::Bottom;
        let mb = compute_transform(&s).unwrap();
        s.vertical_align = VerticalAlign::Top;
        let mt = compute_transform(&s).unwrap();

        assert!(((mb.ty - mc.ty) + (mt.ty - mc.ty)).abs() < 1e-3);
        assert!(mb.ty > mc.ty && mt.ty < mc.ty);
    }

    #[test]
    fn test_degenerate_inputs_yield_none() {
        assert!(compute_transform(&spec((0, 720), (800, 600))).is_none());
        assert!(compute_transform(&spec((1280, 0), (800, 600))).is_none());
        assert!(compute_transform(&spec((1280, 720), (0, 600))).is_none());
        assert!(compute_transform(&spec((1280, 720), (800, 0))).is_none());

        let mut s = spec((1280, 720), (800, 600));
        s.zoom = 0.0;
        assert!(compute_transform(&s).is_none());
        s.zoom = 1.0;
        s.horizontal_stretch = -1.0;
        assert!(compute_transform(&s).is_none());
    }

    #[test]
    fn test_idempotent() {
        let s = spec((1280, 720), (800, 600));
        let a = compute_transform(&s).unwrap();
        let b = compute_transform(&s).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rotation_from_orientation() {
        assert_eq!(rotation_from_orientation(0, 90), 270.0);
        assert_eq!(rotation_from_orientation(90, 90), 0.0);
        assert_eq!(rotation_from_orientation(0, 0), 0.0);
        assert_eq!(rotation_from_orientation(270, 90), 180.0);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(450.0), 90.0);
    }
}

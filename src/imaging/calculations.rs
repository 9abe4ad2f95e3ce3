//! Pure calculation functions for effect geometry and colour math.
//!
//! All functions here are pure and testable without any I/O or images.

/// Sepia colour matrix, one row per output channel (R, G, B).
pub const SEPIA_MATRIX: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Calculate dimensions that fit `source` inside `bounds`, preserving aspect ratio.
///
/// Never upscales: a source that already fits is returned unchanged. Both
/// output dimensions are at least 1.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `bounds` - Bounding box (width, height)
///
/// # Returns
/// * `(width, height)` - Fitted dimensions
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    if src_w <= max_w && src_h <= max_h {
        return source;
    }

    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, max_w.max(1));
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, max_h.max(1));
    (w, h)
}

/// Apply [`SEPIA_MATRIX`] to one RGB pixel, clamping each channel to 0..=255.
pub fn sepia_pixel([r, g, b]: [u8; 3]) -> [u8; 3] {
    let input = [r as f32, g as f32, b as f32];
    let mut out = [0u8; 3];
    for (channel, row) in out.iter_mut().zip(SEPIA_MATRIX.iter()) {
        let v = row[0] * input[0] + row[1] * input[1] + row[2] * input[2];
        *channel = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Centred region of `source` with the aspect ratio of `target`.
///
/// Returns `(x, y, width, height)` in source pixels. Cropping this region and
/// resizing it to `target` covers the box without scaling the whole source
/// first, so memory stays bounded by the source plus the target. The side
/// that already matches is kept whole; the other loses its excess evenly
/// (an odd remainder goes to the right/bottom). Both sides are at least 1.
pub fn calculate_cover_region(source: (u32, u32), target: (u32, u32)) -> (u32, u32, u32, u32) {
    let (src_w, src_h) = source;
    let tgt_aspect = aspect_ratio(target.0, target.1);

    let (w, h) = if aspect_ratio(src_w, src_h) > tgt_aspect {
        // Source is wider: keep full height, trim the sides
        let w = (src_h as f64 * tgt_aspect).round() as u32;
        (w.clamp(1, src_w.max(1)), src_h)
    } else {
        // Source is taller: keep full width, trim top and bottom
        let h = (src_w as f64 / tgt_aspect).round() as u32;
        (src_w, h.clamp(1, src_h.max(1)))
    };

    let x = src_w.saturating_sub(w) / 2;
    let y = src_h.saturating_sub(h) / 2;
    (x, y, w, h)
}

/// Quality values to try, from `start` down to `floor` in steps of 10.
///
/// Always contains `start` first; the floor is appended if the stepping
/// skips past it.
pub fn quality_ladder(start: u32, floor: u32) -> Vec<u32> {
    let mut steps = vec![start];
    let mut q = start;
    while q > floor {
        q = q.saturating_sub(10).max(floor);
        steps.push(q);
    }
    steps
}

/// Width-over-height ratio, zero for a degenerate height.
pub fn aspect_ratio(width: u32, height: u32) -> f64 {
    if height == 0 {
        return 0.0;
    }
    width as f64 / height as f64
}

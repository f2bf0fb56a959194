//! Scan conversion of paths into per-pixel coverage, and compositing of
//! coverage onto an RGBA image.
//!
//! Everything here works in device space: paths are flattened through the
//! current matrix first. Coverage is sampled at pixel centres. Strokes use
//! a signed-distance falloff one pixel wide (the same soft edge a round
//! brush stamp gets); fills use non-zero winding with four sub-scanlines
//! per pixel row and exact horizontal span coverage.

use image::RgbaImage;
use sketchpad_core::geometry::{Matrix, Point};
use sketchpad_core::path::{Path, PathCommand};
use sketchpad_core::render::BlendMode;
use sketchpad_core::style::{Color, Dash, LineCap};

/// Maximum deviation (in pixels) allowed when flattening curves.
const FLATTEN_TOLERANCE: f64 = 0.2;
const MAX_CURVE_STEPS: usize = 128;
const SUBSCANLINES: usize = 4;

/// A flattened subpath in device space.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Polyline {
    pub points: Vec<Point>,
    pub closed: bool,
}

/// Coverage values in `[0, 1]` over a pixel-aligned window of the image.
#[derive(Debug, Clone)]
pub(crate) struct Coverage {
    x0: u32,
    y0: u32,
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Coverage {
    /// An empty mask over the pixels touched by `[min, max]`, clipped to a
    /// `clip_w` x `clip_h` image.
    fn over(min: Point, max: Point, clip_w: u32, clip_h: u32) -> Option<Self> {
        let x0 = min.x.floor().max(0.0);
        let y0 = min.y.floor().max(0.0);
        let x1 = max.x.ceil().min(clip_w as f64);
        let y1 = max.y.ceil().min(clip_h as f64);
        if !(x1 > x0 && y1 > y0) {
            return None;
        }
        let (x0, y0) = (x0 as u32, y0 as u32);
        let (width, height) = (x1 as u32 - x0, y1 as u32 - y0);
        Some(Self {
            x0,
            y0,
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        })
    }

    fn idx(&self, x: u32, y: u32) -> usize {
        (y - self.y0) as usize * self.width as usize + (x - self.x0) as usize
    }

    fn max_at(&mut self, x: u32, y: u32, value: f32) {
        let i = self.idx(x, y);
        if value > self.data[i] {
            self.data[i] = value;
        }
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        if x < self.x0 || y < self.y0 || x >= self.x0 + self.width || y >= self.y0 + self.height {
            return 0.0;
        }
        self.data[self.idx(x, y)]
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&c| c <= 0.0)
    }
}

// ── Flattening ───────────────────────────────────────────────────────

/// Map `path` through `matrix` and replace curves with line segments.
pub(crate) fn flatten(path: &Path, matrix: &Matrix) -> Vec<Polyline> {
    let mut out = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    let mut start = Point::ZERO;

    let finish = |points: &mut Vec<Point>, closed: bool, out: &mut Vec<Polyline>| {
        if !points.is_empty() {
            out.push(Polyline {
                points: std::mem::take(points),
                closed,
            });
        }
    };

    for command in path.commands() {
        match *command {
            PathCommand::MoveTo(p) => {
                finish(&mut current, false, &mut out);
                start = matrix.apply(&p);
                current.push(start);
            }
            PathCommand::LineTo(p) => {
                let p = matrix.apply(&p);
                if current.is_empty() {
                    current.push(start);
                }
                current.push(p);
            }
            PathCommand::QuadTo { control, end } => {
                let from = current.last().copied().unwrap_or(start);
                if current.is_empty() {
                    current.push(from);
                }
                let (c, e) = (matrix.apply(&control), matrix.apply(&end));
                let steps = curve_steps(&[from, c, e]);
                for i in 1..=steps {
                    let t = i as f64 / steps as f64;
                    let a = from.lerp(&c, t);
                    let b = c.lerp(&e, t);
                    current.push(a.lerp(&b, t));
                }
            }
            PathCommand::CubicTo { control1, control2, end } => {
                let from = current.last().copied().unwrap_or(start);
                if current.is_empty() {
                    current.push(from);
                }
                let (c1, c2, e) = (
                    matrix.apply(&control1),
                    matrix.apply(&control2),
                    matrix.apply(&end),
                );
                let steps = curve_steps(&[from, c1, c2, e]);
                for i in 1..=steps {
                    let t = i as f64 / steps as f64;
                    let u = 1.0 - t;
                    let p = from * (u * u * u)
                        + c1 * (3.0 * u * u * t)
                        + c2 * (3.0 * u * t * t)
                        + e * (t * t * t);
                    current.push(p);
                }
            }
            PathCommand::Close => {
                if !current.is_empty() {
                    current.push(start);
                }
                finish(&mut current, true, &mut out);
            }
        }
    }
    finish(&mut current, false, &mut out);
    out
}

/// Number of line segments for a curve with the given control polygon.
fn curve_steps(controls: &[Point]) -> usize {
    let hull: f64 = controls.windows(2).map(|w| w[0].distance_to(&w[1])).sum();
    let steps = (hull / FLATTEN_TOLERANCE).sqrt().ceil();
    if steps.is_finite() {
        (steps as usize).clamp(1, MAX_CURVE_STEPS)
    } else {
        1
    }
}

// ── Dashing ──────────────────────────────────────────────────────────

/// Split polylines into the "on" runs of `dash`, with lengths scaled by
/// `scale` into device space.
pub(crate) fn apply_dash(polylines: Vec<Polyline>, dash: &Dash, scale: f64) -> Vec<Polyline> {
    if dash.is_solid() || scale <= 0.0 {
        return polylines;
    }
    let lengths: Vec<f64> = dash.lengths.iter().map(|l| l * scale).collect();
    let sum: f64 = lengths.iter().sum();
    let period = if lengths.len() % 2 == 1 { sum * 2.0 } else { sum };
    let mut out = Vec::new();

    for polyline in polylines {
        // Each subpath restarts the pattern at the phase offset. The on/off
        // state flips on every step so odd-length patterns alternate too.
        let mut index = 0;
        let mut on = true;
        let mut remaining = lengths[0];
        let mut phase = (dash.phase * scale).rem_euclid(period);
        while phase > 0.0 {
            if phase >= remaining {
                phase -= remaining;
                index = (index + 1) % lengths.len();
                on = !on;
                remaining = lengths[index];
            } else {
                remaining -= phase;
                phase = 0.0;
            }
        }

        let mut run: Vec<Point> = Vec::new();
        if on {
            if let Some(first) = polyline.points.first() {
                run.push(*first);
            }
        }

        for pair in polyline.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let seg_len = a.distance_to(&b);
            let mut travelled = 0.0;
            while seg_len - travelled > remaining {
                travelled += remaining;
                let p = a.lerp(&b, travelled / seg_len);
                run.push(p);
                if on {
                    out.push(Polyline {
                        points: std::mem::take(&mut run),
                        closed: false,
                    });
                }
                index = (index + 1) % lengths.len();
                on = !on;
                remaining = lengths[index];
            }
            remaining -= seg_len - travelled;
            if on {
                run.push(b);
            }
        }
        if on && run.len() > 1 {
            out.push(Polyline {
                points: run,
                closed: false,
            });
        }
    }
    out
}

// ── Stroking ─────────────────────────────────────────────────────────

/// Coverage of a stroke of `width` device pixels along `polylines`.
///
/// Joins are always round. Open ends get `cap`; closed subpaths have none.
pub(crate) fn stroke_coverage(
    polylines: &[Polyline],
    width: f64,
    cap: LineCap,
    clip_w: u32,
    clip_h: u32,
) -> Option<Coverage> {
    let half = width / 2.0;
    if half.is_nan() || half <= 0.0 || half.is_infinite() {
        return None;
    }
    let reach = half * std::f64::consts::SQRT_2 + 1.0;
    let (min, max) = bounds(polylines.iter().flat_map(|p| p.points.iter()))?;
    let mut mask = Coverage::over(
        Point::new(min.x - reach, min.y - reach),
        Point::new(max.x + reach, max.y + reach),
        clip_w,
        clip_h,
    )?;

    for polyline in polylines {
        let points = &polyline.points;
        let ends_capped = !polyline.closed;
        if points.len() == 1 || points.windows(2).all(|w| w[0] == w[1]) {
            if ends_capped {
                stamp_dot(&mut mask, points[0], half, cap);
            }
            continue;
        }
        let last = points.len() - 2;
        for (i, pair) in points.windows(2).enumerate() {
            let cap_start = ends_capped && i == 0;
            let cap_end = ends_capped && i == last;
            stamp_segment(&mut mask, pair[0], pair[1], half, cap, cap_start, cap_end);
        }
    }
    Some(mask)
}

/// A zero-length stroke: round caps leave a disc, square caps a square,
/// butt caps nothing.
fn stamp_dot(mask: &mut Coverage, center: Point, half: f64, cap: LineCap) {
    if cap == LineCap::Butt {
        return;
    }
    for_pixels_near(mask, center, center, half + 1.0, |c| match cap {
        LineCap::Square => {
            let dx = (c.x - center.x).abs();
            let dy = (c.y - center.y).abs();
            edge(half - dx) * edge(half - dy)
        }
        _ => edge(half - c.distance_to(&center)),
    });
}

#[allow(clippy::too_many_arguments)]
fn stamp_segment(
    mask: &mut Coverage,
    a: Point,
    b: Point,
    half: f64,
    cap: LineCap,
    cap_start: bool,
    cap_end: bool,
) {
    let d = b - a;
    let len = d.length();
    if len <= f64::EPSILON {
        return;
    }
    let dir = d * (1.0 / len);
    let reach = half * std::f64::consts::SQRT_2 + 1.0;

    for_pixels_near(mask, a, b, reach, |c| {
        let rel = c - a;
        let along = rel.x * dir.x + rel.y * dir.y;
        let perp = (rel.x * dir.y - rel.y * dir.x).abs();

        let overshoot = if along < 0.0 {
            Some((-along, cap_start, a))
        } else if along > len {
            Some((along - len, cap_end, b))
        } else {
            None
        };
        match overshoot {
            None => edge(half - perp),
            Some((over, true, _)) if cap == LineCap::Butt => edge(half - perp) * edge(-over),
            Some((over, true, _)) if cap == LineCap::Square => {
                edge(half - perp) * edge(half - over)
            }
            Some((_, _, end)) => edge(half - c.distance_to(&end)),
        }
    });
}

/// Coverage of a pixel whose centre is `inside` units within an edge.
fn edge(inside: f64) -> f32 {
    (inside + 0.5).clamp(0.0, 1.0) as f32
}

fn for_pixels_near(
    mask: &mut Coverage,
    a: Point,
    b: Point,
    reach: f64,
    mut coverage: impl FnMut(Point) -> f32,
) {
    let x_start = (a.x.min(b.x) - reach).floor().max(mask.x0 as f64) as u32;
    let y_start = (a.y.min(b.y) - reach).floor().max(mask.y0 as f64) as u32;
    let x_end = (a.x.max(b.x) + reach).ceil().min((mask.x0 + mask.width) as f64);
    let y_end = (a.y.max(b.y) + reach).ceil().min((mask.y0 + mask.height) as f64);
    if !(x_end > x_start as f64 && y_end > y_start as f64) {
        return;
    }
    for y in y_start..y_end as u32 {
        for x in x_start..x_end as u32 {
            let value = coverage(Point::new(x as f64 + 0.5, y as f64 + 0.5));
            if value > 0.0 {
                mask.max_at(x, y, value);
            }
        }
    }
}

// ── Filling ──────────────────────────────────────────────────────────

/// Non-zero winding coverage of the closed area of `polylines`. Open
/// subpaths are closed implicitly.
pub(crate) fn fill_coverage(polylines: &[Polyline], clip_w: u32, clip_h: u32) -> Option<Coverage> {
    let (min, max) = bounds(polylines.iter().flat_map(|p| p.points.iter()))?;
    let mut mask = Coverage::over(min, max, clip_w, clip_h)?;

    let mut edges: Vec<(Point, Point)> = Vec::new();
    for polyline in polylines {
        let points = &polyline.points;
        if points.len() < 2 {
            continue;
        }
        for pair in points.windows(2) {
            edges.push((pair[0], pair[1]));
        }
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            if first != last {
                edges.push((*last, *first));
            }
        }
    }
    edges.retain(|(a, b)| a.y != b.y);
    if edges.is_empty() {
        return None;
    }

    let weight = 1.0 / SUBSCANLINES as f32;
    let mut crossings: Vec<(f64, i32)> = Vec::new();
    let mut row = vec![0.0f32; mask.width as usize];
    let left = mask.x0 as f64;
    let right = (mask.x0 + mask.width) as f64;

    for y in mask.y0..mask.y0 + mask.height {
        row.iter_mut().for_each(|c| *c = 0.0);
        for sub in 0..SUBSCANLINES {
            let sy = y as f64 + (sub as f64 + 0.5) / SUBSCANLINES as f64;
            crossings.clear();
            for (a, b) in &edges {
                let (top, bottom, winding) = if a.y < b.y { (a, b, 1) } else { (b, a, -1) };
                if sy < top.y || sy >= bottom.y {
                    continue;
                }
                let t = (sy - top.y) / (bottom.y - top.y);
                crossings.push((top.x + (bottom.x - top.x) * t, winding));
            }
            crossings.sort_by(|l, r| l.0.total_cmp(&r.0));

            let mut winding = 0;
            for pair in crossings.windows(2) {
                winding += pair[0].1;
                if winding == 0 {
                    continue;
                }
                let xa = pair[0].0.clamp(left, right);
                let xb = pair[1].0.clamp(left, right);
                add_span(&mut row, xa - left, xb - left, weight);
            }
        }
        for (i, value) in row.iter().enumerate() {
            if *value > 0.0 {
                mask.max_at(mask.x0 + i as u32, y, value.min(1.0));
            }
        }
    }
    Some(mask)
}

/// Add `weight` times the horizontal overlap of `[xa, xb)` with each pixel.
fn add_span(row: &mut [f32], xa: f64, xb: f64, weight: f32) {
    if xb <= xa {
        return;
    }
    let first = xa.floor() as usize;
    let last = (xb.ceil() as usize).min(row.len());
    for (i, cell) in row.iter_mut().enumerate().take(last).skip(first) {
        let lo = xa.max(i as f64);
        let hi = xb.min(i as f64 + 1.0);
        if hi > lo {
            *cell += weight * (hi - lo) as f32;
        }
    }
}

fn bounds<'a>(mut points: impl Iterator<Item = &'a Point>) -> Option<(Point, Point)> {
    let first = *points.next()?;
    let (mut min, mut max) = (first, first);
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    if [min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
        Some((min, max))
    } else {
        None
    }
}

// ── Compositing ──────────────────────────────────────────────────────

/// Blend `color` through `mask` onto `image`.
pub(crate) fn composite(image: &mut RgbaImage, mask: &Coverage, color: Color, mode: BlendMode) {
    for y in mask.y0..mask.y0 + mask.height {
        for x in mask.x0..mask.x0 + mask.width {
            let k = mask.data[mask.idx(x, y)];
            if k > 0.0 {
                blend_pixel(image, x, y, color, k, mode);
            }
        }
    }
}

/// Blend one pixel with straight (non-premultiplied) alpha.
pub(crate) fn blend_pixel(image: &mut RgbaImage, x: u32, y: u32, color: Color, coverage: f32, mode: BlendMode) {
    let dst = image.get_pixel_mut(x, y);
    let dst_a = dst.0[3] as f32 / 255.0;
    match mode {
        BlendMode::Clear => {
            let out_a = dst_a * (1.0 - coverage);
            if out_a <= 0.0 {
                dst.0 = [0, 0, 0, 0];
            } else {
                dst.0[3] = to_u8(out_a);
            }
        }
        BlendMode::SourceOver => {
            let src_a = color.a as f32 / 255.0 * coverage;
            if src_a <= 0.0 {
                return;
            }
            let out_a = src_a + dst_a * (1.0 - src_a);
            let blend = |src: u8, dst: u8| {
                let src_f = src as f32 / 255.0;
                let dst_f = dst as f32 / 255.0;
                to_u8((src_f * src_a + dst_f * dst_a * (1.0 - src_a)) / out_a)
            };
            dst.0 = [
                blend(color.r, dst.0[0]),
                blend(color.g, dst.0[1]),
                blend(color.b, dst.0[2]),
                to_u8(out_a),
            ];
        }
    }
}

fn to_u8(unit: f32) -> u8 {
    (unit * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchpad_core::geometry::Rect;

    fn ident(path: &Path) -> Vec<Polyline> {
        flatten(path, &Matrix::IDENTITY)
    }

    #[test]
    fn test_flatten_rect_is_closed() {
        let polylines = ident(&Path::rect(Rect::new(0.0, 0.0, 4.0, 2.0)));
        assert_eq!(polylines.len(), 1);
        assert!(polylines[0].closed);
        assert_eq!(polylines[0].points.first(), polylines[0].points.last());
    }

    #[test]
    fn test_flatten_quad_ends_on_endpoint() {
        let path = Path::new()
            .move_to(Point::new(0.0, 0.0))
            .quad_to(Point::new(10.0, 0.0), Point::new(10.0, 10.0));
        let polylines = ident(&path);
        let points = &polylines[0].points;
        assert!(points.len() > 3);
        assert_eq!(*points.last().unwrap(), Point::new(10.0, 10.0));
    }

    #[test]
    fn test_flatten_applies_matrix() {
        let m = Matrix::translation(5.0, 1.0);
        let polylines = flatten(&Path::line(Point::ZERO, Point::new(1.0, 0.0)), &m);
        assert_eq!(polylines[0].points, vec![Point::new(5.0, 1.0), Point::new(6.0, 1.0)]);
    }

    #[test]
    fn test_horizontal_stroke_coverage() {
        let polylines = ident(&Path::line(Point::new(2.0, 5.0), Point::new(18.0, 5.0)));
        let mask = stroke_coverage(&polylines, 4.0, LineCap::Butt, 20, 10).unwrap();
        // Rows 3..7 are fully inside the 4px band around y=5.
        for y in 3..7 {
            assert!((mask.get(10, y) - 1.0).abs() < 1e-6, "row {y}");
        }
        assert_eq!(mask.get(10, 1), 0.0);
        assert_eq!(mask.get(10, 8), 0.0);
        // Butt cap: nothing left of x=2.
        assert_eq!(mask.get(1, 5), 0.0);
    }

    #[test]
    fn test_caps_extend_differently() {
        let polylines = ident(&Path::line(Point::new(6.0, 5.0), Point::new(14.0, 5.0)));
        let butt = stroke_coverage(&polylines, 4.0, LineCap::Butt, 20, 10).unwrap();
        let square = stroke_coverage(&polylines, 4.0, LineCap::Square, 20, 10).unwrap();
        let round = stroke_coverage(&polylines, 4.0, LineCap::Round, 20, 10).unwrap();
        assert_eq!(butt.get(4, 5), 0.0);
        assert!((square.get(4, 5) - 1.0).abs() < 1e-6);
        assert!(round.get(4, 5) > 0.9);
        // Square corner is covered, round corner is not.
        assert!(square.get(4, 3) > 0.9);
        assert!(round.get(4, 3) < 0.5);
    }

    #[test]
    fn test_zero_length_round_stroke_is_a_dot() {
        let polylines = ident(&Path::line(Point::new(5.0, 5.0), Point::new(5.0, 5.0)));
        let mask = stroke_coverage(&polylines, 6.0, LineCap::Round, 10, 10).unwrap();
        assert!((mask.get(5, 5) - 1.0).abs() < 1e-6);
        assert_eq!(mask.get(0, 0), 0.0);

        let butt = stroke_coverage(&polylines, 6.0, LineCap::Butt, 10, 10).unwrap();
        assert!(butt.is_empty());
    }

    #[test]
    fn test_fill_rect_exact() {
        let polylines = ident(&Path::rect(Rect::new(2.0, 2.0, 4.0, 3.0)));
        let mask = fill_coverage(&polylines, 10, 10).unwrap();
        for y in 0..10 {
            for x in 0..10 {
                let inside = (2..6).contains(&x) && (2..5).contains(&y);
                let expected = if inside { 1.0 } else { 0.0 };
                assert!((mask.get(x, y) - expected).abs() < 1e-6, "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_fill_half_pixel_edge() {
        let polylines = ident(&Path::rect(Rect::new(1.5, 0.0, 2.0, 2.0)));
        let mask = fill_coverage(&polylines, 5, 2).unwrap();
        assert!((mask.get(1, 0) - 0.5).abs() < 1e-6);
        assert!((mask.get(2, 0) - 1.0).abs() < 1e-6);
        assert!((mask.get(3, 0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_fill_ellipse_center_and_corner() {
        let polylines = ident(&Path::ellipse(Rect::new(0.0, 0.0, 20.0, 20.0)));
        let mask = fill_coverage(&polylines, 20, 20).unwrap();
        assert!((mask.get(10, 10) - 1.0).abs() < 1e-6);
        assert_eq!(mask.get(0, 0), 0.0);
    }

    #[test]
    fn test_clipping_outside_image() {
        let polylines = ident(&Path::rect(Rect::new(50.0, 50.0, 4.0, 4.0)));
        assert!(fill_coverage(&polylines, 10, 10).is_none());
    }

    #[test]
    fn test_dash_splits_line() {
        let polylines = ident(&Path::line(Point::new(0.0, 0.0), Point::new(10.0, 0.0)));
        let dashed = apply_dash(polylines, &Dash::new(0.0, vec![2.0, 3.0]), 1.0);
        let starts: Vec<f64> = dashed.iter().map(|p| p.points[0].x.round()).collect();
        assert_eq!(starts, vec![0.0, 5.0]);
        let ends: Vec<f64> = dashed.iter().map(|p| p.points.last().unwrap().x.round()).collect();
        assert_eq!(ends, vec![2.0, 7.0]);
    }

    #[test]
    fn test_dash_phase_offsets_pattern() {
        let polylines = ident(&Path::line(Point::new(0.0, 0.0), Point::new(10.0, 0.0)));
        let dashed = apply_dash(polylines, &Dash::new(3.0, vec![2.0, 3.0]), 1.0);
        // Phase 3 lands one unit into the gap.
        let starts: Vec<f64> = dashed.iter().map(|p| p.points[0].x.round()).collect();
        assert_eq!(starts, vec![2.0, 7.0]);
    }

    #[test]
    fn test_odd_dash_pattern_alternates() {
        let polylines = ident(&Path::line(Point::new(0.0, 0.0), Point::new(10.0, 0.0)));
        let dashed = apply_dash(polylines, &Dash::new(0.0, vec![2.0]), 1.0);
        let spans: Vec<(f64, f64)> = dashed
            .iter()
            .map(|p| (p.points[0].x.round(), p.points.last().unwrap().x.round()))
            .collect();
        assert_eq!(spans, vec![(0.0, 2.0), (4.0, 6.0), (8.0, 10.0)]);
    }

    #[test]
    fn test_source_over_and_clear() {
        let mut image = RgbaImage::new(1, 1);
        blend_pixel(&mut image, 0, 0, Color::RED, 1.0, BlendMode::SourceOver);
        assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0, 255]);

        blend_pixel(&mut image, 0, 0, Color::BLUE, 0.5, BlendMode::SourceOver);
        assert_eq!(image.get_pixel(0, 0).0, [128, 0, 128, 255]);

        blend_pixel(&mut image, 0, 0, Color::BLACK, 0.5, BlendMode::Clear);
        assert_eq!(image.get_pixel(0, 0).0[3], 128);

        blend_pixel(&mut image, 0, 0, Color::BLACK, 1.0, BlendMode::Clear);
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }
}

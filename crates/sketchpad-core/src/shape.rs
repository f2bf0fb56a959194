//! The shape model: every kind of primitive a drawing can hold.
//!
//! Shapes are a closed set of variants ([`Shape`]) with capabilities
//! expressed as traits. All variants render and hit-test; only line,
//! rectangle, ellipse and text are [`Selectable`] and carry a
//! [`Transform`]. Freehand strokes (pen and eraser) are never selectable.
//!
//! Rendering is a pure function of a shape's fields: calling `render` any
//! number of times produces the same output.

use uuid::Uuid;

use crate::geometry::{Point, Rect, Size, Transform};
use crate::path::Path;
use crate::render::{BlendMode, RenderContext};
use crate::style::{Color, Dash, Font, LineCap, StrokeStyle, StyleSnapshot};
use crate::text::TextMetrics;

/// Unique shape identifier.
pub type ShapeId = Uuid;

/// Stroke width of a freshly constructed shape before style is applied.
pub const DEFAULT_STROKE_WIDTH: f64 = 10.0;

// ══════════════════════════════════════════════════════════════════════
// Capabilities
// ══════════════════════════════════════════════════════════════════════

pub trait Renderable {
    /// Draw into `ctx`, applying the shape's own transform if it has one.
    fn render(&self, ctx: &mut dyn RenderContext);
}

pub trait HitTestable {
    fn hit_test(&self, point: &Point) -> bool;
}

pub trait BoundsProviding {
    /// Axis-aligned bounds in local (untransformed) space.
    fn bounding_rect(&self) -> Rect;
}

pub trait Selectable: BoundsProviding {
    fn transform(&self) -> Transform;
    fn set_transform(&mut self, transform: Transform);

    /// A canvas point hits when its preimage under the transform lies in
    /// the local bounding rect.
    fn contains_canvas_point(&self, point: &Point) -> bool {
        self.transform()
            .apply_inverse(point)
            .is_some_and(|local| self.bounding_rect().contains_point(&local))
    }
}

pub trait StyleApplicable {
    /// One-time copy of the global style; later style edits do not follow.
    fn apply_style(&mut self, style: &StyleSnapshot);
}

// ══════════════════════════════════════════════════════════════════════
// Two-point shapes: line, rectangle, ellipse
// ══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoPointKind {
    Line,
    Rect,
    Ellipse,
}

/// A shape defined by two anchor points.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoPointShape {
    pub id: ShapeId,
    pub kind: TwoPointKind,
    pub a: Point,
    pub b: Point,
    pub stroke_color: Option<Color>,
    pub fill_color: Option<Color>,
    pub stroke_width: f64,
    pub cap: LineCap,
    pub dash: Option<Dash>,
    pub transform: Transform,
}

impl TwoPointShape {
    pub fn new(kind: TwoPointKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            a: Point::ZERO,
            b: Point::ZERO,
            stroke_color: Some(Color::BLACK),
            fill_color: None,
            stroke_width: DEFAULT_STROKE_WIDTH,
            cap: LineCap::Round,
            dash: None,
            transform: Transform::IDENTITY,
        }
    }

    pub fn line() -> Self {
        Self::new(TwoPointKind::Line)
    }

    pub fn rect() -> Self {
        Self::new(TwoPointKind::Rect)
    }

    pub fn ellipse() -> Self {
        Self::new(TwoPointKind::Ellipse)
    }

    /// Both anchors at `point`: the zero-size shape a drag starts from.
    pub fn anchored_at(mut self, point: Point) -> Self {
        self.a = point;
        self.b = point;
        self
    }

    /// The A/B box with non-negative width and height.
    pub fn normalized_rect(&self) -> Rect {
        Rect::from_corners(self.a, self.b)
    }

    fn stroke_style(&self, color: Color) -> StrokeStyle {
        StrokeStyle::new(color, self.stroke_width)
            .with_cap(self.cap)
            .with_dash(self.dash.clone())
    }

    fn outline(&self) -> Path {
        match self.kind {
            TwoPointKind::Line => Path::line(self.a, self.b),
            TwoPointKind::Rect => Path::rect(self.normalized_rect()),
            TwoPointKind::Ellipse => Path::ellipse(self.normalized_rect()),
        }
    }
}

impl Renderable for TwoPointShape {
    fn render(&self, ctx: &mut dyn RenderContext) {
        ctx.save();
        ctx.concat(&self.transform.matrix());
        let outline = self.outline();
        if let Some(stroke) = self.stroke_color {
            ctx.stroke_path(&outline, &self.stroke_style(stroke));
        }
        if self.kind != TwoPointKind::Line {
            if let Some(fill) = self.fill_color {
                ctx.fill_path(&outline, fill);
            }
        }
        ctx.restore();
    }
}

impl BoundsProviding for TwoPointShape {
    /// Grown by half the stroke width so hairline shapes stay tappable.
    fn bounding_rect(&self) -> Rect {
        let half = self.stroke_width / 2.0;
        self.normalized_rect().inset(-half, -half)
    }
}

impl Selectable for TwoPointShape {
    fn transform(&self) -> Transform {
        self.transform
    }

    fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }
}

impl HitTestable for TwoPointShape {
    fn hit_test(&self, point: &Point) -> bool {
        self.contains_canvas_point(point)
    }
}

impl StyleApplicable for TwoPointShape {
    fn apply_style(&mut self, style: &StyleSnapshot) {
        self.stroke_width = style.stroke_width;
        match self.kind {
            // Lines are stroke-only and always visible.
            TwoPointKind::Line => {
                self.stroke_color = Some(style.stroke_color.unwrap_or(Color::BLACK));
            }
            TwoPointKind::Rect | TwoPointKind::Ellipse => {
                self.stroke_color = style.stroke_color;
                self.fill_color = style.fill_color;
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════════════
// Freehand strokes: pen and eraser
// ══════════════════════════════════════════════════════════════════════

/// One pointer-move increment of a freehand stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreehandSegment {
    pub a: Point,
    pub b: Point,
    pub width: f64,
}

impl FreehandSegment {
    pub fn new(a: Point, b: Point, width: f64) -> Self {
        Self { a, b, width }
    }

    /// Curve anchor shared with the neighbouring segments.
    pub fn midpoint(&self) -> Point {
        self.a.midpoint(&self.b)
    }
}

/// An append-only freehand stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct FreehandShape {
    pub id: ShapeId,
    pub start: Point,
    segments: Vec<FreehandSegment>,
    pub stroke_color: Color,
    pub stroke_width: f64,
    pub is_finished: bool,
    /// Clears what is underneath instead of painting on top.
    pub is_eraser: bool,
}

impl FreehandShape {
    pub fn new(start: Point, is_eraser: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            segments: Vec::new(),
            stroke_color: Color::BLACK,
            stroke_width: DEFAULT_STROKE_WIDTH,
            is_finished: false,
            is_eraser,
        }
    }

    pub fn segments(&self) -> &[FreehandSegment] {
        &self.segments
    }

    pub fn add_segment(&mut self, segment: FreehandSegment) {
        self.segments.push(segment);
    }

    /// Where the next segment starts.
    pub fn last_point(&self) -> Point {
        self.segments.last().map_or(self.start, |s| s.b)
    }

    /// Width of the newest segment, or the nominal width if there is none.
    pub fn last_width(&self) -> f64 {
        self.segments.last().map_or(self.stroke_width, |s| s.width)
    }

    /// Draw only the newest segment, joined onto the one before it.
    ///
    /// Painting this on top of a buffer that already holds every earlier
    /// segment yields the same image as a full `render`.
    pub fn render_latest_segment(&self, ctx: &mut dyn RenderContext) {
        self.render_segments(ctx, true);
    }

    fn render_segments(&self, ctx: &mut dyn RenderContext, only_last: bool) {
        ctx.save();
        if self.is_eraser {
            ctx.set_blend_mode(BlendMode::Clear);
        }

        if self.segments.is_empty() {
            // Pointer is down but has not moved yet: show a dot.
            if !self.is_finished {
                ctx.fill_path(
                    &Path::circle(self.start, self.stroke_width / 2.0),
                    self.stroke_color,
                );
            }
            ctx.restore();
            return;
        }

        let (mut previous, to_draw) = match self.segments.split_last() {
            Some((last, earlier)) if only_last => {
                (earlier.last().copied(), std::slice::from_ref(last))
            }
            _ => (None, &self.segments[..]),
        };

        for segment in to_draw {
            let path = match previous {
                Some(prev) => Path::new()
                    .move_to(prev.midpoint())
                    .quad_to(segment.a, segment.midpoint()),
                None => Path::line(segment.a, segment.b),
            };
            let style = StrokeStyle::new(self.stroke_color, segment.width).with_cap(LineCap::Round);
            ctx.stroke_path(&path, &style);
            previous = Some(*segment);
        }
        ctx.restore();
    }
}

impl Renderable for FreehandShape {
    fn render(&self, ctx: &mut dyn RenderContext) {
        self.render_segments(ctx, false);
    }
}

impl HitTestable for FreehandShape {
    fn hit_test(&self, _point: &Point) -> bool {
        false
    }
}

impl StyleApplicable for FreehandShape {
    fn apply_style(&mut self, style: &StyleSnapshot) {
        self.stroke_color = style.stroke_color.unwrap_or(Color::BLACK);
        self.stroke_width = style.stroke_width;
    }
}

// ══════════════════════════════════════════════════════════════════════
// Text
// ══════════════════════════════════════════════════════════════════════

/// Padding between measured text and its bounding rect.
pub const DEFAULT_TEXT_PADDING: Size = Size {
    width: 8.0,
    height: 4.0,
};

/// A single line of text centred on `center` in local space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextShape {
    pub id: ShapeId,
    pub center: Point,
    pub transform: Transform,
    text: String,
    pub font: Font,
    pub color: Color,
    pub padding: Size,
    measured: Size,
}

impl TextShape {
    pub fn new(font: Font, metrics: &dyn TextMetrics) -> Self {
        let mut shape = Self {
            id: Uuid::new_v4(),
            center: Point::ZERO,
            transform: Transform::IDENTITY,
            text: String::new(),
            font,
            color: Color::BLACK,
            padding: DEFAULT_TEXT_PADDING,
            measured: Size::default(),
        };
        shape.remeasure(metrics);
        shape
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: &str, metrics: &dyn TextMetrics) {
        self.text = text.to_string();
        self.remeasure(metrics);
    }

    pub fn measured_size(&self) -> Size {
        self.measured
    }

    /// Empty text is measured as a placeholder so the box stays tappable.
    pub fn remeasure(&mut self, metrics: &dyn TextMetrics) {
        let sample = if self.text.is_empty() { "__" } else { &self.text };
        self.measured = metrics.measure(sample, &self.font);
    }

    /// The bounding rect mapped to the canvas, as drawn by a host text widget.
    pub fn frame(&self) -> Rect {
        let corners = self.bounding_rect().corners().map(|c| self.transform.apply(&c));
        corners[1..]
            .iter()
            .fold(Rect::from_corners(corners[0], corners[0]), |acc, p| {
                acc.union(&Rect::from_corners(*p, *p))
            })
    }
}

impl Renderable for TextShape {
    fn render(&self, ctx: &mut dyn RenderContext) {
        if self.text.is_empty() {
            return;
        }
        ctx.save();
        ctx.concat(&self.transform.matrix());
        let origin = Rect::centered(self.center, self.measured).origin;
        ctx.fill_text(&self.text, &self.font, origin, self.color);
        ctx.restore();
    }
}

impl BoundsProviding for TextShape {
    fn bounding_rect(&self) -> Rect {
        Rect::centered(self.center, self.measured).inset(-self.padding.width, -self.padding.height)
    }
}

impl Selectable for TextShape {
    fn transform(&self) -> Transform {
        self.transform
    }

    fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }
}

impl HitTestable for TextShape {
    fn hit_test(&self, point: &Point) -> bool {
        self.contains_canvas_point(point)
    }
}

impl StyleApplicable for TextShape {
    fn apply_style(&mut self, style: &StyleSnapshot) {
        self.color = style.stroke_color.unwrap_or(Color::BLACK);
    }
}

// ══════════════════════════════════════════════════════════════════════
// The closed shape set
// ══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    TwoPoint(TwoPointShape),
    Freehand(FreehandShape),
    Text(TextShape),
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        match self {
            Shape::TwoPoint(s) => s.id,
            Shape::Freehand(s) => s.id,
            Shape::Text(s) => s.id,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::TwoPoint(s) => match s.kind {
                TwoPointKind::Line => "line",
                TwoPointKind::Rect => "rect",
                TwoPointKind::Ellipse => "ellipse",
            },
            Shape::Freehand(s) if s.is_eraser => "eraser",
            Shape::Freehand(_) => "pen",
            Shape::Text(_) => "text",
        }
    }

    pub fn as_selectable(&self) -> Option<&dyn Selectable> {
        match self {
            Shape::TwoPoint(s) => Some(s),
            Shape::Text(s) => Some(s),
            Shape::Freehand(_) => None,
        }
    }

    pub fn as_selectable_mut(&mut self) -> Option<&mut dyn Selectable> {
        match self {
            Shape::TwoPoint(s) => Some(s),
            Shape::Text(s) => Some(s),
            Shape::Freehand(_) => None,
        }
    }

    pub fn is_selectable(&self) -> bool {
        self.as_selectable().is_some()
    }
}

impl Renderable for Shape {
    fn render(&self, ctx: &mut dyn RenderContext) {
        match self {
            Shape::TwoPoint(s) => s.render(ctx),
            Shape::Freehand(s) => s.render(ctx),
            Shape::Text(s) => s.render(ctx),
        }
    }
}

impl HitTestable for Shape {
    fn hit_test(&self, point: &Point) -> bool {
        match self {
            Shape::TwoPoint(s) => s.hit_test(point),
            Shape::Freehand(s) => s.hit_test(point),
            Shape::Text(s) => s.hit_test(point),
        }
    }
}

impl StyleApplicable for Shape {
    fn apply_style(&mut self, style: &StyleSnapshot) {
        match self {
            Shape::TwoPoint(s) => s.apply_style(style),
            Shape::Freehand(s) => s.apply_style(style),
            Shape::Text(s) => s.apply_style(style),
        }
    }
}

impl From<TwoPointShape> for Shape {
    fn from(shape: TwoPointShape) -> Self {
        Shape::TwoPoint(shape)
    }
}

impl From<FreehandShape> for Shape {
    fn from(shape: FreehandShape) -> Self {
        Shape::Freehand(shape)
    }
}

impl From<TextShape> for Shape {
    fn from(shape: TextShape) -> Self {
        Shape::Text(shape)
    }
}

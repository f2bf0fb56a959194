use crate::geometry::{Point, Rect};

/// Cubic Bézier control distance for a quarter circle of radius 1.
const KAPPA: f64 = 0.552_284_749_8;

/// A single path-construction command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    QuadTo { control: Point, end: Point },
    CubicTo {
        control1: Point,
        control2: Point,
        end: Point,
    },
    Close,
}

/// A vector path in the coordinate space of whoever built it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    commands: Vec<PathCommand>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(mut self, p: Point) -> Self {
        self.commands.push(PathCommand::MoveTo(p));
        self
    }

    pub fn line_to(mut self, p: Point) -> Self {
        self.commands.push(PathCommand::LineTo(p));
        self
    }

    pub fn quad_to(mut self, control: Point, end: Point) -> Self {
        self.commands.push(PathCommand::QuadTo { control, end });
        self
    }

    pub fn cubic_to(mut self, control1: Point, control2: Point, end: Point) -> Self {
        self.commands.push(PathCommand::CubicTo {
            control1,
            control2,
            end,
        });
        self
    }

    pub fn close(mut self) -> Self {
        self.commands.push(PathCommand::Close);
        self
    }

    pub fn line(from: Point, to: Point) -> Self {
        Self::new().move_to(from).line_to(to)
    }

    pub fn rect(rect: Rect) -> Self {
        let [tl, tr, br, bl] = rect.corners();
        Self::new().move_to(tl).line_to(tr).line_to(br).line_to(bl).close()
    }

    /// Ellipse inscribed in `rect`, as four cubic arcs.
    pub fn ellipse(rect: Rect) -> Self {
        let c = rect.center();
        let rx = rect.width() / 2.0;
        let ry = rect.height() / 2.0;
        let kx = rx * KAPPA;
        let ky = ry * KAPPA;

        Self::new()
            .move_to(Point::new(c.x + rx, c.y))
            .cubic_to(
                Point::new(c.x + rx, c.y + ky),
                Point::new(c.x + kx, c.y + ry),
                Point::new(c.x, c.y + ry),
            )
            .cubic_to(
                Point::new(c.x - kx, c.y + ry),
                Point::new(c.x - rx, c.y + ky),
                Point::new(c.x - rx, c.y),
            )
            .cubic_to(
                Point::new(c.x - rx, c.y - ky),
                Point::new(c.x - kx, c.y - ry),
                Point::new(c.x, c.y - ry),
            )
            .cubic_to(
                Point::new(c.x + kx, c.y - ry),
                Point::new(c.x + rx, c.y - ky),
                Point::new(c.x + rx, c.y),
            )
            .close()
    }

    pub fn circle(center: Point, radius: f64) -> Self {
        Self::ellipse(Rect::centered(
            center,
            crate::geometry::Size::new(radius * 2.0, radius * 2.0),
        ))
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }
}

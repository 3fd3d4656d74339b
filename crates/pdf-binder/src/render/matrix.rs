//! Affine transformation matrices in PDF convention
//!
//! A point `(x, y)` maps to `(a·x + c·y + e, b·x + d·y + f)`.

use lopdf::Object;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translate(x: f32, y: f32) -> Self {
        Matrix {
            e: x,
            f: y,
            ..Self::IDENTITY
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Matrix {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    /// Counter-clockwise rotation by 90 degrees
    pub fn rotate_ccw_90() -> Self {
        Matrix {
            a: 0.0,
            b: 1.0,
            c: -1.0,
            d: 0.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Map a `width × height` box anchored at the origin to how a viewer shows
    /// it under a page `/Rotate` of `degrees` (clockwise, multiple of 90).
    /// The result is again anchored at the origin.
    pub fn page_rotation(degrees: i64, width: f32, height: f32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Matrix {
                a: 0.0,
                b: -1.0,
                c: 1.0,
                d: 0.0,
                e: 0.0,
                f: width,
            },
            180 => Matrix {
                a: -1.0,
                b: 0.0,
                c: 0.0,
                d: -1.0,
                e: width,
                f: height,
            },
            270 => Matrix {
                a: 0.0,
                b: 1.0,
                c: -1.0,
                d: 0.0,
                e: height,
                f: 0.0,
            },
            _ => Self::IDENTITY,
        }
    }

    /// Apply `self` first, then `next`
    pub fn then(self, next: Matrix) -> Matrix {
        Matrix {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Operands for a `cm` or `Tm` operator
    pub fn operands(&self) -> Vec<Object> {
        [self.a, self.b, self.c, self.d, self.e, self.f]
            .into_iter()
            .map(Object::Real)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-3 && (a.1 - b.1).abs() < 1e-3
    }

    #[test]
    fn page_rotation_keeps_box_at_origin() {
        let (w, h) = (200.0, 100.0);
        for degrees in [90, 270] {
            let m = Matrix::page_rotation(degrees, w, h);
            let corners = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)];
            let mapped: Vec<(f32, f32)> = corners.iter().map(|&(x, y)| m.apply(x, y)).collect();
            for &(x, y) in &mapped {
                assert!((-1e-3..=h + 1e-3).contains(&x), "x out of range for {degrees}");
                assert!((-1e-3..=w + 1e-3).contains(&y), "y out of range for {degrees}");
            }
        }
        let m = Matrix::page_rotation(180, w, h);
        assert!(close(m.apply(0.0, 0.0), (w, h)));
    }

    #[test]
    fn rotate_90_puts_top_edge_on_the_right() {
        let (w, h) = (200.0, 100.0);
        let m = Matrix::page_rotation(90, w, h);
        // Midpoint of the top edge ends up on the right edge of the h × w result
        assert!(close(m.apply(w / 2.0, h), (h, w / 2.0)));
    }

    #[test]
    fn then_composes_in_order() {
        let m = Matrix::scale(2.0, 2.0).then(Matrix::translate(10.0, 5.0));
        assert!(close(m.apply(1.0, 1.0), (12.0, 7.0)));
        let m = Matrix::translate(10.0, 5.0).then(Matrix::scale(2.0, 2.0));
        assert!(close(m.apply(1.0, 1.0), (22.0, 12.0)));
    }
}

/// Projective mapping between the module grid and image pixels
use crate::models::Point;

/// 3x3 homography with the bottom-right coefficient fixed to 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveTransform {
    a11: f64,
    a12: f64,
    a13: f64,
    a21: f64,
    a22: f64,
    a23: f64,
    a31: f64,
    a32: f64,
}

impl PerspectiveTransform {
    /// Transform taking each `src[i]` onto `dst[i]`.
    ///
    /// Returns `None` for degenerate correspondences (three collinear points).
    pub fn from_points(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        let mut a = [[0.0f64; 8]; 8];
        let mut b = [0.0f64; 8];

        for i in 0..4 {
            let (sx, sy) = (src[i].x as f64, src[i].y as f64);
            let (dx, dy) = (dst[i].x as f64, dst[i].y as f64);

            let row = i * 2;
            a[row] = [sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy];
            b[row] = dx;
            a[row + 1] = [0.0, 0.0, 0.0, sx, sy, 1.0, -dy * sx, -dy * sy];
            b[row + 1] = dy;
        }

        let h = solve_linear_system(a, b)?;
        let transform = Self {
            a11: h[0],
            a12: h[1],
            a13: h[2],
            a21: h[3],
            a22: h[4],
            a23: h[5],
            a31: h[6],
            a32: h[7],
        };
        h.iter().all(|v| v.is_finite()).then_some(transform)
    }

    /// Map a point; points on the horizon come back non-finite
    pub fn transform(&self, p: &Point) -> Point {
        let (x, y) = (p.x as f64, p.y as f64);
        let denominator = self.a31 * x + self.a32 * y + 1.0;
        if denominator.abs() < 1e-12 {
            return Point::new(f32::NAN, f32::NAN);
        }
        Point::new(
            ((self.a11 * x + self.a12 * y + self.a13) / denominator) as f32,
            ((self.a21 * x + self.a22 * y + self.a23) / denominator) as f32,
        )
    }
}

/// Gaussian elimination with partial pivoting on an 8x8 system
#[allow(clippy::needless_range_loop)]
fn solve_linear_system(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> Option<[f64; 8]> {
    let n = 8;

    for i in 0..n {
        let mut max_row = i;
        for k in (i + 1)..n {
            if a[k][i].abs() > a[max_row][i].abs() {
                max_row = k;
            }
        }
        if a[max_row][i].abs() < 1e-12 {
            return None;
        }
        a.swap(i, max_row);
        b.swap(i, max_row);

        for k in (i + 1)..n {
            let factor = a[k][i] / a[i][i];
            b[k] -= factor * b[i];
            for j in i..n {
                a[k][j] -= factor * a[i][j];
            }
        }
    }

    let mut x = [0.0f64; 8];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum / a[i][i];
    }

    Some(x)
}

/// Module-grid sampling through a perspective transform
use crate::models::{BitMatrix, Point};
use crate::utils::geometry::PerspectiveTransform;

/// Sub-module offsets for the 3x3 vote, in modules
const VOTE_OFFSETS: [f32; 3] = [-0.3, 0.0, 0.3];

/// Where the fourth correspondence came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BottomRight {
    /// Centre of the bottom-right alignment pattern
    Alignment,
    /// `top_right + bottom_left - top_left`, the affine estimate of the
    /// corner finder position
    Parallelogram,
}

impl BottomRight {
    /// Module-space coordinate the reference point corresponds to
    fn module_position(self, dimension: usize) -> f32 {
        match self {
            BottomRight::Alignment => dimension as f32 - 6.5,
            BottomRight::Parallelogram => dimension as f32 - 3.5,
        }
    }
}

/// Transform from module space (module (x, y) spans [x, x+1)) to image pixels
pub fn module_to_image(
    corners: &[Point; 4],
    kind: BottomRight,
    dimension: usize,
) -> Option<PerspectiveTransform> {
    let far = dimension as f32 - 3.5;
    let br = kind.module_position(dimension);
    let src = [
        Point::new(3.5, 3.5),
        Point::new(far, 3.5),
        Point::new(3.5, far),
        Point::new(br, br),
    ];
    PerspectiveTransform::from_points(&src, corners)
}

/// Sample every module centre with a 3x3 majority vote.
///
/// Samples that land outside the image count as light. Returns `None` when
/// a grid corner maps outside the image or to a non-finite point.
pub fn sample_grid(
    matrix: &BitMatrix,
    transform: &PerspectiveTransform,
    dimension: usize,
) -> Option<BitMatrix> {
    let (w, h) = (matrix.width() as f32, matrix.height() as f32);
    let d = dimension as f32;
    for corner in [
        Point::new(0.5, 0.5),
        Point::new(d - 0.5, 0.5),
        Point::new(0.5, d - 0.5),
        Point::new(d - 0.5, d - 0.5),
    ] {
        let p = transform.transform(&corner);
        if !p.is_finite() || p.x < -1.0 || p.y < -1.0 || p.x > w + 1.0 || p.y > h + 1.0 {
            return None;
        }
    }

    Some(BitMatrix::from_fn(dimension, dimension, |x, y| {
        let mut dark = 0;
        for oy in VOTE_OFFSETS {
            for ox in VOTE_OFFSETS {
                let module = Point::new(x as f32 + 0.5 + ox, y as f32 + 0.5 + oy);
                let p = transform.transform(&module);
                if p.is_finite() && matrix.get_signed(p.x.floor() as isize, p.y.floor() as isize)
                {
                    dark += 1;
                }
            }
        }
        dark >= 5
    }))
}

/// Alignment pattern search for QR versions 2+
///
/// The bottom-right alignment pattern is a 5x5 dark/light/dark target. It is
/// located by sliding a module-space template, laid along the code's own
/// axes, over a window around the position predicted from the finders.
use crate::models::{BitMatrix, Point};
use tracing::trace;

/// Worst template mismatch (of 25 modules) still accepted
const MAX_MISMATCH: usize = 3;
/// Search radii in modules, tried in order
const SEARCH_RADII: [f32; 2] = [4.0, 8.0];

/// Expected colour of template cell (i, j), centre at (2, 2)
fn template_dark(i: usize, j: usize) -> bool {
    let ring = i.abs_diff(2).max(j.abs_diff(2));
    ring != 1
}

/// Centre of the alignment pattern nearest the bottom-right corner, in
/// image coordinates, or `None` when no convincing match is found.
pub fn find_alignment_pattern(
    matrix: &BitMatrix,
    top_left: Point,
    top_right: Point,
    bottom_left: Point,
    dimension: usize,
) -> Option<Point> {
    if dimension < 25 {
        return None;
    }
    let span = (dimension - 7) as f32;
    let u = Point::new(
        (top_right.x - top_left.x) / span,
        (top_right.y - top_left.y) / span,
    );
    let v = Point::new(
        (bottom_left.x - top_left.x) / span,
        (bottom_left.y - top_left.y) / span,
    );
    // alignment centre sits at module (dim - 6.5, dim - 6.5); finder at 3.5
    let offset = (dimension - 10) as f32;
    let predicted = Point::new(
        top_left.x + offset * (u.x + v.x),
        top_left.y + offset * (u.y + v.y),
    );
    let module = ((u.x * u.x + u.y * u.y).sqrt() + (v.x * v.x + v.y * v.y).sqrt()) / 2.0;
    if !predicted.is_finite() || module < 1.0 {
        return None;
    }

    for radius in SEARCH_RADII {
        if let Some(found) = search_window(matrix, predicted, u, v, radius * module) {
            trace!(
                predicted_x = predicted.x,
                predicted_y = predicted.y,
                found_x = found.x,
                found_y = found.y,
                "alignment pattern"
            );
            return Some(found);
        }
    }
    None
}

fn template_mismatch(matrix: &BitMatrix, center: Point, u: Point, v: Point) -> usize {
    let mut mismatch = 0;
    for j in 0..5 {
        for i in 0..5 {
            let (di, dj) = (i as f32 - 2.0, j as f32 - 2.0);
            let x = center.x + di * u.x + dj * v.x;
            let y = center.y + di * u.y + dj * v.y;
            let dark = matrix.get_signed(x.floor() as isize, y.floor() as isize);
            if dark != template_dark(i, j) {
                mismatch += 1;
            }
        }
    }
    mismatch
}

fn search_window(
    matrix: &BitMatrix,
    predicted: Point,
    u: Point,
    v: Point,
    radius: f32,
) -> Option<Point> {
    let x0 = (predicted.x - radius).floor().max(0.0) as usize;
    let y0 = (predicted.y - radius).floor().max(0.0) as usize;
    let x1 = ((predicted.x + radius).ceil() as usize).min(matrix.width().saturating_sub(1));
    let y1 = ((predicted.y + radius).ceil() as usize).min(matrix.height().saturating_sub(1));
    if x0 > x1 || y0 > y1 {
        return None;
    }

    let mut best = MAX_MISMATCH + 1;
    let mut hits: Vec<Point> = Vec::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            let mismatch = template_mismatch(matrix, center, u, v);
            if mismatch < best {
                best = mismatch;
                hits.clear();
            }
            if mismatch == best {
                hits.push(center);
            }
        }
    }
    if hits.is_empty() {
        return None;
    }

    // several separate spots can tie; keep the cluster nearest the prediction
    let anchor = *hits.iter().min_by(|a, b| {
        a.distance_squared(&predicted)
            .partial_cmp(&b.distance_squared(&predicted))
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;
    let module = (u.x * u.x + u.y * u.y).sqrt().max(1.0);
    let cluster: Vec<&Point> = hits
        .iter()
        .filter(|p| p.distance(&anchor) <= module)
        .collect();
    let n = cluster.len() as f32;
    Some(Point::new(
        cluster.iter().map(|p| p.x).sum::<f32>() / n,
        cluster.iter().map(|p| p.y).sum::<f32>() / n,
    ))
}

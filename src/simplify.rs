//! Douglas–Peucker polyline simplification over planar coordinates.

use geo_types::Coord;

/// Indices of the coordinates kept by simplification, in order.
///
/// The first and last coordinates are always kept. With `high_quality` off a
/// radial-distance pass first drops points closer than `tolerance` to the
/// previously kept point, trading accuracy for speed on dense input.
pub fn simplify_indices(coords: &[Coord<f64>], tolerance: f64, high_quality: bool) -> Vec<usize> {
    if coords.len() <= 2 {
        return (0..coords.len()).collect();
    }
    let candidates = if high_quality {
        (0..coords.len()).collect()
    } else {
        radial_distance(coords, tolerance)
    };

    let last = candidates.len() - 1;
    let mut keep = vec![false; candidates.len()];
    keep[0] = true;
    keep[last] = true;
    douglas_peucker(coords, &candidates, 0, last, tolerance, &mut keep);

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(index, kept)| kept.then_some(index))
        .collect()
}

fn radial_distance(coords: &[Coord<f64>], tolerance: f64) -> Vec<usize> {
    let mut kept = vec![0];
    let mut previous = coords[0];
    for (i, &coord) in coords.iter().enumerate().skip(1) {
        if distance(coord, previous) > tolerance {
            kept.push(i);
            previous = coord;
        }
    }
    let last = coords.len() - 1;
    if kept.last() != Some(&last) {
        kept.push(last);
    }
    kept
}

/// Marks the kept entries of `candidates[start..=end]`; `start` and `end` are
/// positions in `candidates`, not in `coords`.
fn douglas_peucker(
    coords: &[Coord<f64>],
    candidates: &[usize],
    start: usize,
    end: usize,
    tolerance: f64,
    keep: &mut [bool],
) {
    if end <= start + 1 {
        return;
    }
    let first = coords[candidates[start]];
    let last = coords[candidates[end]];

    let mut max_distance = 0.0;
    let mut max_index = start;
    for i in (start + 1)..end {
        let d = segment_distance(coords[candidates[i]], first, last);
        if d > max_distance {
            max_distance = d;
            max_index = i;
        }
    }

    if max_distance > tolerance {
        keep[max_index] = true;
        douglas_peucker(coords, candidates, start, max_index, tolerance, keep);
        douglas_peucker(coords, candidates, max_index, end, tolerance, keep);
    }
}

/// Distance from `p` to the segment `a`-`b`. Points projecting beyond either
/// end measure to that end.
pub fn segment_distance(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return distance(p, a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
    distance(p, Coord { x: a.x + t * dx, y: a.y + t * dy })
}

fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

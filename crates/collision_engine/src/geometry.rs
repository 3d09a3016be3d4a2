//! Narrow-phase geometry kernel
//!
//! Pure overlap tests for the supported shape pairs. Every function here
//! is side-effect free and safe to call concurrently from worker threads.
//!
//! Normal convention: the returned normal is a unit vector pointing from
//! the second shape (B) toward the first (A), i.e. the direction that
//! separates A from B. Callers that need a specific orientation (object
//! pushed away from obstacle) order their arguments accordingly.

use serde::{Deserialize, Serialize};

use crate::entity::Shape;
use crate::foundation::math::{Point2, Vec2};

/// Substituted for the center distance when shapes are exactly coincident,
/// keeping the normal finite. The resulting direction is arbitrary but
/// deterministic (+X).
const DIST_EPSILON: f64 = 1e-6;

/// Result of a successful overlap test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Unit separating normal, pointing from B toward A.
    pub normal: Vec2,
    /// Overlap depth along the normal; always non-negative.
    pub penetration: f64,
}

/// Test two shapes for overlap.
///
/// Returns `None` when the shapes do not overlap. The match is exhaustive
/// over the shape variants, so there is no "unsupported pair" failure
/// mode; pairs the engine cannot interpret are filtered out earlier by
/// role, not here.
pub fn intersect(pos_a: &Point2, shape_a: &Shape, pos_b: &Point2, shape_b: &Shape) -> Option<Contact> {
    match (shape_a, shape_b) {
        (Shape::Rect { width: wa, height: ha }, Shape::Rect { width: wb, height: hb }) => {
            rect_rect(pos_a, *wa, *ha, pos_b, *wb, *hb)
        }
        (Shape::Circle { diameter: da }, Shape::Circle { diameter: db }) => {
            circle_circle(pos_a, *da / 2.0, pos_b, *db / 2.0)
        }
        (Shape::Rect { width, height }, Shape::Circle { diameter }) => {
            // Kernel computes rect->circle; flip to keep the B->A convention.
            rect_circle(pos_a, *width, *height, pos_b, *diameter / 2.0).map(|c| Contact {
                normal: -c.normal,
                penetration: c.penetration,
            })
        }
        (Shape::Circle { diameter }, Shape::Rect { width, height }) => {
            rect_circle(pos_b, *width, *height, pos_a, *diameter / 2.0)
        }
    }
}

/// AABB vs AABB overlap.
///
/// The normal is the axis of minimum penetration (ties prefer X) with its
/// sign taken from the positional delta, producing the shallowest
/// separating push.
fn rect_rect(a: &Point2, wa: f64, ha: f64, b: &Point2, wb: f64, hb: f64) -> Option<Contact> {
    let delta = a - b;
    let px = (wa + wb) / 2.0 - delta.x.abs();
    let py = (ha + hb) / 2.0 - delta.y.abs();
    if px < 0.0 || py < 0.0 {
        return None;
    }

    if px <= py {
        let sign = if delta.x >= 0.0 { 1.0 } else { -1.0 };
        Some(Contact {
            normal: Vec2::new(sign, 0.0),
            penetration: px,
        })
    } else {
        let sign = if delta.y >= 0.0 { 1.0 } else { -1.0 };
        Some(Contact {
            normal: Vec2::new(0.0, sign),
            penetration: py,
        })
    }
}

/// Circle vs circle overlap. Touching circles (distance exactly equal to
/// the radii sum) do not count as colliding.
fn circle_circle(a: &Point2, ra: f64, b: &Point2, rb: f64) -> Option<Contact> {
    let delta = a - b;
    let radius_sum = ra + rb;
    let dist_sq = delta.norm_squared();
    if dist_sq >= radius_sum * radius_sum {
        return None;
    }

    let dist = dist_sq.sqrt();
    let (normal, dist) = if dist < DIST_EPSILON {
        // Concentric centers: direction is undefined, pick +X.
        (Vec2::new(1.0, 0.0), DIST_EPSILON)
    } else {
        (delta / dist, dist)
    };

    Some(Contact {
        normal,
        penetration: radius_sum - dist,
    })
}

/// Rectangle vs circle overlap; normal points from the rectangle toward
/// the circle.
fn rect_circle(rect: &Point2, width: f64, height: f64, circle: &Point2, radius: f64) -> Option<Contact> {
    let half = Vec2::new(width / 2.0, height / 2.0);
    let delta = circle - rect;

    // Closest point on the rectangle to the circle center.
    let closest = Vec2::new(delta.x.clamp(-half.x, half.x), delta.y.clamp(-half.y, half.y));
    let offset = delta - closest;
    let dist_sq = offset.norm_squared();
    if dist_sq >= radius * radius {
        return None;
    }

    let dist = dist_sq.sqrt();
    let (normal, dist) = if dist < DIST_EPSILON {
        // Circle center on or inside the rectangle surface.
        (Vec2::new(1.0, 0.0), DIST_EPSILON)
    } else {
        (offset / dist, dist)
    };

    Some(Contact {
        normal,
        penetration: radius - dist,
    })
}

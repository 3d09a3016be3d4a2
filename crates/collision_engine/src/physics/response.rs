//! Collision response and integration
//!
//! Consumes one tick's contact events. Object-obstacle contacts get a
//! physical correction: the velocity component along the contact normal
//! is reflected (scaled by restitution, tangential part scaled by
//! friction) and the position is pushed out by the penetration depth,
//! then re-clamped into the viewport if one is configured. Object-object
//! contacts carry no physics here; they are forwarded to gameplay.
//!
//! The engine never mutates the entity store: corrections are reported
//! through [`GameplayHooks`] by identifier and the host applies them.
//! Events within a tick are independent, so processing order is
//! irrelevant, and the pair-key dedup upstream guarantees no event is
//! delivered twice.

use crate::config::EngineConfig;
use crate::entity::{EntityStore, GameplayHooks, SnapshotTable};
use crate::foundation::math::Vec2;
use crate::physics::contact::{ContactEvent, ContactKind};

/// Apply one tick's contact events.
pub fn apply(
    events: &[ContactEvent],
    table: &SnapshotTable,
    store: &dyn EntityStore,
    hooks: &mut dyn GameplayHooks,
    config: &EngineConfig,
) {
    for event in events {
        match event.kind {
            ContactKind::ObjectObject => {
                hooks.on_object_object_contact(&event.a, &event.b, &event.normal, event.penetration);
            }
            ContactKind::ObjectObstacle => resolve_obstacle_contact(event, table, store, hooks, config),
        }
    }
}

fn resolve_obstacle_contact(
    event: &ContactEvent,
    table: &SnapshotTable,
    store: &dyn EntityStore,
    hooks: &mut dyn GameplayHooks,
    config: &EngineConfig,
) {
    // Stale event (entity retired mid-tick): drop it.
    let Some(snapshot) = table.get_by_id(&event.a) else {
        return;
    };

    let velocity = store.velocity(&event.a).unwrap_or_else(Vec2::zeros);
    let new_velocity = reflect(&velocity, &event.normal, config.restitution, config.friction);

    // Positional correction rather than velocity-based separation, so high
    // penetration cannot tunnel through the obstacle.
    let mut new_position = snapshot.position + event.normal * event.penetration;
    if let Some(viewport) = &config.viewport {
        let half = snapshot.shape.half_extents();
        let (x, y) = viewport.clamp(new_position.x, new_position.y, half.x, half.y);
        new_position.x = x;
        new_position.y = y;
    }

    hooks.on_object_obstacle_resolved(&event.a, new_position, new_velocity);
}

/// Reflect a velocity across a contact normal.
///
/// Only velocities moving into the surface are reflected; motion already
/// separating is left untouched apart from friction. With restitution and
/// friction both 1.0 this is the pure mirror `v - 2(v·n)n`.
fn reflect(velocity: &Vec2, normal: &Vec2, restitution: f64, friction: f64) -> Vec2 {
    let along_normal = velocity.dot(normal);
    if along_normal >= 0.0 {
        return *velocity;
    }
    let normal_part = normal * along_normal;
    let tangent_part = velocity - normal_part;
    tangent_part * friction - normal_part * restitution
}

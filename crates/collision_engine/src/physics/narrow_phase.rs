//! Narrow-phase exact overlap testing
//!
//! Runs the geometry kernel over candidate pairs and produces contact
//! events. This is the single detection code path: worker threads and the
//! synchronous fallback both call [`detect`], which is what guarantees
//! behavioral parity between the two execution modes (same tie-breaks,
//! same epsilon fallbacks).

use crate::entity::{Role, SnapshotTable};
use crate::geometry;
use crate::physics::contact::{ContactEvent, ContactKind, PairMode};

/// Test every candidate pair and return the contacts that actually
/// overlap.
///
/// Pairs referencing missing snapshots are skipped (defense against stale
/// grid membership). Role pairing is resolved from the snapshots, never
/// from pair ordering: dispatch paths are not required to preserve it.
/// Pairs whose roles fit neither pairing of `mode` are dropped silently.
pub fn detect(table: &SnapshotTable, pairs: &[(u32, u32)], mode: PairMode) -> Vec<ContactEvent> {
    let mut events = Vec::new();

    for &(a, b) in pairs {
        let (Some(first), Some(second)) = (table.get(a), table.get(b)) else {
            continue;
        };

        let Some((object, other, kind)) = classify(first, second) else {
            continue;
        };
        let wanted = match mode {
            PairMode::ObjectObject => kind == ContactKind::ObjectObject,
            PairMode::ObjectObstacle => kind == ContactKind::ObjectObstacle,
            PairMode::All => true,
        };
        if !wanted {
            continue;
        }

        // Object first: for object-obstacle contacts the B->A kernel
        // convention then yields the normal pushing the object out.
        if let Some(contact) = geometry::intersect(
            &object.position,
            &object.shape,
            &other.position,
            &other.shape,
        ) {
            events.push(ContactEvent {
                a: object.id.clone(),
                b: other.id.clone(),
                kind,
                normal: contact.normal,
                penetration: contact.penetration,
            });
        }
    }

    events
}

type Classified<'a> = (
    &'a crate::entity::EntitySnapshot,
    &'a crate::entity::EntitySnapshot,
    ContactKind,
);

/// Orient a pair by role. Returns the participants object-first along
/// with the contact kind, or `None` for pairings the engine does not
/// test (obstacle-obstacle, anything involving an unknown role).
fn classify<'a>(
    first: &'a crate::entity::EntitySnapshot,
    second: &'a crate::entity::EntitySnapshot,
) -> Option<Classified<'a>> {
    match (first.role, second.role) {
        (Role::Unknown, _) | (_, Role::Unknown) => None,
        (Role::Obstacle, Role::Obstacle) => None,
        (Role::Obstacle, _) => Some((second, first, ContactKind::ObjectObstacle)),
        (_, Role::Obstacle) => Some((first, second, ContactKind::ObjectObstacle)),
        _ => Some((first, second, ContactKind::ObjectObject)),
    }
}

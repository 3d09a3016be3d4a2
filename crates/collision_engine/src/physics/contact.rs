//! Contact event records produced by the narrow phase

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::foundation::math::Vec2;

/// Which role pairing produced a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactKind {
    /// Two moving objects touched; forwarded to gameplay.
    ObjectObject,
    /// An object touched static geometry; physically corrected.
    ObjectObstacle,
}

/// Role pairing requested from a detection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PairMode {
    /// Only object-object pairs.
    ObjectObject,
    /// Only object-obstacle pairs.
    ObjectObstacle,
    /// Both pairings.
    #[default]
    All,
}

/// One deduplicated contact between two entities.
///
/// Valid for a single tick; consumed immediately by the response step and
/// never persisted. For [`ContactKind::ObjectObstacle`] contacts, `a` is
/// always the object, `b` the obstacle, and the normal points from the
/// obstacle toward the object (the separating push direction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactEvent {
    /// First participant (the object, for object-obstacle contacts).
    pub a: EntityId,
    /// Second participant.
    pub b: EntityId,
    /// Role pairing.
    pub kind: ContactKind,
    /// Unit separating normal, pointing from `b` toward `a`.
    pub normal: Vec2,
    /// Penetration depth along the normal; non-negative.
    pub penetration: f64,
}

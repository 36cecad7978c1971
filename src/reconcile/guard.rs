use crate::core::{EntityKind, PlannedEntity, Result, TrackError};

/// Refuses to delete an entity that other records still name as parent.
///
/// `candidates` is whatever the caller holds of the child level (tasks of a
/// project, activities of a task).
pub fn ensure_deletable(kind: EntityKind, id: &str, candidates: &[PlannedEntity]) -> Result<()> {
    let children = candidates
        .iter()
        .filter(|entity| entity.parent_id.as_deref() == Some(id))
        .count();
    if children > 0 {
        return Err(TrackError::HasChildren {
            kind: kind.to_string(),
            id: id.to_string(),
            children,
        });
    }
    Ok(())
}

use crate::error::DomainResult;
use crate::guard::resolve_required;
use crate::model::{Discipline, Id, LabWork};
use crate::projection::{LabWorkView, Project};
use crate::store::{EntityStore, Repository, HARDEST_FIRST};

/// Number of lab works relinked by [`assign_top_hardest`] when no other limit is given.
pub const TOP_HARDEST_LIMIT: usize = 10;

/// Links the `limit` hardest lab works to `discipline_id` and returns them in rank order.
///
/// Rows already linked to the discipline are left untouched, so repeating the call
/// is a no-op that returns the same list.
///
/// # Errors
/// Returns [`crate::DomainError::NotFound`] when the discipline does not exist,
/// or propagates store failures.
pub fn assign_top_hardest<S: EntityStore + ?Sized>(
    store: &mut S,
    discipline_id: Id<Discipline>,
    limit: usize,
) -> DomainResult<Vec<LabWorkView>> {
    let discipline = resolve_required(&*store, discipline_id)?;
    let selected = store.find_ranked(&HARDEST_FIRST, limit)?;

    let mut relinked = Vec::with_capacity(selected.len());
    for mut row in selected {
        if row.entity.discipline != Some(discipline.id) {
            row.entity.discipline = Some(discipline.id);
            <S as Repository<LabWork>>::update(store, &row)?;
        }
        relinked.push(row);
    }

    relinked.iter().map(|row| LabWork::to_shallow(row, &*store)).collect()
}

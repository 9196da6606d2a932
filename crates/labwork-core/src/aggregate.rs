use serde::{Deserialize, Serialize};

use crate::error::DomainResult;
use crate::store::EntityStore;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct SumResult {
    pub sum: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct CountResult {
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct DeleteResult {
    pub affected: u64,
}

/// Sum of `minimal_point` over every lab work; `0` when there are none.
///
/// # Errors
/// Propagates store failures.
pub fn sum_minimal_point<S: EntityStore + ?Sized>(store: &S) -> DomainResult<SumResult> {
    Ok(SumResult { sum: store.sum_minimal_point()? })
}

/// Lab works with an author whose id is strictly greater than `author_id`.
///
/// # Errors
/// Propagates store failures.
pub fn count_by_author_id_greater_than<S: EntityStore + ?Sized>(
    store: &S,
    author_id: i64,
) -> DomainResult<CountResult> {
    Ok(CountResult { count: store.count_by_author_id_greater_than(author_id)? })
}

/// Deletes every lab work whose `minimal_point` equals `value`.
///
/// # Errors
/// Propagates store failures.
pub fn delete_by_minimal_point<S: EntityStore + ?Sized>(
    store: &mut S,
    value: i64,
) -> DomainResult<DeleteResult> {
    Ok(DeleteResult { affected: store.delete_by_minimal_point(value)? })
}

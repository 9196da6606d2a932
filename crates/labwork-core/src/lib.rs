//! Domain model and integrity rules for the lab work registry.
//!
//! Adapters implement [`EntityStore`]; everything else in this crate is written
//! against that trait and runs unchanged over [`MemoryStore`] or a relational backend.

pub mod aggregate;
pub mod difficulty;
pub mod error;
pub mod guard;
pub mod memory;
pub mod model;
pub mod projection;
pub mod ranking;
pub mod store;

pub use aggregate::{
    count_by_author_id_greater_than, delete_by_minimal_point, sum_minimal_point, CountResult,
    DeleteResult, SumResult,
};
pub use difficulty::Difficulty;
pub use error::{DomainError, DomainResult, StoreError, StoreResult};
pub use guard::{guard_delete, not_found, resolve_optional, resolve_required};
pub use memory::MemoryStore;
pub use model::{
    Color, Coordinates, Country, Discipline, Entity, EntityKind, Id, LabWork, Location, Person,
    Stored, DESCRIPTION_MAX_CHARS,
};
pub use projection::{
    CoordinatesView, DisciplineView, LabWorkFullView, LabWorkView, LocationView, PersonFullView,
    PersonView, Project,
};
pub use ranking::{assign_top_hardest, TOP_HARDEST_LIMIT};
pub use store::{
    compare_ranked, rank_rows, render_order, Direction, EntityStore, ForeignKey, OrderTerm,
    RankKey, Repository, HARDEST_FIRST,
};

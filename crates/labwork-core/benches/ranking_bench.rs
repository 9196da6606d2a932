use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use labwork_core::{
    assign_top_hardest, rank_rows, Coordinates, Difficulty, Discipline, Id, LabWork, MemoryStore,
    Repository, Stored, HARDEST_FIRST, TOP_HARDEST_LIMIT,
};
use time::OffsetDateTime;

fn mk_lab_work(index: usize) -> LabWork {
    let difficulty = Difficulty::ALL[index % Difficulty::ALL.len()];
    let minimal_point = i64::try_from(index % 97).unwrap_or(0) + 1;
    LabWork {
        name: format!("bench-lab-{index}"),
        description: None,
        difficulty,
        minimal_point,
        creation_date: OffsetDateTime::UNIX_EPOCH,
        coordinates: Id::new(1),
        author: None,
        discipline: None,
    }
}

fn mk_store(rows: usize) -> (MemoryStore, Id<Discipline>) {
    let mut store = MemoryStore::new();
    if let Err(err) = store.insert(Coordinates { x: 0.0, y: 0.0 }) {
        panic!("bench coordinates insert failed: {err}");
    }
    let discipline = match store.insert(Discipline {
        name: "Bench".to_string(),
        practice_hours: 10,
        labs_count: 10,
    }) {
        Ok(row) => row.id,
        Err(err) => panic!("bench discipline insert failed: {err}"),
    };
    for index in 0..rows {
        if let Err(err) = store.insert(mk_lab_work(index)) {
            panic!("bench lab work insert failed: {err}");
        }
    }
    (store, discipline)
}

fn bench_rank_rows(c: &mut Criterion) {
    let rows = (0..1_000)
        .map(|index| {
            let raw = i64::try_from(index).unwrap_or(i64::MAX);
            Stored::new(Id::new(raw + 1), mk_lab_work(index))
        })
        .collect::<Vec<_>>();

    c.bench_function("rank_rows_1000_lab_works", |b| {
        b.iter_batched(
            || rows.clone(),
            |rows| rank_rows(rows, &HARDEST_FIRST, TOP_HARDEST_LIMIT),
            BatchSize::SmallInput,
        );
    });
}

fn bench_assign_top_hardest(c: &mut Criterion) {
    let (store, discipline) = mk_store(1_000);

    c.bench_function("assign_top_hardest_1000_lab_works", |b| {
        b.iter_batched(
            || store.clone(),
            |mut store| {
                if let Err(err) = assign_top_hardest(&mut store, discipline, TOP_HARDEST_LIMIT) {
                    panic!("ranked assignment benchmark failed: {err}");
                }
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(ranking_benches, bench_rank_rows, bench_assign_top_hardest);
criterion_main!(ranking_benches);

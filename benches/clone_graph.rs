//! Performance benchmarks for clone tree assembly.
//!
//! Run with: `cargo bench --bench clone_graph`
//!
//! | Operation | Notes |
//! |-----------|-------|
//! | Record transform | One project record, 40 fields |
//! | Plan assembly | In-memory fetch + clone of the whole hierarchy |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use chrono::NaiveDate;
use tokio::runtime::Runtime;

use project_clone_kernel::schema::{self, PROJECT_COST_SHEETS};
use project_clone_kernel::{
    CloneSettings, CloneTransformer, ExemptionPolicy, GraphCloner, GraphFetcher,
    InMemoryOrganizationService, Record, RecordId,
};
use uuid::Uuid;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
}

/// Project with `sheets` cost sheets, each holding `leaves` records per leaf slot.
fn make_project(sheets: usize, leaves: usize) -> Record {
    let mut next = 1u128;
    let mut project = Record::with_id(schema::PROJECT_KIND, RecordId::new(Uuid::from_u128(next)))
        .field("bolt_rentalname", "Bench");
    for _ in 0..sheets {
        next += 1;
        let mut cs = Record::with_id(schema::COST_SHEET_KIND, RecordId::new(Uuid::from_u128(next)));
        for (kind, relationship) in schema::LEAF_RELATIONSHIPS {
            for i in 0..leaves {
                next += 1;
                cs = cs.child(
                    *relationship,
                    Record::with_id(*kind, RecordId::new(Uuid::from_u128(next)))
                        .field("bolt_line", i as i64)
                        .field("bolt_extendedprice", 100.0),
                );
            }
        }
        project = project.child(PROJECT_COST_SHEETS, cs);
    }
    project
}

fn bench_transform(c: &mut Criterion) {
    let policy = ExemptionPolicy::rental_project();
    let mut record = Record::with_id(schema::PROJECT_KIND, RecordId::new(Uuid::from_u128(1)))
        .field("bolt_rentalname", "Bench");
    for i in 0..40 {
        record.set(format!("bolt_field_{}", i), i as i64);
    }
    let transformer = CloneTransformer::new(&policy, today());

    c.bench_function("transform_project_record", |b| {
        b.iter(|| transformer.clone_record(black_box(&record), schema::PROJECT_KIND))
    });
}

fn bench_plan(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let settings = CloneSettings::default();
    let policy = ExemptionPolicy::rental_project();

    let mut group = c.benchmark_group("clone_plan");
    for sheets in [1usize, 10, 50] {
        let service = InMemoryOrganizationService::rental().without_journal();
        let project = make_project(sheets, 4);
        let records = project.count_nodes();
        let target = service.seed(project).unwrap();

        group.throughput(Throughput::Elements(records as u64));
        group.bench_with_input(BenchmarkId::from_parameter(sheets), &target, |b, target| {
            b.to_async(&rt).iter(|| async {
                let snapshot = GraphFetcher::new(&service, &settings)
                    .fetch_root_with_children(target)
                    .await
                    .unwrap();
                GraphCloner::new(
                    GraphFetcher::new(&service, &settings),
                    CloneTransformer::new(&policy, today()),
                    &settings,
                )
                .clone_graph(&snapshot)
                .await
                .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_transform, bench_plan);
criterion_main!(benches);

//! Enrollment throughput against a data directory with a growing number of courses.
//!
//! Run with:
//!   cargo bench --bench enroll_bench

use academia::{FileRegistry, RegistryEngine, StoreConfig};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;

fn populated(courses: usize) -> (FileRegistry, TempDir) {
    let dir = TempDir::new().unwrap();
    let registry = FileRegistry::open(StoreConfig::new(dir.path())).unwrap();
    registry.add_student("s1", "Bench", "pw").unwrap();
    for n in 0..courses {
        registry
            .add_course("f1", &format!("c{}", n), "Course", 100)
            .unwrap();
    }
    (registry, dir)
}

fn bench_enroll_unenroll(c: &mut Criterion) {
    let mut group = c.benchmark_group("enroll_unenroll");
    for courses in [1usize, 10, 100] {
        let (registry, _dir) = populated(courses);
        let last = format!("c{}", courses - 1);
        group.bench_with_input(BenchmarkId::from_parameter(courses), &last, |b, course| {
            b.iter(|| {
                registry.enroll("s1", course).unwrap();
                registry.unenroll("s1", course).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_list_courses(c: &mut Criterion) {
    let (registry, _dir) = populated(100);
    c.bench_function("list_courses_100", |b| {
        b.iter(|| registry.list_courses().unwrap())
    });
}

criterion_group!(benches, bench_enroll_unenroll, bench_list_courses);
criterion_main!(benches);

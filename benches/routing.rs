use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use mathroute::{normalize, InMemoryKnowledgeBase, Router, SolverDispatcher, Solver};

const QUESTIONS: &[&str] = &[
    "derivative of x^2 + 3x",
    "integrate sin(x) dx",
    "limit of sin(x)/x as x -> 0",
    "solve x^2 - 5x + 6 = 0",
    "2+2*3",
    "What is the Laplace transform of t^3?",
];

fn seeded_kb() -> InMemoryKnowledgeBase {
    // 256 stored questions so the similarity scan does realistic work.
    let entries: Vec<String> = (0..256u32)
        .map(|i| {
            format!(
                r#"{{"question": "What is {i} times {i} plus {i}?", "answer": "{}", "solution": "{}"}}"#,
                i * i + i,
                i * i + i
            )
        })
        .collect();
    let json = format!("[{}]", entries.join(","));
    InMemoryKnowledgeBase::from_json_str(&json).unwrap()
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    group.throughput(Throughput::Elements(QUESTIONS.len() as u64));
    group.bench_function("questions", |b| {
        b.iter(|| {
            for q in QUESTIONS {
                criterion::black_box(normalize(q));
            }
        });
    });
    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let solver = SolverDispatcher::new();
    let normalized: Vec<String> = QUESTIONS.iter().map(|q| normalize(q)).collect();
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(normalized.len() as u64));
    group.bench_function("solve", |b| {
        b.iter(|| {
            for q in &normalized {
                let _ = criterion::black_box(solver.solve(q));
            }
        });
    });
    group.finish();
}

fn bench_route(c: &mut Criterion) {
    let plain = Router::new().unwrap();
    let with_kb = Router::builder()
        .knowledge_base(Arc::new(seeded_kb()))
        .build()
        .unwrap();

    let mut group = c.benchmark_group("route");
    group.throughput(Throughput::Elements(QUESTIONS.len() as u64));
    group.bench_function("no_collaborators", |b| {
        b.iter(|| {
            for q in QUESTIONS {
                criterion::black_box(plain.route(q));
            }
        });
    });
    group.bench_function("in_memory_kb", |b| {
        b.iter(|| {
            for q in QUESTIONS {
                criterion::black_box(with_kb.route(q));
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_normalize, bench_dispatch, bench_route);
criterion_main!(benches);

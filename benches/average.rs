use std::hint::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use evoked::{average, contrast, make_evoked, ConditionSpec, Contrast, Epochs, EpochsInfo};
use ndarray::Array3;

/// 200 trials × 64 channels × 500 samples, alternating "A"/"B".
fn epochs() -> Epochs {
    let data = Array3::from_shape_fn((200, 64, 500), |(e, c, t)| {
        ((e * 7 + c * 3 + t) as f32 * 0.01).sin()
    });
    let labels = (0..200).map(|e| if e % 2 == 0 { "A" } else { "B" }.to_string()).collect();
    Epochs::new(data, labels, EpochsInfo { ch_names: vec![], sfreq: 500.0, tmin: -0.2 }).unwrap()
}

fn bench_average(c: &mut Criterion) {
    let ep = epochs();
    c.bench_function("average [200×64×500]", |b| {
        b.iter(|| {
            let ev = average(black_box(&ep), "all").unwrap();
            black_box(ev.data[[0, 0]])
        })
    });
}

fn bench_contrast(c: &mut Criterion) {
    let ep = epochs();
    let a = average(&ep.select("A").unwrap(), "A").unwrap();
    let b_ = average(&ep.select("B").unwrap(), "B").unwrap();
    c.bench_function("contrast [64×500]", |b| {
        b.iter(|| {
            let d = contrast(black_box(&a), black_box(&b_)).unwrap();
            black_box(d.data[[0, 0]])
        })
    });
}

fn bench_make_evoked(c: &mut Criterion) {
    let ep = epochs();
    let spec = ConditionSpec::Labels(vec!["A".into(), "B".into()]);
    let contrasts = [Contrast::new("A", "B")];
    c.bench_function("make_evoked (select + average + contrast)", |b| {
        b.iter(|| {
            let out = make_evoked(black_box(&ep), &spec, &contrasts).unwrap();
            black_box(out.len())
        })
    });
}

criterion_group!(benches, bench_average, bench_contrast, bench_make_evoked);
criterion_main!(benches);

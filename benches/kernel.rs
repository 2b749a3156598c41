use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cliff::descriptor::Descriptor;
use cliff::ml::krr::kernel_matrix;
use cliff::ml::{Kernel, KernelRidge, KrrParams, TrainingSet};
use cliff::logging::Silent;
use nalgebra::DVector;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;

fn random_descriptors(rng: &mut StdRng, count: usize, len: usize) -> Vec<Descriptor> {
    (0..count)
        .map(|_| DVector::from_fn(len, |_, _| rng.gen_range(0.0..40.0)))
        .collect()
}

fn bench_kernel_matrix(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let descriptors = random_descriptors(&mut rng, 300, 78);

    let mut group = c.benchmark_group("kernel_matrix");
    for kernel in [Kernel::Laplacian, Kernel::Gaussian] {
        group.bench_with_input(BenchmarkId::from_parameter(kernel), &kernel, |b, &kernel| {
            b.iter(|| black_box(kernel_matrix(&descriptors, kernel, 1000.0)))
        });
    }
    group.finish();
}

fn bench_train_and_predict(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let descriptors = random_descriptors(&mut rng, 200, 78);
    let targets: Vec<f64> = (0..200).map(|_| rng.gen_range(0.5..1.0)).collect();
    let mut set = TrainingSet::new();
    set.add(descriptors, targets).unwrap();
    let params = KrrParams::default();

    c.bench_function("krr_train_200", |b| {
        b.iter(|| {
            let mut krr = KernelRidge::new().with_logger(Arc::new(Silent));
            krr.train(&set, &params).unwrap();
            black_box(krr.is_trained());
        })
    });

    let mut krr = KernelRidge::new().with_logger(Arc::new(Silent));
    krr.train(&set, &params).unwrap();
    let queries = random_descriptors(&mut rng, 50, 78);
    c.bench_function("krr_predict_50", |b| {
        b.iter(|| black_box(krr.predict(&queries).unwrap()))
    });
}

criterion_group!(kernel_benches, bench_kernel_matrix, bench_train_and_predict);
criterion_main!(kernel_benches);

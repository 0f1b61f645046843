use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ndarray::Array2;
use psisloo::{PsisConfig, SortHint, gpdfit, psisloo, psislw};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp, StudentT};

fn random_log_lik(draws: usize, observations: usize) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(0x5EED_F64 + (draws * observations) as u64);
    let student = StudentT::new(4.0).unwrap();
    Array2::from_shape_fn((draws, observations), |_| -student.sample(&mut rng).abs())
}

fn benchmark_gpdfit(c: &mut Criterion) {
    let mut group = c.benchmark_group("gpdfit");
    for size in [100_usize, 800, 4000] {
        let mut rng = StdRng::seed_from_u64(size as u64);
        let exp = Exp::new(1.0).unwrap();
        let sample: ndarray::Array1<f64> = (0..size).map(|_| exp.sample(&mut rng)).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("unsorted", size), &sample, |b, input| {
            b.iter(|| {
                let fit = gpdfit(black_box(input.view()), SortHint::Unsorted);
                black_box(fit).ok();
            });
        });
    }
    group.finish();
}

fn benchmark_psis(c: &mut Criterion) {
    let shapes = [(1000_usize, 10_usize), (4000, 50), (4000, 400)];
    let inputs: Vec<_> = shapes
        .iter()
        .map(|&(draws, observations)| ((draws, observations), random_log_lik(draws, observations)))
        .collect();
    let config = PsisConfig::default();

    let mut group = c.benchmark_group("psis");
    group.sample_size(20);
    for ((draws, observations), log_lik) in inputs.iter() {
        let label = format!("{draws}x{observations}");
        group.throughput(Throughput::Elements((*draws * *observations) as u64));

        group.bench_with_input(BenchmarkId::new("psislw", &label), log_lik, |b, input| {
            b.iter(|| {
                let smoothed = psislw(black_box(input.view()), &config);
                black_box(smoothed).ok();
            });
        });

        group.bench_with_input(BenchmarkId::new("psisloo", &label), log_lik, |b, input| {
            b.iter(|| {
                let result = psisloo(black_box(input.view()), &config);
                black_box(result).ok();
            });
        });
    }
    group.finish();
}

criterion_group!(psis_benchmark, benchmark_gpdfit, benchmark_psis);
criterion_main!(psis_benchmark);

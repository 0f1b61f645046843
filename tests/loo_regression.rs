use approx::assert_relative_eq;
use ndarray::{Array2, Axis};
use psisloo::data::DEFAULT_LOG_LIK_PREFIX;
use psisloo::{
    LooSummary, ParetoKCategory, PsisConfig, load_log_lik_csv, psisloo, psislw, sumlogs_axis,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use std::fmt::Write as _;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Three observations whose importance weights have tail indices near 0.3, 0.6 and 1.
fn graded_log_lik() -> Array2<f64> {
    let scales = [0.3, 0.6, 1.0];
    Array2::from_shape_fn((100, 3), |(s, j)| {
        scales[j] * ((((s * 37 + j * 11) % 100) as f64 + 0.5) / 100.0).ln()
    })
}

/// Pointwise log densities of a normal model evaluated at posterior draws of its mean.
fn normal_model_log_lik(draws: usize, observations: &[f64], seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let posterior = Normal::new(0.2, 0.15).unwrap();
    let mus: Vec<f64> = (0..draws).map(|_| posterior.sample(&mut rng)).collect();
    let log_norm = -0.5 * (2.0 * std::f64::consts::PI).ln();
    Array2::from_shape_fn((draws, observations.len()), |(s, i)| {
        let z = observations[i] - mus[s];
        log_norm - 0.5 * z * z
    })
}

#[test]
fn matches_reference_values() {
    init_logging();
    let log_lik = graded_log_lik();
    let result = psisloo(log_lik.view(), &PsisConfig::default()).unwrap();

    let expected_loos = [-0.3508049042004391, -0.8455059145429455, -1.8342548683366608];
    let expected_ks = [0.3305646883227041, 0.5892122429279543, 0.9333025958801697];
    for (got, want) in result.loos.iter().zip(expected_loos) {
        assert_relative_eq!(*got, want, max_relative = 1e-9);
    }
    for (got, want) in result.pareto_k.to_vec().into_iter().zip(expected_ks) {
        assert_relative_eq!(got, want, max_relative = 1e-9);
    }
    assert_relative_eq!(result.loo, -3.0305656870800455, max_relative = 1e-9);
    assert_eq!(
        result.pareto_k.categories(),
        vec![
            ParetoKCategory::Good,
            ParetoKCategory::Ok,
            ParetoKCategory::Bad
        ]
    );
}

#[test]
fn total_is_structurally_the_sum_of_pointwise_terms() {
    let observations = [0.1, -0.4, 0.9, 2.5, 0.3, -1.2];
    let log_lik = normal_model_log_lik(1000, &observations, 11);
    let result = psisloo(log_lik.view(), &PsisConfig::default()).unwrap();
    assert_eq!(result.loos.len(), observations.len());
    assert_eq!(result.loo, result.loos.sum());
}

#[test]
fn agrees_with_manual_composition_of_the_smoother() {
    let observations = [0.0, 1.5, -0.7];
    let log_lik = normal_model_log_lik(800, &observations, 12);
    let config = PsisConfig::default().with_wcpp(15.0);

    let (lw, ks) = psislw(log_lik.mapv(|v| -v).view(), &config).unwrap();
    let manual = sumlogs_axis((lw + &log_lik).view(), Axis(0));

    let result = psisloo(log_lik.view(), &config).unwrap();
    assert_eq!(result.loos, manual);
    assert_eq!(result.pareto_k, ks);
}

#[test]
fn outlier_loses_most_predictive_density() {
    let observations = [0.1, -0.4, 0.9, 2.5, 0.3];
    let log_lik = normal_model_log_lik(2000, &observations, 13);
    let result = psisloo(log_lik.view(), &PsisConfig::default()).unwrap();
    let summary = result.summary(log_lik.view()).unwrap();

    let log_n = (log_lik.nrows() as f64).ln();
    let lpd = sumlogs_axis(log_lik.view(), Axis(0)).mapv(|v| v - log_n);
    let gap = &lpd - &result.loos;
    assert!(gap[3] > 0.0);
    assert!(gap.iter().all(|&g| g <= gap[3]));
    assert!(summary.p_loo > 0.0 && summary.p_loo < 5.0);
    assert_eq!(summary.pareto_k_counts.good + summary.pareto_k_counts.ok, 5);
}

#[test]
fn reads_stan_csv_and_reports_summary() {
    init_logging();
    let log_lik = graded_log_lik();

    let mut csv = String::from("# generated by a sampler\nlp,log_lik.1,log_lik.2,log_lik.3\n");
    for row in log_lik.rows() {
        write!(csv, "-1.0").unwrap();
        for value in row {
            write!(csv, ",{value:?}").unwrap();
        }
        csv.push('\n');
    }

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("output.csv");
    std::fs::write(&input, csv).unwrap();

    let loaded = load_log_lik_csv(&input, DEFAULT_LOG_LIK_PREFIX).unwrap();
    assert_eq!(loaded, log_lik);

    let result = psisloo(loaded.view(), &PsisConfig::default()).unwrap();
    let summary = result.summary(loaded.view()).unwrap();
    assert_relative_eq!(summary.lppd, -1.4252806138516596, max_relative = 1e-9);
    assert_relative_eq!(summary.p_loo, 1.6052850732283859, max_relative = 1e-8);

    let report = dir.path().join("loo.toml");
    summary.save(&report).unwrap();
    let reloaded = LooSummary::load(&report).unwrap();
    assert_eq!(reloaded.pareto_k_counts, summary.pareto_k_counts);
    assert_relative_eq!(reloaded.elpd_loo, summary.elpd_loo, max_relative = 1e-15);
}

//! Benchmark the surrogates on the synthetic linear model, without simulators,
//! persistence, or plotting.
//!
//! Usage:
//!   cargo run --example synthetic_benchmark -- [budget]
//!
//! Demonstrates library-only usage: Sobol design, disjoint held-out set,
//! surrogate fit/predict, and Monte Carlo evaluation.

use abm_surrogate_bench::core::config::Config;
use abm_surrogate_bench::core::space::ParameterSpace;
use abm_surrogate_bench::evaluation::evaluate;
use abm_surrogate_bench::report::render_summary_table;
use abm_surrogate_bench::sampling::dedup::filter_disjoint;
use abm_surrogate_bench::sampling::design::{candidate_stream, generate_design, sampler_rng};
use abm_surrogate_bench::simulator::Simulator;
use abm_surrogate_bench::simulator::synthetic::LinearResponse;
use abm_surrogate_bench::surrogate::{GradientBoosting, Kriging, LinearRegression, Surrogate, TrainingSet};

const DIMENSIONS: usize = 5;
const TEST_SIZE: usize = 10;
const MONTE_CARLOS: usize = 20;

fn main() {
    let budget = std::env::args()
        .nth(1)
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(32);

    let config = Config::default();
    let space = ParameterSpace::unit_cube(DIMENSIONS).expect("unit cube");
    let simulator = LinearResponse::new(DIMENSIONS);

    let x = generate_design(&space, budget, 0).expect("training design");
    let y = simulator.evaluate_batch(&x).expect("training responses");

    let keep = TEST_SIZE * MONTE_CARLOS;
    let mut rng = sampler_rng(Some(42));
    let x_oos = filter_disjoint(candidate_stream(&space, &mut rng).take(keep * budget), &x, keep)
        .expect("held-out set");
    let y_oos = simulator.evaluate_batch(&x_oos).expect("held-out responses");

    let training = TrainingSet::new(x, y).expect("training set");
    let surrogates: Vec<Box<dyn Surrogate>> = vec![
        Box::new(Kriging::new(config.surrogates.kriging.clone())),
        Box::new(GradientBoosting::new(config.surrogates.boosting.clone())),
        Box::new(LinearRegression),
    ];

    let predictions: Vec<(String, Vec<f64>)> = surrogates
        .iter()
        .map(|s| {
            let fitted = s.fit(&training).expect("fit");
            let predicted = fitted.predict(&x_oos).expect("predict");
            (fitted.name().to_string(), predicted)
        })
        .collect();

    let matrix = evaluate(&y_oos, &predictions, TEST_SIZE).expect("evaluate");
    println!("Budget {budget}, {MONTE_CARLOS} trials of {TEST_SIZE} points");
    print!("{}", render_summary_table(&matrix.summaries()));
}

//! Order-preserving batch evaluation with an optional worker pool.
//!
//! Output index `i` always holds the response for input index `i`. Any failed or
//! non-finite evaluation aborts the whole batch; no partial results are returned.

#![allow(missing_docs)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel as channel;

use crate::core::errors::{AsbError, Result};
use crate::core::space::DesignPoint;
use crate::simulator::Simulator;

/// Runs a simulator over a batch of design points for one pipeline stage.
#[derive(Debug, Clone, Copy)]
pub struct BatchEvaluator {
    stage: &'static str,
    parallelism: usize,
}

impl BatchEvaluator {
    #[must_use]
    pub fn new(stage: &'static str, parallelism: usize) -> Self {
        Self {
            stage,
            parallelism: parallelism.max(1),
        }
    }

    #[must_use]
    pub fn sequential(stage: &'static str) -> Self {
        Self::new(stage, 1)
    }

    #[must_use]
    pub const fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn run<S: Simulator + ?Sized>(&self, simulator: &S, points: &[DesignPoint]) -> Result<Vec<f64>> {
        for (index, point) in points.iter().enumerate() {
            if point.len() != simulator.dimensions() {
                return Err(AsbError::DimensionMismatch {
                    context: "simulator input",
                    expected: simulator.dimensions(),
                    actual: point.len(),
                    index,
                });
            }
        }

        let workers = self.parallelism.min(points.len());
        if workers <= 1 {
            return points
                .iter()
                .enumerate()
                .map(|(index, point)| self.evaluate_one(simulator, index, point))
                .collect();
        }
        self.run_parallel(simulator, points, workers)
    }

    fn evaluate_one<S: Simulator + ?Sized>(&self, simulator: &S, index: usize, point: &[f64]) -> Result<f64> {
        let value = simulator
            .evaluate(point)
            .map_err(|err| AsbError::SimulationFailure {
                stage: self.stage,
                index,
                details: format!("{}: {err}", simulator.name()),
            })?;
        if !value.is_finite() {
            return Err(AsbError::SimulationFailure {
                stage: self.stage,
                index,
                details: format!("{} returned non-finite response {value}", simulator.name()),
            });
        }
        Ok(value)
    }

    fn run_parallel<S: Simulator + ?Sized>(
        &self,
        simulator: &S,
        points: &[DesignPoint],
        workers: usize,
    ) -> Result<Vec<f64>> {
        let (work_tx, work_rx) = channel::unbounded::<usize>();
        let (result_tx, result_rx) = channel::unbounded::<(usize, Result<f64>)>();
        let abort = AtomicBool::new(false);

        for index in 0..points.len() {
            let _ = work_tx.send(index);
        }
        drop(work_tx);

        thread::scope(|scope| {
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let abort = &abort;
                scope.spawn(move || {
                    while let Ok(index) = work_rx.recv() {
                        if abort.load(Ordering::Acquire) {
                            break;
                        }
                        let outcome = self.evaluate_one(simulator, index, &points[index]);
                        if outcome.is_err() {
                            abort.store(true, Ordering::Release);
                        }
                        if result_tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut slots: Vec<Option<f64>> = vec![None; points.len()];
        let mut first_error: Option<(usize, AsbError)> = None;
        for (index, outcome) in result_rx {
            match outcome {
                Ok(value) => slots[index] = Some(value),
                Err(err) => {
                    if first_error.as_ref().is_none_or(|(i, _)| index < *i) {
                        first_error = Some((index, err));
                    }
                }
            }
        }
        if let Some((_, err)) = first_error {
            return Err(err);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| AsbError::SimulationFailure {
                    stage: self.stage,
                    index,
                    details: "worker exited before evaluating point".to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::synthetic::LinearResponse;

    struct FailsAt {
        bad: f64,
        nan: f64,
    }

    impl Simulator for FailsAt {
        fn name(&self) -> &str {
            "fails-at"
        }

        fn dimensions(&self) -> usize {
            1
        }

        fn evaluate(&self, point: &[f64]) -> Result<f64> {
            if point[0] == self.bad {
                return Err(AsbError::InvalidInput {
                    details: "model diverged".to_string(),
                });
            }
            if point[0] == self.nan {
                return Ok(f64::NAN);
            }
            Ok(point[0] * 2.0)
        }
    }

    fn line(n: usize) -> Vec<DesignPoint> {
        (0..n).map(|i| vec![i as f64]).collect()
    }

    #[test]
    fn parallel_results_preserve_input_order() {
        let sim = LinearResponse::new(1);
        let points = line(257);
        let seq = BatchEvaluator::sequential("test").run(&sim, &points).unwrap();
        let par = BatchEvaluator::new("test", 8).run(&sim, &points).unwrap();
        assert_eq!(seq, par);
        assert_eq!(par[100], 100.0);
    }

    #[test]
    fn failure_aborts_batch_with_stage_and_index() {
        let sim = FailsAt {
            bad: 5.0,
            nan: -1.0,
        };
        for parallelism in [1, 4] {
            let err = BatchEvaluator::new("training_evaluation", parallelism)
                .run(&sim, &line(20))
                .unwrap_err();
            match err {
                AsbError::SimulationFailure { stage, index, details } => {
                    assert_eq!(stage, "training_evaluation");
                    assert_eq!(index, 5);
                    assert!(details.contains("model diverged"), "{details}");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn non_finite_response_is_a_failure() {
        let sim = FailsAt {
            bad: -1.0,
            nan: 3.0,
        };
        let err = BatchEvaluator::sequential("oos_evaluation")
            .run(&sim, &line(10))
            .unwrap_err();
        assert!(matches!(err, AsbError::SimulationFailure { index: 3, .. }));
    }

    #[test]
    fn wrong_dimension_rejected_before_running() {
        let sim = LinearResponse::new(2);
        let err = BatchEvaluator::sequential("test")
            .run(&sim, &[vec![1.0, 2.0], vec![1.0]])
            .unwrap_err();
        assert!(matches!(
            err,
            AsbError::DimensionMismatch {
                expected: 2,
                actual: 1,
                index: 1,
                ..
            }
        ));
    }

    #[test]
    fn trait_default_batch_is_sequential() {
        let sim = LinearResponse::new(1);
        assert_eq!(sim.evaluate_batch(&line(3)).unwrap(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn empty_batch_is_empty() {
        let sim = LinearResponse::new(1);
        assert!(BatchEvaluator::new("test", 4).run(&sim, &[]).unwrap().is_empty());
    }
}

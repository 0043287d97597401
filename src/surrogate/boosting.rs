//! Gradient-boosted regression trees with XGBoost-style regularisation.
//!
//! Squared loss, so every row has gradient `pred - y` and unit hessian. Trees
//! are grown depth-first with exact greedy split search; a split is taken only
//! when its regularised gain is positive and both children carry at least
//! `min_child_weight` hessian.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;

use crate::core::config::BoostingConfig;
use crate::core::errors::{AsbError, Result};
use crate::core::space::DesignPoint;
use crate::surrogate::{FittedSurrogate, Surrogate, TrainingSet, check_dimensions};

const NAME: &str = "XGBoost (Batch)";

#[derive(Debug, Clone)]
pub struct GradientBoosting {
    config: BoostingConfig,
}

impl GradientBoosting {
    #[must_use]
    pub const fn new(config: BoostingConfig) -> Self {
        Self { config }
    }
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self::new(BoostingConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// One regression tree stored as a flat node arena; node 0 is the root.
#[derive(Debug, Clone, PartialEq)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, point: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match self.nodes[at] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => at = if point[feature] < threshold { left } else { right },
            }
        }
    }

    fn leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }
}

struct BestSplit {
    gain: f64,
    feature: usize,
    threshold: f64,
}

struct TreeBuilder<'a> {
    config: &'a BoostingConfig,
    inputs: &'a [DesignPoint],
    gradients: &'a [f64],
    dimensions: usize,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.config.lambda)
    }

    fn leaf_value(&self, g: f64, h: f64) -> f64 {
        if h + self.config.lambda > 0.0 {
            -g / (h + self.config.lambda)
        } else {
            0.0
        }
    }

    fn find_split(&self, rows: &[usize]) -> Option<BestSplit> {
        let g_total: f64 = rows.iter().map(|&r| self.gradients[r]).sum();
        let h_total = rows.len() as f64;
        let parent = self.score(g_total, h_total);
        let mut best: Option<BestSplit> = None;
        let mut sorted = rows.to_vec();

        for feature in 0..self.dimensions {
            sorted.sort_by(|&a, &b| self.inputs[a][feature].total_cmp(&self.inputs[b][feature]));
            let mut g_left = 0.0;
            for (i, pair) in sorted.windows(2).enumerate() {
                g_left += self.gradients[pair[0]];
                let (lo, hi) = (self.inputs[pair[0]][feature], self.inputs[pair[1]][feature]);
                if lo == hi {
                    continue;
                }
                let h_left = (i + 1) as f64;
                let h_right = h_total - h_left;
                if h_left < self.config.min_child_weight || h_right < self.config.min_child_weight {
                    continue;
                }
                let gain = 0.5
                    * (self.score(g_left, h_left) + self.score(g_total - g_left, h_right) - parent)
                    - self.config.gamma;
                if gain > 0.0 && best.as_ref().is_none_or(|b| gain > b.gain) {
                    best = Some(BestSplit {
                        gain,
                        feature,
                        threshold: lo + (hi - lo) / 2.0,
                    });
                }
            }
        }
        best
    }

    fn grow(&mut self, rows: &[usize], depth: usize) -> usize {
        let id = self.nodes.len();
        let g: f64 = rows.iter().map(|&r| self.gradients[r]).sum();
        self.nodes.push(Node::Leaf {
            value: self.leaf_value(g, rows.len() as f64),
        });
        if depth >= self.config.max_depth || rows.len() < 2 {
            return id;
        }
        let Some(split) = self.find_split(rows) else {
            return id;
        };
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| self.inputs[r][split.feature] < split.threshold);
        let left = self.grow(&left_rows, depth + 1);
        let right = self.grow(&right_rows, depth + 1);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }
}

impl Surrogate for GradientBoosting {
    fn name(&self) -> &str {
        NAME
    }

    fn fit(&self, data: &TrainingSet) -> Result<Box<dyn FittedSurrogate>> {
        let cfg = &self.config;
        if !(cfg.learning_rate > 0.0 && cfg.subsample > 0.0 && cfg.subsample <= 1.0) {
            return Err(AsbError::ModelFit {
                surrogate: NAME.to_string(),
                details: format!(
                    "learning_rate {} and subsample {} must be positive (subsample <= 1)",
                    cfg.learning_rate, cfg.subsample
                ),
            });
        }

        let n = data.len();
        let base_score = data.targets().iter().sum::<f64>() / n as f64;
        let mut predictions = vec![base_score; n];
        let mut gradients = vec![0.0; n];
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let sample_size = ((n as f64 * cfg.subsample).round() as usize).clamp(1, n);
        let mut trees = Vec::with_capacity(cfg.n_estimators);

        for _ in 0..cfg.n_estimators {
            for ((g, p), y) in gradients.iter_mut().zip(&predictions).zip(data.targets()) {
                *g = p - y;
            }
            let rows: Vec<usize> = if sample_size == n {
                (0..n).collect()
            } else {
                let mut picked = index::sample(&mut rng, n, sample_size).into_vec();
                picked.sort_unstable();
                picked
            };
            let mut builder = TreeBuilder {
                config: cfg,
                inputs: data.inputs(),
                gradients: &gradients,
                dimensions: data.dimensions(),
                nodes: Vec::new(),
            };
            builder.grow(&rows, 0);
            let tree = Tree {
                nodes: builder.nodes,
            };
            for (p, x) in predictions.iter_mut().zip(data.inputs()) {
                *p += cfg.learning_rate * tree.predict(x);
            }
            trees.push(tree);
        }

        Ok(Box::new(FittedBoosting {
            dimensions: data.dimensions(),
            base_score,
            learning_rate: cfg.learning_rate,
            trees,
        }))
    }
}

/// Trained tree ensemble.
#[derive(Debug, Clone)]
pub struct FittedBoosting {
    dimensions: usize,
    base_score: f64,
    learning_rate: f64,
    trees: Vec<Tree>,
}

impl FittedBoosting {
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn total_leaves(&self) -> usize {
        self.trees.iter().map(Tree::leaves).sum()
    }
}

impl FittedSurrogate for FittedBoosting {
    fn name(&self) -> &str {
        NAME
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn predict(&self, points: &[DesignPoint]) -> Result<Vec<f64>> {
        check_dimensions(points, self.dimensions, "boosting prediction")?;
        Ok(points
            .iter()
            .map(|x| {
                self.base_score
                    + self.learning_rate * self.trees.iter().map(|t| t.predict(x)).sum::<f64>()
            })
            .collect())
    }
}

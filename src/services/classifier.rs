use std::path::Path;

use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    services::features::FeatureMatrix,
};

/// Pre-trained binary classifier over pair feature rows
///
/// Implementations are stateless at inference time: no training, no online
/// updates.
#[cfg_attr(test, mockall::automock)]
pub trait Classifier: Send + Sync {
    /// Row width the model was trained on
    fn num_features(&self) -> usize;

    /// Probability of the positive (will-listen) class, one per row, in row order
    fn predict_proba(&self, features: &FeatureMatrix) -> AppResult<Vec<f32>>;

    /// Classifier name for logging and debugging
    fn name(&self) -> &'static str;
}

// XGBoost JSON model format (`Booster.save_model("model.json")`)

#[derive(Deserialize)]
struct ModelFile {
    learner: Learner,
}

#[derive(Deserialize)]
struct Learner {
    learner_model_param: LearnerModelParam,
    gradient_booster: GradientBooster,
    objective: Objective,
}

#[derive(Deserialize)]
struct LearnerModelParam {
    base_score: String,
    num_feature: String,
}

#[derive(Deserialize)]
struct Objective {
    name: String,
}

#[derive(Deserialize)]
struct GradientBooster {
    name: String,
    #[serde(default)]
    model: Option<GbTreeModel>,
}

#[derive(Deserialize)]
struct GbTreeModel {
    trees: Vec<RawTree>,
}

#[derive(Deserialize)]
struct RawTree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<u32>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
}

/// Older XGBoost releases write booleans, newer ones 0/1
#[derive(Deserialize, Clone, Copy)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf(f32),
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
}

#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Validates the raw arrays so evaluation never indexes out of bounds or loops
    fn from_raw(raw: RawTree, num_features: usize, tree_index: usize) -> AppResult<Self> {
        let len = raw.left_children.len();
        if [
            raw.right_children.len(),
            raw.split_indices.len(),
            raw.split_conditions.len(),
            raw.default_left.len(),
        ]
        .iter()
        .any(|&l| l != len)
            || len == 0
        {
            return Err(AppError::Model(format!(
                "tree {} has inconsistent node arrays",
                tree_index
            )));
        }

        let mut nodes = Vec::with_capacity(len);
        for i in 0..len {
            let left = raw.left_children[i];
            if left == -1 {
                nodes.push(Node::Leaf(raw.split_conditions[i]));
                continue;
            }

            let right = raw.right_children[i];
            let feature = raw.split_indices[i] as usize;
            let child_ok = |c: i32| c >= 0 && (c as usize) < len && c as usize != i;
            if !child_ok(left) || !child_ok(right) || feature >= num_features {
                return Err(AppError::Model(format!(
                    "tree {} node {} is malformed",
                    tree_index, i
                )));
            }

            nodes.push(Node::Split {
                feature,
                threshold: raw.split_conditions[i],
                left: left as usize,
                right: right as usize,
                default_left: raw.default_left[i].is_set(),
            });
        }

        // Every reachable node must be reached exactly once, which rules out cycles
        let mut seen = vec![false; len];
        let mut stack = vec![0usize];
        while let Some(i) = stack.pop() {
            if std::mem::replace(&mut seen[i], true) {
                return Err(AppError::Model(format!(
                    "tree {} is not a tree (node {} reached twice)",
                    tree_index, i
                )));
            }
            if let Node::Split { left, right, .. } = nodes[i] {
                stack.push(left);
                stack.push(right);
            }
        }

        Ok(Self { nodes })
    }

    fn leaf_value(&self, row: &[f32]) -> f32 {
        let mut i = 0;
        loop {
            match self.nodes[i] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = row[feature];
                    i = if x.is_nan() {
                        if default_left {
                            left
                        } else {
                            right
                        }
                    } else if x < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Gradient-boosted tree ensemble loaded from an XGBoost JSON model
///
/// Supports the `gbtree` booster with the `binary:logistic` objective: the
/// margin is `logit(base_score)` plus the sum of one leaf per tree, and the
/// probability is its sigmoid.
#[derive(Debug)]
pub struct BoostedTreeClassifier {
    trees: Vec<Tree>,
    base_margin: f32,
    num_features: usize,
}

impl BoostedTreeClassifier {
    pub fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::Model(format!("Failed to read model {}: {}", path.display(), e))
        })?;

        let classifier = Self::from_json_str(&json)?;

        tracing::info!(
            path = %path.display(),
            trees = classifier.trees.len(),
            num_features = classifier.num_features,
            "Loaded classifier"
        );

        Ok(classifier)
    }

    pub fn from_json_str(json: &str) -> AppResult<Self> {
        let file: ModelFile = serde_json::from_str(json)
            .map_err(|e| AppError::Model(format!("Invalid XGBoost model JSON: {}", e)))?;
        let learner = file.learner;

        if learner.objective.name != "binary:logistic" {
            return Err(AppError::Model(format!(
                "Unsupported objective {}",
                learner.objective.name
            )));
        }

        if learner.gradient_booster.name != "gbtree" {
            return Err(AppError::Model(format!(
                "Unsupported booster {}",
                learner.gradient_booster.name
            )));
        }

        let num_features: usize = learner
            .learner_model_param
            .num_feature
            .parse()
            .map_err(|_| AppError::Model("num_feature is not an integer".to_string()))?;

        let base_score = parse_base_score(&learner.learner_model_param.base_score)?;

        let raw_trees = learner
            .gradient_booster
            .model
            .map(|m| m.trees)
            .unwrap_or_default();

        let trees = raw_trees
            .into_iter()
            .enumerate()
            .map(|(i, raw)| Tree::from_raw(raw, num_features, i))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            trees,
            base_margin: (base_score / (1.0 - base_score)).ln(),
            num_features,
        })
    }

    fn predict_row(&self, row: &[f32]) -> f32 {
        let margin = self
            .trees
            .iter()
            .fold(self.base_margin, |acc, tree| acc + tree.leaf_value(row));
        sigmoid(margin)
    }
}

impl Classifier for BoostedTreeClassifier {
    fn num_features(&self) -> usize {
        self.num_features
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> AppResult<Vec<f32>> {
        if features.width() != self.num_features {
            return Err(AppError::DimensionMismatch {
                expected: self.num_features,
                actual: features.width(),
            });
        }

        Ok(features.iter_rows().map(|row| self.predict_row(row)).collect())
    }

    fn name(&self) -> &'static str {
        "xgboost"
    }
}

/// Parses `base_score`, written as `"5E-1"` or `"[5E-1]"` depending on version
fn parse_base_score(raw: &str) -> AppResult<f32> {
    let value: f32 = raw
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .map_err(|_| AppError::Model(format!("Invalid base_score {}", raw)))?;

    if !(value > 0.0 && value < 1.0) {
        return Err(AppError::Model(format!(
            "base_score {} is not a probability",
            raw
        )));
    }

    Ok(value)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

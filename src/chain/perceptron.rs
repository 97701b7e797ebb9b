use crate::batch::{Float, TransitionMatrix, UnaryPotentials};
use crate::chain::score::path_score;
use crate::error::{Error, Result};

/// How per-sequence hinge losses are combined over a batch. The reference
/// behavior is `Sum`; `Mean` is offered as an option and is a deliberate
/// deviation from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossReduction {
    Sum,
    Mean,
}

impl Default for LossReduction {
    fn default() -> Self {
        LossReduction::Sum
    }
}

/// Margin-based training objective for the chain tagger.
///
/// Per sequence, the loss is `max(0, score(predicted) - score(gold))`: it
/// penalizes only when the decoded path outscores the gold path. Both scores
/// come from the same path-scoring function the decoder is consistent with,
/// restricted to the sequence's mask-derived valid length. There is no
/// partition function anywhere; the tag choice itself is fixed input here,
/// only the scores of the two fixed paths carry gradient.
#[derive(Debug, Default)]
pub struct StructuredPerceptron {
    reduction: LossReduction,
}

impl StructuredPerceptron {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reduction(reduction: LossReduction) -> Self {
        Self { reduction }
    }

    /// Batch hinge loss. `gold` and `predicted` hold one row per sequence;
    /// rows may be padded past the valid length, the padding is never read.
    pub fn batch_loss(
        &self,
        potentials: &UnaryPotentials,
        trans: &TransitionMatrix,
        gold: &[Vec<usize>],
        predicted: &[Vec<usize>],
    ) -> Result<Float> {
        self.check_paths(potentials, trans, gold, "gold")?;
        self.check_paths(potentials, trans, predicted, "predicted")?;

        let mut loss = 0.0;
        for i in 0..potentials.batch_size() {
            let seq = potentials.seq(i);
            let margin = path_score(&seq, trans, &predicted[i])
                - path_score(&seq, trans, &gold[i]);
            if margin > 0.0 {
                loss += margin;
            }
        }
        Ok(self.reduce(loss, potentials.batch_size()))
    }

    /// Batch hinge loss plus its gradients with respect to the unary
    /// potentials and the transition matrix.
    ///
    /// `g_unary` has the batch's (batch x max_len x num_tags) shape and
    /// `g_trans` the (num_tags x num_tags) shape; both are overwritten. For
    /// every sequence with positive margin the predicted path contributes +1
    /// occupancy and the gold path -1, at its unary cells and its adjacent
    /// transition cells. Sequences already won by the gold path contribute
    /// nothing.
    pub fn loss_and_gradients(
        &self,
        potentials: &UnaryPotentials,
        trans: &TransitionMatrix,
        gold: &[Vec<usize>],
        predicted: &[Vec<usize>],
        g_unary: &mut [Float],
        g_trans: &mut [Float],
    ) -> Result<Float> {
        self.check_paths(potentials, trans, gold, "gold")?;
        self.check_paths(potentials, trans, predicted, "predicted")?;

        let k = potentials.num_tags();
        let max_len = potentials.max_len();
        if g_unary.len() != potentials.batch_size() * max_len * k {
            return Err(Error::Shape(format!(
                "unary gradient buffer has {} entries, expected {}",
                g_unary.len(),
                potentials.batch_size() * max_len * k
            )));
        }
        if g_trans.len() != k * k {
            return Err(Error::Shape(format!(
                "transition gradient buffer has {} entries, expected {}",
                g_trans.len(),
                k * k
            )));
        }
        for g in g_unary.iter_mut() {
            *g = 0.0;
        }
        for g in g_trans.iter_mut() {
            *g = 0.0;
        }

        let scale = match self.reduction {
            LossReduction::Sum => 1.0,
            LossReduction::Mean => 1.0 / potentials.batch_size().max(1) as Float,
        };

        let mut loss = 0.0;
        for i in 0..potentials.batch_size() {
            let seq = potentials.seq(i);
            let margin = path_score(&seq, trans, &predicted[i])
                - path_score(&seq, trans, &gold[i]);
            if margin <= 0.0 {
                continue;
            }
            loss += margin;

            /* Occupancy counts of the two fixed paths; the argmax choice
            itself carries no gradient. */
            for t in 0..seq.len() {
                g_unary[(i * max_len + t) * k + predicted[i][t]] += scale;
                g_unary[(i * max_len + t) * k + gold[i][t]] -= scale;
                if t > 0 {
                    g_trans[k * predicted[i][t - 1] + predicted[i][t]] += scale;
                    g_trans[k * gold[i][t - 1] + gold[i][t]] -= scale;
                }
            }
        }
        Ok(self.reduce(loss, potentials.batch_size()))
    }

    fn reduce(&self, loss: Float, batch: usize) -> Float {
        match self.reduction {
            LossReduction::Sum => loss,
            LossReduction::Mean => loss / batch.max(1) as Float,
        }
    }

    fn check_paths(
        &self,
        potentials: &UnaryPotentials,
        trans: &TransitionMatrix,
        paths: &[Vec<usize>],
        what: &str,
    ) -> Result<()> {
        if potentials.num_tags() != trans.num_tags() {
            return Err(Error::Config {
                what: "structured perceptron",
                expected: trans.num_tags(),
                actual: potentials.num_tags(),
            });
        }
        if paths.len() != potentials.batch_size() {
            return Err(Error::Shape(format!(
                "{} paths: {} rows for a batch of {}",
                what,
                paths.len(),
                potentials.batch_size()
            )));
        }
        for (i, path) in paths.iter().enumerate() {
            let len = potentials.seq_len(i);
            if path.len() < len {
                return Err(Error::Shape(format!(
                    "{} path {} has length {}, sequence is {} steps",
                    what,
                    i,
                    path.len(),
                    len
                )));
            }
            if let Some(&tag) = path[..len].iter().find(|&&t| t >= potentials.num_tags()) {
                return Err(Error::Shape(format!(
                    "{} path {} holds tag {} outside 0..{}",
                    what,
                    i,
                    tag,
                    potentials.num_tags()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::UnaryPotentials;

    fn two_tag_batch() -> (UnaryPotentials, TransitionMatrix) {
        let batch = UnaryPotentials::from_sequences(
            &[vec![vec![2.0, 1.0], vec![0.0, 3.0]]],
            2,
        )
        .unwrap();
        let trans = TransitionMatrix::from_weights(2, vec![0.0, 1.0, 0.5, 0.0]).unwrap();
        (batch, trans)
    }

    #[test]
    fn zero_loss_when_gold_wins() {
        let (batch, trans) = two_tag_batch();
        let sp = StructuredPerceptron::new();
        /* Gold [0,1] scores 6.0, no candidate beats it. */
        let loss = sp
            .batch_loss(&batch, &trans, &[vec![0, 1]], &[vec![1, 0]])
            .unwrap();
        assert_eq!(loss, 0.0);
    }

    #[test]
    fn margin_when_prediction_wins() {
        let (batch, trans) = two_tag_batch();
        let sp = StructuredPerceptron::new();
        /* Predicted [0,1] = 6.0 vs gold [0,0] = 2.0. */
        let loss = sp
            .batch_loss(&batch, &trans, &[vec![0, 0]], &[vec![0, 1]])
            .unwrap();
        assert_eq!(loss, 4.0);
    }

    #[test]
    fn gradients_are_occupancy_differences() {
        let (batch, trans) = two_tag_batch();
        let sp = StructuredPerceptron::new();
        let mut g_unary = vec![9.9; 4];
        let mut g_trans = vec![9.9; 4];
        let loss = sp
            .loss_and_gradients(
                &batch,
                &trans,
                &[vec![0, 0]],
                &[vec![0, 1]],
                &mut g_unary,
                &mut g_trans,
            )
            .unwrap();
        assert_eq!(loss, 4.0);
        /* Both paths start at tag 0; only the second step differs. */
        assert_eq!(g_unary, vec![0.0, 0.0, -1.0, 1.0]);
        assert_eq!(g_trans, vec![-1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn no_gradient_without_margin() {
        let (batch, trans) = two_tag_batch();
        let sp = StructuredPerceptron::new();
        let mut g_unary = vec![1.0; 4];
        let mut g_trans = vec![1.0; 4];
        let loss = sp
            .loss_and_gradients(
                &batch,
                &trans,
                &[vec![0, 1]],
                &[vec![0, 1]],
                &mut g_unary,
                &mut g_trans,
            )
            .unwrap();
        assert_eq!(loss, 0.0);
        assert!(g_unary.iter().all(|&g| g == 0.0));
        assert!(g_trans.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn mean_reduction_scales() {
        let seqs = vec![
            vec![vec![2.0, 1.0], vec![0.0, 3.0]],
            vec![vec![2.0, 1.0], vec![0.0, 3.0]],
        ];
        let batch = UnaryPotentials::from_sequences(&seqs, 2).unwrap();
        let trans = TransitionMatrix::from_weights(2, vec![0.0, 1.0, 0.5, 0.0]).unwrap();
        let sum = StructuredPerceptron::new()
            .batch_loss(&batch, &trans, &[vec![0, 0], vec![0, 0]], &[vec![0, 1], vec![0, 1]])
            .unwrap();
        let mean = StructuredPerceptron::with_reduction(LossReduction::Mean)
            .batch_loss(&batch, &trans, &[vec![0, 0], vec![0, 0]], &[vec![0, 1], vec![0, 1]])
            .unwrap();
        assert_eq!(sum, 8.0);
        assert_eq!(mean, 4.0);
    }

    #[test]
    fn short_path_is_rejected() {
        let (batch, trans) = two_tag_batch();
        let sp = StructuredPerceptron::new();
        let err = sp.batch_loss(&batch, &trans, &[vec![0]], &[vec![0, 1]]);
        assert!(err.is_err());
    }
}

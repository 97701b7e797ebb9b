use crate::batch::{AugmentedTransitions, Float, SeqPotentials, FORBIDDEN};

/// Exact MAP decoder for one linear chain.
///
/// Works over an extended lattice of `L + 2` timesteps: position 0 is forced
/// to the START sentinel, position `L + 1` to END, and positions in between
/// carry the real unary potentials. All tables are flat (timestep x tag)
/// buffers reused across sequences; capacity only grows.
#[derive(Debug, Default)]
pub struct ViterbiDecoder {
    /// Running-best scores, `(L+2) x (K+2)`.
    lattice: Vec<Float>,
    /// Extended unary potentials, same shape as `lattice`.
    extended: Vec<Float>,
    /// Backward links: element `(i, j)` is the source tag that yields the
    /// maximum score arriving at `(i, j)`.
    backward_edge: Vec<u32>,
    /// Scratch for the traced path, sentinels included.
    path: Vec<usize>,
}

impl ViterbiDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn reserve(&mut self, cells: usize) {
        if self.lattice.len() < cells {
            self.lattice.resize(cells, 0.0);
            self.extended.resize(cells, 0.0);
            self.backward_edge.resize(cells, 0);
        }
    }

    /// Finds the tag path of length `seq.len()` maximizing the path score.
    ///
    /// The returned path never contains the START/END sentinels, and the
    /// returned score equals rescoring the path with `path_score` (the forced
    /// boundary terms contribute zero). A zero-length sequence decodes to an
    /// empty path with score 0.
    pub fn decode(
        &mut self,
        seq: &SeqPotentials<'_>,
        aug: &AugmentedTransitions,
    ) -> (Vec<usize>, Float) {
        let l = seq.len();
        if l == 0 {
            return (Vec::new(), 0.0);
        }
        let w = aug.width();
        let steps = l + 2;
        self.reserve(steps * w);

        /* Start with everything totally unlikely, then force START at
        timestep 0 and END at timestep L+1; the real unary potentials fill
        the rows in between. */
        for cell in self.extended[..steps * w].iter_mut() {
            *cell = FORBIDDEN;
        }
        self.extended[aug.start_tag()] = 0.0;
        for t in 0..l {
            for j in 0..aug.num_tags() {
                self.extended[w * (t + 1) + j] = seq.unary(t, j);
            }
        }
        self.extended[w * (steps - 1) + aug.end_tag()] = 0.0;

        /* Compute the scores at (0, *). */
        self.lattice[..w].copy_from_slice(&self.extended[..w]);

        /* Compute the scores at (i, *). */
        for i in 1..steps {
            for j in 0..w {
                let mut max_score = Float::MIN;
                let mut argmax_score = 0;
                for p in 0..w {
                    /* Transit from (i-1, p) to (i, j). Ties keep the lowest
                    source tag. */
                    let score = self.lattice[w * (i - 1) + p] + aug.get(p, j);
                    if max_score < score {
                        max_score = score;
                        argmax_score = p;
                    }
                }
                /* Backward link (#i, #j) -> (#i-1, #p). */
                self.backward_edge[w * i + j] = argmax_score as u32;
                self.lattice[w * i + j] = max_score + self.extended[w * i + j];
            }
        }

        /* Find the final node with the maximum score; the sentinel
        construction forces it to be END. */
        let mut best_score = Float::MIN;
        let mut best_tag = 0;
        for j in 0..w {
            let s = self.lattice[w * (steps - 1) + j];
            if best_score < s {
                best_score = s;
                best_tag = j;
            }
        }
        debug_assert_eq!(best_tag, aug.end_tag());

        /* Tag the items by tracing the backward links, then strip the
        leading START and trailing END. */
        self.path.clear();
        self.path.resize(steps, 0);
        self.path[steps - 1] = best_tag;
        for i in (0..steps - 1).rev() {
            self.path[i] = self.backward_edge[w * (i + 1) + self.path[i + 1]] as usize;
        }
        (self.path[1..steps - 1].to_vec(), best_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{TransitionMatrix, UnaryPotentials};
    use crate::chain::score::path_score;

    #[test]
    fn empty_sequence() {
        let batch = UnaryPotentials::from_sequences(&[vec![]], 2).unwrap();
        let trans = TransitionMatrix::ones(2);
        let aug = AugmentedTransitions::new(&trans);
        let mut decoder = ViterbiDecoder::new();
        let (path, score) = decoder.decode(&batch.seq(0), &aug);
        assert!(path.is_empty());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn two_step_chain() {
        let batch = UnaryPotentials::from_sequences(
            &[vec![vec![2.0, 1.0], vec![0.0, 3.0]]],
            2,
        )
        .unwrap();
        let trans = TransitionMatrix::from_weights(2, vec![0.0, 1.0, 0.5, 0.0]).unwrap();
        let aug = AugmentedTransitions::new(&trans);
        let mut decoder = ViterbiDecoder::new();
        let (path, score) = decoder.decode(&batch.seq(0), &aug);
        assert_eq!(path, vec![0, 1]);
        assert_eq!(score, 6.0);
        assert_eq!(path_score(&batch.seq(0), &trans, &path), score);
    }

    #[test]
    fn ties_break_toward_lowest_tag() {
        let batch = UnaryPotentials::from_sequences(&[vec![vec![0.0, 0.0]]], 2).unwrap();
        let trans = TransitionMatrix::from_weights(2, vec![7.0, -3.0, 2.0, 9.0]).unwrap();
        let aug = AugmentedTransitions::new(&trans);
        let mut decoder = ViterbiDecoder::new();
        let (path, score) = decoder.decode(&batch.seq(0), &aug);
        assert_eq!(path, vec![0]);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn buffers_survive_reuse() {
        let trans = TransitionMatrix::zeros(3);
        let aug = AugmentedTransitions::new(&trans);
        let mut decoder = ViterbiDecoder::new();
        let long = UnaryPotentials::from_sequences(
            &[vec![vec![0.0, 1.0, 0.0]; 6]],
            3,
        )
        .unwrap();
        let (path, _) = decoder.decode(&long.seq(0), &aug);
        assert_eq!(path, vec![1; 6]);
        let short = UnaryPotentials::from_sequences(
            &[vec![vec![5.0, 0.0, 0.0], vec![0.0, 0.0, 4.0]]],
            3,
        )
        .unwrap();
        let (path, score) = decoder.decode(&short.seq(0), &aug);
        assert_eq!(path, vec![0, 2]);
        assert_eq!(score, 9.0);
    }
}

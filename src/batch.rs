use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type Float = f64;

/// Score assigned to transitions the decoder must never take. Stands in for
/// negative infinity; its magnitude has to dominate the dynamic range of the
/// real potentials.
pub const FORBIDDEN: Float = -10000.0;

/// Padded batch of unary potentials with its validity mask.
///
/// `values` is a flat row-major (batch, max_len, num_tags) buffer, `mask` a
/// flat 0/1 (batch, max_len) buffer. Padding is a suffix: the valid length of
/// sequence `i` is the number of set mask entries in its row. Padded cells may
/// hold any value; nothing in the core ever reads them.
#[derive(Debug)]
pub struct UnaryPotentials {
    values: Vec<Float>,
    lens: Vec<usize>,
    max_len: usize,
    num_tags: usize,
}

impl UnaryPotentials {
    pub fn new(
        values: Vec<Float>,
        mask: &[u8],
        batch: usize,
        max_len: usize,
        num_tags: usize,
    ) -> Result<Self> {
        if values.len() != batch * max_len * num_tags {
            return Err(Error::Shape(format!(
                "unary buffer has {} entries, expected {} ({} x {} x {})",
                values.len(),
                batch * max_len * num_tags,
                batch,
                max_len,
                num_tags
            )));
        }
        if mask.len() != batch * max_len {
            return Err(Error::Shape(format!(
                "mask has {} entries, expected {} ({} x {})",
                mask.len(),
                batch * max_len,
                batch,
                max_len
            )));
        }
        let lens = (0..batch)
            .map(|i| {
                mask[i * max_len..(i + 1) * max_len]
                    .iter()
                    .filter(|&&m| m != 0)
                    .count()
            })
            .collect();
        Ok(Self {
            values,
            lens,
            max_len,
            num_tags,
        })
    }

    /// Builds a padded batch from per-sequence (len x num_tags) rows.
    pub fn from_sequences(seqs: &[Vec<Vec<Float>>], num_tags: usize) -> Result<Self> {
        let max_len = seqs.iter().map(|s| s.len()).max().unwrap_or_default();
        let mut values = vec![0.0; seqs.len() * max_len * num_tags];
        let mut lens = Vec::with_capacity(seqs.len());
        for (i, seq) in seqs.iter().enumerate() {
            for (t, row) in seq.iter().enumerate() {
                if row.len() != num_tags {
                    return Err(Error::Shape(format!(
                        "sequence {} step {} has {} potentials, expected {}",
                        i,
                        t,
                        row.len(),
                        num_tags
                    )));
                }
                let offset = (i * max_len + t) * num_tags;
                values[offset..offset + num_tags].copy_from_slice(row);
            }
            lens.push(seq.len());
        }
        Ok(Self {
            values,
            lens,
            max_len,
            num_tags,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.lens.len()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn num_tags(&self) -> usize {
        self.num_tags
    }

    /// Mask-derived valid length of sequence `i`.
    pub fn seq_len(&self, i: usize) -> usize {
        self.lens[i]
    }

    /// View over the valid prefix of sequence `i`.
    pub fn seq(&self, i: usize) -> SeqPotentials<'_> {
        let offset = i * self.max_len * self.num_tags;
        SeqPotentials {
            values: &self.values[offset..offset + self.max_len * self.num_tags],
            len: self.lens[i],
            num_tags: self.num_tags,
        }
    }
}

/// One sequence's unary potentials, restricted to its valid length.
#[derive(Debug, Clone, Copy)]
pub struct SeqPotentials<'a> {
    values: &'a [Float],
    len: usize,
    num_tags: usize,
}

impl<'a> SeqPotentials<'a> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_tags(&self) -> usize {
        self.num_tags
    }

    /// Unary potential of tag `k` at timestep `t`. Panics beyond the valid
    /// length; callers iterate to `len()` only.
    pub fn unary(&self, t: usize, k: usize) -> Float {
        debug_assert!(t < self.len);
        self.values[self.num_tags * t + k]
    }
}

/// The learned binary (transition) potential matrix, `K x K`.
///
/// This is the only persistent structural parameter. It is owned by the
/// caller, read-only during a forward pass, and mutated by the external
/// optimizer between passes; every mutable access bumps the version counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionMatrix {
    num_tags: usize,
    weights: Vec<Float>,
    #[serde(default)]
    version: u64,
}

impl TransitionMatrix {
    /// All-ones initialization, as the reference model starts out.
    pub fn ones(num_tags: usize) -> Self {
        Self {
            num_tags,
            weights: vec![1.0; num_tags * num_tags],
            version: 0,
        }
    }

    pub fn zeros(num_tags: usize) -> Self {
        Self {
            num_tags,
            weights: vec![0.0; num_tags * num_tags],
            version: 0,
        }
    }

    pub fn from_weights(num_tags: usize, weights: Vec<Float>) -> Result<Self> {
        if weights.len() != num_tags * num_tags {
            return Err(Error::Shape(format!(
                "transition matrix has {} weights, expected {} ({2} x {2})",
                weights.len(),
                num_tags * num_tags,
                num_tags
            )));
        }
        Ok(Self {
            num_tags,
            weights,
            version: 0,
        })
    }

    pub fn num_tags(&self) -> usize {
        self.num_tags
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Score of transitioning from tag `i` at `t-1` to tag `j` at `t`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Float {
        self.weights[self.num_tags * i + j]
    }

    pub fn weights(&self) -> &[Float] {
        &self.weights
    }

    /// Mutable weight access for the external optimizer. Never call this
    /// while a forward pass borrows the matrix.
    pub fn weights_mut(&mut self) -> &mut [Float] {
        self.version += 1;
        &mut self.weights
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let f = File::create(path)?;
        serde_json::to_writer(BufWriter::new(f), self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let f = File::open(path)?;
        let this: Self = serde_json::from_reader(BufReader::new(f))?;
        if this.weights.len() != this.num_tags * this.num_tags {
            return Err(Error::Shape(format!(
                "loaded transition matrix has {} weights for {} tags",
                this.weights.len(),
                this.num_tags
            )));
        }
        Ok(this)
    }
}

/// The `(K+2) x (K+2)` transition table the decoder walks: the learned matrix
/// embedded in the top-left `K x K` block, START (`K`) and END (`K+1`) rows
/// and columns forced so that every path must begin at START and finish at
/// END without picking up a boundary score.
#[derive(Debug)]
pub struct AugmentedTransitions {
    num_tags: usize,
    table: Vec<Float>,
}

impl AugmentedTransitions {
    pub fn new(trans: &TransitionMatrix) -> Self {
        let k = trans.num_tags();
        let width = k + 2;
        let mut table = vec![FORBIDDEN; width * width];
        for i in 0..k {
            for j in 0..k {
                table[width * i + j] = trans.get(i, j);
            }
        }
        /* START may enter any real tag, any real tag may exit to END; both
        legs contribute zero so decoded scores match plain path rescoring. */
        for j in 0..k {
            table[width * k + j] = 0.0;
            table[width * j + (k + 1)] = 0.0;
        }
        Self { num_tags: k, table }
    }

    pub fn num_tags(&self) -> usize {
        self.num_tags
    }

    /// Table width, `K + 2`.
    pub fn width(&self) -> usize {
        self.num_tags + 2
    }

    pub fn start_tag(&self) -> usize {
        self.num_tags
    }

    pub fn end_tag(&self) -> usize {
        self.num_tags + 1
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Float {
        self.table[(self.num_tags + 2) * i + j]
    }
}

use crate::batch::{AugmentedTransitions, Float, TransitionMatrix, UnaryPotentials};
use crate::chain::perceptron::StructuredPerceptron;
use crate::chain::viterbi::ViterbiDecoder;
use crate::error::{Error, Result};
use crate::evaluation::Accuracy;
use crate::vocab::TagVocab;

/// One forward pass over a batch.
#[derive(Debug)]
pub struct TaggerOutput {
    /// Decoded tag path per sequence, each of its mask-derived length.
    pub paths: Vec<Vec<usize>>,
    /// Decoder score per sequence.
    pub scores: Vec<Float>,
    /// Hard one-hot (batch x max_len x num_tags) array marking the predicted
    /// tag at every valid position. Metric fodder, not a calibrated
    /// probability.
    pub class_probabilities: Vec<Float>,
    /// Batch hinge loss, present when gold tags were supplied.
    pub loss: Option<Float>,
}

/// Thin orchestration over decoder, scorer and trainer for padded batches.
///
/// Owns the tag vocabulary and a reusable decode context; the transition
/// matrix stays with the caller and is only borrowed per pass.
#[derive(Debug)]
pub struct ChainTagger {
    vocab: TagVocab,
    num_tags: usize,
    perceptron: StructuredPerceptron,
    decoder: ViterbiDecoder,
    accuracy: Accuracy,
}

impl ChainTagger {
    /// Fails when the vocabulary and the transition matrix disagree on the
    /// tag count; every later pass is checked against that count too.
    pub fn new(vocab: TagVocab, trans: &TransitionMatrix) -> Result<Self> {
        if vocab.len() != trans.num_tags() {
            return Err(Error::Config {
                what: "chain tagger vocabulary",
                expected: trans.num_tags(),
                actual: vocab.len(),
            });
        }
        Ok(Self {
            num_tags: vocab.len(),
            vocab,
            perceptron: StructuredPerceptron::new(),
            decoder: ViterbiDecoder::new(),
            accuracy: Accuracy::default(),
        })
    }

    pub fn num_tags(&self) -> usize {
        self.num_tags
    }

    pub fn vocab(&self) -> &TagVocab {
        &self.vocab
    }

    fn check_batch(
        &self,
        potentials: &UnaryPotentials,
        trans: &TransitionMatrix,
    ) -> Result<()> {
        if potentials.num_tags() != self.num_tags {
            return Err(Error::Config {
                what: "unary potentials",
                expected: self.num_tags,
                actual: potentials.num_tags(),
            });
        }
        if trans.num_tags() != self.num_tags {
            return Err(Error::Config {
                what: "transition matrix",
                expected: self.num_tags,
                actual: trans.num_tags(),
            });
        }
        Ok(())
    }

    /// Viterbi-decodes every sequence in the batch. Returns one
    /// (path, score) pair per sequence; path length equals the sequence's
    /// valid length.
    pub fn infer(
        &mut self,
        potentials: &UnaryPotentials,
        trans: &TransitionMatrix,
    ) -> Result<Vec<(Vec<usize>, Float)>> {
        self.check_batch(potentials, trans)?;
        let aug = AugmentedTransitions::new(trans);
        let mut best_paths = Vec::with_capacity(potentials.batch_size());
        for i in 0..potentials.batch_size() {
            best_paths.push(self.decoder.decode(&potentials.seq(i), &aug));
        }
        log::debug!(
            "decoded {} sequences with transition matrix v{}",
            best_paths.len(),
            trans.version()
        );
        Ok(best_paths)
    }

    /// Full forward pass: decode, build the one-hot class-probability array,
    /// and when gold tags are given compute the hinge loss and update the
    /// accuracy accumulator. Gold rows may be padded; only the valid prefix
    /// of each is read.
    pub fn forward(
        &mut self,
        potentials: &UnaryPotentials,
        trans: &TransitionMatrix,
        gold: Option<&[Vec<usize>]>,
    ) -> Result<TaggerOutput> {
        let decoded = self.infer(potentials, trans)?;
        let (paths, scores): (Vec<_>, Vec<_>) = decoded.into_iter().unzip();

        let max_len = potentials.max_len();
        let mut class_probabilities =
            vec![0.0; potentials.batch_size() * max_len * self.num_tags];
        for (i, path) in paths.iter().enumerate() {
            for (t, &tag) in path.iter().enumerate() {
                class_probabilities[(i * max_len + t) * self.num_tags + tag] = 1.0;
            }
        }

        let loss = match gold {
            Some(gold) => {
                let loss = self
                    .perceptron
                    .batch_loss(potentials, trans, gold, &paths)?;
                for (i, path) in paths.iter().enumerate() {
                    self.accuracy
                        .accumulate(&gold[i][..potentials.seq_len(i)], path);
                }
                Some(loss)
            }
            None => None,
        };

        Ok(TaggerOutput {
            paths,
            scores,
            class_probabilities,
            loss,
        })
    }

    /// Converts tag index paths to label strings. Pure lookup; an index
    /// outside the vocabulary is an error.
    pub fn decode_to_labels(&self, paths: &[Vec<usize>]) -> Result<Vec<Vec<String>>> {
        paths
            .iter()
            .map(|path| {
                path.iter()
                    .map(|&tag| self.vocab.label(tag).map(str::to_string))
                    .collect()
            })
            .collect()
    }

    pub fn metrics(&self) -> &Accuracy {
        &self.accuracy
    }

    pub fn reset_metrics(&mut self) {
        self.accuracy.reset();
    }
}

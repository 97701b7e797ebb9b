use std::fmt::Display;
use std::iter::zip;

/// Masked tag-level and sequence-level accuracy over decoded batches.
///
/// Fed one (gold, predicted) pair per sequence, both already cut to the
/// sequence's valid length; padding never reaches this accumulator.
#[derive(Debug, Default)]
pub struct Accuracy {
    /** Number of correctly predicted items. */
    item_total_correct: usize,
    /** Total number of items. */
    item_total_num: usize,
    /** Number of sequences predicted entirely correctly. */
    inst_total_correct: usize,
    /** Total number of sequences. */
    inst_total_num: usize,
}

impl Accuracy {
    pub fn accumulate(&mut self, reference: &[usize], prediction: &[usize]) {
        let mut matched = 0;
        for (r, p) in zip(reference, prediction) {
            if *r == *p {
                matched += 1;
                self.item_total_correct += 1;
            }
            self.item_total_num += 1;
        }
        if matched == prediction.len() {
            self.inst_total_correct += 1;
        }
        self.inst_total_num += 1;
    }

    /// Fraction of items tagged correctly; 0 before any accumulation.
    pub fn item_accuracy(&self) -> f64 {
        if self.item_total_num == 0 {
            return 0.0;
        }
        self.item_total_correct as f64 / self.item_total_num as f64
    }

    pub fn sequence_accuracy(&self) -> f64 {
        if self.inst_total_num == 0 {
            return 0.0;
        }
        self.inst_total_correct as f64 / self.inst_total_num as f64
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Display for Accuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Item accuracy: {}/{} => {}",
            self.item_total_correct,
            self.item_total_num,
            self.item_accuracy()
        )?;
        write!(
            f,
            "Sequence accuracy: {}/{} => {}",
            self.inst_total_correct,
            self.inst_total_num,
            self.sequence_accuracy()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_items_and_sequences() {
        let mut acc = Accuracy::default();
        acc.accumulate(&[0, 1, 2], &[0, 1, 1]);
        acc.accumulate(&[1], &[1]);
        assert_eq!(acc.item_accuracy(), 3.0 / 4.0);
        assert_eq!(acc.sequence_accuracy(), 0.5);
        acc.reset();
        assert_eq!(acc.item_accuracy(), 0.0);
    }

    #[test]
    fn empty_sequence_counts_as_correct() {
        let mut acc = Accuracy::default();
        acc.accumulate(&[], &[]);
        assert_eq!(acc.sequence_accuracy(), 1.0);
    }
}

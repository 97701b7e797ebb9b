use crate::batch::{Float, SeqPotentials, TransitionMatrix};

/// Score of a tag path over one sequence's valid prefix:
/// sum of unary potentials along the path plus the transition potential for
/// every adjacent pair. No transition term at `t = 0`. Pure and exact; the
/// decoder's returned score and the trainer's rescoring both reduce to this.
///
/// `path` may be longer than the sequence (padded batch storage); only the
/// first `seq.len()` entries are read. An empty sequence scores 0.
pub fn path_score(seq: &SeqPotentials<'_>, trans: &TransitionMatrix, path: &[usize]) -> Float {
    if seq.is_empty() {
        return 0.0;
    }

    /* Stay at (0, path[0]). */
    let mut i = path[0];
    let mut r = seq.unary(0, i);

    /* Transit from (t-1, i) to (t, j). */
    for t in 1..seq.len() {
        let j = path[t];
        r += trans.get(i, j);
        r += seq.unary(t, j);
        i = j;
    }
    r
}

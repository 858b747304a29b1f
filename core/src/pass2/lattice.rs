//! Word lattice and confusion-network construction from pass 2's n-best
//! list (spec §4.5/§4.6 result formats).

use crate::lm::ngram::WordId;
use crate::pass2::stack::Hypothesis;
use ordered_float::OrderedFloat;

#[derive(Debug, Clone)]
pub struct LatticeArc {
    pub word_id: WordId,
    pub entry_idx: usize,
    pub start_frame: usize,
    pub end_frame: usize,
    pub score: f32,
}

/// A word lattice assembled directly from the hypotheses pass 2 confirmed
/// reach the end of the utterance, rather than the full (possibly huge)
/// back-trellis graph: every arc here is known to lie on at least one
/// complete, LM-rescored path.
#[derive(Debug, Clone, Default)]
pub struct Lattice {
    pub arcs: Vec<LatticeArc>,
}

impl Lattice {
    pub fn from_hypotheses(hypotheses: &[Hypothesis]) -> Self {
        let mut arcs = Vec::new();
        for hypo in hypotheses {
            let mut start = 0usize;
            for (word_id, entry_idx) in hypo.word_ids.iter().zip(hypo.entries.iter()) {
                arcs.push(LatticeArc {
                    word_id: *word_id,
                    entry_idx: *entry_idx,
                    start_frame: start,
                    end_frame: hypo.end_frame,
                    score: hypo.score,
                });
                start = hypo.end_frame;
            }
        }
        Self { arcs }
    }
}

#[derive(Debug, Clone)]
pub struct ConfusionBin {
    pub candidates: Vec<(WordId, f32)>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfusionNetwork {
    pub bins: Vec<ConfusionBin>,
}

impl ConfusionNetwork {
    /// Builds a confusion network by aligning every hypothesis's word
    /// sequence against the 1-best via edit distance (a pivot alignment, the
    /// standard simplification when building CNs from an n-best list rather
    /// than a full lattice), accumulating softmax-normalized posterior mass
    /// per aligned slot.
    pub fn from_nbest(hypotheses: &[Hypothesis]) -> Self {
        let Some(pivot) = hypotheses.first() else {
            return Self::default();
        };
        let weights = softmax(hypotheses.iter().map(|h| h.score).collect());

        let mut bins: Vec<ConfusionBin> = pivot
            .word_ids
            .iter()
            .map(|&w| ConfusionBin {
                candidates: vec![(w, 0.0)],
            })
            .collect();

        for (hypo, weight) in hypotheses.iter().zip(weights.iter()) {
            let alignment = align(&pivot.word_ids, &hypo.word_ids);
            for (pivot_pos, word) in alignment {
                let Some(pos) = pivot_pos else { continue };
                let Some(word) = word else { continue };
                let bin = &mut bins[pos];
                match bin.candidates.iter_mut().find(|(w, _)| *w == word) {
                    Some((_, mass)) => *mass += weight,
                    None => bin.candidates.push((word, *weight)),
                }
            }
        }

        for bin in &mut bins {
            bin.candidates
                .sort_unstable_by_key(|(_, mass)| std::cmp::Reverse(OrderedFloat(*mass)));
        }
        Self { bins }
    }
}

fn softmax(scores: Vec<f32>) -> Vec<f32> {
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    if sum <= 0.0 {
        return vec![0.0; scores.len()];
    }
    exp.into_iter().map(|e| e / sum).collect()
}

/// Needleman-Wunsch alignment of `other` against `pivot`, returning one
/// entry per aligned column: `(pivot_index, other_word)`, with `None` on
/// either side marking a gap.
fn align(pivot: &[WordId], other: &[WordId]) -> Vec<(Option<usize>, Option<WordId>)> {
    let n = pivot.len();
    let m = other.len();
    let mut dp = vec![vec![0i32; m + 1]; n + 1];
    for i in 0..=n {
        dp[i][0] = i as i32;
    }
    for j in 0..=m {
        dp[0][j] = j as i32;
    }
    for i in 1..=n {
        for j in 1..=m {
            let cost = if pivot[i - 1] == other[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j - 1] + cost)
                .min(dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1);
        }
    }

    let mut path = Vec::new();
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && dp[i][j] == dp[i - 1][j - 1] + if pivot[i - 1] == other[j - 1] { 0 } else { 1 } {
            path.push((Some(i - 1), Some(other[j - 1])));
            i -= 1;
            j -= 1;
        } else if i > 0 && dp[i][j] == dp[i - 1][j] + 1 {
            path.push((Some(i - 1), None));
            i -= 1;
        } else {
            path.push((None, Some(other[j - 1])));
            j -= 1;
        }
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sequences_align_one_to_one() {
        let alignment = align(&[1, 2, 3], &[1, 2, 3]);
        assert_eq!(
            alignment,
            vec![(Some(0), Some(1)), (Some(1), Some(2)), (Some(2), Some(3))]
        );
    }

    #[test]
    fn confusion_network_accumulates_pivot_mass() {
        let hypotheses = vec![
            Hypothesis {
                word_ids: vec![1, 2],
                entries: vec![0, 1],
                end_frame: 5,
                score: -1.0,
                dfa_state: None,
            },
            Hypothesis {
                word_ids: vec![1, 3],
                entries: vec![0, 2],
                end_frame: 5,
                score: -4.0,
                dfa_state: None,
            },
        ];
        let cn = ConfusionNetwork::from_nbest(&hypotheses);
        assert_eq!(cn.bins.len(), 2);
        assert!(cn.bins[1].candidates.iter().any(|(w, _)| *w == 2));
        assert!(cn.bins[1].candidates.iter().any(|(w, _)| *w == 3));
    }
}

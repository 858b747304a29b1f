//! Minimum Bayes Risk rescoring over an n-best list (spec §4.5, grounded
//! on `original_source/libjulius/src/mbr.c`).
//!
//! Rather than reporting the MAP (highest-score) hypothesis, MBR picks the
//! hypothesis with the lowest expected word error against the posterior
//! distribution the rest of the n-best list implies — often more robust
//! when the score distribution is flat.

use crate::lm::ngram::WordId;
use crate::pass2::stack::Hypothesis;

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    if sum <= 0.0 {
        return vec![0.0; scores.len()];
    }
    exp.into_iter().map(|e| e / sum).collect()
}

fn edit_distance(a: &[WordId], b: &[WordId]) -> usize {
    let (n, m) = (a.len(), b.len());
    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    for i in 0..=n {
        dp[i][0] = i;
    }
    for j in 0..=m {
        dp[0][j] = j;
    }
    for i in 1..=n {
        for j in 1..=m {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j - 1] + cost).min(dp[i - 1][j] + 1).min(dp[i][j - 1] + 1);
        }
    }
    dp[n][m]
}

/// Re-ranks `hypotheses` by expected word error under each candidate's
/// posterior weight, returning the MBR-optimal hypothesis's index into the
/// input slice. Returns `None` for an empty list.
pub fn select_mbr(hypotheses: &[Hypothesis]) -> Option<usize> {
    if hypotheses.is_empty() {
        return None;
    }
    if hypotheses.len() == 1 {
        return Some(0);
    }
    let scores: Vec<f32> = hypotheses.iter().map(|h| h.score).collect();
    let posterior = softmax(&scores);

    let mut best_idx = 0;
    let mut best_risk = f32::INFINITY;
    for (i, candidate) in hypotheses.iter().enumerate() {
        let risk: f32 = hypotheses
            .iter()
            .zip(posterior.iter())
            .map(|(other, &p)| p * edit_distance(&candidate.word_ids, &other.word_ids) as f32)
            .sum();
        if risk < best_risk {
            best_risk = risk;
            best_idx = i;
        }
    }
    Some(best_idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hypo(word_ids: Vec<WordId>, score: f32) -> Hypothesis {
        let entries = (0..word_ids.len()).collect();
        Hypothesis {
            word_ids,
            entries,
            end_frame: 10,
            score,
            dfa_state: None,
        }
    }

    #[test]
    fn picks_hypothesis_closest_to_the_pack() {
        let hypotheses = vec![
            hypo(vec![1, 2, 3], -10.0),
            hypo(vec![1, 2, 4], -10.1),
            hypo(vec![1, 2, 5], -10.2),
            hypo(vec![9, 9, 9], -9.9),
        ];
        let idx = select_mbr(&hypotheses).unwrap();
        assert_ne!(idx, 3, "outlier with the best raw score should lose to the consensus");
    }

    #[test]
    fn single_hypothesis_is_trivially_selected() {
        let hypotheses = vec![hypo(vec![1], -1.0)];
        assert_eq!(select_mbr(&hypotheses), Some(0));
    }
}

//! Vote statistics computed at reveal time.
//!
//! A [`VoteResult`] is derived, never stored on the session: every reveal
//! recomputes it from the participants' cast votes.

use serde::{Deserialize, Serialize};

use super::value_object::{ParticipantId, PokerValue, Timestamp};

/// One entry of the vote distribution: how often a card was cast and its
/// share of all cast votes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDistribution {
    pub value: PokerValue,
    pub count: usize,
    pub percentage: f64,
}

/// Result of one voting round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResult {
    /// Story that was estimated
    pub story: String,
    /// Description of the story
    pub story_description: Option<String>,
    /// All cast votes in participant order
    pub votes: Vec<(ParticipantId, PokerValue)>,
    /// Per-value counts and percentages, in first-seen order
    pub distribution: Vec<VoteDistribution>,
    /// Average of numeric votes only
    pub average: Option<f64>,
    /// Median of numeric votes only
    pub median: Option<f64>,
    /// Most frequent value; ties resolve to the first value that reached
    /// the running maximum during a single scan
    pub mode: Option<PokerValue>,
    /// All voters cast the identical value and there were at least two
    pub has_consensus: bool,
    pub timestamp: Timestamp,
}

impl VoteResult {
    /// Compute the statistics for one round.
    ///
    /// # Arguments
    ///
    /// * `story` - Title of the current story
    /// * `story_description` - Optional description of the current story
    /// * `votes` - Cast votes in participant order (observers and
    ///   non-voters already excluded)
    /// * `timestamp` - Reveal time
    pub fn calculate(
        story: String,
        story_description: Option<String>,
        votes: Vec<(ParticipantId, PokerValue)>,
        timestamp: Timestamp,
    ) -> Self {
        let numeric: Vec<f64> = votes.iter().filter_map(|(_, v)| v.numeric()).collect();

        let average = if numeric.is_empty() {
            None
        } else {
            Some(numeric.iter().sum::<f64>() / numeric.len() as f64)
        };

        let median = median(&numeric);
        let cast: Vec<PokerValue> = votes.iter().map(|(_, v)| *v).collect();
        let (distribution, mode) = distribution_and_mode(&cast);

        let has_consensus =
            cast.len() >= 2 && cast.windows(2).all(|pair| pair[0] == pair[1]);

        Self {
            story,
            story_description,
            votes,
            distribution,
            average,
            median,
            mode,
            has_consensus,
            timestamp,
        }
    }
}

/// Median with the average-of-two-middles rule for even counts.
fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("card values are never NaN"));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 != 0 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Single linear scan over the cast votes.
///
/// The distribution keeps first-seen order; the mode is the first value to
/// reach the running maximum frequency (not lexical order).
fn distribution_and_mode(cast: &[PokerValue]) -> (Vec<VoteDistribution>, Option<PokerValue>) {
    let mut counts: Vec<(PokerValue, usize)> = Vec::new();
    let mut max_freq = 0;
    let mut mode = None;

    for value in cast {
        let freq = match counts.iter_mut().find(|(v, _)| v == value) {
            Some((_, count)) => {
                *count += 1;
                *count
            }
            None => {
                counts.push((*value, 1));
                1
            }
        };
        if freq > max_freq {
            max_freq = freq;
            mode = Some(*value);
        }
    }

    let total = cast.len();
    let distribution = counts
        .into_iter()
        .map(|(value, count)| VoteDistribution {
            value,
            count,
            percentage: count as f64 * 100.0 / total as f64,
        })
        .collect();

    (distribution, mode)
}

/// Compute the mode of already-cast votes, outside a full result.
///
/// Used when a story is finalized on advance: its estimate is the mode of
/// the revealed votes.
pub fn vote_mode(cast: &[PokerValue]) -> Option<PokerValue> {
    distribution_and_mode(cast).1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::factory::IdFactory;

    fn votes_of(values: &[PokerValue]) -> Vec<(ParticipantId, PokerValue)> {
        values
            .iter()
            .map(|v| (IdFactory::participant_id(), *v))
            .collect()
    }

    fn result_of(values: &[PokerValue]) -> VoteResult {
        VoteResult::calculate(
            "Story A".to_string(),
            None,
            votes_of(values),
            Timestamp::new(0),
        )
    }

    #[test]
    fn test_votes_three_five_five() {
        // テスト項目: 票 [3, 5, 5] の統計値
        // when (操作):
        let result = result_of(&[PokerValue::Three, PokerValue::Five, PokerValue::Five]);

        // then (期待する結果):
        assert_eq!(result.average, Some(13.0 / 3.0));
        assert_eq!(result.median, Some(5.0));
        assert_eq!(result.mode, Some(PokerValue::Five));
        assert!(!result.has_consensus);
    }

    #[test]
    fn test_votes_eight_eight_consensus() {
        // テスト項目: 票 [8, 8] はコンセンサス成立
        // when (操作):
        let result = result_of(&[PokerValue::Eight, PokerValue::Eight]);

        // then (期待する結果):
        assert_eq!(result.average, Some(8.0));
        assert_eq!(result.median, Some(8.0));
        assert_eq!(result.mode, Some(PokerValue::Eight));
        assert!(result.has_consensus);
    }

    #[test]
    fn test_single_vote_never_consensus() {
        // テスト項目: 投票者が 1 人以下ならコンセンサス不成立
        // when (操作):
        let one = result_of(&[PokerValue::Five]);
        let zero = result_of(&[]);

        // then (期待する結果):
        assert!(!one.has_consensus);
        assert!(!zero.has_consensus);
        assert_eq!(zero.average, None);
        assert_eq!(zero.median, None);
        assert_eq!(zero.mode, None);
    }

    #[test]
    fn test_mode_ties_resolve_to_first_seen_max() {
        // テスト項目: 同数の場合、先に最大頻度へ到達した値がモードになる
        // given (前提条件): 挿入順 3, 5（どちらも 1 票）
        // when (操作):
        let result = result_of(&[PokerValue::Three, PokerValue::Five]);

        // then (期待する結果): 先に 1 票に達した 3 がモード
        assert_eq!(result.mode, Some(PokerValue::Three));
    }

    #[test]
    fn test_non_numeric_votes_excluded_from_average_but_counted() {
        // テスト項目: 非数値カードは平均・中央値から除外されるが分布には含まれる
        // when (操作):
        let result = result_of(&[PokerValue::Five, PokerValue::Unsure, PokerValue::Coffee]);

        // then (期待する結果):
        assert_eq!(result.average, Some(5.0));
        assert_eq!(result.median, Some(5.0));
        assert_eq!(result.distribution.len(), 3);
        assert_eq!(result.votes.len(), 3);
    }

    #[test]
    fn test_median_even_count_averages_middles() {
        // テスト項目: 偶数個の中央値は中央 2 値の平均
        // when (操作):
        let result = result_of(&[PokerValue::Three, PokerValue::Five]);

        // then (期待する結果):
        assert_eq!(result.median, Some(4.0));
        assert_eq!(result.average, Some(4.0));
    }

    #[test]
    fn test_distribution_percentages() {
        // テスト項目: 分布のカウントとパーセンテージ
        // when (操作):
        let result = result_of(&[
            PokerValue::Five,
            PokerValue::Five,
            PokerValue::Eight,
            PokerValue::Five,
        ]);

        // then (期待する結果): 先着順で 5 → 8
        assert_eq!(result.distribution[0].value, PokerValue::Five);
        assert_eq!(result.distribution[0].count, 3);
        assert_eq!(result.distribution[0].percentage, 75.0);
        assert_eq!(result.distribution[1].value, PokerValue::Eight);
        assert_eq!(result.distribution[1].count, 1);
        assert_eq!(result.distribution[1].percentage, 25.0);
    }
}

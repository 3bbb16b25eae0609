use chrono::Utc;

/// Get the current Unix timestamp in milliseconds (UTC).
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_monotonic_enough() {
        // テスト項目: now_millis が単調に増加する（ミリ秒精度）
        // given (前提条件):
        let first = now_millis();

        // when (操作):
        let second = now_millis();

        // then (期待する結果):
        assert!(second >= first);
        // 2020-01-01 以降であること（時計が妥当な範囲にある）
        assert!(first > 1_577_836_800_000);
    }
}

//! 票据分配编码
//!
//! 把买家选择的活动列表与票数转换为定长数组：下标是票的槽位，值是活动 id（0 = 未分配）。
//! 元数据在存储边界统一解析为 `Vec<i64>`，核心逻辑不再处理 CSV / JSON 字符串等历史格式。

use serde_json::Value;

/// 单个订单行最多生成的票数
pub const MAX_TICKETS_PER_ITEM: i64 = 10_000;

/// 根据选择生成分配数组，长度恒等于 `tickets_total`
///
/// - 票数 <= 0：空数组
/// - 未选择：全部为 0
/// - 单个活动：全部分配给它
/// - 多个活动：轮询，靠前的活动拿到多出来的票
///
/// 票数在 [`MAX_TICKETS_PER_ITEM`] 处截断；调用方应先用 [`within_limit`] 校验。
pub fn normalize(selection: &[i64], tickets_total: i64) -> Vec<i64> {
    if tickets_total <= 0 {
        return Vec::new();
    }
    let total = tickets_total.min(MAX_TICKETS_PER_ITEM) as usize;

    match selection {
        [] => vec![0; total],
        [only] => vec![*only; total],
        _ => (0..total).map(|i| selection[i % selection.len()]).collect(),
    }
}

/// 订单行应有的票数：max(1, allocation) × max(1, quantity)
/// 溢出时饱和到 i64::MAX
pub fn tickets_total(allocation: i64, quantity: i64) -> i64 {
    allocation.max(1).saturating_mul(quantity.max(1))
}

pub fn within_limit(tickets_total: i64) -> bool {
    tickets_total <= MAX_TICKETS_PER_ITEM
}

/// 长度不符时按选择重建；返回 (分配数组, 是否重建)
pub fn repair(
    persisted: Option<Vec<i64>>,
    selection: &[i64],
    allocation: i64,
    quantity: i64,
) -> (Vec<i64>, bool) {
    let expected = tickets_total(allocation, quantity);
    match persisted {
        Some(existing) if existing.len() as i64 == expected => (existing, false),
        _ => (normalize(selection, expected), true),
    }
}

/// 分配数组去重后的活动列表（保留首次出现顺序，去掉 0）
pub fn selection_from_distribution(distribution: &[i64]) -> Vec<i64> {
    let mut seen = Vec::new();
    for &id in distribution {
        if id > 0 && !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

/// 按活动统计槽位数
pub fn count_by_drawing(distribution: &[i64]) -> Vec<(i64, usize)> {
    let mut counts: Vec<(i64, usize)> = Vec::new();
    for &id in distribution {
        if id <= 0 {
            continue;
        }
        match counts.iter_mut().find(|(d, _)| *d == id) {
            Some((_, n)) => *n += 1,
            None => counts.push((id, 1)),
        }
    }
    counts
}

fn value_to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

/// 解析整数型元数据（数字或数字字符串）
pub fn parse_int(value: &Value) -> Option<i64> {
    value_to_int(value)
}

fn collect_ids(values: &[Value]) -> Vec<i64> {
    values.iter().filter_map(value_to_int).collect()
}

fn split_raw(raw: &str) -> Vec<i64> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(Value::Array(values)) = serde_json::from_str::<Value>(trimmed) {
            return collect_ids(&values);
        }
    }
    trimmed
        .split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

fn raw_ids(value: &Value) -> Vec<i64> {
    match value {
        Value::Array(values) => collect_ids(values),
        Value::String(raw) => split_raw(raw),
        Value::Number(_) => value_to_int(value).into_iter().collect(),
        Value::Object(map) => collect_ids(&map.values().cloned().collect::<Vec<_>>()),
        _ => Vec::new(),
    }
}

/// 买家选择：只保留正整数，去重并保持顺序
pub fn parse_selection(value: &Value) -> Vec<i64> {
    let mut out = Vec::new();
    for id in raw_ids(value) {
        if id > 0 && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// 已持久化的分配数组：保留位置，负数视为 0
pub fn parse_distribution(value: &Value) -> Option<Vec<i64>> {
    match value {
        Value::Array(values) => Some(
            values
                .iter()
                .map(|v| value_to_int(v).unwrap_or(0).max(0))
                .collect(),
        ),
        Value::String(raw) if !raw.trim().is_empty() => {
            Some(split_raw(raw).into_iter().map(|v| v.max(0)).collect())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_empty_and_non_positive_totals() {
        assert!(normalize(&[1, 2], 0).is_empty());
        assert!(normalize(&[1, 2], -3).is_empty());
        assert_eq!(normalize(&[], 4), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_normalize_single_selection_fills_all_slots() {
        for n in 1..8 {
            assert_eq!(normalize(&[42], n), vec![42; n as usize]);
        }
    }

    #[test]
    fn test_normalize_round_robin_favours_earlier_entries() {
        let sel = [10, 20, 30];
        for n in 0..10 {
            let dist = normalize(&sel, n);
            assert_eq!(dist.len(), n as usize);
            for (i, id) in dist.iter().enumerate() {
                assert_eq!(*id, sel[i % sel.len()]);
            }
        }
        assert_eq!(normalize(&sel, 4), vec![10, 20, 30, 10]);
    }

    #[test]
    fn test_six_tickets_over_two_drawings() {
        let dist = normalize(&[1, 2], tickets_total(2, 3));
        assert_eq!(dist, vec![1, 2, 1, 2, 1, 2]);
    }

    #[test]
    fn test_tickets_total_saturates_instead_of_overflowing() {
        assert_eq!(tickets_total(i64::MAX / 2, 3), i64::MAX);
        assert_eq!(tickets_total(i64::MIN, i64::MIN), 1);
        assert!(!within_limit(tickets_total(i64::MAX / 2, 3)));
        assert!(within_limit(tickets_total(100, 100)));
        assert!(!within_limit(MAX_TICKETS_PER_ITEM + 1));
    }

    #[test]
    fn test_normalize_caps_huge_totals() {
        assert_eq!(normalize(&[1], i64::MAX).len(), MAX_TICKETS_PER_ITEM as usize);
        assert_eq!(normalize(&[1, 2], MAX_TICKETS_PER_ITEM + 5).len(), MAX_TICKETS_PER_ITEM as usize);
    }

    #[test]
    fn test_repair_keeps_valid_and_rebuilds_mismatch() {
        let (dist, rebuilt) = repair(Some(vec![5, 5]), &[5], 1, 2);
        assert_eq!(dist, vec![5, 5]);
        assert!(!rebuilt);

        let (dist, rebuilt) = repair(Some(vec![5]), &[5, 6], 2, 2);
        assert_eq!(dist, vec![5, 6, 5, 6]);
        assert!(rebuilt);

        let (dist, rebuilt) = repair(None, &[], 0, 0);
        assert_eq!(dist, vec![0]);
        assert!(rebuilt);
    }

    #[test]
    fn test_repair_is_idempotent() {
        let (first, _) = repair(Some(vec![1]), &[3, 4], 3, 1);
        let (second, rebuilt) = repair(Some(first.clone()), &[3, 4], 3, 1);
        assert_eq!(first, second);
        assert!(!rebuilt);
    }

    #[test]
    fn test_parse_selection_accepts_legacy_formats() {
        assert_eq!(parse_selection(&json!("3,5, 3,-1,abc")), vec![3, 5]);
        assert_eq!(parse_selection(&json!("[7,\"8\",0]")), vec![7, 8]);
        assert_eq!(parse_selection(&json!([9, "10", null, 9])), vec![9, 10]);
        assert_eq!(parse_selection(&json!(11)), vec![11]);
        assert!(parse_selection(&json!(null)).is_empty());
    }

    #[test]
    fn test_parse_distribution_preserves_positions() {
        assert_eq!(
            parse_distribution(&json!([1, "2", null, -4])),
            Some(vec![1, 2, 0, 0])
        );
        assert_eq!(parse_distribution(&json!("")), None);
        assert_eq!(parse_distribution(&json!({"a": 1})), None);
    }

    #[test]
    fn test_selection_from_distribution_dedups() {
        assert_eq!(selection_from_distribution(&[2, 0, 1, 2, 1]), vec![2, 1]);
    }

    #[test]
    fn test_count_by_drawing() {
        assert_eq!(count_by_drawing(&[2, 0, 1, 2, 2]), vec![(2, 3), (1, 1)]);
    }
}

//! 审计日志条目构造：纯文本消息，固定上限

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::models::AuditEntry;

fn markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("static markup pattern"))
}

/// 去除 HTML 标记并压缩空白
pub fn strip_markup(input: &str) -> String {
    let without_tags = markup_regex().replace_all(input, " ");
    without_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn new_entry(
    entry_type: &str,
    message: &str,
    context: serde_json::Value,
    user_id: Option<i64>,
    now: DateTime<Utc>,
) -> AuditEntry {
    AuditEntry {
        timestamp: now,
        entry_type: entry_type.to_string(),
        message: strip_markup(message),
        context,
        user_id,
    }
}

/// 追加并只保留最近 `limit` 条
pub fn push_capped<T>(list: &mut Vec<T>, item: T, limit: usize) {
    list.push(item);
    if list.len() > limit {
        let overflow = list.len() - limit;
        list.drain(..overflow);
    }
}

/// 最新的在前；时间戳相同时后追加的在前
pub fn newest_first(mut entries: Vec<AuditEntry>) -> Vec<AuditEntry> {
    entries.reverse();
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_strip_markup() {
        assert_eq!(
            strip_markup("<strong>Ticket</strong> moved to <a href=\"x\">Lot 2</a>\n"),
            "Ticket moved to Lot 2"
        );
    }

    #[test]
    fn test_push_capped_keeps_most_recent() {
        let mut list: Vec<u32> = (0..5).collect();
        push_capped(&mut list, 5, 3);
        assert_eq!(list, vec![3, 4, 5]);
    }

    #[test]
    fn test_newest_first() {
        let now = Utc::now();
        let older = new_entry("draw", "a", json!({}), None, now - Duration::minutes(5));
        let newer = new_entry("draw", "b", json!({}), Some(1), now);
        let sorted = newest_first(vec![older, newer]);
        assert_eq!(sorted[0].message, "b");
    }

    #[test]
    fn test_newest_first_with_equal_timestamps_keeps_append_order_reversed() {
        let now = Utc::now();
        let entries = (0..3)
            .map(|n| new_entry("draw", &format!("e{n}"), json!({}), None, now))
            .collect();
        let messages: Vec<String> = newest_first(entries).into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["e2", "e1", "e0"]);
    }
}

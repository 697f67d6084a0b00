//! 手动开奖的确定性选号与报告校验和
//!
//! 选号使用哈希链，只为得到可复现、可审计的均匀下标，并不提供不可预测性。
//! 同样的奖池顺序、种子与候补人数，任何人重跑都会得到同样的结果。

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Serialize;

use crate::error::AppResult;
use crate::models::{DrawReport, DrawRole};

/// 候补人数上限
pub const MAX_ALTERNATES: u8 = 3;

/// 下标冲突时最多重新哈希的次数，超过后接受可能重复的下标
pub const MAX_COLLISION_RETRIES: u32 = 25;

/// 取哈希末尾 12 位十六进制
const INDEX_HEX_DIGITS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pick {
    /// 奖池下标
    pub index: usize,
    pub role: DrawRole,
    pub position: usize,
}

pub fn hash_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

fn index_from_hash(hash: &str, pool_size: usize) -> usize {
    let tail = &hash[hash.len().saturating_sub(INDEX_HEX_DIGITS)..];
    let value = u64::from_str_radix(tail, 16).unwrap_or(0);
    (value % pool_size as u64) as usize
}

/// 奖池票据引用按奖池顺序拼接
pub fn ticket_source<S: AsRef<str>>(references: &[S]) -> String {
    references
        .iter()
        .map(|r| r.as_ref())
        .collect::<Vec<_>>()
        .join(",")
}

/// 选出 1 名中奖者与至多 `alternate_count` 名候补
pub fn pick_winners(
    public_seed: &str,
    ticket_source: &str,
    pool_size: usize,
    alternate_count: u8,
) -> Vec<Pick> {
    if pool_size == 0 {
        return Vec::new();
    }
    let draw_count = pool_size.min(alternate_count.min(MAX_ALTERNATES) as usize + 1);
    let mut picks: Vec<Pick> = Vec::with_capacity(draw_count);

    for position in 0..draw_count {
        let mut hash = hash_hex(&format!("{public_seed}|{ticket_source}|{position}"));
        let mut index = index_from_hash(&hash, pool_size);

        let mut attempt = 1;
        while picks.iter().any(|p| p.index == index) && attempt <= MAX_COLLISION_RETRIES {
            hash = hash_hex(&format!("{hash}|{attempt}"));
            index = index_from_hash(&hash, pool_size);
            attempt += 1;
        }

        picks.push(Pick {
            index,
            role: if position == 0 {
                DrawRole::Winner
            } else {
                DrawRole::Alternate
            },
            position,
        });
    }
    picks
}

/// 规范序列化（结构体字段顺序）后的 MD5 摘要
pub fn checksum<T: Serialize>(body: &T) -> AppResult<String> {
    let canonical = serde_json::to_string(body)?;
    Ok(hash_hex(&canonical))
}

/// 重新计算报告正文的摘要并与存储的校验和比对
pub fn verify_report(report: &DrawReport) -> AppResult<bool> {
    Ok(checksum(&report.body)? == report.checksum)
}

/// 未提供公开种子时生成一个
pub fn generate_seed() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn refs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}:{}:0", 100 + i, 200 + i)).collect()
    }

    #[test]
    fn test_hash_hex_known_vector() {
        assert_eq!(hash_hex("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_index_uses_trailing_digits() {
        let hash = "ffffffffffffffffffffffffffffffffffffffffffffffffffff00000000000a";
        assert_eq!(index_from_hash(hash, 7), 10 % 7);
    }

    #[test]
    fn test_five_tickets_two_alternates_seed_abc() {
        let pool = refs(5);
        let source = ticket_source(&pool);
        let first = pick_winners("ABC", &source, pool.len(), 2);
        let second = pick_winners("ABC", &source, pool.len(), 2);

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        assert_eq!(first[0].role, DrawRole::Winner);
        assert_eq!(first[1].role, DrawRole::Alternate);
        assert_eq!(first[2].position, 2);

        let distinct: HashSet<usize> = first.iter().map(|p| p.index).collect();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn test_draw_count_bounded_by_pool_and_cap() {
        let pool = refs(2);
        let source = ticket_source(&pool);
        assert_eq!(pick_winners("s", &source, 2, 3).len(), 2);
        assert_eq!(pick_winners("s", &source, 2, 0).len(), 1);
        assert!(pick_winners("s", &source, 0, 3).is_empty());

        let big = refs(50);
        let source = ticket_source(&big);
        assert_eq!(pick_winners("s", &source, 50, 9).len(), 4);
    }

    #[test]
    fn test_picks_distinct_across_many_seeds() {
        let pool = refs(10);
        let source = ticket_source(&pool);
        for seed in 0..200 {
            let picks = pick_winners(&format!("seed-{seed}"), &source, pool.len(), 3);
            let distinct: HashSet<usize> = picks.iter().map(|p| p.index).collect();
            assert_eq!(distinct.len(), picks.len(), "seed-{seed}");
        }
    }

    #[test]
    fn test_seed_and_order_change_outcome_inputs() {
        let pool = refs(30);
        let source = ticket_source(&pool);
        let mut reversed = pool.clone();
        reversed.reverse();
        let a = pick_winners("ABC", &source, 30, 3);
        let b = pick_winners("ABD", &source, 30, 3);
        let c = pick_winners("ABC", &ticket_source(&reversed), 30, 3);
        // 不同输入几乎必然给出不同结果
        assert!(a != b || a != c);
    }

    #[test]
    fn test_checksum_is_order_sensitive() {
        #[derive(Serialize)]
        struct Ab {
            a: u8,
            b: u8,
        }
        #[derive(Serialize)]
        struct Ba {
            b: u8,
            a: u8,
        }
        let x = checksum(&Ab { a: 1, b: 2 }).unwrap();
        let y = checksum(&Ba { b: 2, a: 1 }).unwrap();
        assert_ne!(x, y);
        assert_eq!(x, checksum(&Ab { a: 1, b: 2 }).unwrap());
    }

    #[test]
    fn test_report_roundtrip_keeps_checksum_valid() {
        use crate::models::{DrawOptions, DrawReportBody};

        let body = DrawReportBody {
            id: "draw-1".into(),
            loterie_id: 7,
            report_type: "manual".into(),
            created_at: "2025-09-01 10:00:00".into(),
            seed: "ABC".into(),
            ticket_count: 5,
            operator_id: 1,
            operator: "Admin".into(),
            ip: "127.0.0.1".into(),
            user_agent: "test".into(),
            winners: vec![],
            options: DrawOptions {
                exclude_cancelled_orders: true,
                alternate_count: 2,
                seed_provided: true,
            },
        };
        let report = DrawReport {
            checksum: checksum(&body).unwrap(),
            body,
        };
        let stored = serde_json::to_string(&report).unwrap();
        assert!(stored.starts_with(r#"{"id":"draw-1","loterie_id":7,"type":"manual""#));
        assert!(stored.find("\"checksum\"") > stored.find("\"options\""));

        let mut loaded: DrawReport = serde_json::from_str(&stored).unwrap();
        assert!(verify_report(&loaded).unwrap());
        loaded.body.seed = "ABD".into();
        assert!(!verify_report(&loaded).unwrap());
    }

    #[test]
    fn test_generated_seed_shape() {
        let seed = generate_seed();
        assert_eq!(seed.len(), 16);
        assert!(seed.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}

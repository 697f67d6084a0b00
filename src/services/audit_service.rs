use chrono::Utc;

use crate::domain::audit::{new_entry, newest_first, push_capped};
use crate::error::AppResult;
use crate::models::AuditEntry;
use crate::store::{MetaScope, Stores, keys};

/// 活动审计日志：只追加，超过上限丢弃最旧的条目
#[derive(Clone)]
pub struct AuditService {
    stores: Stores,
    limit: usize,
}

impl AuditService {
    pub fn new(stores: Stores, limit: usize) -> Self {
        Self { stores, limit }
    }

    pub async fn append(
        &self,
        drawing_id: i64,
        entry_type: &str,
        message: &str,
        context: serde_json::Value,
        user_id: Option<i64>,
    ) -> AppResult<AuditEntry> {
        let mut log = self.load(drawing_id).await?;
        let entry = new_entry(entry_type, message, context, user_id, Utc::now());
        push_capped(&mut log, entry.clone(), self.limit);
        self.stores
            .save(MetaScope::Drawing, drawing_id, keys::AUDIT_LOG, &log)
            .await?;
        log::debug!("Audit entry [{entry_type}] appended to loterie {drawing_id}");
        Ok(entry)
    }

    /// 最新的在前
    pub async fn read(&self, drawing_id: i64) -> AppResult<Vec<AuditEntry>> {
        Ok(newest_first(self.load(drawing_id).await?))
    }

    async fn load(&self, drawing_id: i64) -> AppResult<Vec<AuditEntry>> {
        Ok(self
            .stores
            .load::<Vec<AuditEntry>>(MetaScope::Drawing, drawing_id, keys::AUDIT_LOG)
            .await?
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use crate::models::entry_types;
    use crate::services::test_support::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_keeps_latest_two_hundred_entries() {
        let fx = Fixture::new();
        fx.drawing(1, "Vélo", 0).await;
        let audit = &fx.services.audit;
        for n in 0..205 {
            audit
                .append(1, entry_types::SETTINGS, &format!("entry {n}"), json!({ "n": n }), None)
                .await
                .unwrap();
        }

        let log = audit.read(1).await.unwrap();
        assert_eq!(log.len(), 200);
        assert_eq!(log[0].message, "entry 204");
        assert_eq!(log[199].message, "entry 5");
    }

    #[tokio::test]
    async fn test_log_strips_markup_and_is_per_drawing() {
        let fx = Fixture::new();
        let audit = &fx.services.audit;
        audit
            .append(1, entry_types::SETTINGS, "<b>Capacité</b> modifiée", json!({}), Some(1))
            .await
            .unwrap();

        let log = audit.read(1).await.unwrap();
        assert_eq!(log[0].message, "Capacité modifiée");
        assert_eq!(log[0].user_id, Some(1));
        assert!(audit.read(2).await.unwrap().is_empty());
    }
}

use crate::error::{AppError, AppResult};
use crate::models::{AVAILABLE_COLUMNS, Settings, UpdateSettingsRequest};
use crate::domain::status::normalize_order_status;
use crate::store::{MetaScope, Stores, keys};

#[derive(Clone)]
pub struct SettingsService {
    stores: Stores,
    default_page_size: u32,
}

impl SettingsService {
    pub fn new(stores: Stores, default_page_size: u32) -> Self {
        Self {
            stores,
            default_page_size,
        }
    }

    /// 读取设置；首次读取时按默认值创建并保存
    pub async fn get(&self) -> AppResult<Settings> {
        if let Some(settings) = self
            .stores
            .load::<Settings>(MetaScope::Option, 0, keys::SETTINGS)
            .await?
        {
            return Ok(settings);
        }
        let settings = Settings::with_page_size(self.default_page_size);
        self.stores
            .save(MetaScope::Option, 0, keys::SETTINGS, &settings)
            .await?;
        log::info!("Created default loterie settings");
        Ok(settings)
    }

    /// 设置表单提交：整体覆盖
    pub async fn update(&self, req: &UpdateSettingsRequest) -> AppResult<Settings> {
        let mut settings = self.get().await?;

        if let Some(enabled) = req.reassignment_enabled {
            settings.reassignment_enabled = enabled;
        }
        if let Some(size) = req.table_page_size {
            if !(1..=500).contains(&size) {
                return Err(AppError::ValidationError(
                    "Table page size must be between 1 and 500".into(),
                ));
            }
            settings.table_page_size = size;
        }
        if let Some(columns) = &req.visible_columns {
            let unknown: Vec<&String> = columns
                .iter()
                .filter(|c| !AVAILABLE_COLUMNS.contains(&c.as_str()))
                .collect();
            if !unknown.is_empty() {
                return Err(AppError::ValidationError(format!(
                    "Unknown columns: {}",
                    unknown
                        .iter()
                        .map(|c| c.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
            let mut visible: Vec<String> = Vec::new();
            for column in columns {
                if !visible.contains(column) {
                    visible.push(column.clone());
                }
            }
            settings.visible_columns = visible;
        }
        if let Some(statuses) = &req.excluded_statuses {
            let mut normalized: Vec<String> = Vec::new();
            for status in statuses {
                let status = normalize_order_status(status);
                if !status.is_empty() && !normalized.contains(&status) {
                    normalized.push(status);
                }
            }
            settings.excluded_statuses = normalized;
        }

        self.stores
            .save(MetaScope::Option, 0, keys::SETTINGS, &settings)
            .await?;
        log::info!(
            "Loterie settings updated (reassignment_enabled={}, excluded={:?})",
            settings.reassignment_enabled,
            settings.excluded_statuses
        );
        Ok(settings)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DrawRole {
    Winner,
    Alternate,
}

/// 手动开奖向导步骤，只能前进，重新开始需显式 restart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DrawStep {
    Prepare,
    Validate,
    Committed,
}

/// 持久化的向导状态（活动元数据 `_lm_manual_draw_state`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DrawWizardState {
    pub step: DrawStep,
    pub loterie_id: i64,
    pub operator_id: i64,
    pub exclude_cancelled_orders: bool,
    pub public_seed: String,
    /// 操作者是否自行提供了种子
    pub seed_provided: bool,
    /// 防重放令牌，提交时必须原样带回
    pub nonce: String,
    pub pool_size: usize,
    pub prepared_at: DateTime<Utc>,
    pub report_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PrepareDrawRequest {
    #[serde(default = "default_true")]
    pub exclude_cancelled_orders: bool,
    #[serde(default)]
    pub public_seed: Option<String>,
    /// 必须确认已核对参与者列表
    #[serde(default)]
    pub confirm_reviewed: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CommitDrawRequest {
    pub nonce: String,
    /// 候补人数 0..=3
    #[serde(default)]
    pub alternate_count: u8,
}

/// 向导当前状态视图
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawWizardView {
    pub loterie_id: i64,
    pub step: DrawStep,
    pub state: Option<DrawWizardState>,
}

/// VALIDATE 步骤返回给操作者的奖池预览
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawPreview {
    pub loterie_id: i64,
    pub step: DrawStep,
    pub nonce: String,
    pub seed: String,
    pub pool_size: usize,
    pub unique_participants: usize,
    pub exclude_cancelled_orders: bool,
    pub max_alternates: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DrawWinner {
    pub signature: String,
    pub ticket_number: String,
    pub order_id: i64,
    pub order_number: String,
    pub participant: String,
    pub role: DrawRole,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DrawOptions {
    pub exclude_cancelled_orders: bool,
    pub alternate_count: u8,
    pub seed_provided: bool,
}

/// 报告正文；字段顺序即规范序列化顺序，校验和基于此计算
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DrawReportBody {
    pub id: String,
    pub loterie_id: i64,
    #[serde(rename = "type")]
    pub report_type: String,
    pub created_at: String,
    pub seed: String,
    pub ticket_count: usize,
    pub operator_id: i64,
    pub operator: String,
    pub ip: String,
    pub user_agent: String,
    pub winners: Vec<DrawWinner>,
    pub options: DrawOptions,
}

/// 完整报告，写入后不可修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DrawReport {
    #[serde(flatten)]
    pub body: DrawReportBody,
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DrawHistoryWinner {
    pub signature: String,
    pub ticket_number: String,
    pub order_id: i64,
    pub role: DrawRole,
    pub position: usize,
}

/// 开奖历史中的精简记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DrawHistoryEntry {
    pub report_id: String,
    pub drawn_at: String,
    pub seed: String,
    pub ticket_count: usize,
    pub operator_id: i64,
    pub checksum: String,
    pub winners: Vec<DrawHistoryWinner>,
}

impl From<&DrawReport> for DrawHistoryEntry {
    fn from(report: &DrawReport) -> Self {
        Self {
            report_id: report.body.id.clone(),
            drawn_at: report.body.created_at.clone(),
            seed: report.body.seed.clone(),
            ticket_count: report.body.ticket_count,
            operator_id: report.body.operator_id,
            checksum: report.checksum.clone(),
            winners: report
                .body
                .winners
                .iter()
                .map(|w| DrawHistoryWinner {
                    signature: w.signature.clone(),
                    ticket_number: w.ticket_number.clone(),
                    order_id: w.order_id,
                    role: w.role,
                    position: w.position,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawReportVerification {
    pub report_id: String,
    pub checksum: String,
    pub valid: bool,
}

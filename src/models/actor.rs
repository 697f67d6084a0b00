use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 当前请求的操作者（由鉴权中间件从 JWT 中注入）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Actor {
    pub id: i64,
    pub display_name: String,
    pub role: ActorRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Administrator,
    ShopManager,
    Customer,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Administrator => "administrator",
            ActorRole::ShopManager => "shop_manager",
            ActorRole::Customer => "customer",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "administrator" => Some(ActorRole::Administrator),
            "shop_manager" => Some(ActorRole::ShopManager),
            "customer" => Some(ActorRole::Customer),
            _ => None,
        }
    }
}

impl Actor {
    pub fn is_operator(&self) -> bool {
        matches!(
            self.role,
            ActorRole::Administrator | ActorRole::ShopManager
        )
    }
}

/// 发起请求的客户端信息（写入开奖报告）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClientMeta {
    pub ip: String,
    pub user_agent: String,
}

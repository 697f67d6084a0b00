pub mod account;
pub mod draw;
pub mod hooks;
pub mod loterie;
pub mod public;
pub mod settings;
pub mod ticket;

pub use account::account_config;
pub use draw::draw_config;
pub use hooks::hooks_config;
pub use loterie::loterie_config;
pub use public::public_config;
pub use settings::settings_config;
pub use ticket::ticket_config;

use actix_web::{HttpMessage, HttpRequest, HttpResponse};
use serde::Serialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::{Actor, ClientMeta};

/// 鉴权中间件注入的当前操作者
fn current_actor(req: &HttpRequest) -> AppResult<Actor> {
    req.extensions()
        .get::<Actor>()
        .cloned()
        .ok_or_else(|| AppError::AuthError("Missing access token".to_string()))
}

/// 后台接口只对管理员 / 店长开放
fn require_operator(req: &HttpRequest) -> AppResult<Actor> {
    let actor = current_actor(req)?;
    if !actor.is_operator() {
        return Err(AppError::PermissionDenied);
    }
    Ok(actor)
}

fn client_meta(req: &HttpRequest) -> ClientMeta {
    let ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or_default()
        .to_string();
    let user_agent = req
        .headers()
        .get("User-Agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    ClientMeta { ip, user_agent }
}

fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": data
    }))
}

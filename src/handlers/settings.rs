use actix_web::{HttpRequest, HttpResponse, web};

use super::{ok, require_operator};
use crate::error::AppResult;
use crate::models::*;
use crate::services::AppServices;

#[utoipa::path(
    get,
    path = "/admin/settings",
    tag = "settings",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "全局设置", body = Settings)
    )
)]
pub async fn get_settings(
    services: web::Data<AppServices>,
    req: HttpRequest,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    Ok(ok(services.settings.get().await?))
}

#[utoipa::path(
    put,
    path = "/admin/settings",
    tag = "settings",
    request_body = UpdateSettingsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "保存成功", body = Settings),
        (status = 400, description = "参数错误")
    )
)]
pub async fn update_settings(
    services: web::Data<AppServices>,
    req: HttpRequest,
    body: web::Json<UpdateSettingsRequest>,
) -> AppResult<HttpResponse> {
    let actor = require_operator(&req)?;
    let settings = services.settings.update(&body).await?;
    log::info!("Settings saved by user {}", actor.id);
    Ok(ok(settings))
}

#[utoipa::path(
    get,
    path = "/admin/products/{id}/lottery",
    tag = "settings",
    params(
        ("id" = i64, Path, description = "商品ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "商品抽奖配置", body = ProductLotteryConfig)
    )
)]
pub async fn get_product_config(
    services: web::Data<AppServices>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    Ok(ok(services.drawings.product_config(path.into_inner()).await?))
}

#[utoipa::path(
    put,
    path = "/admin/products/{id}/lottery",
    tag = "settings",
    params(
        ("id" = i64, Path, description = "商品ID")
    ),
    request_body = ProductLotteryConfig,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "保存成功", body = ProductLotteryConfig),
        (status = 400, description = "目标活动不存在")
    )
)]
pub async fn update_product_config(
    services: web::Data<AppServices>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<ProductLotteryConfig>,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    let config = services
        .drawings
        .save_product_config(path.into_inner(), &body)
        .await?;
    Ok(ok(config))
}

pub fn settings_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/settings")
            .route("", web::get().to(get_settings))
            .route("", web::put().to(update_settings)),
    )
    .service(
        web::scope("/admin/products")
            .route("/{id}/lottery", web::get().to(get_product_config))
            .route("/{id}/lottery", web::put().to(update_product_config)),
    );
}

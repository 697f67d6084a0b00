use actix_web::{HttpResponse, web};

use super::ok;
use crate::error::AppResult;
use crate::models::*;
use crate::services::AppServices;

#[utoipa::path(
    get,
    path = "/public/loteries",
    tag = "public",
    responses(
        (status = 200, description = "已发布的活动（按标题排序）", body = [DrawingChoice])
    )
)]
pub async fn list_choices(services: web::Data<AppServices>) -> AppResult<HttpResponse> {
    let settings = services.settings.get().await?;
    Ok(ok(services.drawings.choices(&settings).await?))
}

#[utoipa::path(
    get,
    path = "/public/loteries/{id}/summary",
    tag = "public",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    responses(
        (status = 200, description = "活动摘要", body = DrawingSummary),
        (status = 404, description = "活动不存在或未发布")
    )
)]
pub async fn get_summary(
    services: web::Data<AppServices>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    Ok(ok(services.drawings.summary(path.into_inner()).await?))
}

pub fn public_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/public/loteries")
            .route("", web::get().to(list_choices))
            .route("/{id}/summary", web::get().to(get_summary)),
    );
}

use actix_web::{HttpRequest, HttpResponse, web};

use super::{draw_config, ok, require_operator};
use crate::error::AppResult;
use crate::models::*;
use crate::services::AppServices;

#[utoipa::path(
    get,
    path = "/admin/loteries",
    tag = "loterie",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "活动列表", body = [Drawing]),
        (status = 403, description = "无权限")
    )
)]
pub async fn list_loteries(
    services: web::Data<AppServices>,
    req: HttpRequest,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    Ok(ok(services.drawings.list().await?))
}

#[utoipa::path(
    get,
    path = "/admin/loteries/{id}",
    tag = "loterie",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "活动详情", body = Drawing),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn get_loterie(
    services: web::Data<AppServices>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    Ok(ok(services.drawings.load(path.into_inner()).await?))
}

#[utoipa::path(
    put,
    path = "/admin/loteries/{id}/meta",
    tag = "loterie",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    request_body = UpdateDrawingMetaRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "保存成功", body = Drawing),
        (status = 400, description = "参数错误")
    )
)]
pub async fn update_loterie_meta(
    services: web::Data<AppServices>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateDrawingMetaRequest>,
) -> AppResult<HttpResponse> {
    let actor = require_operator(&req)?;
    let drawing = services
        .drawings
        .update_meta(&actor, path.into_inner(), &body)
        .await?;
    Ok(ok(drawing))
}

#[utoipa::path(
    get,
    path = "/admin/loteries/{id}/stats",
    tag = "loterie",
    params(
        ("id" = i64, Path, description = "活动ID"),
        ("refresh" = Option<bool>, Query, description = "强制重建统计"),
        ("search" = Option<String>, Query, description = "票号 / 顾客 / 邮箱 / 订单号"),
        ("status" = Option<TicketStatus>, Query, description = "票据状态"),
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "统计与票据列表", body = DrawingStatsView),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn get_loterie_stats(
    services: web::Data<AppServices>,
    req: HttpRequest,
    path: web::Path<i64>,
    query: web::Query<StatsQuery>,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    let drawing_id = path.into_inner();
    let mut ledger = services.tickets.ledger();
    let view = ledger.refreshed_stats_view(drawing_id, &query).await?;
    Ok(ok(view))
}

#[utoipa::path(
    get,
    path = "/admin/loteries/{id}/audit-log",
    tag = "loterie",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "审计日志（最新在前）", body = [AuditEntry])
    )
)]
pub async fn get_audit_log(
    services: web::Data<AppServices>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    let drawing_id = path.into_inner();
    services.drawings.load(drawing_id).await?;
    Ok(ok(services.audit.read(drawing_id).await?))
}

pub fn loterie_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/loteries")
            .route("", web::get().to(list_loteries))
            .route("/{id}", web::get().to(get_loterie))
            .route("/{id}/meta", web::put().to(update_loterie_meta))
            .route("/{id}/stats", web::get().to(get_loterie_stats))
            .route("/{id}/audit-log", web::get().to(get_audit_log))
            .configure(draw_config),
    );
}

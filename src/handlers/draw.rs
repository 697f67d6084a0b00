use actix_web::{HttpRequest, HttpResponse, web};

use super::{client_meta, ok, require_operator};
use crate::error::AppResult;
use crate::models::*;
use crate::services::AppServices;

#[utoipa::path(
    get,
    path = "/admin/loteries/{id}/draw",
    tag = "draw",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "开奖向导当前状态", body = DrawWizardView)
    )
)]
pub async fn get_wizard(
    services: web::Data<AppServices>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    Ok(ok(services.draws.wizard(path.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/admin/loteries/{id}/draw/prepare",
    tag = "draw",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    request_body = PrepareDrawRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "奖池已锁定，进入确认步骤", body = DrawPreview),
        (status = 400, description = "未确认核对参与者"),
        (status = 409, description = "奖池为空")
    )
)]
pub async fn prepare_draw(
    services: web::Data<AppServices>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<PrepareDrawRequest>,
) -> AppResult<HttpResponse> {
    let actor = require_operator(&req)?;
    let preview = services
        .draws
        .prepare(&actor, path.into_inner(), &body)
        .await?;
    Ok(ok(preview))
}

#[utoipa::path(
    post,
    path = "/admin/loteries/{id}/draw/commit",
    tag = "draw",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    request_body = CommitDrawRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "开奖完成，返回报告", body = DrawReport),
        (status = 400, description = "令牌不匹配或参数错误"),
        (status = 409, description = "奖池为空")
    )
)]
pub async fn commit_draw(
    services: web::Data<AppServices>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<CommitDrawRequest>,
) -> AppResult<HttpResponse> {
    let actor = require_operator(&req)?;
    let client = client_meta(&req);
    let report = services
        .draws
        .commit(&actor, &client, path.into_inner(), &body)
        .await?;
    Ok(ok(report))
}

#[utoipa::path(
    post,
    path = "/admin/loteries/{id}/draw/restart",
    tag = "draw",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "向导已回到第一步", body = DrawWizardView)
    )
)]
pub async fn restart_draw(
    services: web::Data<AppServices>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let actor = require_operator(&req)?;
    Ok(ok(services.draws.restart(&actor, path.into_inner()).await?))
}

#[utoipa::path(
    get,
    path = "/admin/loteries/{id}/reports",
    tag = "draw",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "开奖报告（最新在前）", body = [DrawReport])
    )
)]
pub async fn list_reports(
    services: web::Data<AppServices>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    Ok(ok(services.draws.reports(path.into_inner()).await?))
}

/// 下载报告：原样输出持久化格式，不包裹响应信封
#[utoipa::path(
    get,
    path = "/admin/loteries/{id}/reports/{report_id}",
    tag = "draw",
    params(
        ("id" = i64, Path, description = "活动ID"),
        ("report_id" = String, Path, description = "报告ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "报告文件", body = DrawReport),
        (status = 404, description = "报告不存在")
    )
)]
pub async fn download_report(
    services: web::Data<AppServices>,
    req: HttpRequest,
    path: web::Path<(i64, String)>,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    let (drawing_id, report_id) = path.into_inner();
    let report = services.draws.report(drawing_id, &report_id).await?;
    let body = serde_json::to_string_pretty(&report)?;
    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"loterie-{drawing_id}-{report_id}.json\""),
        ))
        .body(body))
}

#[utoipa::path(
    get,
    path = "/admin/loteries/{id}/reports/{report_id}/verify",
    tag = "draw",
    params(
        ("id" = i64, Path, description = "活动ID"),
        ("report_id" = String, Path, description = "报告ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "校验结果", body = DrawReportVerification)
    )
)]
pub async fn verify_report(
    services: web::Data<AppServices>,
    req: HttpRequest,
    path: web::Path<(i64, String)>,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    let (drawing_id, report_id) = path.into_inner();
    Ok(ok(services.draws.verify(drawing_id, &report_id).await?))
}

#[utoipa::path(
    get,
    path = "/admin/loteries/{id}/roles",
    tag = "draw",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "最近一次开奖的中奖 / 候补票")
    )
)]
pub async fn get_roles(
    services: web::Data<AppServices>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    Ok(ok(services.draws.roles(path.into_inner()).await?))
}

#[utoipa::path(
    get,
    path = "/admin/loteries/{id}/history",
    tag = "draw",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "开奖历史（最新在前）", body = [DrawHistoryEntry])
    )
)]
pub async fn get_history(
    services: web::Data<AppServices>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    Ok(ok(services.draws.history(path.into_inner()).await?))
}

/// 挂在 /admin/loteries 作用域下
pub fn draw_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/{id}/draw", web::get().to(get_wizard))
        .route("/{id}/draw/prepare", web::post().to(prepare_draw))
        .route("/{id}/draw/commit", web::post().to(commit_draw))
        .route("/{id}/draw/restart", web::post().to(restart_draw))
        .route("/{id}/reports", web::get().to(list_reports))
        .route("/{id}/reports/{report_id}", web::get().to(download_report))
        .route("/{id}/reports/{report_id}/verify", web::get().to(verify_report))
        .route("/{id}/roles", web::get().to(get_roles))
        .route("/{id}/history", web::get().to(get_history));
}

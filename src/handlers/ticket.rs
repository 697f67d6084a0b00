use actix_web::{HttpRequest, HttpResponse, web};

use super::{ok, require_operator};
use crate::error::AppResult;
use crate::models::*;
use crate::services::{AppServices, ReassignScope};

#[utoipa::path(
    post,
    path = "/admin/tickets/reassign",
    tag = "ticket",
    request_body = ReassignBatchRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "批量转移结果", body = ReassignBatchResponse)
    )
)]
pub async fn reassign_tickets(
    services: web::Data<AppServices>,
    req: HttpRequest,
    body: web::Json<ReassignBatchRequest>,
) -> AppResult<HttpResponse> {
    let actor = require_operator(&req)?;
    let result = services
        .reassignment
        .reassign_batch(&actor, ReassignScope::Operator, &body.tickets)
        .await?;
    Ok(ok(result))
}

#[utoipa::path(
    post,
    path = "/admin/tickets/distribution",
    tag = "ticket",
    request_body = DistributionPreviewRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "分配数组预览", body = DistributionPreviewResponse),
        (status = 400, description = "票数超过单行上限")
    )
)]
pub async fn preview_distribution(
    services: web::Data<AppServices>,
    req: HttpRequest,
    body: web::Json<DistributionPreviewRequest>,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    Ok(ok(services.tickets.preview_distribution(&body)?))
}

pub fn ticket_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/tickets")
            .route("/reassign", web::post().to(reassign_tickets))
            .route("/distribution", web::post().to(preview_distribution)),
    );
}

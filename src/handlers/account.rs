use actix_web::{HttpRequest, HttpResponse, web};

use super::{current_actor, ok};
use crate::error::AppResult;
use crate::models::*;
use crate::services::{AppServices, ReassignScope};

#[utoipa::path(
    get,
    path = "/account/tickets",
    tag = "account",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "我的彩票", body = [CustomerTicket]),
        (status = 401, description = "未授权")
    )
)]
pub async fn my_tickets(
    services: web::Data<AppServices>,
    req: HttpRequest,
) -> AppResult<HttpResponse> {
    let actor = current_actor(&req)?;
    Ok(ok(services.tickets.customer_tickets(actor.id).await?))
}

#[utoipa::path(
    post,
    path = "/account/tickets/reassign",
    tag = "account",
    request_body = ReassignBatchRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "批量转移结果", body = ReassignBatchResponse),
        (status = 401, description = "未授权")
    )
)]
pub async fn reassign_my_tickets(
    services: web::Data<AppServices>,
    req: HttpRequest,
    body: web::Json<ReassignBatchRequest>,
) -> AppResult<HttpResponse> {
    let actor = current_actor(&req)?;
    let result = services
        .reassignment
        .reassign_batch(&actor, ReassignScope::Customer(actor.id), &body.tickets)
        .await?;
    Ok(ok(result))
}

pub fn account_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/account/tickets")
            .route("", web::get().to(my_tickets))
            .route("/reassign", web::post().to(reassign_my_tickets)),
    );
}

//! 宿主商城适配层推送的事件

use actix_web::{HttpRequest, HttpResponse, web};

use super::{ok, require_operator};
use crate::error::AppResult;
use crate::models::*;
use crate::services::AppServices;

#[utoipa::path(
    post,
    path = "/hooks/checkout-item",
    tag = "hooks",
    request_body = CheckoutItemRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "订单行抽奖数据已写入", body = CheckoutItemResponse),
        (status = 400, description = "选择不符合商品配置")
    )
)]
pub async fn checkout_item(
    services: web::Data<AppServices>,
    req: HttpRequest,
    body: web::Json<CheckoutItemRequest>,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    Ok(ok(services.order_events.record_checkout_item(&body).await?))
}

#[utoipa::path(
    post,
    path = "/hooks/order-status",
    tag = "hooks",
    request_body = OrderStatusChangedRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已处理", body = OrderStatusChangedResponse),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn order_status_changed(
    services: web::Data<AppServices>,
    req: HttpRequest,
    body: web::Json<OrderStatusChangedRequest>,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    Ok(ok(services.order_events.on_order_status_changed(&body).await?))
}

#[utoipa::path(
    post,
    path = "/hooks/order-completed",
    tag = "hooks",
    request_body = OrderCompletedRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已处理", body = OrderCompletedResponse),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn order_completed(
    services: web::Data<AppServices>,
    req: HttpRequest,
    body: web::Json<OrderCompletedRequest>,
) -> AppResult<HttpResponse> {
    require_operator(&req)?;
    Ok(ok(services.order_events.on_order_completed(body.order_id).await?))
}

pub fn hooks_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/hooks")
            .route("/checkout-item", web::post().to(checkout_item))
            .route("/order-status", web::post().to(order_status_changed))
            .route("/order-completed", web::post().to(order_completed)),
    );
}

use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::loterie::list_loteries,
        handlers::loterie::get_loterie,
        handlers::loterie::update_loterie_meta,
        handlers::loterie::get_loterie_stats,
        handlers::loterie::get_audit_log,
        handlers::draw::get_wizard,
        handlers::draw::prepare_draw,
        handlers::draw::commit_draw,
        handlers::draw::restart_draw,
        handlers::draw::list_reports,
        handlers::draw::download_report,
        handlers::draw::verify_report,
        handlers::draw::get_roles,
        handlers::draw::get_history,
        handlers::ticket::reassign_tickets,
        handlers::ticket::preview_distribution,
        handlers::settings::get_settings,
        handlers::settings::update_settings,
        handlers::settings::get_product_config,
        handlers::settings::update_product_config,
        handlers::public::list_choices,
        handlers::public::get_summary,
        handlers::account::my_tickets,
        handlers::account::reassign_my_tickets,
        handlers::hooks::checkout_item,
        handlers::hooks::order_status_changed,
        handlers::hooks::order_completed,
    ),
    components(
        schemas(
            Drawing,
            DrawingPost,
            ManualStatus,
            ReassignmentMode,
            UpdateDrawingMetaRequest,
            DrawingSummary,
            DrawingChoice,
            ProductLotteryConfig,
            DrawingStatusCode,
            DrawingStats,
            DrawingStatsView,
            StatsQuery,
            TicketStatus,
            TicketRecord,
            CustomerTicket,
            ReassignTicketRequest,
            ReassignBatchRequest,
            ReassignSkipped,
            ReassignBatchResponse,
            DistributionPreviewRequest,
            DistributionPreviewResponse,
            DrawRole,
            DrawStep,
            DrawWizardState,
            DrawWizardView,
            PrepareDrawRequest,
            CommitDrawRequest,
            DrawPreview,
            DrawWinner,
            DrawOptions,
            DrawReportBody,
            DrawReport,
            DrawHistoryWinner,
            DrawHistoryEntry,
            DrawReportVerification,
            DrawRoleMark,
            AuditEntry,
            Settings,
            UpdateSettingsRequest,
            CheckoutItemRequest,
            CheckoutItemResponse,
            OrderStatusChangedRequest,
            OrderStatusChangedResponse,
            OrderCompletedRequest,
            OrderCompletedResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "loterie", description = "Loterie administration API"),
        (name = "draw", description = "Manual draw wizard and reports API"),
        (name = "ticket", description = "Ticket reassignment API"),
        (name = "settings", description = "Plugin and product settings API"),
        (name = "public", description = "Public loterie API"),
        (name = "account", description = "Customer ticket API"),
        (name = "hooks", description = "Shop event hooks"),
    ),
    info(
        title = "Loterie Manager API",
        version = "1.0.0",
        description = "Loterie Manager REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

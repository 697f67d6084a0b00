pub mod audit_service;
pub mod draw_service;
pub mod drawing_service;
pub mod order_event_service;
pub mod reassignment_service;
pub mod settings_service;
pub mod ticket_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use audit_service::*;
pub use draw_service::*;
pub use drawing_service::*;
pub use order_event_service::*;
pub use reassignment_service::*;
pub use settings_service::*;
pub use ticket_service::*;

use crate::config::LoterieConfig;
use crate::store::Stores;

/// 全部服务，注入到 actix 的 app data 中
#[derive(Clone)]
pub struct AppServices {
    pub settings: SettingsService,
    pub audit: AuditService,
    pub drawings: DrawingService,
    pub tickets: TicketService,
    pub reassignment: ReassignmentService,
    pub draws: DrawService,
    pub order_events: OrderEventService,
}

impl AppServices {
    pub fn new(stores: Stores, config: &LoterieConfig) -> Self {
        let settings = SettingsService::new(stores.clone(), config.default_page_size);
        let audit = AuditService::new(stores.clone(), config.audit_log_limit);
        let drawings = DrawingService::new(stores.clone(), audit.clone());
        let tickets = TicketService::new(stores.clone(), settings.clone(), drawings.clone());
        let reassignment = ReassignmentService::new(
            stores.clone(),
            settings.clone(),
            drawings.clone(),
            tickets.clone(),
            audit.clone(),
        );
        let draws = DrawService::new(
            stores.clone(),
            drawings.clone(),
            tickets.clone(),
            audit.clone(),
            config.report_limit,
            config.draw_history_limit,
        );
        let order_events = OrderEventService::new(
            stores,
            settings.clone(),
            drawings.clone(),
            tickets.clone(),
            audit.clone(),
        );
        Self {
            settings,
            audit,
            drawings,
            tickets,
            reassignment,
            draws,
            order_events,
        }
    }
}

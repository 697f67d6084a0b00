pub mod actor;
pub mod audit;
pub mod draw;
pub mod drawing;
pub mod order;
pub mod pagination;
pub mod settings;
pub mod stats;
pub mod ticket;

pub use actor::*;
pub use audit::*;
pub use draw::*;
pub use drawing::*;
pub use order::*;
pub use pagination::*;
pub use settings::*;
pub use stats::*;
pub use ticket::*;

pub mod drawings;
pub mod entity_meta;
pub mod order_items;
pub mod orders;

pub use drawings as drawing_entity;
pub use entity_meta as entity_meta_entity;
pub use order_items as order_item_entity;
pub use orders as order_entity;

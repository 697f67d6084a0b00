//! 服务层测试夹具：内存存储 + 完整服务集合

use serde_json::{Value, json};
use std::sync::Arc;

use crate::config::LoterieConfig;
use crate::models::{
    Actor, ActorRole, CheckoutItemRequest, DrawingPost, Order, OrderItem, ProductLotteryConfig,
};
use crate::services::AppServices;
use crate::store::{MemoryStore, MetaScope, MetaStore, OrderRepository, Stores, keys};

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub services: AppServices,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let services = AppServices::new(Stores::from_backend(store.clone()), &LoterieConfig::default());
        Self { store, services }
    }

    pub async fn drawing(&self, id: i64, title: &str, capacity: i64) {
        self.store
            .put_drawing(DrawingPost {
                id,
                title: title.to_string(),
                post_status: "publish".to_string(),
            })
            .unwrap();
        self.store
            .set(MetaScope::Drawing, id, keys::TICKET_CAPACITY, json!(capacity))
            .await
            .unwrap();
    }

    /// items: (item_id, quantity, total_cents, tax_cents)
    pub fn order(&self, id: i64, status: &str, customer_id: Option<i64>, items: &[(i64, i64, i64, i64)]) {
        self.store
            .put_order(Order {
                id,
                number: id.to_string(),
                status: status.to_string(),
                customer_id,
                billing_first_name: Some("Client".into()),
                billing_last_name: Some(id.to_string()),
                billing_email: Some(format!("client{id}@boutique.fr")),
                shipping_first_name: None,
                shipping_last_name: None,
                customer_display_name: None,
                created_at: chrono::Utc::now(),
                items: items
                    .iter()
                    .map(|&(item_id, quantity, total_cents, tax_cents)| OrderItem {
                        id: item_id,
                        order_id: id,
                        product_id: item_id,
                        name: format!("Produit {item_id}"),
                        quantity,
                        total_cents,
                        tax_cents,
                    })
                    .collect(),
            })
            .unwrap();
    }

    /// 结账写入；商品 id 与订单行 id 相同
    pub async fn checkout(&self, item_id: i64, allocation: i64, quantity: i64, selection: &[i64]) {
        self.services
            .drawings
            .save_product_config(
                item_id,
                &ProductLotteryConfig {
                    ticket_allocation: allocation,
                    target_lotteries: Vec::new(),
                },
            )
            .await
            .unwrap();
        self.services
            .order_events
            .record_checkout_item(&CheckoutItemRequest {
                item_id,
                product_id: item_id,
                quantity,
                selection: json!(selection),
            })
            .await
            .unwrap();
    }

    pub async fn item(&self, order_id: i64, item_id: i64) -> OrderItem {
        let order = self.store.find_order(order_id).await.unwrap().unwrap();
        order.item(item_id).cloned().unwrap()
    }

    pub async fn set_item_meta(&self, item_id: i64, key: &str, value: Value) {
        self.store
            .set(MetaScope::OrderItem, item_id, key, value)
            .await
            .unwrap();
    }

    pub async fn item_meta(&self, item_id: i64, key: &str) -> Option<Value> {
        self.store.get(MetaScope::OrderItem, item_id, key).await.unwrap()
    }

    pub async fn set_mode(&self, drawing_id: i64, mode: &str) {
        self.store
            .set(MetaScope::Drawing, drawing_id, keys::REASSIGNMENT_MODE, json!(mode))
            .await
            .unwrap();
    }

    pub async fn close(&self, drawing_id: i64) {
        self.store
            .set(MetaScope::Drawing, drawing_id, keys::END_DATE, json!("2020-01-01"))
            .await
            .unwrap();
    }
}

pub fn operator() -> Actor {
    Actor {
        id: 1,
        display_name: "Admin".into(),
        role: ActorRole::Administrator,
    }
}

pub fn customer(id: i64) -> Actor {
    Actor {
        id,
        display_name: format!("Client {id}"),
        role: ActorRole::Customer,
    }
}

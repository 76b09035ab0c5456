use std::sync::Arc;

use rust_decimal::Decimal;
use shared::{domain::Quantity, protocol::DraftRecord};
use storage::{DraftStore, Storage};

#[tokio::test]
async fn drafts_survive_reopening_the_database() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("data").join("configurator.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let record = DraftRecord {
        item_name: "Chariot".into(),
        item_image: "/bases/chariot.png".into(),
        quantity: Quantity::new(3),
        optional_accessories: Vec::new(),
        default_accessories: Vec::new(),
        total_price: Decimal::from(390),
        committed_at: None,
    };

    {
        let storage = Storage::new(&database_url).await.expect("open");
        let drafts = DraftStore::new(Arc::new(storage.clone()), "panier");
        drafts.append(&record).await.expect("append");
        storage.pool().close().await;
    }

    let storage = Storage::new(&database_url).await.expect("reopen");
    let drafts = DraftStore::new(Arc::new(storage), "panier");
    assert_eq!(drafts.read_all().await.expect("read"), vec![record]);
}

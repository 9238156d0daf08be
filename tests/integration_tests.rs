use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use category_guard::handlers::SessionUser;
use category_guard::handlers::category_handlers::{
    CategoryRequest, create_category_handler, delete_category_handler, list_categories_handler,
    update_category_handler,
};
use category_guard::handlers::security_handlers::{
    ConfirmIpRequest, check_ip_handler, confirm_ip_handler, ip_history_handler,
};
use category_guard::locks::KeyedLocks;
use category_guard::models::category::{CategoryPatch, CategoryRecord};
use category_guard::repositories::category_repository::{CategoryRepository, KvCategoryRepository};
use category_guard::repositories::ip_security_repository::KvIpSecurityRepository;
use category_guard::repositories::kv_store::{
    CATEGORIES_KEY, FileKeyValueStore, KeyValueStore, RepositoryError,
};
use category_guard::services::category_service::{
    CategoryService, CategoryServiceImpl, resolve_category_or_default,
};
use category_guard::services::ip_provider::IpAddressProvider;
use category_guard::services::ip_security_service::{IpSecurityService, IpSecurityServiceImpl};

/// Provider whose IP the test moves between "networks"
struct MovableIpProvider {
    ip: Mutex<String>,
}

impl MovableIpProvider {
    fn new(ip: &str) -> Self {
        Self {
            ip: Mutex::new(ip.to_string()),
        }
    }

    fn move_to(&self, ip: &str) {
        *self.ip.lock().unwrap() = ip.to_string();
    }
}

#[async_trait]
impl IpAddressProvider for MovableIpProvider {
    async fn current_ip(&self) -> Result<String, RepositoryError> {
        Ok(self.ip.lock().unwrap().clone())
    }
}

/// Test fixture wiring both services to one on-disk store
struct TestContext {
    _dir: TempDir,
    store: Arc<FileKeyValueStore>,
    ip_provider: Arc<MovableIpProvider>,
    category_service: Arc<dyn CategoryService>,
    ip_security_service: Arc<dyn IpSecurityService>,
}

impl TestContext {
    async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = Arc::new(FileKeyValueStore::new(dir.path().join("store")));
        store.initialize().await.expect("Failed to initialize store");

        let locks = Arc::new(KeyedLocks::new());
        let ip_provider = Arc::new(MovableIpProvider::new("85.100.10.1"));

        let category_service: Arc<dyn CategoryService> = Arc::new(CategoryServiceImpl::new(
            Arc::new(KvCategoryRepository::new(store.clone())),
            locks.clone(),
        ));
        let ip_security_service: Arc<dyn IpSecurityService> =
            Arc::new(IpSecurityServiceImpl::new(
                Arc::new(KvIpSecurityRepository::new(store.clone())),
                ip_provider.clone(),
                locks,
            ));

        Self {
            _dir: dir,
            store,
            ip_provider,
            category_service,
            ip_security_service,
        }
    }
}

fn request(name: &str, color: Option<&str>) -> CategoryRequest {
    CategoryRequest {
        name: name.to_string(),
        icon: None,
        color: color.map(str::to_string),
    }
}

#[tokio::test]
async fn test_built_ins_survive_corrupt_storage() {
    let ctx = TestContext::new().await;
    ctx.store
        .set(CATEGORIES_KEY, "{\"this is\": not json")
        .await
        .unwrap();

    let categories = ctx.category_service.get_effective_categories("u1").await;
    assert_eq!(categories.builtins.len(), 8);
    assert!(categories.custom.is_empty());

    // Writes refuse to replace a collection they could not read
    let result = ctx
        .category_service
        .add_category(
            "u1",
            CategoryPatch {
                name: Some("Pets".to_string()),
                ..CategoryPatch::default()
            },
        )
        .await;
    assert!(result.is_err());
    assert_eq!(
        ctx.store.get(CATEGORIES_KEY).await.unwrap().as_deref(),
        Some("{\"this is\": not json")
    );
}

#[tokio::test]
async fn test_override_flow_on_disk() {
    let ctx = TestContext::new().await;
    let alice = SessionUser::new("alice");
    let bob = SessionUser::new("bob");

    update_category_handler(
        ctx.category_service.as_ref(),
        Some(&alice),
        "food",
        request("Yemek", None),
    )
    .await
    .unwrap();
    update_category_handler(
        ctx.category_service.as_ref(),
        Some(&alice),
        "food",
        request("Yemek", Some("#4D96FF")),
    )
    .await
    .unwrap();

    let alice_view = list_categories_handler(ctx.category_service.as_ref(), Some(&alice))
        .await
        .unwrap();
    let food = &alice_view.builtins[0];
    assert_eq!(food.id, "food");
    assert_eq!(food.name, "Yemek");
    assert_eq!(food.color, "#4D96FF");
    assert_eq!(food.icon, "🍔");

    let bob_view = list_categories_handler(ctx.category_service.as_ref(), Some(&bob))
        .await
        .unwrap();
    assert_eq!(bob_view.builtins[0].name, "Gıda");

    // One stored override for (alice, food), no matter how often it was edited
    let stored = KvCategoryRepository::new(ctx.store.clone())
        .load_all()
        .await
        .unwrap();
    let overrides: Vec<&CategoryRecord> = stored
        .records
        .iter()
        .filter(|r| r.overrides("food"))
        .collect();
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides[0].id, "food_override_alice");
}

#[tokio::test]
async fn test_custom_category_lifecycle() {
    let ctx = TestContext::new().await;
    let alice = SessionUser::new("alice");
    let bob = SessionUser::new("bob");

    let pets = create_category_handler(
        ctx.category_service.as_ref(),
        Some(&alice),
        request("Pets", Some("#6BCB77")),
    )
    .await
    .unwrap();
    let bobs = create_category_handler(
        ctx.category_service.as_ref(),
        Some(&bob),
        request("Pets", None),
    )
    .await
    .unwrap();
    assert_ne!(pets, bobs);

    let error = update_category_handler(
        ctx.category_service.as_ref(),
        Some(&bob),
        &pets,
        request("Stolen", None),
    )
    .await
    .unwrap_err();
    assert_eq!(error.error, "forbidden");

    update_category_handler(
        ctx.category_service.as_ref(),
        Some(&alice),
        &pets,
        request("Evcil Hayvan", None),
    )
    .await
    .unwrap();

    let alice_view = list_categories_handler(ctx.category_service.as_ref(), Some(&alice))
        .await
        .unwrap();
    assert_eq!(alice_view.custom.len(), 1);
    assert_eq!(alice_view.custom[0].name, "Evcil Hayvan");
    assert_eq!(alice_view.custom[0].color, "#6BCB77");

    delete_category_handler(ctx.category_service.as_ref(), Some(&alice), &pets)
        .await
        .unwrap();

    let alice_view = list_categories_handler(ctx.category_service.as_ref(), Some(&alice))
        .await
        .unwrap();
    assert!(alice_view.custom.is_empty());
    assert_eq!(alice_view.builtins.len(), 8);

    // A spending entry still pointing at the deleted category shows as "other"
    let shown = resolve_category_or_default(&pets, &alice_view.into_vec());
    assert_eq!(shown.id, "other");

    let bob_view = list_categories_handler(ctx.category_service.as_ref(), Some(&bob))
        .await
        .unwrap();
    assert_eq!(bob_view.custom.len(), 1);
    assert_eq!(bob_view.custom[0].id, bobs);
}

#[tokio::test]
async fn test_ip_change_detection_flow() {
    let ctx = TestContext::new().await;
    let alice = SessionUser::new("alice");

    let first = check_ip_handler(ctx.ip_security_service.as_ref(), Some(&alice))
        .await
        .unwrap();
    assert!(!first.ip_changed);
    assert!(first.warning.is_none());

    let record = ip_history_handler(ctx.ip_security_service.as_ref(), Some(&alice))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.registered_ip, "85.100.10.1");
    assert_eq!(record.last_login_ip, "85.100.10.1");

    ctx.ip_provider.move_to("31.200.5.7");
    let moved = check_ip_handler(ctx.ip_security_service.as_ref(), Some(&alice))
        .await
        .unwrap();
    assert!(moved.ip_changed);
    let warning = moved.warning.unwrap();
    assert_eq!(warning.old_ip, "85.100.10.1");
    assert_eq!(warning.new_ip, "31.200.5.7");

    confirm_ip_handler(
        ctx.ip_security_service.as_ref(),
        Some(&alice),
        ConfirmIpRequest {
            ip: "31.200.5.7".to_string(),
        },
    )
    .await
    .unwrap();

    let confirmed = check_ip_handler(ctx.ip_security_service.as_ref(), Some(&alice))
        .await
        .unwrap();
    assert!(!confirmed.ip_changed);

    let record = ip_history_handler(ctx.ip_security_service.as_ref(), Some(&alice))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.registered_ip, "31.200.5.7");
    assert_eq!(record.change_history.len(), 1);
}

#[tokio::test]
async fn test_ip_history_bounded_on_disk() {
    let ctx = TestContext::new().await;
    let alice = SessionUser::new("alice");
    check_ip_handler(ctx.ip_security_service.as_ref(), Some(&alice))
        .await
        .unwrap();

    for i in 1..=15 {
        ctx.ip_provider.move_to(&format!("10.20.30.{}", i));
        let outcome = check_ip_handler(ctx.ip_security_service.as_ref(), Some(&alice))
            .await
            .unwrap();
        assert!(outcome.ip_changed);
    }

    let record = ctx
        .ip_security_service
        .get_history("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.change_history.len(), 10);
    assert_eq!(record.change_history[0].old_ip, "10.20.30.5");
    assert_eq!(record.change_history[9].new_ip, "10.20.30.15");
}

#[tokio::test]
async fn test_corrupt_ip_record_is_reported() {
    let ctx = TestContext::new().await;
    let alice = SessionUser::new("alice");
    ctx.store.set("ipSecurity_alice", "garbage").await.unwrap();

    let error = check_ip_handler(ctx.ip_security_service.as_ref(), Some(&alice))
        .await
        .unwrap_err();
    assert_eq!(error.error, "read_failed");
}

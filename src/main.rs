use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use category_guard::config::Config;
use category_guard::handlers::SessionUser;
use category_guard::handlers::category_handlers::list_categories_handler;
use category_guard::handlers::security_handlers::check_ip_handler;
use category_guard::locks::KeyedLocks;
use category_guard::repositories::category_repository::KvCategoryRepository;
use category_guard::repositories::ip_security_repository::KvIpSecurityRepository;
use category_guard::repositories::kv_store::{FileKeyValueStore, KeyValueStore};
use category_guard::services::category_service::{CategoryService, CategoryServiceImpl};
use category_guard::services::ip_provider::CachedIpProvider;
use category_guard::services::ip_security_service::{IpSecurityService, IpSecurityServiceImpl};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Open the local store
    let file_store = FileKeyValueStore::new(config.data_dir.clone());
    file_store.initialize().await?;
    let store: Arc<dyn KeyValueStore> = Arc::new(file_store);
    let locks = Arc::new(KeyedLocks::new());

    // Initialize services
    let category_service: Arc<dyn CategoryService> = Arc::new(CategoryServiceImpl::new(
        Arc::new(KvCategoryRepository::new(store.clone())),
        locks.clone(),
    ));
    let ip_security_service: Arc<dyn IpSecurityService> = Arc::new(IpSecurityServiceImpl::new(
        Arc::new(KvIpSecurityRepository::new(store.clone())),
        Arc::new(CachedIpProvider::new(store.clone(), locks.clone())),
        locks,
    ));

    let session = SessionUser::new(config.user_id.clone());
    tracing::info!("Signed in as {}", session.user_id);

    match check_ip_handler(ip_security_service.as_ref(), Some(&session)).await {
        Ok(outcome) => match outcome.warning {
            Some(warning) => println!(
                "⚠ {} ({} -> {})",
                warning.message, warning.old_ip, warning.new_ip
            ),
            None => println!("✓ Login location verified"),
        },
        Err(e) => println!("✗ {}", e.message),
    }

    let categories = list_categories_handler(category_service.as_ref(), Some(&session)).await?;

    println!("Categories for {}:", session.user_id);
    for category in categories.all() {
        let marker = if category.is_built_in() { "" } else { " (custom)" };
        println!(
            "  {} {} [{}] {}{}",
            category.icon, category.name, category.id, category.color, marker
        );
    }

    Ok(())
}

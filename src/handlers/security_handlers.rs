use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::handlers::common::{ErrorResponse, SessionUser};
use crate::models::ip_security::{IpCheckOutcome, IpSecurityRecord};
use crate::services::ip_security_service::IpSecurityService;
use crate::validation::validate_ip_address;

/// Request payload for trusting an IP address
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConfirmIpRequest {
    #[validate(custom(function = "validate_ip_address"))]
    pub ip: String,
}

/// Handler run right after sign-in.
///
/// Errors are returned rather than swallowed; the caller decides whether a
/// failed check blocks the login.
pub async fn check_ip_handler(
    ip_security_service: &dyn IpSecurityService,
    session: Option<&SessionUser>,
) -> Result<IpCheckOutcome, ErrorResponse> {
    let session = session.ok_or_else(|| ErrorResponse::session_required("verify login location"))?;

    ip_security_service
        .check_ip(&session.user_id)
        .await
        .map_err(|e| ErrorResponse::from_ip_security_error("verify login location", &e))
}

/// Handler for the login history screen
pub async fn ip_history_handler(
    ip_security_service: &dyn IpSecurityService,
    session: Option<&SessionUser>,
) -> Result<Option<IpSecurityRecord>, ErrorResponse> {
    let session = session.ok_or_else(|| ErrorResponse::session_required("load login history"))?;

    ip_security_service
        .get_history(&session.user_id)
        .await
        .map_err(|e| ErrorResponse::from_ip_security_error("load login history", &e))
}

/// Handler for the "this was me" action on an IP change warning
pub async fn confirm_ip_handler(
    ip_security_service: &dyn IpSecurityService,
    session: Option<&SessionUser>,
    request: ConfirmIpRequest,
) -> Result<(), ErrorResponse> {
    let session = session.ok_or_else(|| ErrorResponse::session_required("trust IP address"))?;
    request
        .validate()
        .map_err(|errors| ErrorResponse::validation(&errors))?;

    ip_security_service
        .confirm_ip(&session.user_id, &request.ip)
        .await
        .map_err(|e| ErrorResponse::from_ip_security_error("trust IP address", &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::KeyedLocks;
    use crate::repositories::ip_security_repository::KvIpSecurityRepository;
    use crate::repositories::kv_store::{CURRENT_IP_KEY, InMemoryKeyValueStore, KeyValueStore};
    use crate::services::ip_provider::CachedIpProvider;
    use crate::services::ip_security_service::IpSecurityServiceImpl;
    use std::sync::Arc;

    async fn ip_security_service(
        current_ip: &str,
    ) -> (Arc<InMemoryKeyValueStore>, Arc<dyn IpSecurityService>) {
        let store = Arc::new(InMemoryKeyValueStore::new());
        store.set(CURRENT_IP_KEY, current_ip).await.unwrap();
        let locks = Arc::new(KeyedLocks::new());

        let service: Arc<dyn IpSecurityService> = Arc::new(IpSecurityServiceImpl::new(
            Arc::new(KvIpSecurityRepository::new(store.clone())),
            Arc::new(CachedIpProvider::new(store.clone(), locks.clone())),
            locks,
        ));
        (store, service)
    }

    #[tokio::test]
    async fn test_check_ip_handler_warns_on_new_ip() {
        let (store, service) = ip_security_service("10.1.1.1").await;
        let session = SessionUser::new("u1");

        let first = check_ip_handler(service.as_ref(), Some(&session)).await.unwrap();
        assert!(!first.ip_changed);

        store.set(CURRENT_IP_KEY, "10.2.2.2").await.unwrap();
        let second = check_ip_handler(service.as_ref(), Some(&session)).await.unwrap();
        assert!(second.ip_changed);
        assert_eq!(second.warning.unwrap().old_ip, "10.1.1.1");
    }

    #[tokio::test]
    async fn test_confirm_ip_handler_rejects_malformed_ip() {
        let (_, service) = ip_security_service("10.1.1.1").await;
        let session = SessionUser::new("u1");
        check_ip_handler(service.as_ref(), Some(&session)).await.unwrap();

        let error = confirm_ip_handler(
            service.as_ref(),
            Some(&session),
            ConfirmIpRequest {
                ip: "not-an-ip".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(error.error, "validation_error");
    }

    #[tokio::test]
    async fn test_confirm_ip_handler_before_first_check() {
        let (_, service) = ip_security_service("10.1.1.1").await;
        let session = SessionUser::new("u1");

        let error = confirm_ip_handler(
            service.as_ref(),
            Some(&session),
            ConfirmIpRequest {
                ip: "10.1.1.1".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(error.error, "ip_record_not_found");
    }

    #[tokio::test]
    async fn test_ip_history_handler_requires_session() {
        let (_, service) = ip_security_service("10.1.1.1").await;

        let error = ip_history_handler(service.as_ref(), None).await.unwrap_err();
        assert_eq!(error.error, "session_required");
    }
}

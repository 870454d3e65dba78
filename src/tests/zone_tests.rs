//! tests/zone_tests.rs

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::services::zone_service::{normalize_zone_name, ZoneRouter};
    use crate::tests::support::{memory_store, tenant, FailingStore};

    #[test]
    fn normalizes_case_spaces_and_hyphens() {
        assert_eq!(normalize_zone_name("Porta Romana").as_deref(), Some("porta-romana"));
        assert_eq!(normalize_zone_name("  porta   romana ").as_deref(), Some("porta-romana"));
        assert_eq!(normalize_zone_name("PORTA-ROMANA").as_deref(), Some("porta-romana"));
        assert_eq!(normalize_zone_name("Navigli").as_deref(), Some("navigli"));
        assert_eq!(normalize_zone_name("   "), None);
    }

    #[actix_rt::test]
    async fn zone_variants_route_to_same_agent() {
        let store = memory_store().await;
        store
            .insert_tenant(&tenant("user-1", &[("porta-romana", "+393331234567")]))
            .await
            .unwrap();
        let router = ZoneRouter::new(store.clone());

        for zone in ["Porta Romana", "porta romana", "PORTA-ROMANA", " porta\tromana "] {
            assert_eq!(
                router.route(Some(zone), Some("user-1")).await.as_deref(),
                Some("whatsapp:+393331234567"),
                "zona {:?}",
                zone
            );
        }
    }

    #[actix_rt::test]
    async fn keeps_existing_channel_prefix() {
        let store = memory_store().await;
        store
            .insert_tenant(&tenant("user-1", &[("navigli", "whatsapp:+391112223333")]))
            .await
            .unwrap();
        let router = ZoneRouter::new(store.clone());

        assert_eq!(
            router.route(Some("Navigli"), Some("user-1")).await.as_deref(),
            Some("whatsapp:+391112223333")
        );
    }

    #[actix_rt::test]
    async fn unconfigured_or_missing_inputs_use_default() {
        let store = memory_store().await;
        store
            .insert_tenant(&tenant("user-1", &[("navigli", "+391112223333"), ("brera", "")]))
            .await
            .unwrap();
        let router = ZoneRouter::new(store.clone());

        assert_eq!(router.route(Some("Isola"), Some("user-1")).await, None);
        assert_eq!(router.route(Some("Brera"), Some("user-1")).await, None);
        assert_eq!(router.route(None, Some("user-1")).await, None);
        assert_eq!(router.route(Some("Non specificato"), Some("user-1")).await, None);
        assert_eq!(router.route(Some("Navigli"), None).await, None);
        assert_eq!(router.route(Some("Navigli"), Some("user-unknown")).await, None);
    }

    #[actix_rt::test]
    async fn store_errors_degrade_to_default() {
        let router = ZoneRouter::new(Arc::new(FailingStore));
        assert_eq!(router.route(Some("Navigli"), Some("user-1")).await, None);
    }
}

//! tests/cost_tests.rs

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use serde_json::{json, Value};

    use crate::models::call_model::{CallCompletion, LeadDetails};
    use crate::services::cost_service::CostService;
    use crate::services::function_service::FunctionRegistry;
    use crate::services::sqlite_store::SqliteStore;
    use crate::services::store::CallStore;
    use crate::tests::support::{memory_store, new_call, FailingStore};

    async fn finished_call(store: &SqliteStore, call_id: &str, days_ago: i64, duration: i64) {
        let started_at = Utc::now() - Duration::days(days_ago);
        store
            .create_call(&new_call(call_id, "+393330000000", started_at))
            .await
            .unwrap();
        store
            .complete_call(&CallCompletion {
                call_id: call_id.to_string(),
                customer_number: "+393330000000".to_string(),
                assistant_id: None,
                user_id: None,
                order_id: None,
                ended_at: started_at + Duration::seconds(duration),
                duration: Some(duration),
                ended_reason: "customer-ended-call".to_string(),
                transcript: None,
                structured_data: Default::default(),
                client_info: LeadDetails::default(),
            })
            .await
            .unwrap();
    }

    #[actix_rt::test]
    async fn estimates_current_month_only() {
        let store = memory_store().await;
        finished_call(&store, "call-1", 0, 600).await;
        finished_call(&store, "call-2", 0, 1200).await;
        finished_call(&store, "call-old", 40, 6000).await;
        let costs = CostService::new(store.clone(), 0.06, 100.0);

        let report = costs.check_monthly_costs().await.unwrap();

        assert_eq!(report.calls, 2);
        assert_eq!(report.total_duration_secs, 1800);
        assert!((report.estimated_cost_eur - 1.8).abs() < 1e-9);
        assert!(!report.over_threshold);
    }

    #[actix_rt::test]
    async fn flags_costs_over_threshold() {
        let store = memory_store().await;
        finished_call(&store, "call-1", 0, 1200).await;
        let costs = CostService::new(store.clone(), 0.06, 1.0);

        assert!(costs.check_monthly_costs().await.unwrap().over_threshold);
    }

    #[actix_rt::test]
    async fn store_errors_yield_no_report() {
        let costs = CostService::new(Arc::new(FailingStore), 0.06, 100.0);
        assert!(costs.check_monthly_costs().await.is_none());
    }

    #[test]
    fn registry_invokes_registered_functions() {
        let mut registry = FunctionRegistry::with_defaults();
        registry.register("echo", |params: &Value| params.clone());

        assert_eq!(
            registry.invoke("echo", &json!({ "a": 1 })),
            Some(json!({ "a": 1 }))
        );
        assert_eq!(
            registry.invoke("check_availability", &Value::Null),
            Some(json!({
                "available": true,
                "message": "Abbiamo 3 appartamenti disponibili in quella zona"
            }))
        );
        assert_eq!(registry.invoke("book_visit", &Value::Null), None);
    }
}

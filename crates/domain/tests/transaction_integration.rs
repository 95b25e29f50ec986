//! Integration tests for the Transaction aggregate.
//!
//! These tests verify the full transaction lifecycle including event
//! persistence, publish rollback, and concurrent duplicate callbacks.

use std::sync::Arc;

use common::{AggregateId, SiteId};
use domain::{
    AbortTransaction, Aggregate, ApplyBillerResponse, BillerChargeSettings, BillerName,
    BillerResponse, ChargeInformation, Currency, DomainError, DomainEventPublisher,
    DomainEventSubscriber, InMemoryRepository, Money, NewCancelRebill, NewChargeTransaction,
    NewRebillUpdate, NewSale, PaymentType, PersistDomainEventSubscriber, PublishError,
    RebillSchedule, RecordRequest, RocketgateSettings, SaleCharge, Status, Transaction,
    TransactionError, TransactionEvent, TransactionService, TransactionType, UpdateExisting,
    UpdateSubsequentOperationFields,
};
use event_store::{EventQuery, EventStore, EventStoreExt, InMemoryEventStore, Version};
use serde_json::{Map, Value};

type Service = TransactionService<InMemoryRepository<Transaction>>;

/// Helper to create a test transaction service wired to an event store
fn create_service() -> (Service, InMemoryEventStore) {
    let store = InMemoryEventStore::new();
    let mut publisher: DomainEventPublisher<TransactionEvent> = DomainEventPublisher::new();
    publisher.subscribe(Arc::new(PersistDomainEventSubscriber::new(store.clone())));
    let service = TransactionService::new(InMemoryRepository::new(), Arc::new(publisher));
    (service, store)
}

fn settings() -> BillerChargeSettings {
    BillerChargeSettings::Rocketgate(RocketgateSettings::new("1000", "secret"))
}

fn one_off_charge() -> ChargeInformation {
    ChargeInformation::new(Money::from_cents(1497), Currency::new("USD"), 30)
}

fn charge_command(site_id: SiteId) -> NewChargeTransaction {
    NewChargeTransaction::new(
        site_id,
        BillerName::Rocketgate,
        PaymentType::Cc,
        one_off_charge(),
        settings(),
    )
    .with_payment_method("visa")
}

async fn pending_transaction(service: &Service) -> AggregateId {
    let cmd = charge_command(SiteId::new());
    let id = cmd.transaction_id;
    service.create_charge(cmd).await.unwrap();
    id
}

mod transaction_lifecycle {
    use super::*;

    #[tokio::test]
    async fn declined_charge_then_duplicate_response() {
        let (service, store) = create_service();
        let site_id = SiteId::new();

        let cmd = charge_command(site_id);
        let id = cmd.transaction_id;
        let result = service.create_charge(cmd).await.unwrap();
        assert_eq!(result.aggregate.status(), Status::Pending);
        assert_eq!(result.aggregate.site_id(), Some(site_id));
        assert_eq!(result.new_version, Version::first());

        let result = service
            .apply_biller_response(ApplyBillerResponse::new(
                id,
                BillerResponse::declined(
                    r#"{"merchantID": "1000", "amount": "14.97"}"#,
                    r#"{"reasonCode": "X", "bankResponseCode": "0"}"#,
                )
                .with_code("X"),
            ))
            .await
            .unwrap();
        assert_eq!(result.aggregate.status(), Status::Declined);

        for response in [
            BillerResponse::declined("{}", "{}"),
            BillerResponse::approved("{}", "{}"),
        ] {
            let again = service
                .apply_biller_response(ApplyBillerResponse::new(id, response))
                .await;
            assert!(matches!(
                again,
                Err(DomainError::Transaction(
                    TransactionError::AlreadyProcessed { .. }
                ))
            ));
        }

        let transaction = service.get_transaction(id).await.unwrap().unwrap();
        assert_eq!(transaction.status(), Status::Declined);
        assert_eq!(transaction.interactions().len(), 2);
        assert_eq!(transaction.version(), Version::new(2));
        assert_eq!(store.event_count().await, 2);
    }

    #[tokio::test]
    async fn three_d_challenge_then_completion() {
        let (service, store) = create_service();
        let id = pending_transaction(&service).await;

        let result = service
            .apply_biller_response(ApplyBillerResponse::new(
                id,
                BillerResponse::pending(
                    r#"{"use3DSecure": "TRUE"}"#,
                    r#"{"reasonCode": "202", "_3DSECURE_STEP_UP_URL": "https://acs/step-up",
                        "_3DSECURE_STEP_UP_JWT": "jwt", "cardHash": "initial-hash"}"#,
                ),
            ))
            .await
            .unwrap();
        assert_eq!(result.aggregate.status(), Status::Pending);
        let artifacts = result.aggregate.artifacts().unwrap();
        assert_eq!(
            artifacts.three_d.step_up_url.as_deref(),
            Some("https://acs/step-up")
        );

        let result = service
            .update_existing(UpdateExisting::new(
                id,
                BillerResponse::approved(
                    r#"{"PARES": "abc"}"#,
                    r#"{"reasonCode": "0", "cardHash": "final-hash"}"#,
                ),
            ))
            .await
            .unwrap();

        let transaction = result.aggregate;
        assert_eq!(transaction.status(), Status::Approved);
        assert_eq!(
            transaction.artifacts().unwrap().card_hash.as_deref(),
            Some("final-hash")
        );
        let summary = transaction.three_d_secure_summary().unwrap();
        assert!(summary.requested);
        assert!(summary.challenged);
        assert_eq!(transaction.biller_transactions().unwrap().len(), 2);

        let types = store.event_types_for_aggregate(id).await.unwrap();
        assert_eq!(
            types,
            vec![
                "TransactionCreated",
                "AuthenticationRequested",
                "StatusUpdated"
            ]
        );
    }

    #[tokio::test]
    async fn completion_of_finished_transaction_is_rejected() {
        let (service, _) = create_service();
        let id = pending_transaction(&service).await;
        service
            .apply_biller_response(ApplyBillerResponse::new(
                id,
                BillerResponse::approved("{}", "{}"),
            ))
            .await
            .unwrap();

        let result = service
            .update_existing(UpdateExisting::new(
                id,
                BillerResponse::approved("{}", "{}"),
            ))
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Transaction(
                TransactionError::PreviousTransactionShouldBePending {
                    status: Status::Approved
                }
            ))
        ));
    }

    #[tokio::test]
    async fn abort_records_synthetic_interaction() {
        let (service, _) = create_service();
        let id = pending_transaction(&service).await;

        let result = service
            .abort(AbortTransaction::new(id, "circuit breaker open"))
            .await
            .unwrap();

        let transaction = result.aggregate;
        assert_eq!(transaction.status(), Status::Aborted);
        assert_eq!(transaction.interactions().len(), 1);
        assert!(transaction.interactions()[0].payload().is_none());
        let exchange = transaction.latest_exchange();
        assert!(exchange.request.is_none());
        assert!(exchange.response.is_some());
    }

    #[tokio::test]
    async fn rebill_update_and_cancel_reference_previous_charge() {
        let (service, _) = create_service();
        let previous = pending_transaction(&service).await;

        let update = NewRebillUpdate::new(
            previous,
            SiteId::new(),
            BillerName::Rocketgate,
            PaymentType::Cc,
            ChargeInformation::new(Money::from_cents(100), Currency::new("EUR"), 3)
                .with_rebill(RebillSchedule::new(Money::from_cents(2999), 30, 3)),
            settings(),
        );
        let result = service.create_rebill_update(update).await.unwrap();
        assert_eq!(
            result.aggregate.transaction_type(),
            TransactionType::RebillUpdate
        );
        assert_eq!(result.aggregate.previous_transaction_id(), Some(previous));

        let cancel = NewCancelRebill::new(
            previous,
            SiteId::new(),
            BillerName::Rocketgate,
            PaymentType::Cc,
            settings(),
        );
        let result = service.create_cancel_rebill(cancel).await.unwrap();
        assert_eq!(
            result.aggregate.transaction_type(),
            TransactionType::CancelRebill
        );
        assert!(result.aggregate.charge().is_none());
    }

    #[tokio::test]
    async fn subsequent_operation_fields_accumulate() {
        let (service, _) = create_service();
        let id = pending_transaction(&service).await;

        service
            .record_request(RecordRequest::new(id, r#"{"use3DSecure": "FALSE"}"#))
            .await
            .unwrap();

        let mut fields = Map::new();
        fields.insert("memberId".to_string(), Value::from("member-1"));
        service
            .update_subsequent_operation_fields(UpdateSubsequentOperationFields::new(id, fields))
            .await
            .unwrap();

        let mut handles = Map::new();
        handles.insert("guidNo".to_string(), Value::from("guid-9"));
        let result = service
            .apply_biller_response(ApplyBillerResponse::new(
                id,
                BillerResponse::approved("{}", r#"{"guidNo": "guid-9"}"#)
                    .with_subsequent_operation_fields(handles),
            ))
            .await
            .unwrap();

        let fields = result.aggregate.subsequent_operation_fields();
        assert_eq!(fields.get("memberId"), Some(&Value::from("member-1")));
        assert_eq!(fields.get("guidNo"), Some(&Value::from("guid-9")));
        assert_eq!(result.new_version, Version::new(4));
    }
}

mod sale {
    use super::*;

    #[tokio::test]
    async fn sale_creates_main_then_cross_sales() {
        let (service, store) = create_service();
        let site_id = SiteId::new();
        let cross_site = SiteId::new();

        let cmd = NewSale::new(
            site_id,
            BillerName::Rocketgate,
            PaymentType::Cc,
            vec![
                SaleCharge::main(one_off_charge()),
                SaleCharge::cross_sale(cross_site, one_off_charge()),
            ],
            settings(),
        )
        .unwrap();

        let results = service.create_sale(cmd).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].aggregate.site_id(), Some(site_id));
        assert_eq!(results[1].aggregate.site_id(), Some(cross_site));
        assert_eq!(store.event_count().await, 2);
    }

    #[tokio::test]
    async fn sale_without_main_purchase_is_rejected() {
        let result = NewSale::new(
            SiteId::new(),
            BillerName::Rocketgate,
            PaymentType::Cc,
            vec![SaleCharge::cross_sale(SiteId::new(), one_off_charge())],
            settings(),
        );
        assert!(matches!(result, Err(TransactionError::MainPurchaseNotFound)));
    }

    #[tokio::test]
    async fn sale_with_two_main_purchases_is_rejected() {
        let result = NewSale::new(
            SiteId::new(),
            BillerName::Rocketgate,
            PaymentType::Cc,
            vec![
                SaleCharge::main(one_off_charge()),
                SaleCharge::main(one_off_charge()),
            ],
            settings(),
        );
        assert!(matches!(
            result,
            Err(TransactionError::MoreThanOneMainPurchase { count: 2 })
        ));
    }
}

mod durability {
    use super::*;

    #[tokio::test]
    async fn events_are_appended_in_operation_order() {
        let (service, store) = create_service();
        let id = pending_transaction(&service).await;

        service
            .record_request(RecordRequest::new(id, "{}"))
            .await
            .unwrap();
        service
            .update_subsequent_operation_fields(UpdateSubsequentOperationFields::new(
                id,
                Map::new(),
            ))
            .await
            .unwrap();
        service
            .apply_biller_response(ApplyBillerResponse::new(
                id,
                BillerResponse::approved("{}", "{}"),
            ))
            .await
            .unwrap();

        let types = store.event_types_for_aggregate(id).await.unwrap();
        assert_eq!(
            types,
            vec![
                "TransactionCreated",
                "BillerInteractionAdded",
                "SubsequentOperationFieldsUpdated",
                "StatusUpdated",
            ]
        );

        let status_events = store
            .query_events(EventQuery::for_aggregate(id).event_type("StatusUpdated"))
            .await
            .unwrap();
        assert_eq!(status_events.len(), 1);
        assert_eq!(status_events[0].payload["type"], "StatusUpdated");
        assert_eq!(status_events[0].payload["data"]["status"], "Approved");
    }

    #[tokio::test]
    async fn persistence_failure_fails_the_operation() {
        let (service, store) = create_service();
        let id = pending_transaction(&service).await;
        store.set_fail_on_append(true);

        let result = service
            .apply_biller_response(ApplyBillerResponse::new(
                id,
                BillerResponse::approved("{}", "{}"),
            ))
            .await;

        assert!(matches!(result, Err(DomainError::Publish(_))));
        assert_eq!(result.unwrap_err().public_message(), "Internal error");

        let transaction = service.get_transaction(id).await.unwrap().unwrap();
        assert_eq!(transaction.status(), Status::Pending);
        assert!(transaction.interactions().is_empty());
        assert_eq!(transaction.version(), Version::first());
    }

    /// Rejects every status change.
    struct StatusGate;

    #[async_trait::async_trait]
    impl DomainEventSubscriber<TransactionEvent> for StatusGate {
        fn name(&self) -> &'static str {
            "status_gate"
        }

        fn is_subscribed_to(&self, event: &TransactionEvent) -> bool {
            matches!(event, TransactionEvent::StatusUpdated(_))
        }

        async fn handle(&self, _event: &TransactionEvent) -> Result<(), PublishError> {
            Err(PublishError::Subscriber {
                subscriber: "status_gate",
                message: "status changes are closed".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn failing_subscriber_after_persistence_records_nothing() {
        let store = InMemoryEventStore::new();
        let mut publisher: DomainEventPublisher<TransactionEvent> = DomainEventPublisher::new();
        publisher.subscribe(Arc::new(PersistDomainEventSubscriber::new(store.clone())));
        publisher.subscribe(Arc::new(StatusGate));
        let service: Service =
            TransactionService::new(InMemoryRepository::new(), Arc::new(publisher));
        let id = pending_transaction(&service).await;

        let result = service
            .apply_biller_response(ApplyBillerResponse::new(
                id,
                BillerResponse::approved("{}", "{}"),
            ))
            .await;

        assert!(matches!(result, Err(DomainError::Publish(_))));
        let transaction = service.get_transaction(id).await.unwrap().unwrap();
        assert_eq!(transaction.status(), Status::Pending);
        assert_eq!(transaction.version(), Version::first());
        assert_eq!(
            store.event_types_for_aggregate(id).await.unwrap(),
            vec!["TransactionCreated"]
        );
    }

    #[tokio::test]
    async fn failed_creation_leaves_nothing_behind() {
        let (service, store) = create_service();
        store.set_fail_on_append(true);
        let cmd = charge_command(SiteId::new());
        let id = cmd.transaction_id;

        assert!(service.create_charge(cmd).await.is_err());
        assert!(service.get_transaction(id).await.unwrap().is_none());
        assert!(!store.aggregate_exists(id).await.unwrap());
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn duplicate_postbacks_finalize_exactly_once() {
        let (service, store) = create_service();
        let service = Arc::new(service);
        let id = pending_transaction(&service).await;

        let mut handles = Vec::new();
        for outcome in [true, false, true, false] {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let response = if outcome {
                    BillerResponse::approved("{}", "{}")
                } else {
                    BillerResponse::declined("{}", "{}")
                };
                service
                    .apply_biller_response(ApplyBillerResponse::new(id, response))
                    .await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(DomainError::Transaction(TransactionError::AlreadyProcessed { .. })) => {}
                Err(DomainError::Repository(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(accepted, 1);
        let transaction = service.get_transaction(id).await.unwrap().unwrap();
        assert!(transaction.status().is_terminal());
        assert_eq!(transaction.interactions().len(), 2);
        assert_eq!(transaction.version(), Version::new(2));
        assert_eq!(store.event_count().await, 2);
    }
}

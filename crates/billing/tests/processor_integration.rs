//! Integration tests for the transaction processor.
//!
//! These tests drive transactions through gateways backed by in-memory
//! biller clients, checking the Aborted path, classification, sales and
//! rebill operations end to end.

use std::sync::Arc;
use std::time::Duration;

use billing::{
    BillerOperation, CancelRebillRequest, ChargeRequest, CompleteThreeDRequest, GatewayConfig,
    InMemoryBillerClient, PostbackRequest, ProcessorBuilder, ProcessorError, RebillUpdateRequest,
    SaleRequest, TransactionProcessor,
};
use classification::{ClassificationRecord, InMemoryClassificationTable, MappingCriteria};
use common::{AggregateId, BreakerSettings, SiteId};
use domain::{
    BillerChargeSettings, BillerName, BillerResponse, ChargeInformation, Currency, DomainError,
    InMemoryRepository, Money, PaymentType, RebillSchedule, RocketgateSettings, SaleCharge,
    Status, Transaction, TransactionError, TransactionType,
};
use event_store::{EventStoreExt, InMemoryEventStore};
use serde_json::{Map, Value};

type Processor = TransactionProcessor<InMemoryRepository<Transaction>>;

struct Harness {
    processor: Processor,
    store: InMemoryEventStore,
    client: InMemoryBillerClient,
    table: InMemoryClassificationTable,
}

fn harness_with(config: GatewayConfig) -> Harness {
    let store = InMemoryEventStore::new();
    let client = InMemoryBillerClient::new(BillerName::Rocketgate);
    let table = InMemoryClassificationTable::new();
    let processor = ProcessorBuilder::new(config)
        .with_client(Arc::new(client.clone()))
        .with_classification_lookup(Arc::new(table.clone()))
        .with_event_store(store.clone())
        .build(InMemoryRepository::new());

    Harness {
        processor,
        store,
        client,
        table,
    }
}

fn harness() -> Harness {
    harness_with(GatewayConfig::default())
}

fn settings() -> BillerChargeSettings {
    BillerChargeSettings::Rocketgate(RocketgateSettings::new("1000", "secret"))
}

fn one_off() -> ChargeInformation {
    ChargeInformation::new(Money::from_cents(1497), Currency::new("USD"), 30)
}

fn charge_request() -> ChargeRequest {
    ChargeRequest::new(
        SiteId::new(),
        BillerName::Rocketgate,
        PaymentType::Cc,
        one_off(),
        settings(),
    )
    .with_payment_method("visa")
}

mod charge {
    use super::*;

    #[tokio::test]
    async fn approved_charge_is_persisted() {
        let h = harness();

        let view = h.processor.charge(charge_request()).await.unwrap();

        assert_eq!(view.status, Status::Approved);
        assert_eq!(view.transaction_type, TransactionType::Charge);
        assert_eq!(view.payment_method.as_deref(), Some("visa"));
        assert!(view.error_classification.is_none());
        assert_eq!(h.client.call_count().await, 1);

        let types = h
            .store
            .event_types_for_aggregate(view.transaction_id)
            .await
            .unwrap();
        assert_eq!(types, vec!["TransactionCreated", "StatusUpdated"]);
    }

    #[tokio::test]
    async fn unreadable_reply_still_reports_the_committed_outcome() {
        let h = harness();
        h.client
            .push_reply(BillerResponse::approved("{}", "<xml>ok</xml>"))
            .await;

        let view = h.processor.charge(charge_request()).await.unwrap();

        assert_eq!(view.status, Status::Approved);
        assert!(view.card_hash.is_none());
        let found = h.processor.find(view.transaction_id).await.unwrap().unwrap();
        assert_eq!(found.status, Status::Approved);
        assert_eq!(h.store.event_count().await, 2);
    }

    #[tokio::test]
    async fn unmapped_decline_then_duplicate_postback() {
        let h = harness();
        h.client
            .push_reply(
                BillerResponse::declined(
                    r#"{"merchantID": "1000"}"#,
                    r#"{"reasonCode": "X", "bankResponseCode": "0"}"#,
                )
                .with_code("X"),
            )
            .await;

        let view = h.processor.charge(charge_request()).await.unwrap();

        assert_eq!(view.status, Status::Declined);
        let classification = view.error_classification.unwrap();
        assert_eq!(classification.group_decline, "9999");
        assert_eq!(classification.error_type, "Error");
        assert_eq!(classification.group_message, "Generic decline");
        assert_eq!(classification.recommended_action, "Contact support");

        for response in [
            BillerResponse::declined("{}", "{}"),
            BillerResponse::approved("{}", "{}"),
        ] {
            let result = h
                .processor
                .apply_postback(PostbackRequest::new(view.transaction_id, response))
                .await;
            assert!(matches!(
                result,
                Err(ProcessorError::Domain(DomainError::Transaction(
                    TransactionError::AlreadyProcessed { .. }
                )))
            ));
        }

        let found = h.processor.find(view.transaction_id).await.unwrap().unwrap();
        assert_eq!(found.status, Status::Declined);
        assert_eq!(h.store.event_count().await, 2);
    }

    #[tokio::test]
    async fn mapped_decline_uses_table_row() {
        let h = harness();
        h.table
            .insert(
                MappingCriteria::Rocketgate {
                    merchant_id: "1000".to_string(),
                    reason_code: "105".to_string(),
                    bank_response_code: "51".to_string(),
                },
                ClassificationRecord::new("105", "Soft", "Insufficient funds", "Retry later"),
            )
            .await;
        h.client
            .push_reply(BillerResponse::declined(
                r#"{"merchantID": "1000"}"#,
                r#"{"reasonCode": "105", "bankResponseCode": "51"}"#,
            ))
            .await;

        let view = h.processor.charge(charge_request()).await.unwrap();

        let classification = view.error_classification.unwrap();
        assert_eq!(classification.group_message, "Insufficient funds");
    }

    #[tokio::test]
    async fn unknown_biller_creates_nothing() {
        let h = harness();
        let request = ChargeRequest::new(
            SiteId::new(),
            BillerName::Epoch,
            PaymentType::Cc,
            one_off(),
            settings(),
        );

        let result = h.processor.charge(request).await;

        assert!(matches!(
            result,
            Err(ProcessorError::UnknownBiller(BillerName::Epoch))
        ));
        assert_eq!(h.store.event_count().await, 0);
        assert_eq!(h.client.call_count().await, 0);
    }

    #[tokio::test]
    async fn invalid_charge_is_rejected_before_dispatch() {
        let h = harness();
        let request = ChargeRequest::new(
            SiteId::new(),
            BillerName::Rocketgate,
            PaymentType::Cc,
            ChargeInformation::new(Money::from_cents(0), Currency::new("usd"), 30),
            settings(),
        );

        let error = h.processor.charge(request).await.unwrap_err();

        assert!(error.is_rejection());
        assert!(error.public_message().contains("amount"));
        assert_eq!(h.client.call_count().await, 0);
    }
}

mod unavailable {
    use super::*;

    fn fragile() -> GatewayConfig {
        GatewayConfig {
            breaker: BreakerSettings::new(1, Duration::from_secs(60)),
            ..GatewayConfig::default()
        }
    }

    #[tokio::test]
    async fn open_breaker_aborts_without_calling_biller() {
        let h = harness_with(fragile());
        h.client.push_failure("connection refused").await;

        let first = h.processor.charge(charge_request()).await.unwrap();
        assert_eq!(first.status, Status::Aborted);
        assert_eq!(h.client.call_count().await, 1);

        let second = h.processor.charge(charge_request()).await.unwrap();
        assert_eq!(second.status, Status::Aborted);
        assert_eq!(h.client.call_count().await, 1);

        let classification = second.error_classification.unwrap();
        assert!(classification.is_default());
        assert!(classification.criteria.unwrap().is_empty());

        assert!(!h
            .processor
            .gateways()
            .get(BillerName::Rocketgate)
            .unwrap()
            .is_available());
    }

    #[tokio::test]
    async fn timeout_aborts() {
        let h = harness_with(GatewayConfig {
            biller_timeout: Duration::from_millis(10),
            ..GatewayConfig::default()
        });
        h.client.set_delay(Duration::from_millis(200)).await;

        let view = h.processor.charge(charge_request()).await.unwrap();

        assert_eq!(view.status, Status::Aborted);
        let transaction = h
            .processor
            .service()
            .get_transaction(view.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert!(transaction.response_reason().unwrap().contains("timed out"));
    }
}

mod sale {
    use super::*;

    fn sale_request() -> SaleRequest {
        SaleRequest::new(
            SiteId::new(),
            BillerName::Rocketgate,
            PaymentType::Cc,
            vec![
                SaleCharge::cross_sale(SiteId::new(), one_off()),
                SaleCharge::main(one_off()),
                SaleCharge::cross_sale(SiteId::new(), one_off()),
            ],
            settings(),
        )
    }

    #[tokio::test]
    async fn approved_main_sends_cross_sales() {
        let h = harness();

        let views = h.processor.sale(sale_request()).await.unwrap();

        assert_eq!(views.len(), 3);
        assert!(views.iter().all(|v| v.status == Status::Approved));
        assert_eq!(h.client.call_count().await, 3);
    }

    #[tokio::test]
    async fn declined_main_aborts_cross_sales() {
        let h = harness();
        h.client
            .push_reply(BillerResponse::declined("{}", r#"{"reasonCode": "105"}"#))
            .await;

        let views = h.processor.sale(sale_request()).await.unwrap();

        assert_eq!(views[0].status, Status::Declined);
        assert_eq!(views[1].status, Status::Aborted);
        assert_eq!(views[2].status, Status::Aborted);
        assert_eq!(h.client.call_count().await, 1);
    }

    #[tokio::test]
    async fn challenged_main_aborts_cross_sales() {
        let h = harness();
        h.client
            .push_reply(BillerResponse::pending(
                r#"{"use3DSecure": "TRUE"}"#,
                r#"{"reasonCode": "202", "_3DSECURE_STEP_UP_URL": "https://acs/step-up"}"#,
            ))
            .await;

        let views = h.processor.sale(sale_request()).await.unwrap();

        assert_eq!(views[0].status, Status::Pending);
        assert!(views[1..].iter().all(|v| v.status == Status::Aborted));
        assert_eq!(h.client.call_count().await, 1);
    }

    #[tokio::test]
    async fn sale_without_main_is_rejected() {
        let h = harness();
        let request = SaleRequest::new(
            SiteId::new(),
            BillerName::Rocketgate,
            PaymentType::Cc,
            vec![SaleCharge::cross_sale(SiteId::new(), one_off())],
            settings(),
        );

        let result = h.processor.sale(request).await;

        assert!(matches!(
            result,
            Err(ProcessorError::Domain(DomainError::Transaction(
                TransactionError::MainPurchaseNotFound
            )))
        ));
        assert_eq!(h.store.event_count().await, 0);
    }
}

mod three_d {
    use super::*;

    #[tokio::test]
    async fn challenge_then_completion() {
        let h = harness();
        h.client
            .push_reply(BillerResponse::pending(
                r#"{"use3DSecure": "TRUE"}"#,
                r#"{"reasonCode": "202", "_3DSECURE_STEP_UP_URL": "https://acs/step-up", "_3DSECURE_STEP_UP_JWT": "jwt"}"#,
            ))
            .await;
        h.client
            .push_reply(BillerResponse::approved(
                r#"{"PARES": "abc"}"#,
                r#"{"reasonCode": "0", "cardHash": "hash-2"}"#,
            ))
            .await;

        let pending = h.processor.charge(charge_request()).await.unwrap();
        assert_eq!(pending.status, Status::Pending);
        assert_eq!(
            pending.three_d.unwrap().step_up_url.as_deref(),
            Some("https://acs/step-up")
        );

        let mut fields = Map::new();
        fields.insert("PARES".to_string(), Value::from("abc"));
        let completed = h
            .processor
            .complete_three_d(CompleteThreeDRequest::new(pending.transaction_id, fields))
            .await
            .unwrap();

        assert_eq!(completed.status, Status::Approved);
        assert!(completed.three_d.is_none());
        assert_eq!(completed.card_hash.as_deref(), Some("hash-2"));

        let calls = h.client.calls().await;
        assert_eq!(calls[1].operation, BillerOperation::CompleteThreeD);
        assert_eq!(calls[1].payment["PARES"], "abc");

        let again = h
            .processor
            .complete_three_d(CompleteThreeDRequest::new(pending.transaction_id, Map::new()))
            .await;
        assert!(matches!(
            again,
            Err(ProcessorError::Domain(DomainError::Transaction(
                TransactionError::PreviousTransactionShouldBePending { .. }
            )))
        ));
        assert_eq!(h.client.call_count().await, 2);
    }

    #[tokio::test]
    async fn completion_of_unknown_transaction() {
        let h = harness();
        let id = AggregateId::new();

        let result = h
            .processor
            .complete_three_d(CompleteThreeDRequest::new(id, Map::new()))
            .await;

        assert!(matches!(result, Err(ProcessorError::TransactionNotFound(missing)) if missing == id));
    }
}

mod rebill {
    use super::*;

    fn handles() -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("guidNo".to_string(), Value::from("guid-1"));
        fields
    }

    fn new_schedule() -> ChargeInformation {
        ChargeInformation::new(Money::from_cents(100), Currency::new("USD"), 3)
            .with_rebill(RebillSchedule::new(Money::from_cents(2999), 30, 3))
    }

    #[tokio::test]
    async fn update_forwards_previous_handles() {
        let h = harness();
        h.client
            .push_reply(
                BillerResponse::approved("{}", r#"{"guidNo": "guid-1"}"#)
                    .with_subsequent_operation_fields(handles()),
            )
            .await;
        let previous = h.processor.charge(charge_request()).await.unwrap();

        let view = h
            .processor
            .update_rebill(RebillUpdateRequest::new(previous.transaction_id, new_schedule()))
            .await
            .unwrap();

        assert_eq!(view.status, Status::Approved);
        assert_eq!(view.transaction_type, TransactionType::RebillUpdate);
        assert_eq!(view.payment_method.as_deref(), Some("visa"));

        let calls = h.client.calls().await;
        let update = &calls[1];
        assert_eq!(update.operation, BillerOperation::RebillUpdate);
        assert_eq!(update.subsequent_operation_fields, handles());
        assert!(update.charge.as_ref().unwrap().rebill.is_some());
    }

    #[tokio::test]
    async fn cancel_requires_approved_previous() {
        let h = harness();
        h.client
            .push_reply(BillerResponse::declined("{}", "{}"))
            .await;
        let declined = h.processor.charge(charge_request()).await.unwrap();

        let result = h
            .processor
            .cancel_rebill(CancelRebillRequest::new(declined.transaction_id))
            .await;

        assert!(matches!(
            result,
            Err(ProcessorError::PreviousTransactionNotApproved {
                status: Status::Declined,
                ..
            })
        ));
        assert_eq!(h.client.call_count().await, 1);
    }

    #[tokio::test]
    async fn cancel_of_approved_charge() {
        let h = harness();
        let previous = h.processor.charge(charge_request()).await.unwrap();

        let view = h
            .processor
            .cancel_rebill(CancelRebillRequest::new(previous.transaction_id))
            .await
            .unwrap();

        assert_eq!(view.transaction_type, TransactionType::CancelRebill);
        assert_eq!(view.status, Status::Approved);
        let calls = h.client.calls().await;
        assert_eq!(calls[1].operation, BillerOperation::CancelRebill);
        assert!(calls[1].charge.is_none());
    }

    #[tokio::test]
    async fn missing_previous_transaction() {
        let h = harness();
        let id = AggregateId::new();

        let result = h
            .processor
            .update_rebill(RebillUpdateRequest::new(id, new_schedule()))
            .await;

        assert!(matches!(
            result,
            Err(ProcessorError::PreviousTransactionNotFound(missing)) if missing == id
        ));
        assert!(h.processor.find(id).await.unwrap().is_none());
    }
}

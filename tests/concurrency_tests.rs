use orderflow::application::reply::Reply;
use orderflow::domain::order::SettlementStatus;
use orderflow::domain::ports::Ledger;

mod common;

async fn paid_invoice(shop: &common::Shop, buyer: u64) -> orderflow::domain::order::InvoiceRef {
    shop.engine.start_purchase(buyer, "Shopify").await.unwrap();
    shop.engine.choose_variant(buyer, "USA").await.unwrap();
    shop.engine.submit_quantity(buyer, "3").await.unwrap();
    let Reply::Checkout { reference, .. } = shop.engine.pay_automated(buyer).await.unwrap() else {
        panic!("expected checkout");
    };
    assert!(shop.oracle.mark_paid(reference).await);
    reference
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_checks_deliver_once() {
    let shop = common::shop();
    let reference = paid_invoice(&shop, 42).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = shop.engine.clone();
            tokio::spawn(async move { engine.check_payment(42, reference).await.unwrap() })
        })
        .collect();

    let mut delivered = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Reply::Delivered { payload, .. } => {
                assert_eq!(payload.len(), 3);
                delivered += 1;
            }
            Reply::AlreadyDelivered { .. } => duplicates += 1,
            other => panic!("unexpected reply: {other:?}"),
        }
    }
    assert_eq!((delivered, duplicates), (1, 7));

    let orders = shop.ledger.all_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].total.to_string(), "30.00");
    assert!(shop.engine.delivered().contains(reference).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_buyers_progress_independently() {
    let shop = common::shop();
    let handles: Vec<_> = (100..120)
        .map(|buyer| {
            let engine = shop.engine.clone();
            tokio::spawn(async move {
                engine.start_purchase(buyer, "Amazon").await.unwrap();
                engine.choose_variant(buyer, "USA").await.unwrap();
                engine.submit_quantity(buyer, "1").await.unwrap();
                engine.confirm_manual_payment(buyer).await.unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let orders = shop.ledger.all_orders().await.unwrap();
    assert_eq!(orders.len(), 20);
    assert!(orders.iter().all(|o| o.status == SettlementStatus::Pending));
    let mut ids: Vec<u64> = orders.iter().map(|o| o.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_operator_confirms_credit_once() {
    let shop = common::shop();
    shop.engine.request_top_up(9, "15.50").await.unwrap();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let settlement = shop.settlement.clone();
            tokio::spawn(async move {
                settlement
                    .dispatch(common::OPERATOR, "topup_confirm_1_9")
                    .await
                    .is_ok()
            })
        })
        .collect();
    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(shop.ledger.balance(9).await.unwrap().to_string(), "15.50");
}

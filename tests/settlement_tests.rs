use orderflow::application::reply::Reply;
use orderflow::application::settlement::OperatorOutcome;
use orderflow::config::ShopConfig;
use orderflow::domain::catalog::Catalog;
use orderflow::domain::money::Balance;
use orderflow::domain::order::{SettlementMethod, SettlementStatus};
use orderflow::domain::ports::Ledger;
use orderflow::domain::session::Stage;
use orderflow::error::ShopError;
use orderflow::interfaces::csv::ledger_writer::LedgerWriter;
use rust_decimal_macros::dec;

mod common;

use common::OPERATOR;

#[tokio::test]
async fn test_manual_path_end_to_end() {
    let shop = common::shop();
    shop.engine.start_purchase(7, "Amazon").await.unwrap();
    shop.engine.choose_variant(7, "TURKEY").await.unwrap();
    shop.engine.submit_quantity(7, "2").await.unwrap();

    let Reply::WalletInstructions { address } = shop.engine.pay_manual(7).await.unwrap() else {
        panic!("expected wallet instructions");
    };
    assert!(!address.is_empty());

    let Reply::AwaitingConfirmation { order_id } =
        shop.engine.confirm_manual_payment(7).await.unwrap()
    else {
        panic!("expected pending order");
    };
    let session = shop.engine.session(7).await.unwrap().unwrap();
    assert_eq!(session.stage, Stage::AwaitingManualConfirmation);

    let order = shop.ledger.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, SettlementStatus::Pending);
    assert_eq!(order.method, SettlementMethod::ManualWallet);
    assert_eq!(order.total.to_string(), "30.00");

    let alert = &shop.outbox.sent_to(OPERATOR).await[0];
    let tokens: Vec<&str> = alert.actions.iter().map(|a| a.token.as_str()).collect();
    assert_eq!(tokens, vec!["issue_7", "reply_7"]);

    let outcome = shop.settlement.dispatch(OPERATOR, "issue_7").await.unwrap();
    assert!(matches!(outcome, OperatorOutcome::Issued { notified: true, .. }));
    let order = shop.ledger.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, SettlementStatus::Confirmed);
    let session = shop.engine.session(7).await.unwrap().unwrap();
    assert_eq!(session.stage, Stage::Fulfilled);

    let delivered = shop.outbox.sent_to(7).await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].text.matches("Geo: TURKEY").count(), 2);

    // a second issue finds nothing pending
    assert!(matches!(
        shop.settlement.dispatch(OPERATOR, "issue_7").await,
        Err(ShopError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_top_up_reject_leaves_balance() {
    let shop = common::shop();
    let Reply::TopUpRequested { top_up_id, .. } =
        shop.engine.request_top_up(9, "15.50").await.unwrap()
    else {
        panic!("expected top-up request");
    };

    let token = format!("topup_reject_{top_up_id}_9");
    shop.settlement.dispatch(OPERATOR, &token).await.unwrap();

    let top_up = shop.ledger.get_top_up(top_up_id).await.unwrap().unwrap();
    assert_eq!(top_up.status, SettlementStatus::Rejected);
    assert_eq!(shop.ledger.balance(9).await.unwrap().to_string(), "0.00");

    let confirm = format!("topup_confirm_{top_up_id}_9");
    assert!(matches!(
        shop.settlement.dispatch(OPERATOR, &confirm).await,
        Err(ShopError::AlreadySettled { .. })
    ));
    assert_eq!(shop.ledger.balance(9).await.unwrap().to_string(), "0.00");
}

#[tokio::test]
async fn test_top_up_confirm_twice_applies_once() {
    let shop = common::shop();
    shop.engine.request_top_up(9, "12.345").await.unwrap();

    shop.settlement
        .dispatch(OPERATOR, "topup_confirm_1_9")
        .await
        .unwrap();
    assert!(
        shop.settlement
            .dispatch(OPERATOR, "topup_confirm_1_9")
            .await
            .is_err()
    );
    // amounts round half away from zero
    assert_eq!(shop.ledger.balance(9).await.unwrap().to_string(), "12.35");

    let Reply::Profile { stats, .. } = shop.engine.profile(9).await.unwrap() else {
        panic!("expected profile");
    };
    assert_eq!(stats.top_ups_count, 1);
    assert_eq!(stats.balance.to_string(), "12.35");
}

#[tokio::test]
async fn test_support_round_trip() {
    let shop = common::shop();
    shop.engine.contact_support(5, "where is my order?").await.unwrap();
    let forwarded = &shop.outbox.sent_to(OPERATOR).await[0];
    assert!(forwarded.text.contains("where is my order?"));

    shop.settlement.dispatch(OPERATOR, "reply_5").await.unwrap();
    shop.settlement
        .operator_message(OPERATOR, "shipped")
        .await
        .unwrap();
    assert!(shop.outbox.sent_to(5).await[0].text.contains("shipped"));
}

#[tokio::test]
async fn test_hyphenated_category_keeps_variant() {
    let shop = common::shop_with(ShopConfig {
        catalog: Catalog::new().with_category("Apple-Music", [("UK", Balance::new(dec!(4.50)))]),
        operator_id: OPERATOR,
        cooldown_secs: 0,
        ..ShopConfig::default()
    });
    shop.engine.start_purchase(7, "Apple-Music").await.unwrap();
    shop.engine.choose_variant(7, "UK").await.unwrap();
    shop.engine.submit_quantity(7, "2").await.unwrap();
    shop.engine.pay_manual(7).await.unwrap();
    shop.engine.confirm_manual_payment(7).await.unwrap();

    let OperatorOutcome::Issued { payload, .. } =
        shop.settlement.dispatch(OPERATOR, "issue_7").await.unwrap()
    else {
        panic!("expected issue outcome");
    };
    assert_eq!(payload.len(), 2);
    assert!(payload.records.iter().all(|r| r.variant == "UK"));

    let orders = shop.ledger.all_orders().await.unwrap();
    assert_eq!(orders[0].item.category, "Apple-Music");
    assert_eq!(orders[0].item.variant, "UK");

    let mut out = Vec::new();
    LedgerWriter::new(&mut out).write_orders(&orders).unwrap();
    let report = String::from_utf8(out).unwrap();
    assert!(report.contains("Apple-Music-UK"));
}

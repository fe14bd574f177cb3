mod common;

use backoffice_api::{
    entities::{CartItem, Order, OrderItem, OrderStatus, Product, Role},
    errors::ServiceError,
};
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;

#[tokio::test]
async fn checkout_converts_cart_into_completed_order() {
    let app = TestApp::new().await;
    let shopper = app.create_user(Role::User).await;

    let donut = app.create_product("Donut", dec!(2.49), dec!(75.000)).await;
    let water = app.create_product("Water", dec!(1.00), dec!(50.000)).await;

    app.services
        .cart
        .add_item(&shopper, donut.id, dec!(3))
        .await
        .expect("add donuts");
    app.services
        .cart
        .add_item(&shopper, water.id, dec!(2))
        .await
        .expect("add water");

    let outcome = app
        .services
        .checkout
        .checkout(&shopper)
        .await
        .expect("checkout should succeed");

    assert_eq!(outcome.order.total, dec!(9.47));
    assert_eq!(outcome.order.item_count, 5);
    assert_eq!(outcome.order.status, OrderStatus::Completed);
    assert_eq!(outcome.order.user_name, shopper.name);
    assert_eq!(outcome.order.user_id, Some(shopper.id));

    assert_eq!(outcome.items.len(), 2);
    let mut item_totals: Vec<_> = outcome.items.iter().map(|i| i.item_total()).collect();
    item_totals.sort();
    assert_eq!(item_totals, vec![dec!(2.00), dec!(7.47)]);

    // cart is cleared
    let remaining = app
        .services
        .cart
        .get_cart(&shopper)
        .await
        .expect("get cart");
    assert!(remaining.is_empty());

    // stock decreased by the purchased quantities
    let donut_after = Product::find_by_id(donut.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    let water_after = Product::find_by_id(water.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(donut_after.stock, dec!(72.000));
    assert_eq!(water_after.stock, dec!(48.000));
}

#[tokio::test]
async fn checkout_on_empty_cart_fails_without_an_order() {
    let app = TestApp::new().await;
    let shopper = app.create_user(Role::User).await;

    let err = app.services.checkout.checkout(&shopper).await.unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
    assert_eq!(err.to_string(), "Validation error: Cart is empty");

    let orders = Order::find().all(&*app.db).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn checkout_snapshots_survive_product_edits() {
    let app = TestApp::new().await;
    let shopper = app.create_user(Role::User).await;
    let admin = app.create_user(Role::Admin).await;

    let cake = app.create_product("Cake", dec!(4.99), dec!(20.000)).await;
    app.services
        .cart
        .add_item(&shopper, cake.id, dec!(1))
        .await
        .unwrap();
    let outcome = app.services.checkout.checkout(&shopper).await.unwrap();

    // rename and reprice after the sale
    app.services
        .catalog
        .update_product(
            &admin,
            cake.id,
            backoffice_api::services::catalog::UpdateProductInput {
                name: Some("Birthday Cake".to_string()),
                price: Some(dec!(6.99)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let items = OrderItem::find().all(&*app.db).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_name, "Cake");
    assert_eq!(items[0].price, dec!(4.99));
    assert_eq!(items[0].order_id, outcome.order.id);
}

#[tokio::test]
async fn checkout_aborts_cleanly_when_stock_ran_out() {
    let app = TestApp::new().await;
    let first = app.create_user(Role::User).await;
    let second = app.create_user(Role::User).await;

    let bar = app.create_product("Chocolate Bar", dec!(2.49), dec!(5.000)).await;

    app.services
        .cart
        .add_item(&first, bar.id, dec!(4))
        .await
        .unwrap();
    app.services
        .cart
        .add_item(&second, bar.id, dec!(4))
        .await
        .unwrap();

    // first checkout drains the stock the second one was counting on
    app.services.checkout.checkout(&first).await.unwrap();

    let err = app.services.checkout.checkout(&second).await.unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // the failed checkout left nothing behind: one order, cart intact,
    // stock exactly as the first checkout left it
    let orders = Order::find().all(&*app.db).await.unwrap();
    assert_eq!(orders.len(), 1);

    let cart_rows = CartItem::find().all(&*app.db).await.unwrap();
    assert_eq!(cart_rows.len(), 1);
    assert_eq!(cart_rows[0].user_id, second.id);

    let bar_after = Product::find_by_id(bar.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bar_after.stock, dec!(1.000));
}

#[tokio::test]
async fn order_visibility_follows_stock_capability() {
    let app = TestApp::new().await;
    let shopper = app.create_user(Role::User).await;
    let other = app.create_user(Role::User).await;
    let moderator = app.create_user(Role::Moderator).await;

    let pop = app.create_product("Lollipop", dec!(1.99), dec!(10.000)).await;
    app.services
        .cart
        .add_item(&shopper, pop.id, dec!(1))
        .await
        .unwrap();
    let outcome = app.services.checkout.checkout(&shopper).await.unwrap();

    // owners and stock managers see the order
    assert_eq!(
        app.services
            .checkout
            .list_orders(&shopper)
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        app.services
            .checkout
            .list_orders(&moderator)
            .await
            .unwrap()
            .len(),
        1
    );

    // other plain users see neither the listing nor the order itself
    assert!(app
        .services
        .checkout
        .list_orders(&other)
        .await
        .unwrap()
        .is_empty());
    let err = app
        .services
        .checkout
        .get_order(&other, outcome.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

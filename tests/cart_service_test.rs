mod common;

use backoffice_api::{
    entities::{CartItem, Role},
    errors::ServiceError,
};
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use uuid::Uuid;

#[tokio::test]
async fn adding_same_product_twice_merges_into_one_row() {
    let app = TestApp::new().await;
    let shopper = app.create_user(Role::User).await;
    let gummies = app.create_product("Gummy Bears", dec!(3.49), dec!(100.000)).await;

    app.services
        .cart
        .add_item(&shopper, gummies.id, dec!(2))
        .await
        .unwrap();
    let merged = app
        .services
        .cart
        .add_item(&shopper, gummies.id, dec!(3))
        .await
        .unwrap();

    assert_eq!(merged.quantity, dec!(5.000));

    let rows = CartItem::find().all(&*app.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity, dec!(5.000));
}

#[tokio::test]
async fn merge_that_exceeds_stock_fails_and_keeps_the_row() {
    let app = TestApp::new().await;
    let shopper = app.create_user(Role::User).await;
    let cake = app.create_product("Cupcake", dec!(3.99), dec!(6.000)).await;

    app.services
        .cart
        .add_item(&shopper, cake.id, dec!(4))
        .await
        .unwrap();

    let err = app
        .services
        .cart
        .add_item(&shopper, cake.id, dec!(3))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    let rows = CartItem::find().all(&*app.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity, dec!(4.000));
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let app = TestApp::new().await;
    let shopper = app.create_user(Role::User).await;

    let err = app
        .services
        .cart
        .add_item(&shopper, Uuid::new_v4(), dec!(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn cart_total_tracks_live_prices() {
    let app = TestApp::new().await;
    let shopper = app.create_user(Role::User).await;
    let admin = app.create_user(Role::Admin).await;
    let waffle = app.create_product("Waffle", dec!(4.49), dec!(30.000)).await;

    app.services
        .cart
        .add_item(&shopper, waffle.id, dec!(2))
        .await
        .unwrap();
    assert_eq!(
        app.services.cart.cart_total(&shopper).await.unwrap(),
        dec!(8.98)
    );

    // reprice while the item sits in the cart; the total follows
    app.services
        .catalog
        .update_product(
            &admin,
            waffle.id,
            backoffice_api::services::catalog::UpdateProductInput {
                price: Some(dec!(5.00)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(
        app.services.cart.cart_total(&shopper).await.unwrap(),
        dec!(10.00)
    );
}

#[tokio::test]
async fn weighed_products_keep_fractional_quantities() {
    let app = TestApp::new().await;
    let shopper = app.create_user(Role::User).await;
    let bar = app
        .create_product_full("Chocolate Bar", Some("508"), dec!(2.49), dec!(120.000), true)
        .await;

    let item = app
        .services
        .cart
        .add_item(&shopper, bar.id, dec!(0.750))
        .await
        .unwrap();
    assert_eq!(item.quantity, dec!(0.750));

    let lines = app.services.cart.get_cart(&shopper).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product.unit_label(), "KGS");
    assert_eq!(lines[0].item_total(), dec!(1.8675));
}

#[tokio::test]
async fn setting_quantity_to_zero_removes_the_row() {
    let app = TestApp::new().await;
    let shopper = app.create_user(Role::User).await;
    let corn = app.create_product("Candy Corn", dec!(2.99), dec!(150.000)).await;

    app.services
        .cart
        .add_item(&shopper, corn.id, dec!(2))
        .await
        .unwrap();

    let updated = app
        .services
        .cart
        .update_item_quantity(&shopper, corn.id, dec!(0))
        .await
        .unwrap();
    assert!(updated.is_none());

    let rows = CartItem::find().all(&*app.db).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn removing_a_product_that_is_not_in_the_cart_fails() {
    let app = TestApp::new().await;
    let shopper = app.create_user(Role::User).await;
    let pop = app.create_product("Lollipop", dec!(1.99), dec!(200.000)).await;

    let err = app
        .services
        .cart
        .remove_item(&shopper, pop.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn carts_are_private_per_user() {
    let app = TestApp::new().await;
    let first = app.create_user(Role::User).await;
    let second = app.create_user(Role::User).await;
    let apple = app.create_product("Candy Apple", dec!(3.49), dec!(40.000)).await;

    app.services
        .cart
        .add_item(&first, apple.id, dec!(2))
        .await
        .unwrap();

    assert!(app
        .services
        .cart
        .get_cart(&second)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        app.services.cart.cart_total(&second).await.unwrap(),
        dec!(0)
    );
}

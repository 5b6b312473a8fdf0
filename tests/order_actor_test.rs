use actor_framework::mock::MockClient;
use actor_framework::{ActorClient, FrameworkError};
use checkout_engine::clients::{OrderClient, ProductClient};
use checkout_engine::model::{
    Address, CartId, CartOwner, ContactDetails, OrderLine, OrderPayload, OrderStatus, Product,
    ProductCreate, ProductId, ProductStatus, UserId, Variant, VariantId,
};
use checkout_engine::placement::{OrderService, OrderServiceError};
use checkout_engine::product_actor::{ProductActionResult, ProductError};
use checkout_engine::taxonomy::ErrorKind;
use testresult::TestResult;

fn variant(id: u32, stock: Option<u32>) -> Variant {
    Variant {
        id: VariantId(id),
        size: Some("M".into()),
        sku: None,
        price: 1_000,
        promotional_price: None,
        is_active: true,
        stock,
    }
}

fn product(id: u32) -> Product {
    Product {
        id: ProductId(id),
        name: format!("Product {id}"),
        status: ProductStatus::Active,
        image: None,
        variants: vec![variant(1, Some(10))],
    }
}

fn line(product: u32, quantity: u32) -> OrderLine {
    OrderLine {
        product_id: ProductId(product),
        variant_id: VariantId(1),
        quantity,
        price: 1_000,
        regular_price: 1_000,
        name: format!("Product {product}"),
        size: Some("M".into()),
        sku: None,
    }
}

fn payload(key: &str, lines: Vec<OrderLine>) -> OrderPayload {
    OrderPayload {
        idempotency_key: key.to_string(),
        owner: CartOwner::User(UserId("alice".into())),
        cart_id: CartId(1),
        contact: ContactDetails::default(),
        address: Address::default(),
        delivery_method_id: None,
        shop_id: None,
        payment_method_id: None,
        comment: None,
        lines,
        currency: "UAH".into(),
        subtotal: 0,
        delivery_fee: 0,
        tax: 0,
        total: 0,
    }
}

/// Real Order actor with a mocked catalog: the create hook checks then reserves each line.
#[tokio::test]
async fn test_order_actor_reserves_through_catalog() -> TestResult {
    let mut product_mock = MockClient::<Product>::new();
    product_mock.expect_get(ProductId(1)).return_ok(Some(product(1)));
    product_mock
        .expect_action(ProductId(1))
        .return_ok(ProductActionResult::Updated);

    let (order_actor, order_client) = checkout_engine::order_actor::new(10);
    let actor_handle = tokio::spawn(order_actor.run(ProductClient::new(product_mock.client())));
    let orders = OrderClient::new(order_client);

    let receipt = orders.create_order(payload("k-1", vec![line(1, 3)])).await?;
    assert_eq!(receipt.confirmation_ref, format!("CO-{:06}", receipt.order_id.0));
    assert_eq!(
        orders.order_status(receipt.order_id).await?,
        Some(OrderStatus::Pending)
    );
    product_mock.verify();

    drop(orders);
    actor_handle.await?;
    Ok(())
}

/// A reservation failing on the second line releases the first and rejects the order.
#[tokio::test]
async fn test_failed_reservation_releases_earlier_lines() -> TestResult {
    let mut product_mock = MockClient::<Product>::new();
    product_mock.expect_get(ProductId(1)).return_ok(Some(product(1)));
    product_mock.expect_get(ProductId(2)).return_ok(Some(product(2)));
    product_mock
        .expect_action(ProductId(1))
        .return_ok(ProductActionResult::Updated);
    product_mock
        .expect_action(ProductId(2))
        .return_err(FrameworkError::EntityError(Box::new(
            ProductError::InsufficientStock {
                variant: VariantId(1),
                requested: 4,
                available: 1,
            },
        )));
    product_mock
        .expect_action(ProductId(1))
        .return_ok(ProductActionResult::Updated);

    let (order_actor, order_client) = checkout_engine::order_actor::new(10);
    tokio::spawn(order_actor.run(ProductClient::new(product_mock.client())));
    let orders = OrderClient::new(order_client);

    let result = orders
        .create_order(payload("k-2", vec![line(1, 2), line(2, 4)]))
        .await;
    assert!(matches!(
        result,
        Err(OrderServiceError::Rejected {
            kind: ErrorKind::StockReservationFailed,
            ..
        })
    ));
    product_mock.verify();
    Ok(())
}

/// Full actors: a resubmitted key returns the first order and reserves nothing more;
/// cancelling returns the stock.
#[tokio::test]
async fn test_duplicate_submission_and_cancel() -> TestResult {
    let (product_actor, product_client) = checkout_engine::product_actor::new(10);
    let (order_actor, order_client) = checkout_engine::order_actor::new(10);
    let products = ProductClient::new(product_client);
    tokio::spawn(product_actor.run(()));
    tokio::spawn(order_actor.run(products.clone()));
    let orders = OrderClient::new(order_client);

    let id = products
        .create_product(ProductCreate {
            name: "Mug".into(),
            status: ProductStatus::Active,
            image: None,
            variants: vec![variant(1, Some(5))],
        })
        .await?;
    let stock = |product: Option<Product>| {
        product.and_then(|p| p.variant(&VariantId(1)).and_then(|v| v.stock))
    };
    let mut order_line = line(0, 2);
    order_line.product_id = id;

    let first = orders.create_order(payload("same", vec![order_line.clone()])).await?;
    let second = orders.create_order(payload("same", vec![order_line])).await?;
    assert_eq!(first, second);
    assert_eq!(stock(products.get(id).await?), Some(3));

    let cancelled = orders.cancel(first.order_id).await?;
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(stock(products.get(id).await?), Some(5));
    assert!(orders.complete(first.order_id).await.is_err());
    Ok(())
}

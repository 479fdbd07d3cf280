//! Cross-entity lifecycle tests for the domain layer.

use common::Money;
use domain::{
    DomainError, Order, OrderStatus, Payment, PaymentStatus, Shipment, ShipmentStatus, Status,
    StockItem,
};

fn widget(stock: u32) -> StockItem {
    StockItem::new("Widget", stock, Money::from_cents(100), None).unwrap()
}

mod fulfillment {
    use super::*;

    #[test]
    fn order_payment_and_shipment_reach_their_happy_states() {
        let mut item = widget(10);
        let mut order = Order::create(&item, 2).unwrap();
        item.decrease_stock(order.quantity()).unwrap();
        assert_eq!(item.stock_quantity(), 8);
        assert_eq!(order.total_amount(), Money::from_cents(200));

        let mut payment = Payment::create(order.id(), order.total_amount(), "card").unwrap();
        payment.complete().unwrap();
        order.pay().unwrap();

        let mut shipment = Shipment::create(order.id());
        shipment.ship("TRK-0001").unwrap();
        order.ship().unwrap();
        shipment.complete().unwrap();

        assert_eq!(order.status(), OrderStatus::Shipped);
        assert_eq!(payment.status(), PaymentStatus::Completed);
        assert_eq!(shipment.status(), ShipmentStatus::Delivered);
        assert!(order.status().is_terminal());
    }

    #[test]
    fn cancelled_order_gives_back_exactly_its_quantity() {
        let mut item = widget(10);
        let mut order = Order::create(&item, 4).unwrap();
        item.decrease_stock(order.quantity()).unwrap();

        order.cancel().unwrap();
        item.increase_stock(order.quantity()).unwrap();

        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(item.stock_quantity(), 10);
    }
}

mod rejections {
    use super::*;

    #[test]
    fn overselling_leaves_stock_unchanged() {
        let mut item = widget(3);
        let err = item.decrease_stock(5).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                requested: 5,
                available: 3,
                ..
            }
        ));
        assert_eq!(item.stock_quantity(), 3);
    }

    #[test]
    fn paid_orders_cannot_be_cancelled_or_paid_again() {
        let item = widget(10);
        let mut order = Order::create(&item, 1).unwrap();
        order.pay().unwrap();

        assert!(matches!(
            order.pay(),
            Err(DomainError::InvalidTransition { from: "PAID", .. })
        ));
        assert!(order.cancel().is_err());
        assert_eq!(order.status(), OrderStatus::Paid);
    }

    #[test]
    fn completed_payments_are_final() {
        let item = widget(10);
        let order = Order::create(&item, 1).unwrap();
        let mut payment = Payment::create(order.id(), order.total_amount(), "card").unwrap();
        payment.complete().unwrap();

        assert!(payment.complete().is_err());
        assert!(payment.cancel().is_err());
        assert!(payment.fail().is_err());
        assert_eq!(payment.status(), PaymentStatus::Completed);
    }

    #[test]
    fn delivered_shipments_cannot_be_cancelled() {
        let item = widget(10);
        let order = Order::create(&item, 1).unwrap();
        let mut shipment = Shipment::create(order.id());
        shipment.ship("TRK-0002").unwrap();
        shipment.complete().unwrap();

        assert!(shipment.cancel().is_err());
        assert_eq!(shipment.status(), ShipmentStatus::Delivered);
    }
}

mod serialization {
    use super::*;

    #[test]
    fn entities_round_trip_through_json() {
        let item = widget(10);
        let order = Order::create(&item, 2).unwrap();
        let payment = Payment::create(order.id(), order.total_amount(), "card").unwrap();
        let shipment = Shipment::create(order.id());

        let json = serde_json::to_string(&order).unwrap();
        assert!(json.contains("\"status\":\"PENDING\""));
        assert_eq!(serde_json::from_str::<Order>(&json).unwrap(), order);
        assert_eq!(
            serde_json::from_str::<Payment>(&serde_json::to_string(&payment).unwrap()).unwrap(),
            payment
        );
        assert_eq!(
            serde_json::from_str::<Shipment>(&serde_json::to_string(&shipment).unwrap()).unwrap(),
            shipment
        );
    }
}

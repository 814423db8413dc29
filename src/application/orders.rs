use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::info;

use crate::domain::{
    AccountId, ContactSnapshot, Order, Paise, PaymentMethod, ServiceType, compute_price,
    format_rupees, rupee_amount, weight_in_range,
};
use crate::storage::Repository;

use super::{AppError, Validator, WalletService, is_valid_phone};

/// Booking request as submitted by a client.
///
/// Fields are kept raw so that every problem can be reported per field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrderRequest {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub pickup_date: String,
    pub pickup_time: String,
    pub service_type: String,
    pub weight: Option<f64>,
    pub express: bool,
    /// Price the client displayed; checked against the computed one
    #[serde(with = "rupee_amount::option")]
    pub total_amount: Option<Paise>,
    pub payment_method: String,
}

/// Result of a successful booking.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    /// Wallet balance after the booking (unchanged for non-wallet payments)
    pub new_balance: Paise,
}

/// Validates bookings, prices them and takes payment.
#[derive(Clone)]
pub struct OrderService {
    repo: Repository,
    wallet: WalletService,
}

impl OrderService {
    pub fn new(repo: Repository, wallet: WalletService) -> Self {
        Self { repo, wallet }
    }

    /// Place an order for `account_id`.
    ///
    /// The stored total is always the server-computed price. Wallet payments
    /// debit the account and persist the order in one commit, so a failed
    /// payment never leaves an order behind.
    pub async fn place_order(
        &self,
        account_id: AccountId,
        request: OrderRequest,
    ) -> Result<PlacedOrder, AppError> {
        let mut v = Validator::new();
        v.check(!request.name.trim().is_empty(), "name", "Name is required")
            .check(
                is_valid_phone(request.phone.trim()),
                "phone",
                "Please enter a valid 10-digit phone number",
            )
            .check(
                !request.address.trim().is_empty(),
                "address",
                "Address is required",
            );
        let pickup_date = v.require(
            parse_pickup_date(&request.pickup_date),
            "pickupDate",
            "Valid pickup date is required",
        );
        v.check(
            !request.pickup_time.trim().is_empty(),
            "pickupTime",
            "Pickup time is required",
        );
        let service = v.require(
            ServiceType::from_str(&request.service_type),
            "serviceType",
            "Invalid service type",
        );
        let weight = v.require(
            request.weight.filter(|w| weight_in_range(*w)),
            "weight",
            "Weight must be between 1 and 20 kg",
        );
        let method = v.require(
            PaymentMethod::from_str(&request.payment_method)
                .filter(PaymentMethod::accepted_for_orders),
            "paymentMethod",
            "Invalid payment method",
        );
        if let (Some(service), Some(weight), Some(claimed)) =
            (service, weight, request.total_amount)
        {
            v.check(
                claimed == compute_price(service, weight, request.express),
                "totalAmount",
                "Total amount does not match the service price",
            );
        }

        let (((pickup_date, service), weight), method) =
            v.finish_with(pickup_date.zip(service).zip(weight).zip(method))?;

        let order = Order::new(
            account_id,
            ContactSnapshot {
                name: request.name.trim().to_string(),
                phone: request.phone.trim().to_string(),
                address: request.address.trim().to_string(),
            },
            pickup_date,
            request.pickup_time.trim().to_string(),
            service,
            weight,
            request.express,
            method,
        );

        let new_balance = if method == PaymentMethod::Wallet {
            self.wallet.pay_for_order(&order).await?.new_balance
        } else {
            // Card and UPI are accepted at face value
            let balance = self.wallet.balance(account_id).await?;
            self.repo.save_order(&order).await?;
            balance
        };

        info!(
            account_id = %account_id,
            order_id = %order.id,
            service = %order.service_type,
            total = %format_rupees(order.total_amount),
            method = %order.payment_method,
            "Order placed"
        );

        Ok(PlacedOrder { order, new_balance })
    }

    /// All orders of an account, newest first.
    pub async fn list_orders(&self, account_id: AccountId) -> Result<Vec<Order>, AppError> {
        Ok(self.repo.list_orders(account_id).await?)
    }
}

/// Accepts `YYYY-MM-DD` or an ISO-8601 date-time, keeping only the date.
pub fn parse_pickup_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(input).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pickup_date() {
        let expected = NaiveDate::from_ymd_opt(2026, 10, 20);
        assert_eq!(parse_pickup_date("2026-10-20"), expected);
        assert_eq!(parse_pickup_date("2026-10-20T09:30:00Z"), expected);
        assert_eq!(parse_pickup_date("2026-10-20T09:30:00.000+05:30"), expected);
        assert_eq!(parse_pickup_date("2026-10-20T09:30"), expected);
        assert_eq!(parse_pickup_date("20/10/2026"), None);
        assert_eq!(parse_pickup_date(""), None);
    }

    #[test]
    fn test_order_request_defaults() {
        let request: OrderRequest =
            serde_json::from_str(r#"{"serviceType": "wash-fold", "weight": 3}"#).unwrap();
        assert_eq!(request.service_type, "wash-fold");
        assert_eq!(request.weight, Some(3.0));
        assert!(!request.express);
        assert!(request.total_amount.is_none());
        assert!(request.name.is_empty());
    }
}

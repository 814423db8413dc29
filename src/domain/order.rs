use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Paise, PaymentMethod, rupee_amount, rupees};

pub type OrderId = Uuid;

/// Flat surcharge for express service, per order (not per kg).
pub const EXPRESS_SURCHARGE: Paise = rupees(200);

pub const MIN_WEIGHT_KG: f64 = 1.0;
pub const MAX_WEIGHT_KG: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    #[serde(rename = "dry-clean")]
    DryClean,
    #[serde(rename = "wash-fold")]
    WashFold,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::DryClean => "dry-clean",
            ServiceType::WashFold => "wash-fold",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "dry-clean" => Some(ServiceType::DryClean),
            "wash-fold" => Some(ServiceType::WashFold),
            _ => None,
        }
    }

    /// Price per kilogram.
    pub fn base_price(&self) -> Paise {
        match self {
            ServiceType::DryClean => rupees(250),
            ServiceType::WashFold => rupees(150),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceType::DryClean => "Dry Cleaning",
            ServiceType::WashFold => "Wash & Fold",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Scheduled,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Scheduled => "scheduled",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(OrderStatus::Scheduled),
            "processing" => Some(OrderStatus::Processing),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// Authoritative price of an order.
///
/// `weight_kg` must already be validated to lie within
/// [`MIN_WEIGHT_KG`, `MAX_WEIGHT_KG`]; the per-kg part is rounded to the paisa.
pub fn compute_price(service: ServiceType, weight_kg: f64, express: bool) -> Paise {
    let by_weight = (service.base_price() as f64 * weight_kg).round() as Paise;
    let surcharge = if express { EXPRESS_SURCHARGE } else { 0 };
    by_weight + surcharge
}

pub fn weight_in_range(weight_kg: f64) -> bool {
    weight_kg.is_finite() && (MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(&weight_kg)
}

/// Contact details captured at booking time, independent of later profile edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSnapshot {
    pub name: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    #[serde(flatten)]
    pub contact: ContactSnapshot,
    pub pickup_date: NaiveDate,
    pub pickup_time: String,
    pub service_type: ServiceType,
    pub weight: f64,
    pub express: bool,
    #[serde(with = "rupee_amount")]
    pub total_amount: Paise,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a freshly booked order; the total is always computed here.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_id: AccountId,
        contact: ContactSnapshot,
        pickup_date: NaiveDate,
        pickup_time: String,
        service_type: ServiceType,
        weight: f64,
        express: bool,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            contact,
            pickup_date,
            pickup_time,
            service_type,
            weight,
            express,
            total_amount: compute_price(service_type, weight, express),
            payment_method,
            status: OrderStatus::Scheduled,
            created_at: Utc::now(),
        }
    }

    /// Short human reference, e.g. "Order #a1b2c3 - Dry Cleaning".
    pub fn short_label(&self) -> String {
        let id = self.id.simple().to_string();
        format!(
            "Order #{} - {}",
            &id[id.len() - 6..],
            self.service_type.display_name()
        )
    }
}

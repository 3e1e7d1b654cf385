//! Order submission payloads and the sheet rows they become.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::sheets::{de_number, de_text, User};

/// Order as sent by the order form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
  pub current_user: User,
  #[serde(default)]
  pub selected_team: String,
  #[serde(default)]
  pub page: String,
  #[serde(default)]
  pub telegram_value: String,
  #[serde(default)]
  pub customer: Customer,
  /// Line items, stored verbatim as JSON text
  #[serde(default)]
  pub products: Vec<Value>,
  #[serde(default)]
  pub shipping: Shipping,
  #[serde(default)]
  pub payment: Payment,
  #[serde(default)]
  pub telegram: TelegramOptions,
  #[serde(default)]
  pub subtotal: f64,
  #[serde(default)]
  pub grand_total: f64,
  #[serde(default)]
  pub note: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
  #[serde(deserialize_with = "de_text")]
  pub name: String,
  #[serde(deserialize_with = "de_text")]
  pub phone: String,
  #[serde(deserialize_with = "de_text")]
  pub province: String,
  #[serde(deserialize_with = "de_text")]
  pub district: String,
  #[serde(deserialize_with = "de_text")]
  pub sangkat: String,
  #[serde(deserialize_with = "de_text")]
  pub additional_location: String,
  #[serde(deserialize_with = "de_number")]
  pub shipping_fee: f64,
}

impl Customer {
  /// `Province, District, Sangkat`, skipping blank parts.
  pub fn location(&self) -> String {
    [&self.province, &self.district, &self.sangkat]
      .into_iter()
      .map(|part| part.trim())
      .filter(|part| !part.is_empty())
      .collect::<Vec<_>>()
      .join(", ")
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Shipping {
  #[serde(deserialize_with = "de_text")]
  pub method: String,
  #[serde(deserialize_with = "de_text")]
  pub details: String,
  /// Internal delivery cost
  #[serde(deserialize_with = "de_number")]
  pub cost: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Payment {
  #[serde(deserialize_with = "de_text")]
  pub status: String,
  #[serde(deserialize_with = "de_text")]
  pub info: String,
}

/// Delivery options for the team notification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramOptions {
  pub schedule: bool,
  pub time: Option<String>,
}

impl OrderRequest {
  /// Team the order is filed under, used verbatim in `Orders_<team>`.
  pub fn team(&self) -> Result<&str> {
    if self.selected_team.is_empty() {
      return Err(Error::InvalidRequest("Team not selected".to_string()));
    }
    Ok(&self.selected_team)
  }

  pub fn is_scheduled(&self) -> bool {
    self.telegram.schedule
  }
}

/// An order that has been accepted and assigned an id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
  pub order_id: String,
  pub timestamp: String,
  pub team: String,
  #[serde(flatten)]
  pub request: OrderRequest,
}

impl PlacedOrder {
  /// Accept `request` at `now`.
  pub fn new(request: OrderRequest, now: DateTime<Utc>) -> Result<Self> {
    let team = request.team()?.to_string();
    Ok(Self {
      order_id: order_id(&team, now),
      timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
      team,
      request,
    })
  }

  /// Row for the team's order sheet, in sheet column order.
  pub fn order_row(&self) -> Result<Vec<Value>> {
    let r = &self.request;
    let products = serde_json::to_string(&r.products)
      .map_err(|e| Error::InvalidRequest(format!("Failed to serialize products: {}", e)))?;

    Ok(vec![
      json!(self.timestamp),
      json!(self.order_id),
      json!(r.current_user.user_name),
      json!(r.page),
      json!(r.telegram_value),
      json!(r.customer.name),
      json!(r.customer.phone),
      json!(r.customer.location()),
      json!(r.customer.additional_location),
      json!(r.note),
      json!(r.customer.shipping_fee),
      json!(r.subtotal),
      json!(r.grand_total),
      json!(products),
      json!(r.shipping.method),
      json!(r.shipping.details),
      json!(r.shipping.cost),
      json!(r.payment.status),
      json!(r.payment.info),
      // Telegram message id, filled in once a message is sent
      json!(""),
    ])
  }

  /// Row for `AllOrders`: the order row followed by the team.
  pub fn all_orders_row(&self) -> Result<Vec<Value>> {
    let mut row = self.order_row()?;
    row.push(json!(self.team));
    Ok(row)
  }

  /// Row for `RevenueDashboard`.
  pub fn revenue_row(&self) -> Vec<Value> {
    vec![
      json!(self.timestamp),
      json!(self.team),
      json!(self.request.page),
      json!(self.request.grand_total),
    ]
  }
}

/// `GO-<team>-<unix nanos>`
pub fn order_id(team: &str, now: DateTime<Utc>) -> String {
  format!("GO-{}-{}", team, now.timestamp_nanos_opt().unwrap_or_default())
}

/// Acknowledgement returned to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
  pub order_id: String,
}

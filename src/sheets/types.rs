//! Typed rows of the spreadsheet datasets.
//!
//! Serde names are the sheet column headers, verbatim.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::api_types::{de_bool, de_integer, de_number, de_text};

pub const USERS_SHEET: &str = "Users";
pub const ALL_ORDERS_SHEET: &str = "AllOrders";
pub const FORMULA_REPORT_SHEET: &str = "FormulaReport";
pub const REVENUE_SHEET: &str = "RevenueDashboard";
pub const USER_ACTIVITY_SHEET: &str = "UserActivityLogs";
pub const TELEGRAM_TEMPLATES_SHEET: &str = "TelegramTemplates";
pub const ORDER_SHEET_PREFIX: &str = "Orders_";

/// Per-team order sheet name.
pub fn order_sheet(team: &str) -> String {
  format!("{}{}", ORDER_SHEET_PREFIX, team)
}

/// A row type bound to the sheet it is read from.
pub trait SheetRecord: Serialize + DeserializeOwned + Send + Sync + 'static {
  /// Sheet (dataset) name
  fn sheet() -> &'static str;
}

macro_rules! sheet_record {
  ($ty:ty, $sheet:expr) => {
    impl SheetRecord for $ty {
      fn sheet() -> &'static str {
        $sheet
      }
    }
  };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  #[serde(rename = "UserName", deserialize_with = "de_text")]
  pub user_name: String,
  #[serde(rename = "Password", default, deserialize_with = "de_text")]
  pub password: String,
  /// Comma-separated team names
  #[serde(rename = "Team", default, deserialize_with = "de_text")]
  pub team: String,
  #[serde(rename = "FullName", default, deserialize_with = "de_text")]
  pub full_name: String,
  #[serde(rename = "ProfilePictureURL", default, deserialize_with = "de_text")]
  pub profile_picture_url: String,
  #[serde(rename = "Role", default, deserialize_with = "de_text")]
  pub role: String,
  #[serde(rename = "IsSystemAdmin", default, deserialize_with = "de_bool")]
  pub is_system_admin: bool,
}

impl User {
  pub fn teams(&self) -> impl Iterator<Item = &str> {
    self.team.split(',').map(str::trim).filter(|t| !t.is_empty())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  #[serde(rename = "ProductName", deserialize_with = "de_text")]
  pub product_name: String,
  #[serde(rename = "Barcode", default, deserialize_with = "de_text")]
  pub barcode: String,
  #[serde(rename = "Price", default, deserialize_with = "de_number")]
  pub price: f64,
  #[serde(rename = "ImageURL", default, deserialize_with = "de_text")]
  pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
  #[serde(rename = "Province", default, deserialize_with = "de_text")]
  pub province: String,
  #[serde(rename = "District", default, deserialize_with = "de_text")]
  pub district: String,
  #[serde(rename = "Sangkat", default, deserialize_with = "de_text")]
  pub sangkat: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingMethod {
  #[serde(rename = "MethodName", deserialize_with = "de_text")]
  pub method_name: String,
  #[serde(rename = "LogoURL", default, deserialize_with = "de_text")]
  pub logo_url: String,
  #[serde(rename = "AllowManualDriver", default, deserialize_with = "de_bool")]
  pub allow_manual_driver: bool,
  #[serde(rename = "RequireDriverSelection", default, deserialize_with = "de_bool")]
  pub require_driver_selection: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamPage {
  #[serde(rename = "Team", deserialize_with = "de_text")]
  pub team: String,
  #[serde(rename = "PageName", deserialize_with = "de_text")]
  pub page_name: String,
  #[serde(rename = "TelegramValue", default, deserialize_with = "de_text")]
  pub telegram_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
  #[serde(rename = "ColorName", deserialize_with = "de_text")]
  pub color_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
  #[serde(rename = "DriverName", deserialize_with = "de_text")]
  pub driver_name: String,
  #[serde(rename = "ImageURL", default, deserialize_with = "de_text")]
  pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
  #[serde(rename = "BankName", deserialize_with = "de_text")]
  pub bank_name: String,
  #[serde(rename = "LogoURL", default, deserialize_with = "de_text")]
  pub logo_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneCarrier {
  #[serde(rename = "CarrierName", deserialize_with = "de_text")]
  pub carrier_name: String,
  #[serde(rename = "Prefixes (comma-separated)", default, deserialize_with = "de_text")]
  pub prefixes: String,
  #[serde(rename = "CarrierLogoURL", default, deserialize_with = "de_text")]
  pub carrier_logo_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramTemplate {
  #[serde(rename = "Team", deserialize_with = "de_text")]
  pub team: String,
  #[serde(rename = "Part", default, deserialize_with = "de_integer")]
  pub part: i64,
  #[serde(rename = "Template", default, deserialize_with = "de_text")]
  pub template: String,
}

/// A row of the consolidated `AllOrders` sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  /// ISO 8601 text as written by the backend
  #[serde(rename = "Timestamp", default, deserialize_with = "de_text")]
  pub timestamp: String,
  #[serde(rename = "Order ID", default, deserialize_with = "de_text")]
  pub order_id: String,
  #[serde(rename = "User", default, deserialize_with = "de_text")]
  pub user: String,
  #[serde(rename = "Page", default, deserialize_with = "de_text")]
  pub page: String,
  #[serde(rename = "TelegramValue", default, deserialize_with = "de_text")]
  pub telegram_value: String,
  #[serde(rename = "Customer Name", default, deserialize_with = "de_text")]
  pub customer_name: String,
  #[serde(rename = "Customer Phone", default, deserialize_with = "de_text")]
  pub customer_phone: String,
  #[serde(rename = "Location", default, deserialize_with = "de_text")]
  pub location: String,
  #[serde(rename = "Address Details", default, deserialize_with = "de_text")]
  pub address_details: String,
  #[serde(rename = "Note", default, deserialize_with = "de_text")]
  pub note: String,
  #[serde(rename = "Shipping Fee (Customer)", default, deserialize_with = "de_number")]
  pub shipping_fee_customer: f64,
  #[serde(rename = "Subtotal", default, deserialize_with = "de_number")]
  pub subtotal: f64,
  #[serde(rename = "Grand Total", default, deserialize_with = "de_number")]
  pub grand_total: f64,
  #[serde(rename = "Products (JSON)", default, deserialize_with = "de_text")]
  pub products_json: String,
  #[serde(rename = "Internal Shipping Method", default, deserialize_with = "de_text")]
  pub internal_shipping_method: String,
  #[serde(rename = "Internal Shipping Details", default, deserialize_with = "de_text")]
  pub internal_shipping_details: String,
  #[serde(rename = "Internal Cost", default, deserialize_with = "de_number")]
  pub internal_cost: f64,
  #[serde(rename = "Payment Status", default, deserialize_with = "de_text")]
  pub payment_status: String,
  #[serde(rename = "Payment Info", default, deserialize_with = "de_text")]
  pub payment_info: String,
  #[serde(rename = "Telegram Message ID", default, deserialize_with = "de_text")]
  pub telegram_message_id: String,
  #[serde(rename = "Team", default, deserialize_with = "de_text")]
  pub team: String,
}

/// A row of the `RevenueDashboard` sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueEntry {
  #[serde(rename = "Timestamp", default, deserialize_with = "de_text")]
  pub timestamp: String,
  #[serde(rename = "Team", default, deserialize_with = "de_text")]
  pub team: String,
  #[serde(rename = "Page", default, deserialize_with = "de_text")]
  pub page: String,
  #[serde(rename = "Revenue", default, deserialize_with = "de_number")]
  pub revenue: f64,
}

sheet_record!(User, USERS_SHEET);
sheet_record!(Product, "Products");
sheet_record!(Location, "Locations");
sheet_record!(ShippingMethod, "ShippingMethods");
sheet_record!(TeamPage, "TeamsPages");
sheet_record!(Color, "Colors");
sheet_record!(Driver, "Drivers");
sheet_record!(BankAccount, "BankAccounts");
sheet_record!(PhoneCarrier, "PhoneCarriers");
sheet_record!(TelegramTemplate, TELEGRAM_TEMPLATES_SHEET);
sheet_record!(Order, ALL_ORDERS_SHEET);
sheet_record!(RevenueEntry, REVENUE_SHEET);

/// Free-form row, used for the `Settings` sheet and untyped dataset reads.
pub type SheetRow = serde_json::Map<String, serde_json::Value>;

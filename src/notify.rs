//! Team notifications for placed orders.
//!
//! Delivery (chat messages, invoice documents) belongs to an external
//! service. The service only decides when to notify and hands the order to
//! a [`Notifier`] on the background task queue.

use async_trait::async_trait;
use tracing::info;

use crate::cache::DatasetLoader;
use crate::error::Result;
use crate::orders::PlacedOrder;
use crate::sheets::TelegramTemplate;

#[async_trait]
pub trait Notifier: Send + Sync {
  /// Announce a new order to its team.
  async fn notify_order(&self, order: &PlacedOrder) -> Result<()>;

  /// Produce and deliver the order document (invoice).
  async fn send_document(&self, order: &PlacedOrder) -> Result<()>;
}

/// Message templates of `team`, ordered by part number.
///
/// Team names match case-insensitively.
pub async fn team_templates(loader: &DatasetLoader, team: &str) -> Result<Vec<TelegramTemplate>> {
  let team = team.to_lowercase();
  let mut templates: Vec<TelegramTemplate> = loader
    .load_records::<TelegramTemplate>()
    .await?
    .into_iter()
    .filter(|t| t.team.to_lowercase() == team)
    .collect();
  templates.sort_by_key(|t| t.part);
  Ok(templates)
}

/// Notifier that resolves the team's templates and logs what would be sent.
pub struct LogNotifier {
  loader: DatasetLoader,
}

impl LogNotifier {
  pub fn new(loader: DatasetLoader) -> Self {
    Self { loader }
  }
}

#[async_trait]
impl Notifier for LogNotifier {
  async fn notify_order(&self, order: &PlacedOrder) -> Result<()> {
    let templates = team_templates(&self.loader, &order.team).await?;
    info!(
      order_id = %order.order_id,
      team = %order.team,
      parts = templates.len(),
      "Order notification prepared"
    );
    Ok(())
  }

  async fn send_document(&self, order: &PlacedOrder) -> Result<()> {
    info!(order_id = %order.order_id, team = %order.team, "Order document requested");
    Ok(())
  }
}

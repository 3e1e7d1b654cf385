//! The service facade callers talk to.
//!
//! `SheetService` owns the dataset cache, the remote store handle and the
//! background task queue. Reads go through the cache; writes go straight to
//! the store and invalidate the datasets they touch.

use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use serde_json::json;
use tracing::{info, warn};

use crate::aggregate::{self, DatasetSpec, StaticData};
use crate::cache::{CacheStorage, DatasetLoader, TtlPolicy};
use crate::error::Result;
use crate::notify::{LogNotifier, Notifier};
use crate::orders::{OrderReceipt, OrderRequest, PlacedOrder};
use crate::report::{FormulaReport, Period, RevenueAggregate};
use crate::sheets::{
  order_sheet, Order, RemoteStore, RevenueEntry, SheetRow, SheetWrite, User, WriteAck, ALL_ORDERS_SHEET,
  FORMULA_REPORT_SHEET, REVENUE_SHEET,
};
use crate::tasks::TaskQueue;
use crate::upload::{self, ImageUploadRequest};

pub struct SheetService {
  loader: DatasetLoader,
  tasks: TaskQueue,
  notifier: Arc<dyn Notifier>,
  offset: FixedOffset,
}

impl SheetService {
  /// Build a service over `remote`.
  ///
  /// `offset` is the reference timezone reports are bucketed in.
  pub fn new(
    remote: Arc<dyn RemoteStore>,
    storage: Arc<dyn CacheStorage>,
    policy: TtlPolicy,
    offset: FixedOffset,
    tasks: TaskQueue,
  ) -> Self {
    let loader = DatasetLoader::new(remote, storage, policy);
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier::new(loader.clone()));
    Self {
      loader,
      tasks,
      notifier,
      offset,
    }
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn loader(&self) -> &DatasetLoader {
    &self.loader
  }

  // --------------------------------------------------------------------------
  // Reads
  // --------------------------------------------------------------------------

  /// Every row of `name` as header-keyed JSON objects.
  pub async fn get_dataset(&self, name: &str) -> Result<Vec<SheetRow>> {
    Ok(self.loader.load_default(name).await?)
  }

  pub async fn get_users(&self) -> Result<Vec<User>> {
    Ok(self.loader.load_records().await?)
  }

  /// Load several datasets in parallel. Fails if any one of them fails.
  pub async fn get_many_datasets(&self, specs: Vec<DatasetSpec>) -> Result<StaticData> {
    Ok(aggregate::load_all(&self.loader, specs).await?)
  }

  /// Reference data for the order form.
  pub async fn get_static_data(&self) -> Result<StaticData> {
    self.get_many_datasets(aggregate::static_data_specs()).await
  }

  // --------------------------------------------------------------------------
  // Reports
  // --------------------------------------------------------------------------

  /// Rebuild the `FormulaReport` sheet from `AllOrders`.
  pub async fn refresh_formula_report(&self) -> Result<WriteAck> {
    self.refresh_formula_report_for(Period::current(self.offset)).await
  }

  pub async fn refresh_formula_report_for(&self, period: Period) -> Result<WriteAck> {
    let orders: Vec<Order> = self.loader.load_records().await?;
    let report = FormulaReport::build(&orders, &period);
    let rows = report.to_rows();

    info!(
      orders = orders.len(),
      skipped = report.quality.skipped,
      rows = rows.len(),
      "Writing formula report"
    );
    let ack = self
      .loader
      .remote()
      .write_dataset(FORMULA_REPORT_SHEET, SheetWrite::Overwrite(rows))
      .await?;
    Ok(ack)
  }

  /// Revenue per year, month and day, by team and by page.
  pub async fn get_revenue_summary(&self) -> Result<RevenueAggregate> {
    self.get_revenue_summary_for(Period::current(self.offset)).await
  }

  pub async fn get_revenue_summary_for(&self, period: Period) -> Result<RevenueAggregate> {
    let entries: Vec<RevenueEntry> = self.loader.load_records().await?;
    let (summary, quality) = RevenueAggregate::build(&entries, &period);
    info!(entries = entries.len(), skipped = quality.skipped, "Built revenue summary");
    Ok(summary)
  }

  // --------------------------------------------------------------------------
  // Writes
  // --------------------------------------------------------------------------

  /// Record an order.
  ///
  /// Only the team order sheet write is required to succeed. The
  /// consolidated sheets and the activity log are best effort.
  pub async fn submit_order(&self, request: OrderRequest) -> Result<OrderReceipt> {
    let order = PlacedOrder::new(request, Utc::now())?;
    let team_sheet = order_sheet(&order.team);
    let remote = self.loader.remote();

    remote
      .write_dataset(&team_sheet, SheetWrite::Append(order.order_row()?))
      .await?;

    if let Err(e) = remote
      .write_dataset(ALL_ORDERS_SHEET, SheetWrite::Append(order.all_orders_row()?))
      .await
    {
      warn!(order_id = %order.order_id, error = %e, "Failed to append to AllOrders");
    }
    if let Err(e) = remote
      .write_dataset(REVENUE_SHEET, SheetWrite::Append(order.revenue_row()))
      .await
    {
      warn!(order_id = %order.order_id, error = %e, "Failed to append to RevenueDashboard");
    }

    let details = json!({
      "orderId": order.order_id,
      "team": order.team,
      "grandTotal": order.request.grand_total,
    });
    if let Err(e) = remote
      .log_activity(&order.request.current_user.user_name, "SUBMIT_ORDER_GO", details)
      .await
    {
      warn!(order_id = %order.order_id, error = %e, "Failed to log order activity");
    }

    if order.request.is_scheduled() {
      info!(
        order_id = %order.order_id,
        time = order.request.telegram.time.as_deref().unwrap_or(""),
        "Order notification scheduled"
      );
    } else {
      self.dispatch_notifications(&order);
    }

    self.loader.invalidate(ALL_ORDERS_SHEET);
    self.loader.invalidate(REVENUE_SHEET);
    self.loader.invalidate(&team_sheet);

    info!(order_id = %order.order_id, team = %order.team, "Order submitted");
    Ok(OrderReceipt {
      order_id: order.order_id,
    })
  }

  fn dispatch_notifications(&self, order: &PlacedOrder) {
    let order = Arc::new(order.clone());

    let notifier = Arc::clone(&self.notifier);
    let placed = Arc::clone(&order);
    self.tasks.submit(format!("notify {}", order.order_id), async move {
      notifier.notify_order(&placed).await.map_err(|e| e.to_string())
    });

    let notifier = Arc::clone(&self.notifier);
    let placed = Arc::clone(&order);
    self.tasks.submit(format!("document {}", order.order_id), async move {
      notifier.send_document(&placed).await.map_err(|e| e.to_string())
    });
  }

  /// Upload a file and return its URL.
  ///
  /// If the request names a cell, the URL is written into it in the
  /// background.
  pub async fn upload_image(&self, request: ImageUploadRequest) -> Result<WriteAck> {
    let target = request.cell_target();
    let ack = self.loader.remote().upload_file(request.file).await?;

    if let (Some(target), Some(url)) = (target, ack.url.clone().filter(|u| !u.is_empty())) {
      let loader = self.loader.clone();
      self.tasks.submit(format!("update {} {}", target.sheet, target.column), async move {
        upload::update_cell(&loader, &target, &url).await.map_err(|e| e.to_string())
      });
    }
    Ok(ack)
  }

  // --------------------------------------------------------------------------
  // Cache control
  // --------------------------------------------------------------------------

  pub fn invalidate(&self, dataset: &str) {
    self.loader.invalidate(dataset);
  }

  pub fn invalidate_all(&self) {
    self.loader.invalidate_all();
  }

  /// Wait for queued background work, then stop the workers.
  pub async fn shutdown(&self) {
    self.tasks.shutdown().await;
  }
}

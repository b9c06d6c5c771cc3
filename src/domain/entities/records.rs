use super::optimistic::OptimisticEntity;
use crate::domain::value_objects::offline::EntityId;
use base64::Engine;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub id: EntityId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CustomerRecord {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Customer name cannot be empty".to_string());
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(format!("Invalid customer email: {email}"));
            }
        }
        Ok(())
    }
}

impl OptimisticEntity for CustomerRecord {
    type Draft = NewCustomer;
    type Patch = CustomerPatch;

    fn entity_id(&self) -> &EntityId {
        &self.id
    }

    fn provisional(id: EntityId, draft: &NewCustomer) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            email: draft.email.clone(),
            phone: draft.phone.clone(),
            address: draft.address.clone(),
        }
    }

    fn apply_patch(&mut self, patch: &CustomerPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(email) = &patch.email {
            self.email = Some(email.clone());
        }
        if let Some(phone) = &patch.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(address) = &patch.address {
            self.address = Some(address.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Void,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub id: EntityId,
    pub customer_id: EntityId,
    pub number: Option<String>,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub lines: Vec<InvoiceLine>,
    pub due_date: Option<NaiveDate>,
}

impl InvoiceRecord {
    pub fn total_cents(&self) -> i64 {
        self.lines
            .iter()
            .map(|line| i64::from(line.quantity) * line.unit_price_cents)
            .sum()
    }

    pub fn validate(&self) -> Result<(), String> {
        for line in &self.lines {
            if line.description.trim().is_empty() {
                return Err("Invoice line description cannot be empty".to_string());
            }
            if line.unit_price_cents < 0 {
                return Err("Invoice line price cannot be negative".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    #[default]
    Open,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderRecord {
    pub id: EntityId,
    pub customer_id: EntityId,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: WorkOrderStatus,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkOrder {
    pub customer_id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<WorkOrderStatus>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
}

impl WorkOrderRecord {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Work order title cannot be empty".to_string());
        }
        Ok(())
    }
}

impl OptimisticEntity for WorkOrderRecord {
    type Draft = NewWorkOrder;
    type Patch = WorkOrderPatch;

    fn entity_id(&self) -> &EntityId {
        &self.id
    }

    fn provisional(id: EntityId, draft: &NewWorkOrder) -> Self {
        Self {
            id,
            customer_id: draft.customer_id.clone(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            status: WorkOrderStatus::Open,
            scheduled_for: draft.scheduled_for,
            assigned_to: draft.assigned_to.clone(),
        }
    }

    fn apply_patch(&mut self, patch: &WorkOrderPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(scheduled_for) = patch.scheduled_for {
            self.scheduled_for = Some(scheduled_for);
        }
        if let Some(assigned_to) = &patch.assigned_to {
            self.assigned_to = Some(assigned_to.clone());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemRecord {
    pub id: EntityId,
    pub sku: String,
    pub name: String,
    pub quantity_on_hand: i64,
    pub unit_cost_cents: i64,
}

impl InventoryItemRecord {
    pub fn validate(&self) -> Result<(), String> {
        if self.sku.trim().is_empty() {
            return Err("Inventory SKU cannot be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("Inventory item name cannot be empty".to_string());
        }
        if self.unit_cost_cents < 0 {
            return Err("Inventory unit cost cannot be negative".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub id: EntityId,
    pub supplier: String,
    pub item_id: EntityId,
    pub quantity: u32,
    pub unit_cost_cents: i64,
}

impl PurchaseRecord {
    pub fn validate(&self) -> Result<(), String> {
        if self.supplier.trim().is_empty() {
            return Err("Purchase supplier cannot be empty".to_string());
        }
        if self.quantity == 0 {
            return Err("Purchase quantity must be greater than 0".to_string());
        }
        if self.unit_cost_cents < 0 {
            return Err("Purchase unit cost cannot be negative".to_string());
        }
        Ok(())
    }
}

/// 作業指示に紐づく写真などのメディア。オフライン時はキュー経由でのみ送信される。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRecord {
    pub id: EntityId,
    pub work_order_id: EntityId,
    pub file_name: String,
    pub content_type: String,
    pub data_base64: String,
}

impl AttachmentRecord {
    pub fn decoded_len(&self) -> Result<usize, String> {
        base64::engine::general_purpose::STANDARD
            .decode(self.data_base64.as_bytes())
            .map(|bytes| bytes.len())
            .map_err(|e| format!("Attachment content is not valid base64: {e}"))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.file_name.trim().is_empty() {
            return Err("Attachment file name cannot be empty".to_string());
        }
        if !self.content_type.contains('/') {
            return Err(format!(
                "Invalid attachment content type: {}",
                self.content_type
            ));
        }
        if self.decoded_len()? == 0 {
            return Err("Attachment content cannot be empty".to_string());
        }
        Ok(())
    }
}

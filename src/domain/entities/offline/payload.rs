use crate::domain::entities::records::{
    AttachmentRecord, CustomerRecord, InventoryItemRecord, InvoiceRecord, PurchaseRecord,
    WorkOrderRecord,
};
use crate::domain::value_objects::offline::{EntityId, EntityKind, OperationKind};
use serde::{Deserialize, Serialize};

/// `entityKind` をタグにしたアクションのペイロード。種別ごとにスキーマが固定される。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "entityKind", content = "data", rename_all = "snake_case")]
pub enum ActionPayload {
    Customer(CustomerRecord),
    Invoice(InvoiceRecord),
    WorkOrder(WorkOrderRecord),
    InventoryItem(InventoryItemRecord),
    Purchase(PurchaseRecord),
    Attachment(AttachmentRecord),
}

impl ActionPayload {
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            ActionPayload::Customer(_) => EntityKind::Customer,
            ActionPayload::Invoice(_) => EntityKind::Invoice,
            ActionPayload::WorkOrder(_) => EntityKind::WorkOrder,
            ActionPayload::InventoryItem(_) => EntityKind::InventoryItem,
            ActionPayload::Purchase(_) => EntityKind::Purchase,
            ActionPayload::Attachment(_) => EntityKind::Attachment,
        }
    }

    pub fn entity_id(&self) -> &EntityId {
        match self {
            ActionPayload::Customer(record) => &record.id,
            ActionPayload::Invoice(record) => &record.id,
            ActionPayload::WorkOrder(record) => &record.id,
            ActionPayload::InventoryItem(record) => &record.id,
            ActionPayload::Purchase(record) => &record.id,
            ActionPayload::Attachment(record) => &record.id,
        }
    }

    /// 生の JSON と種別タグからペイロードを復元する
    pub fn from_json(kind: EntityKind, data: serde_json::Value) -> Result<Self, String> {
        let tagged = serde_json::json!({
            "entityKind": kind.as_str(),
            "data": data,
        });
        serde_json::from_value(tagged).map_err(|e| format!("Invalid {kind} payload: {e}"))
    }

    pub fn validate(&self, operation: OperationKind) -> Result<(), String> {
        // 削除は対象 ID さえあればよい
        if operation == OperationKind::Delete {
            return Ok(());
        }
        match self {
            ActionPayload::Customer(record) => record.validate(),
            ActionPayload::Invoice(record) => record.validate(),
            ActionPayload::WorkOrder(record) => record.validate(),
            ActionPayload::InventoryItem(record) => record.validate(),
            ActionPayload::Purchase(record) => record.validate(),
            ActionPayload::Attachment(record) => record.validate(),
        }
    }
}

impl From<CustomerRecord> for ActionPayload {
    fn from(record: CustomerRecord) -> Self {
        ActionPayload::Customer(record)
    }
}

impl From<WorkOrderRecord> for ActionPayload {
    fn from(record: WorkOrderRecord) -> Self {
        ActionPayload::WorkOrder(record)
    }
}

impl From<AttachmentRecord> for ActionPayload {
    fn from(record: AttachmentRecord) -> Self {
        ActionPayload::Attachment(record)
    }
}

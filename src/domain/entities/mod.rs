pub mod offline;
pub mod optimistic;
pub mod records;

pub use optimistic::OptimisticEntity;
pub use records::{
    AttachmentRecord, CustomerPatch, CustomerRecord, InventoryItemRecord, InvoiceLine,
    InvoiceRecord, InvoiceStatus, NewCustomer, NewWorkOrder, PurchaseRecord, WorkOrderPatch,
    WorkOrderRecord, WorkOrderStatus,
};

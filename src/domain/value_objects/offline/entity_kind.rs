use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// アクションが対象とするドメインコレクション
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Customer,
    Invoice,
    WorkOrder,
    InventoryItem,
    Purchase,
    Attachment,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Customer,
        EntityKind::Invoice,
        EntityKind::WorkOrder,
        EntityKind::InventoryItem,
        EntityKind::Purchase,
        EntityKind::Attachment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Customer => "customer",
            EntityKind::Invoice => "invoice",
            EntityKind::WorkOrder => "work_order",
            EntityKind::InventoryItem => "inventory_item",
            EntityKind::Purchase => "purchase",
            EntityKind::Attachment => "attachment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown entity kind: {s}"))
    }
}

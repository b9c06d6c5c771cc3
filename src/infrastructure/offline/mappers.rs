use super::rows::PendingActionRow;
use crate::domain::entities::offline::{ActionPayload, PendingAction};
use crate::domain::value_objects::offline::{
    ActionStatus, EntityKind, OperationKind, PendingActionId,
};
use crate::shared::error::AppError;
use chrono::{DateTime, SecondsFormat, Utc};
use std::str::FromStr;

pub(super) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Serialization(format!("Invalid timestamp '{value}': {e}")))
}

fn parse_optional_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    value.map(parse_timestamp).transpose()
}

pub(super) fn map_row(row: PendingActionRow) -> Result<PendingAction, AppError> {
    let entity_kind = EntityKind::from_str(&row.entity_kind).map_err(AppError::Serialization)?;
    let payload: ActionPayload = serde_json::from_str(&row.payload)?;

    if payload.entity_kind() != entity_kind {
        return Err(AppError::Serialization(format!(
            "Row {} is tagged {} but carries a {} payload",
            row.action_id,
            entity_kind,
            payload.entity_kind()
        )));
    }

    Ok(PendingAction {
        id: PendingActionId::parse(&row.action_id).map_err(AppError::Serialization)?,
        entity_kind,
        operation: OperationKind::from_str(&row.operation).map_err(AppError::Serialization)?,
        payload,
        enqueued_at: parse_timestamp(&row.enqueued_at)?,
        status: ActionStatus::from_str(&row.status).map_err(AppError::Serialization)?,
        attempts: u32::try_from(row.attempts).unwrap_or(u32::MAX),
        last_error: row.last_error,
        last_attempt_at: parse_optional_timestamp(row.last_attempt_at.as_deref())?,
        synced_at: parse_optional_timestamp(row.synced_at.as_deref())?,
    })
}

/// 読めない行を `(seq, エラー内容)` として分けて返す
pub(super) fn map_rows(rows: Vec<PendingActionRow>) -> (Vec<PendingAction>, Vec<(i64, String)>) {
    let mut actions = Vec::with_capacity(rows.len());
    let mut undecodable = Vec::new();

    for row in rows {
        let seq = row.seq;
        match map_row(row) {
            Ok(action) => actions.push(action),
            Err(err) => {
                tracing::warn!(
                    target: "sync::store",
                    seq,
                    error = %err,
                    "skipping undecodable action log row"
                );
                undecodable.push((seq, err.to_string()));
            }
        }
    }

    (actions, undecodable)
}

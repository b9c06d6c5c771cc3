use crate::application::services::action_log::ActionLog;
use crate::application::services::status_monitor::SyncStatusMonitor;
use crate::application::services::sync_engine::SyncEngine;
use crate::domain::entities::offline::ActionPayload;
use crate::domain::value_objects::offline::{EntityKind, OperationKind, PendingActionId};
use crate::presentation::dto::Validate;
use crate::presentation::dto::sync_dto::{
    ActionIdRequest, ActionMutationResponse, EnqueueActionRequest, EnqueueActionResponse,
    PendingActionResponse, SyncNowResponse, SyncStatusResponse,
};
use crate::shared::AppError;
use std::str::FromStr;
use std::sync::Arc;

/// 同期状態表示と手動操作のためのハンドラ
pub struct SyncHandler {
    monitor: Arc<SyncStatusMonitor>,
    engine: Arc<SyncEngine>,
    log: Arc<ActionLog>,
}

impl SyncHandler {
    pub fn new(
        monitor: Arc<SyncStatusMonitor>,
        engine: Arc<SyncEngine>,
        log: Arc<ActionLog>,
    ) -> Self {
        Self {
            monitor,
            engine,
            log,
        }
    }

    pub async fn get_sync_status(&self) -> Result<SyncStatusResponse, AppError> {
        Ok(self.monitor.get_status().await.into())
    }

    /// タイマーを待たずに同期パスを実行する
    pub async fn sync_now(&self) -> Result<SyncNowResponse, AppError> {
        Ok(self.engine.sync_now().await.into())
    }

    pub async fn enqueue_action(
        &self,
        request: EnqueueActionRequest,
    ) -> Result<EnqueueActionResponse, AppError> {
        request.validate().map_err(AppError::Validation)?;

        let entity_kind = parse_entity_kind(&request.entity_kind)?;
        let operation = parse_operation(&request.operation)?;
        let payload =
            ActionPayload::from_json(entity_kind, request.payload).map_err(AppError::Validation)?;

        let action_id = self.log.enqueue(entity_kind, operation, payload).await?;
        Ok(EnqueueActionResponse {
            action_id: action_id.to_string(),
        })
    }

    pub async fn list_dead_letters(&self) -> Result<Vec<PendingActionResponse>, AppError> {
        self.log
            .dead_letters()
            .await
            .iter()
            .map(PendingActionResponse::try_from)
            .collect()
    }

    pub async fn requeue_dead_letter(
        &self,
        request: ActionIdRequest,
    ) -> Result<ActionMutationResponse, AppError> {
        request.validate().map_err(AppError::Validation)?;
        let id = parse_action_id(&request.action_id)?;

        let changed = self.log.requeue(&id).await?;
        Ok(ActionMutationResponse {
            action_id: id.to_string(),
            changed,
        })
    }

    pub async fn discard_action(
        &self,
        request: ActionIdRequest,
    ) -> Result<ActionMutationResponse, AppError> {
        request.validate().map_err(AppError::Validation)?;
        let id = parse_action_id(&request.action_id)?;

        let changed = self.log.discard(&id).await?;
        if changed {
            tracing::info!(target: "sync::log", action_id = %id, "action discarded");
        }
        Ok(ActionMutationResponse {
            action_id: id.to_string(),
            changed,
        })
    }
}

fn parse_entity_kind(value: &str) -> Result<EntityKind, AppError> {
    EntityKind::from_str(value).map_err(AppError::Validation)
}

fn parse_operation(value: &str) -> Result<OperationKind, AppError> {
    OperationKind::from_str(value).map_err(AppError::Validation)
}

fn parse_action_id(value: &str) -> Result<PendingActionId, AppError> {
    PendingActionId::parse(value).map_err(AppError::Validation)
}

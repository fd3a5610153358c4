use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use parla_storage::{models::ActionItem, queries};

use crate::{ParlaService, ServiceError, ServiceResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListActionItemsRequest {
	pub user_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListActionItemsResponse {
	pub action_items: Vec<ActionItemView>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionItemView {
	pub action_item_id: Uuid,
	pub note_id: Uuid,
	pub user_id: String,
	pub task: String,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoveActionItemRequest {
	pub action_item_id: Uuid,
	pub user_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoveActionItemResponse {
	pub removed: bool,
}

impl From<ActionItem> for ActionItemView {
	fn from(item: ActionItem) -> Self {
		Self {
			action_item_id: item.action_item_id,
			note_id: item.note_id,
			user_id: item.user_id,
			task: item.task,
			created_at: item.created_at,
		}
	}
}

impl ParlaService {
	pub async fn list_action_items(
		&self,
		req: ListActionItemsRequest,
	) -> ServiceResult<ListActionItemsResponse> {
		let user_id = req.user_id.trim();

		if user_id.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "user_id is required.".to_string(),
			});
		}

		let items = queries::list_action_items(&self.db, user_id).await?;

		Ok(ListActionItemsResponse {
			action_items: items.into_iter().map(ActionItemView::from).collect(),
		})
	}

	/// Removes one action item. The delete is scoped by owner, so a stale or
	/// foreign id deletes nothing and reads as not found.
	pub async fn remove_action_item(
		&self,
		req: RemoveActionItemRequest,
	) -> ServiceResult<RemoveActionItemResponse> {
		let removed =
			queries::delete_action_item(&self.db, req.action_item_id, &req.user_id).await?;

		if removed == 0 {
			return Err(ServiceError::NotFound {
				message: format!("Action item {} was not found.", req.action_item_id),
			});
		}

		Ok(RemoveActionItemResponse { removed: true })
	}
}

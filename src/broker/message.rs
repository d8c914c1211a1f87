use serde::{Deserialize, Serialize};

/// Body of `POST /publish`.
///
/// `body` holds a batch of fragments (see [`crate::broker::batch`]); each
/// fragment becomes one message with the same exchange, routing key, delivery
/// mode and priority.
///
/// # Example
///
/// ```json
/// {"exchange": "events", "key": "user.created", "deliverymode": 2,
///  "priority": 0, "body": "[{\"id\":1},{\"id\":2}]"}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageEntity {
    pub exchange: String,
    #[serde(rename = "key")]
    pub routing_key: String,
    #[serde(rename = "deliverymode")]
    pub delivery_mode: u8,
    pub priority: u8,
    pub body: String,
}

/// Body of `POST /exchange` and `DELETE /exchange` (only `name` is used on delete).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub durable: bool,
    #[serde(rename = "autodelete")]
    pub auto_delete: bool,
    #[serde(rename = "nowait")]
    pub no_wait: bool,
}

/// Body of `POST /queue` and `DELETE /queue` (only `name` is used on delete).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueEntity {
    pub name: String,
    pub durable: bool,
    #[serde(rename = "autodelete")]
    pub auto_delete: bool,
    pub exclusive: bool,
    #[serde(rename = "nowait")]
    pub no_wait: bool,
}

/// Body of `POST /queue/bind` and `DELETE /queue/bind`.
///
/// Every routing key in `keys` is bound (or unbound) on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueBindEntity {
    pub queue: String,
    pub exchange: String,
    #[serde(rename = "nowait")]
    pub no_wait: bool,
    pub keys: Vec<String>,
}

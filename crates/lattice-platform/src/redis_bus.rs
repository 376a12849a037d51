use anyhow::Result;
use async_trait::async_trait;
use lattice_core::ProposalStatusChanged;
use redis::{AsyncCommands, Client};
use serde::Serialize;

use crate::source::EventSink;

#[derive(Clone)]
pub struct RedisBus {
    client: Client,
    channel: String,
}

impl RedisBus {
    pub fn connect(redis_url: &str, channel: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self {
            client,
            channel: channel.to_string(),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub async fn publish_json<T: Serialize>(&self, channel: &str, payload: &T) -> Result<()> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let serialized = serde_json::to_string(payload)?;
        let _: i64 = connection.publish(channel, serialized).await?;
        Ok(())
    }
}

#[async_trait]
impl EventSink for RedisBus {
    async fn publish(&self, event: &ProposalStatusChanged) -> Result<()> {
        self.publish_json(&self.channel, event).await
    }
}

//! Seams between the workflows and the external service.
//!
//! The session only talks to these traits, so tests and alternative
//! backends can stand in for the HTTP client.

use async_trait::async_trait;
use guppshupp::{Error, ExtractedMemories, Guppshupp, Health, Message, PersonalityKind};

/// Turns a conversation into extracted memories.
#[async_trait]
pub trait MemoryExtractor: Send + Sync {
    /// Issue one extraction request. No retry.
    async fn extract(&self, messages: &[Message]) -> Result<ExtractedMemories, Error>;
}

/// Writes a response to a message in one personality's voice.
#[async_trait]
pub trait PersonalityGenerator: Send + Sync {
    /// Issue one generation request. No retry.
    async fn generate(
        &self,
        user_message: &str,
        kind: PersonalityKind,
        memories: &ExtractedMemories,
    ) -> Result<String, Error>;
}

/// Reports whether the backing service is up.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn health(&self) -> Result<Health, Error>;
}

#[async_trait]
impl MemoryExtractor for Guppshupp {
    async fn extract(&self, messages: &[Message]) -> Result<ExtractedMemories, Error> {
        self.extract_memory(messages).await
    }
}

#[async_trait]
impl PersonalityGenerator for Guppshupp {
    async fn generate(
        &self,
        user_message: &str,
        kind: PersonalityKind,
        memories: &ExtractedMemories,
    ) -> Result<String, Error> {
        self.transform_personality(user_message, kind, memories)
            .await
    }
}

#[async_trait]
impl HealthCheck for Guppshupp {
    async fn health(&self) -> Result<Health, Error> {
        Guppshupp::health(self).await
    }
}

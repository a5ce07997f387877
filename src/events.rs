use async_trait::async_trait;
use net::ItemStack;

use crate::{inventory::Container, player::Profile};

/// A click on a non-empty slot, delivered before anything is moved.
#[derive(Debug)]
pub struct ContainerClick<'a> {
    pub player: &'a Profile,
    pub container: &'a Container,
    pub item: &'a ItemStack,
    pub slot: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventResult {
    pub cancel: bool,
}

impl EventResult {
    pub const ALLOW: Self = Self { cancel: false };
    pub const CANCEL: Self = Self { cancel: true };
}

/// Hook points for container interactions. Implementations may suspend; the
/// click is held until they answer.
#[async_trait]
pub trait ContainerEvents: Send + Sync {
    async fn container_click(&self, event: ContainerClick<'_>) -> EventResult;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

#[async_trait]
impl ContainerEvents for NoopEvents {
    async fn container_click(&self, _event: ContainerClick<'_>) -> EventResult {
        EventResult::ALLOW
    }
}

//! Messaging Service
//!
//! Conversations are derived: every message carries the conversation id of
//! its (sender, recipient, task) triple. Inserts into one conversation are
//! serialized together with their publish, so subscribers see messages in
//! creation order.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use handy_core::{
    conversation_id, require_text, ConversationId, ConversationSummary, EntityType, HandyError,
    HandyResult, MarketConfig, Message, MessageId, NotificationType, StorageError, TaskHeadline,
    UserId, UserSummary, ValidationError, WorkflowError,
};
use handy_events::{EventHub, MarketEvent, Subscription, Topic};
use handy_storage::MarketplaceStore;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{AuthContext, NewMessage, NotificationService};

#[derive(Clone)]
pub struct MessagingService {
    store: Arc<dyn MarketplaceStore>,
    events: EventHub,
    notifications: NotificationService,
    config: MarketConfig,
    conversation_locks: Arc<DashMap<ConversationId, Arc<Mutex<()>>>>,
}

impl MessagingService {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        events: EventHub,
        notifications: NotificationService,
        config: MarketConfig,
    ) -> Self {
        Self {
            store,
            events,
            notifications,
            config,
            conversation_locks: Arc::new(DashMap::new()),
        }
    }

    fn lock_for(&self, conversation: &ConversationId) -> Arc<Mutex<()>> {
        self.conversation_locks
            .entry(conversation.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the conversation's lock once no sender holds or awaits it.
    fn release_lock(&self, conversation: &ConversationId, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.conversation_locks
            .remove_if(conversation, |_, entry| Arc::strong_count(entry) == 1);
    }

    /// Forbidden unless the conversation is empty or `user` takes part in it.
    async fn ensure_participant(
        &self,
        user: UserId,
        conversation: &ConversationId,
    ) -> HandyResult<Option<(UserId, UserId)>> {
        let participants = self.store.conversation_participants(conversation).await?;
        match participants {
            Some((a, b)) if a != user && b != user => Err(WorkflowError::forbidden(
                "view this conversation",
                "you are not a participant",
            )
            .into()),
            other => Ok(other),
        }
    }

    /// Send a message from the caller.
    pub async fn send(&self, ctx: &AuthContext, request: NewMessage) -> HandyResult<Message> {
        let content = require_text("content", Some(request.content))?;
        if content.chars().count() > self.config.max_message_length {
            return Err(ValidationError::invalid(
                "content",
                format!("must be at most {} characters", self.config.max_message_length),
            )
            .into());
        }
        if request.recipient_id == ctx.user_id {
            return Err(
                ValidationError::invalid("recipient_id", "cannot message yourself").into(),
            );
        }
        if request.attachments.len() > self.config.max_attachments {
            return Err(ValidationError::invalid(
                "attachments",
                format!("at most {} attachments are allowed", self.config.max_attachments),
            )
            .into());
        }
        if self.store.user_get(request.recipient_id).await?.is_none() {
            return Err(StorageError::not_found(EntityType::User, request.recipient_id).into());
        }
        if let Some(task_id) = request.task_id {
            if self.store.task_get(task_id).await?.is_none() {
                return Err(StorageError::not_found(EntityType::Task, task_id).into());
            }
        }

        let conversation = conversation_id(ctx.user_id, request.recipient_id, request.task_id);
        let NewMessage {
            recipient_id,
            task_id,
            attachments,
            ..
        } = request;
        let lock = self.lock_for(&conversation);
        let sent = async {
            let _guard = lock.lock().await;
            let message = Message {
                id: MessageId::now_v7(),
                conversation_id: conversation.clone(),
                sender_id: ctx.user_id,
                recipient_id,
                content,
                task_id,
                attachments,
                created_at: Utc::now(),
                read_at: None,
            };
            self.store.message_insert(&message).await?;
            self.events.publish(MarketEvent::MessageCreated {
                message: message.clone(),
            });
            Ok::<_, HandyError>(message)
        }
        .await;
        self.release_lock(&conversation, lock);
        let message = sent?;

        debug!(
            conversation_id = %conversation,
            message_id = %message.id,
            actor_id = %ctx.user_id,
            "Message sent"
        );
        self.notifications
            .notify(
                message.recipient_id,
                NotificationType::MessageReceived,
                "New message",
                "You have a new message",
                json!({ "conversation_id": conversation, "message_id": message.id }),
            )
            .await;
        Ok(message)
    }

    /// One summary per conversation the caller is part of, most recent first.
    pub async fn list_conversations(
        &self,
        ctx: &AuthContext,
    ) -> HandyResult<Vec<ConversationSummary>> {
        let me = ctx.user_id;
        let messages = self.store.message_list_for_user(me).await?;

        // Messages arrive in creation order, so the last one seen per key is the latest.
        let mut grouped: HashMap<ConversationId, (Message, usize, usize)> = HashMap::new();
        for message in messages {
            let unread = usize::from(message.is_unread_for(me));
            match grouped.entry(message.conversation_id.clone()) {
                Entry::Occupied(mut entry) => {
                    let (latest, count, unread_count) = entry.get_mut();
                    *count += 1;
                    *unread_count += unread;
                    *latest = message;
                }
                Entry::Vacant(entry) => {
                    entry.insert((message, 1, unread));
                }
            }
        }

        let mut summaries = Vec::with_capacity(grouped.len());
        for (conversation_id, (last_message, message_count, unread_count)) in grouped {
            let other = last_message.counterpart_of(me).unwrap_or(me);
            let other_user = match self.store.profile_get(other).await? {
                Some(profile) => UserSummary::from(&profile),
                None => UserSummary::unknown(other),
            };
            let task = match last_message.task_id {
                Some(task_id) => self
                    .store
                    .task_get(task_id)
                    .await?
                    .map(|t| TaskHeadline::from(&t)),
                None => None,
            };
            summaries.push(ConversationSummary {
                conversation_id,
                last_message_at: last_message.created_at,
                last_message,
                message_count,
                unread_count,
                other_user,
                task,
            });
        }
        summaries.sort_by(|a, b| {
            b.last_message_at
                .cmp(&a.last_message_at)
                .then_with(|| b.last_message.id.cmp(&a.last_message.id))
        });
        Ok(summaries)
    }

    /// One page of a conversation, oldest first. `limit` 0 means the default.
    pub async fn list_messages(
        &self,
        ctx: &AuthContext,
        conversation: &ConversationId,
        limit: usize,
        offset: usize,
    ) -> HandyResult<Vec<Message>> {
        self.ensure_participant(ctx.user_id, conversation).await?;
        let limit = self.config.message_page_limit(limit);
        self.store
            .message_list_by_conversation(conversation, limit, offset)
            .await
    }

    /// Mark every message addressed to the caller in this conversation read.
    ///
    /// Idempotent; returns how many messages changed on this call.
    pub async fn mark_read(
        &self,
        ctx: &AuthContext,
        conversation: &ConversationId,
    ) -> HandyResult<usize> {
        let participants = self.ensure_participant(ctx.user_id, conversation).await?;
        let read_at = Utc::now();
        let count = self
            .store
            .message_mark_read(conversation, ctx.user_id, read_at)
            .await?;

        if count > 0 {
            info!(
                conversation_id = %conversation,
                actor_id = %ctx.user_id,
                count,
                "Messages marked read"
            );
            if let Some((a, b)) = participants {
                let other_user_id = if a == ctx.user_id { b } else { a };
                self.events.publish(MarketEvent::MessagesRead {
                    conversation_id: conversation.clone(),
                    reader_id: ctx.user_id,
                    other_user_id,
                    count,
                    read_at,
                });
            }
        }
        Ok(count)
    }

    /// Messages addressed to the caller that are still unread.
    pub async fn unread_count(&self, ctx: &AuthContext) -> HandyResult<usize> {
        self.store.message_unread_count(ctx.user_id).await
    }

    /// Forbidden unless the caller may read `conversation`.
    pub async fn authorize_conversation(
        &self,
        ctx: &AuthContext,
        conversation: &ConversationId,
    ) -> HandyResult<()> {
        self.ensure_participant(ctx.user_id, conversation)
            .await
            .map(|_| ())
    }

    /// Live feed of one conversation. Dropping the subscription unsubscribes.
    pub async fn subscribe_conversation(
        &self,
        ctx: &AuthContext,
        conversation: ConversationId,
    ) -> HandyResult<Subscription> {
        self.authorize_conversation(ctx, &conversation).await?;
        Ok(self.events.subscribe(Topic::Conversation(conversation)))
    }

    /// Live feed of everything addressed to the caller.
    pub fn subscribe_inbox(&self, ctx: &AuthContext) -> Subscription {
        self.events.subscribe(Topic::Inbox(ctx.user_id))
    }
}

use std::collections::VecDeque;

use engine::{Color, Vec2};

pub(crate) const MESSAGE_LIFETIME_SECONDS: f64 = 1.0;
/// World units per second, upward.
const MESSAGE_RISE_SPEED: f32 = 30.0;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Message {
    pub text: String,
    pub position: Vec2,
    pub color: Color,
    pub created_at: f64,
}

impl Message {
    pub(crate) fn is_expired(&self, now: f64) -> bool {
        now >= self.created_at + MESSAGE_LIFETIME_SECONDS
    }

    /// 0.0 when fresh, 1.0 at expiry.
    pub(crate) fn age_fraction(&self, now: f64) -> f32 {
        ((now - self.created_at) / MESSAGE_LIFETIME_SECONDS).clamp(0.0, 1.0) as f32
    }
}

/// Floating combat text, oldest first. Every message shares one lifetime, so
/// expiry only ever pops from the front.
#[derive(Debug, Default, Clone)]
pub(crate) struct MessageQueue {
    messages: VecDeque<Message>,
}

impl MessageQueue {
    pub(crate) fn push(&mut self, text: String, position: Vec2, color: Color, now: f64) {
        self.messages.push_back(Message {
            text,
            position,
            color,
            created_at: now,
        });
    }

    pub(crate) fn update(&mut self, now: f64, dt: f32) {
        while self
            .messages
            .front()
            .is_some_and(|message| message.is_expired(now))
        {
            self.messages.pop_front();
        }
        for message in &mut self.messages {
            message.position.y -= MESSAGE_RISE_SPEED * dt;
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.messages.clear();
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::PollTally;

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, name: String },

    /// A chat message was posted to an event room
    MessageCreate {
        id: Uuid,
        event_id: Uuid,
        sender_id: Uuid,
        sender_name: String,
        text: Option<String>,
        image_url: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A poll was opened in an event room
    PollCreate {
        id: Uuid,
        event_id: Uuid,
        created_by: Uuid,
        question: String,
        options: Vec<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Recomputed tallies after a vote
    PollUpdate {
        poll_id: Uuid,
        event_id: Uuid,
        total_votes: u32,
        tallies: Vec<PollTally>,
    },

    /// Who voted for what
    PollVote {
        poll_id: Uuid,
        event_id: Uuid,
        user_id: Uuid,
        option: String,
    },

    /// A user started typing in an event room
    TypingStart {
        room: Uuid,
        user_id: Uuid,
        name: String,
    },

    /// A user came online or went offline
    PresenceUpdate {
        user_id: Uuid,
        name: String,
        online: bool,
    },
}

impl GatewayEvent {
    /// Returns the room id (event id) if this event is scoped to one.
    /// Events that return `None` are global and reach every client.
    pub fn room(&self) -> Option<Uuid> {
        match self {
            Self::MessageCreate { event_id, .. } => Some(*event_id),
            Self::PollCreate { event_id, .. } => Some(*event_id),
            Self::PollUpdate { event_id, .. } => Some(*event_id),
            Self::PollVote { event_id, .. } => Some(*event_id),
            Self::TypingStart { room, .. } => Some(*room),
            // Ready and PresenceUpdate are global
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Replace this connection's room subscriptions. Rooms are event ids;
    /// only subscribed rooms receive chat/poll traffic.
    Subscribe { rooms: Vec<Uuid> },

    /// Indicate typing in an event room
    StartTyping { room: Uuid },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_scoping() {
        let event_id = Uuid::new_v4();
        let scoped = GatewayEvent::PollVote {
            poll_id: Uuid::new_v4(),
            event_id,
            user_id: Uuid::new_v4(),
            option: "Dune".into(),
        };
        assert_eq!(scoped.room(), Some(event_id));

        let global = GatewayEvent::PresenceUpdate {
            user_id: Uuid::new_v4(),
            name: "sam".into(),
            online: true,
        };
        assert_eq!(global.room(), None);
    }

    #[test]
    fn command_wire_shape() {
        let cmd: GatewayCommand =
            serde_json::from_str(r#"{"type":"StartTyping","data":{"room":"00000000-0000-0000-0000-000000000001"}}"#)
                .unwrap();
        match cmd {
            GatewayCommand::StartTyping { room } => {
                assert_eq!(room, "00000000-0000-0000-0000-000000000001".parse::<Uuid>().unwrap());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}

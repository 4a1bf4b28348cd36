use serde::{Deserialize, Serialize};

/// A board marker in percentage coordinates, both axes in `[0, 100]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Marker {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    /// Role name of the sending tab.
    pub from: String,
    pub text: String,
    pub ts: i64,
}

/// Frames exchanged over the team channel. There is no version field; any
/// change to this shape breaks older tabs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelMessage {
    Marker { marker: Marker },
    Chat { msg: ChatMessage },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channel_frames_match_tab_protocol() {
        let marker = ChannelMessage::Marker {
            marker: Marker {
                id: "m1".to_string(),
                x: 12.5,
                y: 80.0,
            },
        };
        assert_eq!(
            serde_json::to_value(&marker).expect("encode marker"),
            json!({"type": "marker", "marker": {"id": "m1", "x": 12.5, "y": 80.0}})
        );

        let chat: ChannelMessage = serde_json::from_value(json!({
            "type": "chat",
            "msg": {"id": "c1", "from": "Leader", "text": "hold", "ts": 5}
        }))
        .expect("decode chat");
        assert!(matches!(chat, ChannelMessage::Chat { ref msg } if msg.from == "Leader"));
    }

    #[test]
    fn unknown_frame_type_is_rejected() {
        let decoded = serde_json::from_value::<ChannelMessage>(json!({"type": "ping"}));
        assert!(decoded.is_err());
    }
}

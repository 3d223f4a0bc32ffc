//! Adapter for the videoroom conferencing plugin.

use janusgate_client::{AdapterResult, HandleContext, Jsep, PluginAdapter, PluginEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plugin identifier claimed by [`VideoRoomAdapter`].
pub const PLUGIN: &str = "janus.plugin.videoroom";

/// A room-scoped request without negotiation side effects.
#[derive(Debug, Clone, Serialize)]
pub struct RoomRequest {
    request: &'static str,
    /// Target room number.
    pub room: u64,
    /// Room PIN, when the room requires one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

impl RoomRequest {
    /// Asks for the current participant list of a room.
    pub fn list_participants(room: u64) -> Self {
        Self {
            request: "listparticipants",
            room,
            pin: None,
        }
    }

    /// Builder: set the room PIN.
    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }
}

/// A join request, either as a publisher or as a subscriber to an
/// existing feed.
#[derive(Debug, Clone, Serialize)]
pub struct JoinRequest {
    request: &'static str,
    ptype: &'static str,
    /// Target room number.
    pub room: u64,
    /// Feed to subscribe to (subscriber joins only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed: Option<u64>,
    /// Display name shown to other participants.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// Room PIN, when the room requires one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

impl JoinRequest {
    /// Joins a room as a publisher.
    pub fn publisher(room: u64) -> Self {
        Self {
            request: "join",
            ptype: "publisher",
            room,
            feed: None,
            display: None,
            pin: None,
        }
    }

    /// Joins a room as a subscriber to the given feed.
    pub fn subscriber(room: u64, feed: u64) -> Self {
        Self {
            request: "join",
            ptype: "subscriber",
            room,
            feed: Some(feed),
            display: None,
            pin: None,
        }
    }

    /// Builder: set the display name.
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    /// Builder: set the room PIN.
    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }
}

/// A publish request, usually sent together with an SDP offer.
#[derive(Debug, Clone, Serialize)]
pub struct PublishRequest {
    request: &'static str,
    /// Whether to publish audio.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<bool>,
    /// Whether to publish video.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<bool>,
    /// Whether to open a data channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<bool>,
    /// Bitrate cap in bits per second.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
}

impl PublishRequest {
    /// Publishes with the plugin's defaults for every stream.
    pub fn new() -> Self {
        Self {
            request: "publish",
            audio: None,
            video: None,
            data: None,
            bitrate: None,
        }
    }

    /// Builder: enable or disable audio.
    pub fn with_audio(mut self, audio: bool) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Builder: enable or disable video.
    pub fn with_video(mut self, video: bool) -> Self {
        self.video = Some(video);
        self
    }

    /// Builder: enable or disable the data channel.
    pub fn with_data(mut self, data: bool) -> Self {
        self.data = Some(data);
        self
    }

    /// Builder: cap the bitrate.
    pub fn with_bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = Some(bitrate);
        self
    }
}

impl Default for PublishRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Completes a subscription: sent together with the SDP answer to the
/// offer that came back on the subscriber join.
#[derive(Debug, Clone, Serialize)]
pub struct StartRequest {
    request: &'static str,
    /// Room the subscription belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<u64>,
}

impl StartRequest {
    pub fn new() -> Self {
        Self {
            request: "start",
            room: None,
        }
    }

    /// Builder: set the room.
    pub fn with_room(mut self, room: u64) -> Self {
        self.room = Some(room);
        self
    }
}

impl Default for StartRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// A participant as reported by `listparticipants`.
#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    /// Participant id.
    pub id: u64,
    /// Display name, if set.
    #[serde(default)]
    pub display: Option<String>,
    /// Whether the participant is an active publisher.
    #[serde(default)]
    pub publisher: Option<bool>,
    /// Whether the participant is currently talking.
    #[serde(default)]
    pub talking: Option<bool>,
}

/// An active publisher advertised in a `joined` or `event` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Publisher {
    /// Feed id to subscribe to.
    pub id: u64,
    /// Display name, if set.
    #[serde(default)]
    pub display: Option<String>,
}

/// The plugin payload of a videoroom response or event.
///
/// All fields beyond the discriminant are optional on the wire; absent
/// lists decode to empty collections.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoRoomResponse {
    /// Payload discriminant, e.g. `joined`, `event`, `participants`.
    pub videoroom: String,
    /// Room the payload refers to.
    #[serde(default)]
    pub room: Option<u64>,
    /// Participant id assigned to us (`joined`).
    #[serde(default)]
    pub id: Option<u64>,
    /// Private id for correlating subscriber handles (`joined`).
    #[serde(default)]
    pub private_id: Option<u64>,
    /// Participant list (`participants`).
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// Active publishers in the room.
    #[serde(default)]
    pub publishers: Vec<Publisher>,
}

/// Decodes videoroom payloads and records the plugin-assigned ids.
///
/// On a `joined` payload the participant id, private id and room number
/// are written into the handle context under `participant_id`,
/// `private_id` and `room`.
pub struct VideoRoomAdapter;

impl PluginAdapter for VideoRoomAdapter {
    fn plugin(&self) -> &str {
        PLUGIN
    }

    fn decode(
        &self,
        context: &mut HandleContext,
        data: &Value,
        jsep: Option<&Jsep>,
    ) -> AdapterResult<Option<PluginEvent>> {
        let resp: VideoRoomResponse = serde_json::from_value(data.clone())?;
        tracing::trace!(kind = %resp.videoroom, room = ?resp.room, "videoroom payload");
        if resp.videoroom == "joined" {
            if let Some(id) = resp.id {
                context.set("participant_id", id);
            }
            if let Some(private_id) = resp.private_id {
                context.set("private_id", private_id);
            }
            if let Some(room) = resp.room {
                context.set("room", room);
            }
        }
        let name = resp.videoroom.clone();
        Ok(Some(PluginEvent::new(name, resp).with_jsep(jsep.cloned())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_publisher_wire_shape() {
        let req = JoinRequest::publisher(1234)
            .with_display("alice")
            .with_pin("4321");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["request"], "join");
        assert_eq!(value["ptype"], "publisher");
        assert_eq!(value["room"], 1234);
        assert_eq!(value["display"], "alice");
        assert_eq!(value["pin"], "4321");
        assert!(value.get("feed").is_none());
    }

    #[test]
    fn join_subscriber_carries_feed() {
        let req = JoinRequest::subscriber(1234, 9001);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["ptype"], "subscriber");
        assert_eq!(value["feed"], 9001);
    }

    #[test]
    fn publish_omits_unset_options() {
        let req = PublishRequest::new().with_audio(true);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["request"], "publish");
        assert_eq!(value["audio"], true);
        assert!(value.get("video").is_none());
        assert!(value.get("bitrate").is_none());
    }

    #[test]
    fn start_wire_shape() {
        let req = StartRequest::new();
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, json!({"request": "start"}));

        let req = StartRequest::new().with_room(1234);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["room"], 1234);
    }

    #[test]
    fn empty_participant_list_decodes_to_empty_vec() {
        let resp: VideoRoomResponse = serde_json::from_value(json!({
            "videoroom": "participants",
            "room": 1234,
            "participants": []
        }))
        .unwrap();
        assert_eq!(resp.videoroom, "participants");
        assert!(resp.participants.is_empty());

        // An entirely absent list behaves the same.
        let resp: VideoRoomResponse =
            serde_json::from_value(json!({"videoroom": "event"})).unwrap();
        assert!(resp.participants.is_empty());
        assert!(resp.publishers.is_empty());
    }

    #[test]
    fn joined_payload_records_ids_in_context() {
        let mut context = HandleContext::new();
        let data = json!({
            "videoroom": "joined",
            "room": 1234,
            "id": 9001,
            "private_id": 42,
            "publishers": [{"id": 7, "display": "bob"}]
        });

        let event = VideoRoomAdapter
            .decode(&mut context, &data, None)
            .unwrap()
            .unwrap();
        assert_eq!(event.name(), "joined");
        assert_eq!(context.get_i64("participant_id"), 9001);
        assert_eq!(context.get_i64("private_id"), 42);
        assert_eq!(context.get_i64("room"), 1234);

        let body = event.body::<VideoRoomResponse>().unwrap();
        assert_eq!(body.publishers[0].id, 7);
    }

    #[test]
    fn non_joined_payload_leaves_context_alone() {
        let mut context = HandleContext::new();
        let data = json!({"videoroom": "event", "room": 1234, "id": 5});
        VideoRoomAdapter
            .decode(&mut context, &data, None)
            .unwrap()
            .unwrap();
        assert!(context.is_empty());
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let mut context = HandleContext::new();
        // Discriminant missing entirely.
        let data = json!({"room": 1234});
        assert!(VideoRoomAdapter.decode(&mut context, &data, None).is_err());
    }
}

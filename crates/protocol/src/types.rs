//! Message body shapes the orchestration layer constructs or decodes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Body of the device-introduction message sent right after the
/// transport opens.
///
/// The capability metadata mirrors what the appliance expects from a
/// first-party remote; it gates which message types the appliance
/// will send back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfoBody {
    pub unique_identifier: String,
    pub name: String,
    pub localized_model_name: String,
    pub system_build_version: String,
    pub application_bundle_identifier: String,
    pub application_bundle_version: String,
    pub protocol_version: i32,
    pub allows_pairing: bool,
    pub last_supported_message_type: u32,
    pub supports_system_pairing: bool,
}

impl DeviceInfoBody {
    /// Introduction body for the given session identifier.
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            unique_identifier: session_id.into(),
            name: "mrp-rs".to_string(),
            localized_model_name: "iPhone".to_string(),
            system_build_version: "17C54".to_string(),
            application_bundle_identifier: "com.apple.TVRemote".to_string(),
            application_bundle_version: "344.28".to_string(),
            protocol_version: 1,
            allows_pairing: true,
            last_supported_message_type: 45,
            supports_system_pairing: true,
        }
    }
}

/// Which live-update feeds the appliance should push to this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientUpdatesConfig {
    pub now_playing_updates: bool,
    pub artwork_updates: bool,
    pub keyboard_updates: bool,
    pub volume_updates: bool,
}

impl ClientUpdatesConfig {
    /// Now-playing and artwork feeds on; keyboard and volume off.
    pub fn now_playing_and_artwork() -> Self {
        Self {
            now_playing_updates: true,
            artwork_updates: true,
            keyboard_updates: false,
            volume_updates: false,
        }
    }
}

/// Connection state declared after session verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Artwork sizing hint for playback-queue requests. A negative width
/// asks the appliance to scale proportionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtworkSize {
    pub width: i32,
    pub height: i32,
}

/// Caller-facing playback-queue request options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackQueueRequest {
    pub location: i64,
    pub length: i64,
    pub artwork_size: Option<ArtworkSize>,
}

impl PlaybackQueueRequest {
    /// The page the background refresh loop asks for: first 100
    /// entries with proportional 368-pixel artwork.
    pub fn background_refresh() -> Self {
        Self {
            location: 0,
            length: 100,
            artwork_size: Some(ArtworkSize {
                width: -1,
                height: 368,
            }),
        }
    }

    /// Flattens the options into the wire body, attaching a fresh
    /// request identifier and expanding the artwork hint into the
    /// width/height fields the appliance reads.
    pub fn into_body(self) -> Value {
        let mut body = serde_json::json!({
            "requestID": Uuid::new_v4().to_string(),
            "location": self.location,
            "length": self.length,
        });
        if let Some(artwork) = self.artwork_size {
            body["artworkWidth"] = Value::from(artwork.width);
            body["artworkHeight"] = Value::from(artwork.height);
        }
        body
    }
}

impl Default for PlaybackQueueRequest {
    fn default() -> Self {
        Self::background_refresh()
    }
}

/// Now-playing state decoded from a state-snapshot payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlayingInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<f64>,
    pub elapsed_time: Option<f64>,
    pub timestamp: Option<f64>,
    pub app_display_name: Option<String>,
    pub app_bundle_identifier: Option<String>,
    pub playback_state: Option<i64>,
}

impl NowPlayingInfo {
    /// Decodes the now-playing block of a state-snapshot payload.
    ///
    /// The display name and bundle identifier live beside the block
    /// rather than inside it, attached to the player path.
    pub fn from_payload(payload: &Value) -> Self {
        let info = &payload["nowPlayingInfo"];
        Self {
            title: string_field(info, "title"),
            artist: string_field(info, "artist"),
            album: string_field(info, "album"),
            duration: info["duration"].as_f64(),
            elapsed_time: info["elapsedTime"].as_f64(),
            timestamp: info["timestamp"].as_f64(),
            app_display_name: string_field(payload, "displayName"),
            app_bundle_identifier: payload["playerPath"]["client"]["bundleIdentifier"]
                .as_str()
                .map(str::to_string),
            playback_state: payload["playbackState"].as_i64(),
        }
    }
}

/// One entry of the appliance's supported-commands list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedCommand {
    pub command: String,
    pub enabled: bool,
    pub can_scrub: bool,
}

impl SupportedCommand {
    /// Decodes the supported-commands block of a state-snapshot
    /// payload, preserving source order. Missing flags default to
    /// `false`.
    pub fn list_from_payload(payload: &Value) -> Vec<SupportedCommand> {
        payload["supportedCommands"]["supportedCommands"]
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| SupportedCommand {
                        command: entry["command"].as_str().unwrap_or_default().to_string(),
                        enabled: entry["enabled"].as_bool().unwrap_or(false),
                        can_scrub: entry["canScrub"].as_bool().unwrap_or(false),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value[key].as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn device_info_serializes_camel_case() {
        let body = serde_json::to_value(DeviceInfoBody::for_session("abc")).unwrap();
        assert_eq!(body["uniqueIdentifier"], "abc");
        assert_eq!(body["protocolVersion"], 1);
        assert_eq!(body["lastSupportedMessageType"], 45);
        assert_eq!(body["allowsPairing"], true);
    }

    #[test]
    fn updates_config_enables_now_playing_only() {
        let config = serde_json::to_value(ClientUpdatesConfig::now_playing_and_artwork()).unwrap();
        assert_eq!(config["nowPlayingUpdates"], true);
        assert_eq!(config["artworkUpdates"], true);
        assert_eq!(config["keyboardUpdates"], false);
        assert_eq!(config["volumeUpdates"], false);
    }

    #[test]
    fn queue_request_flattens_artwork_hint() {
        let body = PlaybackQueueRequest::background_refresh().into_body();
        assert_eq!(body["length"], 100);
        assert_eq!(body["location"], 0);
        assert_eq!(body["artworkWidth"], -1);
        assert_eq!(body["artworkHeight"], 368);
        assert!(body.get("artworkSize").is_none());
        assert!(body["requestID"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[test]
    fn queue_request_without_artwork_omits_dimensions() {
        let body = PlaybackQueueRequest {
            location: 5,
            length: 20,
            artwork_size: None,
        }
        .into_body();
        assert!(body.get("artworkWidth").is_none());
        assert_eq!(body["location"], 5);
    }

    #[test]
    fn now_playing_decodes_nested_fields() {
        let payload = json!({
            "nowPlayingInfo": {
                "title": "Song",
                "artist": "Artist",
                "album": "Album",
                "duration": 240.5,
                "elapsedTime": 12.25,
                "timestamp": 1234.0,
            },
            "displayName": "Music",
            "playerPath": {"client": {"bundleIdentifier": "com.apple.Music"}},
            "playbackState": 1,
        });

        let info = NowPlayingInfo::from_payload(&payload);
        assert_eq!(info.title.as_deref(), Some("Song"));
        assert_eq!(info.duration, Some(240.5));
        assert_eq!(info.app_display_name.as_deref(), Some("Music"));
        assert_eq!(
            info.app_bundle_identifier.as_deref(),
            Some("com.apple.Music")
        );
        assert_eq!(info.playback_state, Some(1));
    }

    #[test]
    fn now_playing_tolerates_sparse_payloads() {
        let info = NowPlayingInfo::from_payload(&json!({"nowPlayingInfo": {}}));
        assert!(info.title.is_none());
        assert!(info.playback_state.is_none());
    }

    #[test]
    fn supported_commands_preserve_order_and_defaults() {
        let payload = json!({
            "supportedCommands": {
                "supportedCommands": [
                    {"command": "Play", "enabled": true, "canScrub": true},
                    {"command": "Pause"},
                    {"command": "SkipForward", "enabled": false},
                ]
            }
        });

        let commands = SupportedCommand::list_from_payload(&payload);
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].command, "Play");
        assert!(commands[0].enabled && commands[0].can_scrub);
        assert_eq!(commands[1].command, "Pause");
        assert!(!commands[1].enabled && !commands[1].can_scrub);
        assert_eq!(commands[2].command, "SkipForward");
    }

    #[test]
    fn missing_commands_block_decodes_empty() {
        assert!(SupportedCommand::list_from_payload(&json!({})).is_empty());
    }
}

//! Cross-context messages between the popup, the page and the background worker.
//!
//! Wire format is `{ "type": "...", "payload": { ... } }`.

use crate::capture::CaptureRequest;
use crate::geometry::AspectConstraint;
use crate::host::MessageSender;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Popup or shortcut → background: start a new selection.
    InitiateCapture {
        #[serde(rename = "aspectRatio", default)]
        aspect_ratio: AspectConstraint,
    },
    /// Background → page: arm the selection overlay.
    StartSelection {
        #[serde(rename = "aspectRatio", default)]
        aspect_ratio: AspectConstraint,
    },
    /// Page → background: capture this region.
    #[serde(alias = "CAPTURE_REGION")]
    Capture(CaptureRequest),
    /// Popup → background: save the composite.
    DownloadImage {
        #[serde(rename = "dataUrl")]
        data_url: String,
    },
}

impl Message {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A message plus the page it came from. Popup and shortcut messages have
/// no sender.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub message: Message,
    pub sender: Option<MessageSender>,
}

impl Envelope {
    pub fn from_page(message: Message, sender: MessageSender) -> Self {
        Self {
            message,
            sender: Some(sender),
        }
    }

    pub fn from_extension(message: Message) -> Self {
        Self {
            message,
            sender: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SelectionRect;

    #[test]
    fn capture_region_alias_is_accepted() {
        let msg = Message::from_json(
            r#"{"type":"CAPTURE_REGION","payload":{"left":1,"top":2,"width":3,"height":4,"devicePixelRatio":2}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            Message::Capture(CaptureRequest::new(SelectionRect::new(1.0, 2.0, 3.0, 4.0), 2.0))
        );
    }

    #[test]
    fn capture_is_written_with_canonical_type() {
        let msg = Message::Capture(CaptureRequest::new(SelectionRect::new(1.0, 2.0, 3.0, 4.0), 1.0));
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "CAPTURE");
        assert_eq!(value["payload"]["devicePixelRatio"], 1.0);
    }

    #[test]
    fn initiate_capture_carries_aspect_ratio() {
        let msg =
            Message::from_json(r#"{"type":"INITIATE_CAPTURE","payload":{"aspectRatio":"4:3"}}"#).unwrap();
        assert_eq!(
            msg,
            Message::InitiateCapture {
                aspect_ratio: AspectConstraint::Ratio { w: 4.0, h: 3.0 }
            }
        );
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["payload"]["aspectRatio"], "4:3");
    }

    #[test]
    fn to_json_round_trips_through_from_json() {
        let msg = Message::StartSelection {
            aspect_ratio: AspectConstraint::Ratio { w: 16.0, h: 9.0 },
        };
        let text = msg.to_json().unwrap();
        assert_eq!(Message::from_json(&text).unwrap(), msg);
    }

    #[test]
    fn download_uses_data_url_key() {
        let msg = Message::DownloadImage {
            data_url: "data:image/png;base64,AA==".into(),
        };
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "DOWNLOAD_IMAGE");
        assert_eq!(value["payload"]["dataUrl"], "data:image/png;base64,AA==");
    }
}

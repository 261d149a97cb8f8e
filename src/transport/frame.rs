//! Pub/sub wire frames
//!
//! One frame per line, encoded as tagged UTF-8 JSON. Published frames flow
//! publisher → broker → subscriber; subscription control frames flow
//! subscriber → broker and are echoed upstream to publishers as filter
//! hints. Topics are opaque strings at this layer.

use super::TransportError;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// A single pub/sub wire frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Frame {
    /// Published message on a topic
    #[serde(rename = "pub")]
    Publish { topic: String, payload: String },
    /// Register a topic-prefix filter
    #[serde(rename = "sub")]
    Subscribe { topic: String },
    /// Remove a topic-prefix filter
    #[serde(rename = "unsub")]
    Unsubscribe { topic: String },
}

/// Write one frame as a JSON line and flush it
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(frame)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame; `Ok(None)` on a cleanly closed stream
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let bytes = reader.read_line(&mut line).await?;
    if bytes == 0 {
        return Ok(None);
    }
    let frame = serde_json::from_str(line.trim_end())?;
    Ok(Some(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_frame_round_trip() {
        let frames = vec![
            Frame::Publish {
                topic: "geral".to_string(),
                payload: "hello".to_string(),
            },
            Frame::Subscribe {
                topic: "user_Bot1".to_string(),
            },
            Frame::Unsubscribe {
                topic: "user_Bot1".to_string(),
            },
        ];

        let mut wire = Vec::new();
        for frame in &frames {
            write_frame(&mut wire, frame).await.unwrap();
        }

        let mut reader = BufReader::new(Cursor::new(wire));
        for expected in &frames {
            let read = read_frame(&mut reader).await.unwrap().unwrap();
            assert_eq!(&read, expected);
        }
        assert_eq!(read_frame(&mut reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_tag_names_on_the_wire() {
        let mut wire = Vec::new();
        write_frame(
            &mut wire,
            &Frame::Publish {
                topic: "t".to_string(),
                payload: "p".to_string(),
            },
        )
        .await
        .unwrap();

        let text = String::from_utf8(wire).unwrap();
        assert!(text.contains(r#""type":"pub""#));
        assert!(text.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_garbage_line_is_a_codec_error() {
        let mut reader = BufReader::new(Cursor::new(b"not json\n".to_vec()));
        let result = read_frame(&mut reader).await;
        assert!(matches!(result, Err(TransportError::Codec(_))));
    }

    #[tokio::test]
    async fn test_payload_with_newline_stays_in_one_line() {
        // serde_json escapes the newline, so framing survives.
        let frame = Frame::Publish {
            topic: "geral".to_string(),
            payload: "line one\nline two".to_string(),
        };
        let mut wire = Vec::new();
        write_frame(&mut wire, &frame).await.unwrap();

        let mut reader = BufReader::new(Cursor::new(wire));
        assert_eq!(read_frame(&mut reader).await.unwrap(), Some(frame));
    }
}

//! JSON-lines keypoint recordings: one `{"t_ms": .., "keypoints": [[y, x, score], ..]}`
//! object per line, as dumped by the pose-estimation host.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// Milliseconds since the start of the recording.
    pub t_ms: u64,
    pub keypoints: Vec<[f64; 3]>,
}

pub fn parse_recording(content: &str) -> Result<Vec<RecordedFrame>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}: invalid frame", i + 1))
        })
        .collect()
}

pub fn load_recording<P: AsRef<Path>>(path: P) -> Result<Vec<RecordedFrame>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read recording {}", path.display()))?;
    parse_recording(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_blank_lines() {
        let content = "{\"t_ms\": 0, \"keypoints\": [[0.1, 0.2, 0.9]]}\n\n{\"t_ms\": 33, \"keypoints\": []}\n";
        let frames = parse_recording(content).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].keypoints[0], [0.1, 0.2, 0.9]);
        assert_eq!(frames[1].t_ms, 33);
    }

    #[test]
    fn test_parse_reports_line_number() {
        let content = "{\"t_ms\": 0, \"keypoints\": []}\nnot json\n";
        let err = parse_recording(content).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }
}

//! JSON test vector loader for frame tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use base64::Engine;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TestVector {
    pub description: String,
    pub frame: FrameData,
    pub expect: ExpectFrames,
    #[serde(default)]
    pub expect_error: Option<ExpectError>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectFrames {
    /// Hex-encoded payloads, in order.
    pub payloads: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectError {
    pub class: String,
    pub expected: usize,
    pub received: usize,
}

#[derive(Debug, Deserialize)]
pub struct FrameData {
    pub encoding: String,
    pub data: String,
}

impl FrameData {
    pub fn decode(&self) -> Vec<u8> {
        match self.encoding.as_str() {
            "base64" => base64::engine::general_purpose::STANDARD
                .decode(&self.data)
                .expect("invalid base64 in test vector"),
            "hex" => hex::decode(&self.data).expect("invalid hex in test vector"),
            other => panic!("unsupported encoding: {other}"),
        }
    }
}

impl ExpectFrames {
    pub fn decode(&self) -> Vec<Vec<u8>> {
        self.payloads
            .iter()
            .map(|p| hex::decode(p).expect("invalid hex payload in test vector"))
            .collect()
    }
}

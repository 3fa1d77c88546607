//! Request/response envelopes carried inside frames.
//!
//! These are hand-declared prost messages that are wire-compatible with the
//! conformance runner's `ClientCompatRequest` / `ClientCompatResponse`. Only
//! the fields the relay and its collaborators touch are typed; nested records
//! the relay never inspects (`raw_request`, `connect_error_raw`) are kept as
//! opaque bytes, which is wire-identical to an embedded message.

use bytes::Bytes;
use prost::Message;

use crate::error::{RelayError, Result};

/// HTTP version selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum HttpVersion {
    Unspecified = 0,
    Http1 = 1,
    Http2 = 2,
    Http3 = 3,
}

/// RPC protocol selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Protocol {
    Unspecified = 0,
    Connect = 1,
    Grpc = 2,
    GrpcWeb = 3,
}

/// Message codec selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Codec {
    Unspecified = 0,
    Proto = 1,
    Json = 2,
    Text = 3,
}

/// Compression selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Compression {
    Unspecified = 0,
    Identity = 1,
    Gzip = 2,
    Br = 3,
    Zstd = 4,
    Deflate = 5,
    Snappy = 6,
}

/// Call shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum StreamType {
    Unspecified = 0,
    Unary = 1,
    ClientStream = 2,
    ServerStream = 3,
    HalfDuplexBidiStream = 4,
    FullDuplexBidiStream = 5,
}

/// RPC status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Code {
    Unspecified = 0,
    Canceled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

/// Header (or trailer) with one or more values.
#[derive(Clone, PartialEq, Message)]
pub struct Header {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, repeated, tag = "2")]
    pub value: Vec<String>,
}

impl Header {
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            value: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// `google.protobuf.Any`: a typed payload the relay never unpacks.
#[derive(Clone, PartialEq, Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "bytes", tag = "2")]
    pub value: Bytes,
}

/// Client certificate and key (PEM).
#[derive(Clone, PartialEq, Message)]
pub struct TlsCreds {
    #[prost(bytes = "bytes", tag = "1")]
    pub cert: Bytes,
    #[prost(bytes = "bytes", tag = "2")]
    pub key: Bytes,
}

/// Cancellation directive for a single call.
#[derive(Clone, PartialEq, Message)]
pub struct Cancel {
    #[prost(oneof = "CancelTiming", tags = "1, 2, 3")]
    pub cancel_timing: Option<CancelTiming>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum CancelTiming {
    /// Cancel before the client half-closes.
    #[prost(message, tag = "1")]
    BeforeCloseSend(()),
    /// Cancel this many milliseconds after half-close.
    #[prost(uint32, tag = "2")]
    AfterCloseSendMs(u32),
    /// Cancel once this many responses have arrived.
    #[prost(uint32, tag = "3")]
    AfterNumResponses(u32),
}

/// One test invocation, as written by the driver.
#[derive(Clone, PartialEq, Message)]
pub struct ClientCompatRequest {
    #[prost(string, tag = "1")]
    pub test_name: String,
    #[prost(enumeration = "HttpVersion", tag = "2")]
    pub http_version: i32,
    #[prost(enumeration = "Protocol", tag = "3")]
    pub protocol: i32,
    #[prost(enumeration = "Codec", tag = "4")]
    pub codec: i32,
    #[prost(enumeration = "Compression", tag = "5")]
    pub compression: i32,
    #[prost(string, tag = "6")]
    pub host: String,
    #[prost(uint32, tag = "7")]
    pub port: u32,
    #[prost(bytes = "bytes", tag = "8")]
    pub server_tls_cert: Bytes,
    #[prost(message, optional, tag = "9")]
    pub client_tls_creds: Option<TlsCreds>,
    #[prost(uint32, tag = "10")]
    pub message_receive_limit: u32,
    #[prost(string, tag = "11")]
    pub service: String,
    #[prost(string, tag = "12")]
    pub method: String,
    #[prost(enumeration = "StreamType", tag = "13")]
    pub stream_type: i32,
    #[prost(bool, tag = "14")]
    pub use_get_http_method: bool,
    #[prost(message, repeated, tag = "15")]
    pub request_headers: Vec<Header>,
    #[prost(message, repeated, tag = "16")]
    pub request_messages: Vec<Any>,
    #[prost(uint32, optional, tag = "17")]
    pub timeout_ms: Option<u32>,
    #[prost(uint32, tag = "18")]
    pub request_delay_ms: u32,
    #[prost(message, optional, tag = "19")]
    pub cancel: Option<Cancel>,
    /// Raw HTTP override, passed through untouched.
    #[prost(bytes = "bytes", optional, tag = "20")]
    pub raw_request: Option<Bytes>,
}

impl ClientCompatRequest {
    /// Cancellation timing, if any.
    pub fn cancel_timing(&self) -> Option<&CancelTiming> {
        self.cancel.as_ref().and_then(|c| c.cancel_timing.as_ref())
    }
}

/// What the server saw, echoed back by conformance services.
#[derive(Clone, PartialEq, Message)]
pub struct RequestInfo {
    #[prost(message, repeated, tag = "1")]
    pub request_headers: Vec<Header>,
    #[prost(int64, optional, tag = "2")]
    pub timeout_ms: Option<i64>,
    #[prost(message, repeated, tag = "3")]
    pub requests: Vec<Any>,
}

/// One response message.
#[derive(Clone, PartialEq, Message)]
pub struct ConformancePayload {
    #[prost(bytes = "bytes", tag = "1")]
    pub data: Bytes,
    #[prost(message, optional, tag = "2")]
    pub request_info: Option<RequestInfo>,
}

/// RPC-level error returned by the system under test.
#[derive(Clone, PartialEq, Message)]
pub struct RpcError {
    #[prost(enumeration = "Code", tag = "1")]
    pub code: i32,
    #[prost(string, optional, tag = "2")]
    pub message: Option<String>,
    #[prost(message, repeated, tag = "3")]
    pub details: Vec<Any>,
}

impl RpcError {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: Some(message.into()),
            details: Vec::new(),
        }
    }
}

/// Low-level observations about the HTTP exchange.
#[derive(Clone, PartialEq, Message)]
pub struct WireDetails {
    #[prost(int32, tag = "1")]
    pub actual_status_code: i32,
    #[prost(bytes = "bytes", optional, tag = "2")]
    pub connect_error_raw: Option<Bytes>,
    #[prost(message, repeated, tag = "3")]
    pub actual_http_trailers: Vec<Header>,
    #[prost(string, optional, tag = "4")]
    pub actual_grpcweb_trailers: Option<String>,
}

/// Successful completion of a test case (the RPC itself may still have failed).
#[derive(Clone, PartialEq, Message)]
pub struct ClientResponseResult {
    #[prost(message, repeated, tag = "1")]
    pub response_headers: Vec<Header>,
    #[prost(message, repeated, tag = "2")]
    pub payloads: Vec<ConformancePayload>,
    #[prost(message, optional, tag = "3")]
    pub error: Option<RpcError>,
    #[prost(message, repeated, tag = "4")]
    pub response_trailers: Vec<Header>,
    #[prost(int32, tag = "5")]
    pub num_unsent_requests: i32,
    #[prost(message, optional, tag = "7")]
    pub wire_details: Option<WireDetails>,
}

/// The test case could not be run at all.
#[derive(Clone, PartialEq, Message)]
pub struct ClientErrorResult {
    #[prost(string, tag = "1")]
    pub message: String,
}

/// Result of one test invocation, as read back by the driver.
#[derive(Clone, PartialEq, Message)]
pub struct ClientCompatResponse {
    #[prost(string, tag = "1")]
    pub test_name: String,
    #[prost(oneof = "Outcome", tags = "2, 3")]
    pub result: Option<Outcome>,
    #[prost(string, repeated, tag = "4")]
    pub feedback: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum Outcome {
    #[prost(message, tag = "2")]
    Response(ClientResponseResult),
    #[prost(message, tag = "3")]
    Error(ClientErrorResult),
}

impl ClientCompatResponse {
    pub fn success(test_name: impl Into<String>, result: ClientResponseResult) -> Self {
        Self {
            test_name: test_name.into(),
            result: Some(Outcome::Response(result)),
            feedback: Vec::new(),
        }
    }

    pub fn failure(test_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            result: Some(Outcome::Error(ClientErrorResult {
                message: message.into(),
            })),
            feedback: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.result, Some(Outcome::Error(_)))
    }

    /// Turn an envelope produced by a collaborator into its result.
    ///
    /// An error-kind envelope becomes [`RelayError::Invocation`] carrying the
    /// collaborator's message; an envelope with no result at all is also an
    /// invocation error.
    pub fn into_outcome(self) -> Result<ClientResponseResult> {
        match self.result {
            Some(Outcome::Response(result)) => Ok(result),
            Some(Outcome::Error(err)) => Err(RelayError::Invocation(err.message)),
            None => Err(RelayError::Invocation(format!(
                "collaborator returned no result for {:?}",
                self.test_name
            ))),
        }
    }
}

/// Decode-only view used to salvage the test name from a broken request.
///
/// Every field other than `test_name` is skipped by length, so corruption
/// nested inside later fields does not prevent recovery.
#[derive(Clone, PartialEq, Message)]
struct TestNameOnly {
    #[prost(string, tag = "1")]
    test_name: String,
}

/// Decode a request envelope.
pub fn decode_request(payload: Bytes) -> Result<ClientCompatRequest> {
    ClientCompatRequest::decode(payload).map_err(|e| RelayError::Decode(e.to_string()))
}

/// Best-effort recovery of `test_name` from a payload that failed to decode.
///
/// An absent or empty name counts as unrecoverable.
pub fn recover_test_name(payload: &[u8]) -> Option<String> {
    TestNameOnly::decode(payload)
        .ok()
        .map(|salvaged| salvaged.test_name)
        .filter(|name| !name.is_empty())
}

/// Decode a response envelope produced by a forwarding collaborator.
pub fn decode_response(payload: Bytes) -> Result<ClientCompatResponse> {
    ClientCompatResponse::decode(payload)
        .map_err(|e| RelayError::Invocation(format!("collaborator sent an undecodable response: {e}")))
}

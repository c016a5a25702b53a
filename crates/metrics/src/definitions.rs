//! Metric name and label definitions.
//!
//! Every metric stubwire records is named here so the set of exported series
//! is documented in one place.

/// Message traffic observed by the stub engine
pub mod messages {
    /// Total number of inbound channel messages processed
    pub const RECEIVED_TOTAL: &str = "stubwire_messages_received_total";
    /// Inbound messages that matched a message stub
    pub const MATCHED_TOTAL: &str = "stubwire_messages_matched_total";
    /// Inbound messages that matched no message stub
    pub const UNMATCHED_TOTAL: &str = "stubwire_messages_unmatched_total";
    /// Total number of outbound messages delivered to channels
    pub const SENT_TOTAL: &str = "stubwire_messages_sent_total";
    /// Outbound deliveries that failed at the transport
    pub const SEND_ERRORS_TOTAL: &str = "stubwire_message_send_errors_total";
    /// Message stubs fired by an HTTP trigger
    pub const HTTP_TRIGGERED_TOTAL: &str = "stubwire_messages_http_triggered_total";
}

/// Live channel registry
pub mod channels {
    /// Number of currently registered channels
    pub const ACTIVE: &str = "stubwire_channels_active";
    /// Total number of channels opened
    pub const OPENED_TOTAL: &str = "stubwire_channels_opened_total";
    /// Total number of channels closed by the registry
    pub const CLOSED_TOTAL: &str = "stubwire_channels_closed_total";
}

/// Message journal
pub mod journal {
    /// Number of events currently retained
    pub const EVENTS: &str = "stubwire_journal_events";
    /// Events evicted because the journal reached its size limit
    pub const EVICTIONS_TOTAL: &str = "stubwire_journal_evictions_total";
    /// Blocking waits that returned because the timeout elapsed
    pub const WAIT_TIMEOUTS_TOTAL: &str = "stubwire_journal_wait_timeouts_total";
}

/// WebSocket and HTTP front end
pub mod gateway {
    /// Total number of WebSocket upgrades accepted
    pub const CONNECTIONS_TOTAL: &str = "stubwire_gateway_connections_total";
    /// Plain HTTP requests reported to the message engine
    pub const HTTP_REQUESTS_TOTAL: &str = "stubwire_gateway_http_requests_total";
}

/// Common label keys
pub mod labels {
    pub const CHANNEL_TYPE: &str = "channel_type";
    pub const TRIGGER: &str = "trigger";
    pub const METHOD: &str = "method";
}

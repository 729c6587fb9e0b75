use std::time::Duration;

use rdkafka::config::ClientConfig;

/// Where a group with no committed offset starts reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialOffset {
    /// Only records produced after the group joins
    #[default]
    Newest,
    /// Replay the partition from the beginning
    Oldest,
}

impl InitialOffset {
    fn as_reset_policy(&self) -> &'static str {
        match self {
            InitialOffset::Newest => "latest",
            InitialOffset::Oldest => "earliest",
        }
    }
}

/// Consumer-group session settings
///
/// Defaults: start at the newest offset, reset out-of-range offsets instead
/// of failing, heartbeat every 3s, evict after 60s of silence, allow 60s for
/// a rebalance, auto-commit stored offsets every second.
#[derive(Debug, Clone)]
pub struct ConsumerGroupConfig {
    /// Bootstrap broker addresses
    pub brokers: Vec<String>,

    /// Consumer group identifier
    pub group_id: String,

    /// Offset policy for new groups and invalid committed offsets
    pub initial_offset: InitialOffset,

    /// Interval between group heartbeats
    pub heartbeat_interval: Duration,

    /// A member is evicted after this long without a heartbeat
    pub session_timeout: Duration,

    /// Time a rebalance may take before the member is considered failed
    pub rebalance_timeout: Duration,

    /// Offset auto-commit interval
    pub auto_commit_interval: Duration,

    /// How long construction waits for broker metadata
    pub metadata_timeout: Duration,
}

impl ConsumerGroupConfig {
    /// Create a configuration with the default group policies
    ///
    /// # Example
    ///
    /// ```
    /// use delivery_gateway::consumer::ConsumerGroupConfig;
    ///
    /// let config = ConsumerGroupConfig::new(vec!["b1:9092".to_string()], "g1");
    /// let client = config.client_config();
    /// assert_eq!(client.get("group.id"), Some("g1"));
    /// ```
    pub fn new(brokers: Vec<String>, group_id: impl Into<String>) -> Self {
        Self {
            brokers,
            group_id: group_id.into(),
            initial_offset: InitialOffset::Newest,
            heartbeat_interval: Duration::from_secs(3),
            session_timeout: Duration::from_secs(60),
            rebalance_timeout: Duration::from_secs(60),
            auto_commit_interval: Duration::from_secs(1),
            metadata_timeout: Duration::from_secs(10),
        }
    }

    /// Set the initial offset policy (builder pattern)
    pub fn with_initial_offset(mut self, offset: InitialOffset) -> Self {
        self.initial_offset = offset;
        self
    }

    /// Set heartbeat interval and session timeout (builder pattern)
    pub fn with_heartbeat(mut self, interval: Duration, session_timeout: Duration) -> Self {
        self.heartbeat_interval = interval;
        self.session_timeout = session_timeout;
        self
    }

    /// Set the rebalance timeout (builder pattern)
    pub fn with_rebalance_timeout(mut self, timeout: Duration) -> Self {
        self.rebalance_timeout = timeout;
        self
    }

    /// Set the auto-commit interval (builder pattern)
    pub fn with_auto_commit_interval(mut self, interval: Duration) -> Self {
        self.auto_commit_interval = interval;
        self
    }

    /// Set the metadata wait used at construction (builder pattern)
    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    /// Render the librdkafka client properties
    pub fn client_config(&self) -> ClientConfig {
        // librdkafka rejects max.poll.interval.ms below session.timeout.ms
        let rebalance_timeout = self.rebalance_timeout.max(self.session_timeout);

        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", self.brokers.join(","))
            .set("group.id", &self.group_id)
            .set("api.version.request", "true")
            .set("auto.offset.reset", self.initial_offset.as_reset_policy())
            .set("heartbeat.interval.ms", millis(self.heartbeat_interval))
            .set("session.timeout.ms", millis(self.session_timeout))
            .set("max.poll.interval.ms", millis(rebalance_timeout))
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", millis(self.auto_commit_interval))
            // Offsets are stored only after the handler accepts a record
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "false");
        config
    }
}

fn millis(duration: Duration) -> String {
    duration.as_millis().to_string()
}

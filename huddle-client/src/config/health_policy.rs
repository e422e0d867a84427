use std::time::Duration;

/// Thresholds driving per-peer health transitions.
#[derive(Debug, Clone)]
pub struct HealthPolicy {
    /// ICE restarts attempted before a peer is given up.
    pub max_restart_attempts: u32,
    /// Upper bound on time spent reconnecting.
    pub max_reconnect_wait: Duration,
    /// Time a new peer may spend connecting.
    pub connect_timeout: Duration,
    pub loss_threshold: f64,
    pub rtt_threshold: Duration,
    /// Time an offer may wait for its answer before it is sent again.
    pub answer_timeout: Duration,
    /// Offers sent for one exchange before the peer is dropped.
    pub max_offer_attempts: u32,
}

impl HealthPolicy {
    pub fn restart_interval(&self) -> Duration {
        self.max_reconnect_wait / self.max_restart_attempts.max(1)
    }

    pub fn is_degraded(&self, packet_loss: f64, rtt: Duration) -> bool {
        packet_loss > self.loss_threshold || rtt > self.rtt_threshold
    }
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            max_restart_attempts: 3,
            max_reconnect_wait: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(15),
            loss_threshold: 0.1,
            rtt_threshold: Duration::from_millis(500),
            answer_timeout: Duration::from_secs(10),
            max_offer_attempts: 3,
        }
    }
}

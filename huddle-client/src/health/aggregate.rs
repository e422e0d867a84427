use huddle_core::{ConnectionStatus, HealthState};

/// Room-wide status from the health of every remote peer. Degraded outranks
/// connecting, which outranks connected; an empty room is connected.
pub fn aggregate_status<I>(peers: I, signaling_up: bool) -> ConnectionStatus
where
    I: IntoIterator<Item = HealthState>,
{
    let mut status = ConnectionStatus::Connected;
    for health in peers {
        match health {
            HealthState::Degraded | HealthState::Reconnecting => {
                return ConnectionStatus::Degraded;
            }
            HealthState::Connecting => status = ConnectionStatus::Connecting,
            HealthState::Connected | HealthState::Failed | HealthState::Closed => {}
        }
    }

    if !signaling_up {
        return ConnectionStatus::Degraded;
    }
    status
}

use crate::error::SessionError;
use crate::session::SessionEvent;
use tokio::sync::{broadcast, oneshot};

/// Requests from room handles to the session actor.
pub(crate) enum SessionCommand {
    SetAudioEnabled {
        enabled: bool,
        reply: oneshot::Sender<()>,
    },
    SetVideoEnabled {
        enabled: bool,
        reply: oneshot::Sender<()>,
    },
    SetScreenShare {
        enabled: bool,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Subscribe {
        reply: oneshot::Sender<broadcast::Receiver<SessionEvent>>,
    },
    Leave {
        reply: oneshot::Sender<()>,
    },
}

/// Progress of the request half of a stream.
///
/// The request side is driven by the client-facing multiplexer, which moves it
/// freely between these values.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestState {
    #[default]
    Initial,
    HeaderComplete,
    MsgComplete,
    StreamClosed,
    ConnectFail,
}

/// Progress of the response half of a stream.
///
/// Only ever advances: `Initial` → `HeaderComplete` → `MsgComplete`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResponseState {
    #[default]
    Initial,
    HeaderComplete,
    MsgComplete,
}

impl ResponseState {
    #[inline]
    pub fn is_complete(&self) -> bool {
        matches!(self, ResponseState::MsgComplete)
    }
}

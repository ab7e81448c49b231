//! Loop-control signal returned by every message handler.

/// What the dispatch loop does after a handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Continuation {
    /// Keep reading messages.
    Again,
    /// Handler satisfied; stop and report success.
    #[default]
    Pass,
    /// Handler ran, but the exchange must report failure. Used for
    /// server-reported errors so the handler's side effects survive.
    PassReturnFail,
    /// Hard abort.
    Fail,
    /// Stop reading; the exchange continues asynchronously. Counts as
    /// success for loop exit.
    AsyncAgain,
}

impl Continuation {
    /// Check whether the dispatch loop stops on this signal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Again)
    }

    /// Check whether a terminal signal reports success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Pass | Self::AsyncAgain)
    }

    /// Check whether a terminal signal reports failure.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Fail | Self::PassReturnFail)
    }

    /// Short name used in log events.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Again => "AGAIN",
            Self::Pass => "PASS",
            Self::PassReturnFail => "PASS_RETURN_FAIL",
            Self::Fail => "FAIL",
            Self::AsyncAgain => "ASYNC_AGAIN",
        }
    }
}

impl std::fmt::Display for Continuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

use std::fmt;

/// What a fetch did (or will do) to the local copy of a file.
///
/// Passed to post-processors so they can skip work that is already done.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchAction {
    /// The file did not exist locally and was downloaded.
    Downloaded,
    /// The file existed but did not match the registry and was re-downloaded.
    Updated,
    /// The file existed and verified; nothing was transferred.
    Fetched,
}

impl FetchAction {
    /// Whether this action moved bytes over the network.
    pub fn downloaded(&self) -> bool {
        matches!(self, Self::Downloaded | Self::Updated)
    }
}

impl fmt::Display for FetchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Downloaded => "download",
            Self::Updated => "update",
            Self::Fetched => "fetch",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downloaded_covers_both_transfer_variants() {
        assert!(FetchAction::Downloaded.downloaded());
        assert!(FetchAction::Updated.downloaded());
        assert!(!FetchAction::Fetched.downloaded());
    }
}

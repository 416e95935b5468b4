/// Content Safety text operations this crate calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    DetectProtectedMaterialForCode,
    ShieldPrompt,
}

impl Operation {
    pub fn path(self) -> &'static str {
        match self {
            Self::DetectProtectedMaterialForCode => {
                "/contentsafety/text:detectProtectedMaterialForCode"
            }
            Self::ShieldPrompt => "/contentsafety/text:shieldPrompt",
        }
    }

    pub fn api_version(self) -> &'static str {
        match self {
            Self::DetectProtectedMaterialForCode => "2024-09-15-preview",
            Self::ShieldPrompt => "2024-09-01",
        }
    }

    /// `{endpoint}{path}?api-version={version}`; a trailing `/` on the
    /// endpoint is dropped.
    pub fn url(self, endpoint: &str) -> String {
        format!(
            "{}{}?api-version={}",
            endpoint.trim_end_matches('/'),
            self.path(),
            self.api_version()
        )
    }
}

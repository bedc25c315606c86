/// One hit from the profile search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSearchResult {
    pub name: String,
    pub uuid: String,
    /// Best rank label across all categories, or `Unranked`.
    pub tier: String,
}

/// Engine configuration, passed in at construction time rather than read
/// from the environment inside business logic.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name of the single table holding headers and question batches.
    pub table_name: String,
    /// Upper bound on id-allocation attempts for one create call.
    pub id_retry_limit: u32,
    /// Page size used when a caller passes a non-positive one.
    pub default_page_size: i32,
}

impl EngineConfig {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            table_name: "examdesk".to_string(),
            id_retry_limit: 100,
            default_page_size: 50,
        }
    }
}

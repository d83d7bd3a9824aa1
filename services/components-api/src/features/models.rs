use sqlx::FromRow;

/// One catalog hit from the `projects` table. The url is synthesized after
/// the merge, not read from the store. Identity for de-duplication is the
/// full tuple, url included.
#[derive(FromRow, Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Component {
    pub component: String,
    pub purl_name: String,
    pub purl_type: String,
    #[sqlx(skip)]
    pub url: String,
}

/// One (component, version) sighting from `all_urls`, with its license
/// columns left-joined in (nullable when the sighting carries no license).
#[derive(FromRow, Debug, Clone, Default)]
pub struct AllUrl {
    pub component: String,
    pub version: String,
    pub license: Option<String>,
    pub license_id: Option<String>,
    pub is_spdx: Option<bool>,
    pub purl_name: String,
    pub mine_id: i32,
}

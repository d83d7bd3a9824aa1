use shared::services::database::Database;
use shared::utilities::{config::Config, errors::AppError};
use tracing::{debug, warn};

use crate::features::models::AllUrl;
use crate::features::repository::{AllUrlsRepository, ComponentRepository};
use crate::features::schemas::{
    CompSearchRequest, CompVersionRequest, ComponentLicense, ComponentVersion, SearchComponent,
    VersionedComponent,
};

/// Which search entry point a request dispatches to, based on which
/// fields were supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    FreeText,
    NameType,
    VendorType,
    NameVendorType,
}

impl SearchKind {
    pub fn from_request(request: &CompSearchRequest) -> Result<Self, AppError> {
        if !request.search.is_empty() {
            Ok(Self::FreeText)
        } else if !request.component.is_empty() && !request.vendor.is_empty() {
            Ok(Self::NameVendorType)
        } else if !request.component.is_empty() {
            Ok(Self::NameType)
        } else if !request.vendor.is_empty() {
            Ok(Self::VendorType)
        } else {
            Err(AppError::BadRequest("No data supplied".to_string()))
        }
    }
}

/// Use case behind the two catalog endpoints.
pub struct ComponentUseCase {
    components: ComponentRepository,
    all_urls: AllUrlsRepository,
}

impl ComponentUseCase {
    pub fn new(database: &Database, config: &Config) -> Self {
        Self {
            components: ComponentRepository::new(database, config),
            all_urls: AllUrlsRepository::new(database, config),
        }
    }

    pub async fn search_components(
        &self,
        request: &CompSearchRequest,
    ) -> Result<Vec<SearchComponent>, AppError> {
        let kind = SearchKind::from_request(request)?;
        debug!("Dispatching {kind:?} search for package type '{}'", request.package);
        let results = match kind {
            SearchKind::FreeText => {
                self.components
                    .get_components(&request.search, &request.package, request.limit, request.offset)
                    .await?
            }
            SearchKind::NameType => {
                self.components
                    .get_components_by_name_type(
                        &request.component,
                        &request.package,
                        request.limit,
                        request.offset,
                    )
                    .await?
            }
            SearchKind::VendorType => {
                self.components
                    .get_components_by_vendor_type(
                        &request.vendor,
                        &request.package,
                        request.limit,
                        request.offset,
                    )
                    .await?
            }
            SearchKind::NameVendorType => {
                self.components
                    .get_components_by_name_vendor_type(
                        &request.component,
                        &request.vendor,
                        &request.package,
                        request.limit,
                        request.offset,
                    )
                    .await?
            }
        };

        Ok(results
            .into_iter()
            .map(|record| SearchComponent {
                purl: format!("pkg:{}/{}", record.purl_type, record.purl_name),
                component: record.component,
                url: record.url,
            })
            .collect())
    }

    pub async fn get_component_versions(
        &self,
        request: &CompVersionRequest,
    ) -> Result<VersionedComponent, AppError> {
        if request.purl.is_empty() {
            return Err(AppError::BadRequest("No purl supplied".to_string()));
        }
        let purl = purl_helper::purl_from_string(&request.purl)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let purl_name = purl.purl_name();

        let rows = self
            .all_urls
            .get_urls_by_purl_name_type(&purl_name, &purl.purl_type, request.limit)
            .await?;

        let url = match purl_helper::project_url(&purl_name, &purl.purl_type) {
            Ok(url) => url,
            Err(e) => {
                warn!("No project URL for {purl_name}: {e}");
                String::new()
            }
        };

        Ok(VersionedComponent {
            component: rows
                .first()
                .map(|row| row.component.clone())
                .unwrap_or_default(),
            purl: request.purl.clone(),
            url,
            versions: group_versions(&rows),
        })
    }
}

/// Shape the raw sighting rows into the response versions list. Rows
/// without a version string are dropped; a row without a license becomes a
/// version with an empty licenses list.
fn group_versions(rows: &[AllUrl]) -> Vec<ComponentVersion> {
    rows.iter()
        .filter(|row| !row.version.is_empty())
        .map(|row| {
            let licenses = match row.license.as_deref() {
                Some(name) if !name.is_empty() => vec![ComponentLicense {
                    name: name.to_string(),
                    spdx_id: row.license_id.clone().unwrap_or_default(),
                    is_spdx_approved: row.is_spdx.unwrap_or(false),
                }],
                _ => Vec::new(),
            };
            ComponentVersion {
                version: row.version.clone(),
                licenses,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_request(search: &str, component: &str, vendor: &str) -> CompSearchRequest {
        CompSearchRequest {
            search: search.to_string(),
            component: component.to_string(),
            vendor: vendor.to_string(),
            ..Default::default()
        }
    }

    fn row(version: &str, license: Option<&str>) -> AllUrl {
        AllUrl {
            component: "tablestyle".to_string(),
            version: version.to_string(),
            license: license.map(str::to_string),
            license_id: license.map(|_| "MIT".to_string()),
            is_spdx: license.map(|_| true),
            purl_name: "tablestyle".to_string(),
            mine_id: 4,
        }
    }

    #[test]
    fn test_dispatch_prefers_free_text() {
        let request = search_request("angular", "angular", "google");
        assert_eq!(SearchKind::from_request(&request).unwrap(), SearchKind::FreeText);
    }

    #[test]
    fn test_dispatch_on_supplied_fields() {
        let request = search_request("", "angular", "");
        assert_eq!(SearchKind::from_request(&request).unwrap(), SearchKind::NameType);
        let request = search_request("", "", "scanoss");
        assert_eq!(SearchKind::from_request(&request).unwrap(), SearchKind::VendorType);
        let request = search_request("", "engine", "scanoss");
        assert_eq!(
            SearchKind::from_request(&request).unwrap(),
            SearchKind::NameVendorType
        );
    }

    #[test]
    fn test_dispatch_rejects_empty_request() {
        let request = search_request("", "", "");
        assert!(SearchKind::from_request(&request).is_err());
    }

    #[test]
    fn test_group_versions_skips_empty_versions() {
        let rows = vec![row("", Some("MIT License")), row("0.6.5", Some("MIT License"))];
        let versions = group_versions(&rows);
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, "0.6.5");
        assert_eq!(versions[0].licenses[0].name, "MIT License");
        assert_eq!(versions[0].licenses[0].spdx_id, "MIT");
        assert!(versions[0].licenses[0].is_spdx_approved);
    }

    #[test]
    fn test_group_versions_without_license() {
        let rows = vec![row("1.0.0", None), row("1.0.1", Some(""))];
        let versions = group_versions(&rows);
        assert_eq!(versions.len(), 2);
        assert!(versions[0].licenses.is_empty());
        assert!(versions[1].licenses.is_empty());
    }

    #[test]
    fn test_group_versions_does_not_coalesce_license_rows() {
        let rows = vec![row("2.0.0", Some("MIT License")), row("2.0.0", Some("Apache 2.0"))];
        let versions = group_versions(&rows);
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, "2.0.0");
        assert_eq!(versions[1].version, "2.0.0");
        assert_ne!(versions[0].licenses, versions[1].licenses);
    }
}
